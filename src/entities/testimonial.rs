use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const MAX_STARS: i32 = 5;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "testimonials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    /// Stored exactly as submitted; clamp with `filled_stars` when rendering.
    pub rating: i32,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn filled_stars(&self) -> u8 {
        self.rating.clamp(0, MAX_STARS) as u8
    }

    /// Five characters, filled stars first.
    pub fn star_string(&self) -> String {
        let filled = self.filled_stars() as usize;
        let mut stars = "★".repeat(filled);
        stars.push_str(&"☆".repeat(MAX_STARS as usize - filled));
        stars
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
