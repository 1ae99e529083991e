use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the single settings row.
pub const CONFIG_ID: &str = "config";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub business_name: String,
    pub website: String,
    pub phone: String,
    pub instagram_url: String,
    /// Object keyed by service type (`walk30`, ...) holding checkout URLs.
    #[sea_orm(column_type = "Json")]
    pub payment_links: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
