use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "pets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub pet_type: String,
    pub breed: String,
    pub age: String,
    #[sea_orm(column_type = "Json")]
    pub behavior_flags: Json,
    #[sea_orm(column_type = "Text")]
    pub entry_behavior: String,
    #[sea_orm(column_type = "Text")]
    pub allergies: String,
    #[sea_orm(column_type = "Text")]
    pub meds: String,
    #[sea_orm(column_type = "Text")]
    pub vet_info: String,
    pub photo_url: String,
}

impl Model {
    pub fn behavior_flags(&self) -> Vec<String> {
        serde_json::from_value(self.behavior_flags.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Client,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
