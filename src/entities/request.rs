use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Offerings a booking can ask for. Labels and prices live in `crate::catalog`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum,
    Deserialize, Serialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum ServiceType {
    #[sea_orm(string_value = "walk30")]
    Walk30,
    #[sea_orm(string_value = "walk60")]
    Walk60,
    #[sea_orm(string_value = "homeVisit")]
    HomeVisit,
    #[sea_orm(string_value = "homeVisitMedical")]
    HomeVisitMedical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Deserialize, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "declined")]
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Completed => "completed",
            RequestStatus::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Declined)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Left empty by the public booking form.
    pub client_id: Option<Uuid>,
    #[sea_orm(column_type = "Json")]
    pub pet_ids: Json,
    pub service_type: ServiceType,
    pub date: String,
    pub time_window: String,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    pub status: RequestStatus,
    pub client_phone: String,
    /// Bumped on every status transition; callers may pass it back to detect races.
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn pet_ids(&self) -> Vec<Uuid> {
        serde_json::from_value(self.pet_ids.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Client,
    #[sea_orm(has_many = "super::visit::Entity")]
    Visits,
    #[sea_orm(has_many = "super::request_transition::Entity")]
    Transitions,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visits.def()
    }
}

impl Related<super::request_transition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
