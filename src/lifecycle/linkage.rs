//! Visit → request → client resolution.
//!
//! Booking requests carry only the phone number the client typed, so the
//! owning client is found by exact phone match. Phone numbers are not unique;
//! when several clients share one, the most recently created profile wins and
//! the ambiguity is reported alongside the result.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{client, request, visit, Client, Request, Visit};

#[derive(Debug, Clone, PartialEq)]
pub enum PhoneMatch {
    None,
    Unique(client::Model),
    Ambiguous { chosen: client::Model, matches: usize },
}

impl PhoneMatch {
    pub fn client(&self) -> Option<&client::Model> {
        match self {
            PhoneMatch::None => None,
            PhoneMatch::Unique(client) | PhoneMatch::Ambiguous { chosen: client, .. } => Some(client),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClientResolution {
    Found,
    Ambiguous { matches: usize },
    ProfileNotFound,
    RequestNotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitLinkage {
    pub visit: visit::Model,
    pub request: Option<request::Model>,
    pub client: Option<client::Model>,
    pub resolution: ClientResolution,
}

pub async fn find_client_by_phone(db: &DatabaseConnection, phone: &str) -> Result<PhoneMatch, DbErr> {
    let mut matches = Client::find()
        .filter(client::Column::Phone.eq(phone))
        .order_by_desc(client::Column::CreatedAt)
        .order_by_desc(client::Column::Id)
        .all(db)
        .await?;

    Ok(match matches.len() {
        0 => PhoneMatch::None,
        1 => PhoneMatch::Unique(matches.remove(0)),
        count => {
            tracing::warn!(phone, matches = count, "several clients share a phone number, using the newest");
            PhoneMatch::Ambiguous {
                chosen: matches.remove(0),
                matches: count,
            }
        }
    })
}

/// `Ok(None)` when the visit itself does not exist.
pub async fn resolve_visit(db: &DatabaseConnection, visit_id: Uuid) -> Result<Option<VisitLinkage>, DbErr> {
    let Some(visit) = Visit::find_by_id(visit_id).one(db).await? else {
        return Ok(None);
    };

    let Some(request) = Request::find_by_id(visit.request_id).one(db).await? else {
        return Ok(Some(VisitLinkage {
            visit,
            request: None,
            client: None,
            resolution: ClientResolution::RequestNotFound,
        }));
    };

    let (client, resolution) = match find_client_by_phone(db, &request.client_phone).await? {
        PhoneMatch::None => (None, ClientResolution::ProfileNotFound),
        PhoneMatch::Unique(client) => (Some(client), ClientResolution::Found),
        PhoneMatch::Ambiguous { chosen, matches } => (Some(chosen), ClientResolution::Ambiguous { matches }),
    };

    Ok(Some(VisitLinkage {
        visit,
        request: Some(request),
        client,
        resolution,
    }))
}
