//! Booking request lifecycle.
//!
//! ```text
//! pending --approve--> approved --complete--> completed
//!    \
//!     `--decline (confirmed)--> declined
//! ```
//!
//! `completed` and `declined` are terminal. Every transition is one
//! conditional update on the request row (status and, optionally, version),
//! so a racing operator gets a `Conflict` or `InvalidTransition` instead of
//! silently overwriting the other's decision. Each successful transition
//! appends a row to `request_transitions`.

pub mod linkage;
pub mod visits;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{self, request, request_transition, Request, RequestStatus, RequestTransition, ServiceType};
use crate::storage::StorageError;

pub use linkage::{resolve_visit, ClientResolution, PhoneMatch, VisitLinkage};
pub use visits::PhotoUpload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    Approve,
    Decline,
    Complete,
}

impl RequestAction {
    /// Source and target status of the action.
    pub fn edge(&self) -> (RequestStatus, RequestStatus) {
        match self {
            RequestAction::Approve => (RequestStatus::Pending, RequestStatus::Approved),
            RequestAction::Decline => (RequestStatus::Pending, RequestStatus::Declined),
            RequestAction::Complete => (RequestStatus::Approved, RequestStatus::Completed),
        }
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestAction::Approve => "approve",
            RequestAction::Decline => "decline",
            RequestAction::Complete => "complete",
        })
    }
}

/// Actions an operator may take on a request in `status`.
pub fn allowed_actions(status: RequestStatus) -> &'static [RequestAction] {
    match status {
        RequestStatus::Pending => &[RequestAction::Approve, RequestAction::Decline],
        RequestStatus::Approved => &[RequestAction::Complete],
        RequestStatus::Completed | RequestStatus::Declined => &[],
    }
}

/// Declining is destructive from the client's point of view, so the operator
/// has to confirm it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Withheld,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Withheld
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),
    #[error("request {0} not found")]
    RequestNotFound(Uuid),
    #[error("cannot {action} a request that is {status}")]
    InvalidTransition { action: RequestAction, status: RequestStatus },
    #[error("request {id} changed concurrently (expected version {expected}, found {actual})")]
    Conflict { id: Uuid, expected: i32, actual: i32 },
    #[error("declining a request requires confirmation")]
    ConfirmationRequired,
    #[error(transparent)]
    Store(#[from] DbErr),
    #[error(transparent)]
    Blob(#[from] StorageError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingForm {
    pub client_phone: String,
    pub service_type: ServiceType,
    pub date: String,
    pub time_window: String,
    #[serde(default)]
    pub notes: String,
}

/// Outcome of completing a request: the operator continues on the visit form.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub request: request::Model,
    pub visit_form_path: String,
}

pub fn visit_form_path(request_id: Uuid) -> String {
    format!("/admin/visits/new?request_id={}", request_id)
}

fn require(value: &str, field: &str) -> Result<String, LifecycleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LifecycleError::Validation(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

#[derive(Clone)]
pub struct RequestLifecycle {
    db: DatabaseConnection,
}

impl RequestLifecycle {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Public booking form. The request starts `pending` with no client or pet linkage.
    pub async fn submit_booking(&self, form: BookingForm) -> Result<request::Model, LifecycleError> {
        let client_phone = require(&form.client_phone, "client_phone")?;
        let date = require(&form.date, "date")?;
        let time_window = require(&form.time_window, "time_window")?;
        chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| LifecycleError::Validation("date must be formatted YYYY-MM-DD".to_string()))?;

        let booking = request::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(None),
            pet_ids: Set(serde_json::json!([])),
            service_type: Set(form.service_type),
            date: Set(date),
            time_window: Set(time_window),
            notes: Set(form.notes.trim().to_string()),
            status: Set(RequestStatus::Pending),
            client_phone: Set(client_phone),
            version: Set(1),
            created_at: Set(entities::now()),
        };

        let saved = booking.insert(&self.db).await?;
        info!(request_id = %saved.id, service_type = saved.service_type.key(), "booking request submitted");
        crate::metrics::increment_bookings_submitted(saved.service_type.key());
        Ok(saved)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<request::Model>, DbErr> {
        Request::find_by_id(id).one(&self.db).await
    }

    /// All requests, newest first, optionally restricted to one status.
    pub async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<request::Model>, DbErr> {
        let mut query = Request::find().order_by_desc(request::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(request::Column::Status.eq(status));
        }
        query.all(&self.db).await
    }

    pub async fn approve(
        &self,
        id: Uuid,
        expected_version: Option<i32>,
        actor: &str,
    ) -> Result<request::Model, LifecycleError> {
        self.transition(id, RequestAction::Approve, expected_version, actor).await
    }

    /// Nothing is written unless `confirmation` is `Confirmed`.
    pub async fn decline(
        &self,
        id: Uuid,
        confirmation: Confirmation,
        expected_version: Option<i32>,
        actor: &str,
    ) -> Result<request::Model, LifecycleError> {
        if confirmation != Confirmation::Confirmed {
            return Err(LifecycleError::ConfirmationRequired);
        }
        self.transition(id, RequestAction::Decline, expected_version, actor).await
    }

    pub async fn complete(
        &self,
        id: Uuid,
        expected_version: Option<i32>,
        actor: &str,
    ) -> Result<Completion, LifecycleError> {
        let request = self.transition(id, RequestAction::Complete, expected_version, actor).await?;
        Ok(Completion {
            visit_form_path: visit_form_path(request.id),
            request,
        })
    }

    /// Audit trail of a request, oldest first.
    pub async fn history(&self, id: Uuid) -> Result<Vec<request_transition::Model>, DbErr> {
        RequestTransition::find()
            .filter(request_transition::Column::RequestId.eq(id))
            .order_by_asc(request_transition::Column::Version)
            .all(&self.db)
            .await
    }

    async fn transition(
        &self,
        id: Uuid,
        action: RequestAction,
        expected_version: Option<i32>,
        actor: &str,
    ) -> Result<request::Model, LifecycleError> {
        let (from, to) = action.edge();

        let mut update = Request::update_many()
            .col_expr(request::Column::Status, Expr::value(to))
            .col_expr(request::Column::Version, Expr::col(request::Column::Version).add(1))
            .filter(request::Column::Id.eq(id))
            .filter(request::Column::Status.eq(from));
        if let Some(version) = expected_version {
            update = update.filter(request::Column::Version.eq(version));
        }

        let txn = self.db.begin().await?;
        let result = update.exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(self.explain_rejection(id, action, expected_version).await);
        }

        let updated = Request::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(LifecycleError::RequestNotFound(id))?;

        request_transition::ActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(id),
            from_status: Set(from),
            to_status: Set(to),
            version: Set(updated.version),
            actor: Set(actor.to_string()),
            created_at: Set(entities::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(request_id = %id, %from, %to, version = updated.version, actor, "request transitioned");
        crate::metrics::record_transition(from, to);
        Ok(updated)
    }

    /// Works out why a conditional update matched no row.
    async fn explain_rejection(&self, id: Uuid, action: RequestAction, expected_version: Option<i32>) -> LifecycleError {
        let (from, _) = action.edge();
        let current = match Request::find_by_id(id).one(&self.db).await {
            Ok(Some(current)) => current,
            Ok(None) => return LifecycleError::RequestNotFound(id),
            Err(e) => return LifecycleError::Store(e),
        };

        if current.status != from {
            return LifecycleError::InvalidTransition {
                action,
                status: current.status,
            };
        }

        warn!(request_id = %id, %action, expected = ?expected_version, actual = current.version, "transition lost a race");
        crate::metrics::increment_transition_conflicts();
        LifecycleError::Conflict {
            id,
            expected: expected_version.unwrap_or(current.version),
            actual: current.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    fn booking(service_type: ServiceType) -> BookingForm {
        BookingForm {
            client_phone: "+15551234567".to_string(),
            service_type,
            date: "2025-06-01".to_string(),
            time_window: "9am-12pm".to_string(),
            notes: "Rex pulls on the leash".to_string(),
        }
    }

    #[tokio::test]
    async fn booking_starts_pending_without_linkage() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);

        let req = lifecycle.submit_booking(booking(ServiceType::Walk30)).await.unwrap();

        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.client_id, None);
        assert!(req.pet_ids().is_empty());
        assert_eq!(req.version, 1);
    }

    #[tokio::test]
    async fn booking_rejects_missing_fields() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);

        let mut form = booking(ServiceType::Walk30);
        form.time_window = "   ".to_string();
        let err = lifecycle.submit_booking(form).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(msg) if msg.contains("time_window")));

        let mut form = booking(ServiceType::Walk30);
        form.date = "June 1st".to_string();
        assert!(matches!(
            lifecycle.submit_booking(form).await.unwrap_err(),
            LifecycleError::Validation(_)
        ));

        assert!(lifecycle.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approve_changes_only_status() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);
        let before = lifecycle.submit_booking(booking(ServiceType::Walk60)).await.unwrap();

        let after = lifecycle.approve(before.id, None, "admin").await.unwrap();

        assert_eq!(after.status, RequestStatus::Approved);
        assert_eq!(after.version, before.version + 1);
        let normalized = request::Model {
            status: before.status,
            version: before.version,
            ..after.clone()
        };
        assert_eq!(normalized, before);
    }

    #[tokio::test]
    async fn decline_without_confirmation_writes_nothing() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);
        let req = lifecycle.submit_booking(booking(ServiceType::HomeVisit)).await.unwrap();

        let err = lifecycle
            .decline(req.id, Confirmation::Withheld, None, "admin")
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::ConfirmationRequired));
        let stored = lifecycle.get(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert_eq!(stored.version, 1);
        assert!(lifecycle.history(req.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmed_decline_is_recorded() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);
        let req = lifecycle.submit_booking(booking(ServiceType::HomeVisit)).await.unwrap();

        let declined = lifecycle
            .decline(req.id, Confirmation::Confirmed, Some(1), "admin@example.com")
            .await
            .unwrap();

        assert_eq!(declined.status, RequestStatus::Declined);
        let history = lifecycle.history(req.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, RequestStatus::Pending);
        assert_eq!(history[0].to_status, RequestStatus::Declined);
        assert_eq!(history[0].actor, "admin@example.com");
    }

    #[tokio::test]
    async fn complete_points_at_visit_form_for_the_request() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);
        let req = lifecycle.submit_booking(booking(ServiceType::Walk30)).await.unwrap();
        lifecycle.approve(req.id, None, "admin").await.unwrap();

        let completion = lifecycle.complete(req.id, None, "admin").await.unwrap();

        assert_eq!(completion.request.status, RequestStatus::Completed);
        assert_eq!(
            completion.visit_form_path,
            format!("/admin/visits/new?request_id={}", req.id)
        );
    }

    #[tokio::test]
    async fn complete_requires_approval_first() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);
        let req = lifecycle.submit_booking(booking(ServiceType::Walk30)).await.unwrap();

        let err = lifecycle.complete(req.id, None, "admin").await.unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                action: RequestAction::Complete,
                status: RequestStatus::Pending
            }
        ));
    }

    #[tokio::test]
    async fn terminal_states_reject_every_action() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);

        let completed = lifecycle.submit_booking(booking(ServiceType::Walk30)).await.unwrap();
        lifecycle.approve(completed.id, None, "admin").await.unwrap();
        lifecycle.complete(completed.id, None, "admin").await.unwrap();

        let declined = lifecycle.submit_booking(booking(ServiceType::Walk30)).await.unwrap();
        lifecycle
            .decline(declined.id, Confirmation::Confirmed, None, "admin")
            .await
            .unwrap();

        for id in [completed.id, declined.id] {
            assert!(matches!(
                lifecycle.approve(id, None, "admin").await,
                Err(LifecycleError::InvalidTransition { .. })
            ));
            assert!(matches!(
                lifecycle.decline(id, Confirmation::Confirmed, None, "admin").await,
                Err(LifecycleError::InvalidTransition { .. })
            ));
            assert!(matches!(
                lifecycle.complete(id, None, "admin").await,
                Err(LifecycleError::InvalidTransition { .. })
            ));
        }

        assert!(allowed_actions(RequestStatus::Completed).is_empty());
        assert!(allowed_actions(RequestStatus::Declined).is_empty());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);
        let req = lifecycle.submit_booking(booking(ServiceType::Walk30)).await.unwrap();
        lifecycle.approve(req.id, Some(1), "first operator").await.unwrap();

        // Second operator still looking at version 1 tries to complete after a reload
        // that saw `approved` but not the version bump.
        let err = lifecycle.complete(req.id, Some(1), "second operator").await.unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Conflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        let stored = lifecycle.get(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);

        let err = lifecycle.approve(Uuid::new_v4(), None, "admin").await.unwrap_err();
        assert!(matches!(err, LifecycleError::RequestNotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_by_status_newest_first() {
        let (db, _dir) = test_db().await;
        let lifecycle = RequestLifecycle::new(db);
        let first = lifecycle.submit_booking(booking(ServiceType::Walk30)).await.unwrap();
        let second = lifecycle.submit_booking(booking(ServiceType::Walk60)).await.unwrap();
        lifecycle.approve(first.id, None, "admin").await.unwrap();

        let pending = lifecycle.list(Some(RequestStatus::Pending)).await.unwrap();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id]);

        let all = lifecycle.list(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at >= all[1].created_at);
    }
}
