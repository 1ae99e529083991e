use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::AdminId;
use crate::entities::{request, RequestStatus};
use crate::lifecycle::{allowed_actions, Confirmation, LifecycleError, RequestAction, RequestLifecycle};
use crate::messaging;

/// Request as the admin screens show it.
#[derive(Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    request: request::Model,
    service_label: &'static str,
    allowed_actions: &'static [RequestAction],
}

impl From<request::Model> for RequestView {
    fn from(request: request::Model) -> Self {
        Self {
            service_label: request.service_type.short_label(),
            allowed_actions: allowed_actions(request.status),
            request,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    status: Option<RequestStatus>,
}

#[derive(Deserialize, Default)]
pub struct TransitionBody {
    expected_version: Option<i32>,
}

#[derive(Deserialize, Default)]
pub struct DeclineBody {
    #[serde(default)]
    confirm: bool,
    expected_version: Option<i32>,
}

fn record_transition_span(action: RequestAction, request: &request::Model) {
    tracing::Span::current()
        .record("table", "requests")
        .record("action", tracing::field::display(action))
        .record("request_id", tracing::field::display(request.id))
        .record(
            "business_event",
            format!("Request {} is now {}", request.id, request.status).as_str(),
        );
}

pub async fn list_requests(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Query(params): Query<ListParams>,
) -> Response {
    match lifecycle.list(params.status).await {
        Ok(requests) => {
            let views: Vec<RequestView> = requests.into_iter().map(RequestView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => super::store_error("list requests", e),
    }
}

pub async fn get_request(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Path(request_id): Path<Uuid>,
) -> Response {
    match lifecycle.get(request_id).await {
        Ok(Some(request)) => (StatusCode::OK, Json(RequestView::from(request))).into_response(),
        Ok(None) => LifecycleError::RequestNotFound(request_id).into_response(),
        Err(e) => super::store_error("load request", e),
    }
}

pub async fn approve_request(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Extension(admin): Extension<AdminId>,
    Path(request_id): Path<Uuid>,
    body: Option<Json<TransitionBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match lifecycle.approve(request_id, body.expected_version, &admin.actor()).await {
        Ok(request) => {
            record_transition_span(RequestAction::Approve, &request);
            (StatusCode::OK, Json(RequestView::from(request))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn decline_request(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Extension(admin): Extension<AdminId>,
    Path(request_id): Path<Uuid>,
    body: Option<Json<DeclineBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match lifecycle
        .decline(
            request_id,
            Confirmation::from(body.confirm),
            body.expected_version,
            &admin.actor(),
        )
        .await
    {
        Ok(request) => {
            record_transition_span(RequestAction::Decline, &request);
            (StatusCode::OK, Json(RequestView::from(request))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// On success the admin UI continues at `visit_form_path`.
pub async fn complete_request(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Extension(admin): Extension<AdminId>,
    Path(request_id): Path<Uuid>,
    body: Option<Json<TransitionBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match lifecycle.complete(request_id, body.expected_version, &admin.actor()).await {
        Ok(completion) => {
            record_transition_span(RequestAction::Complete, &completion.request);
            (StatusCode::OK, Json(completion)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn decline_sms(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Path(request_id): Path<Uuid>,
) -> Response {
    let request = match lifecycle.get(request_id).await {
        Ok(Some(r)) => r,
        Ok(None) => return LifecycleError::RequestNotFound(request_id).into_response(),
        Err(e) => return super::store_error("load request", e),
    };

    match messaging::decline_message(&request) {
        Some(sms) => (StatusCode::OK, Json(sms)).into_response(),
        None => super::error_response(
            StatusCode::CONFLICT,
            format!("Decline message is only available for declined requests (request is {})", request.status),
        ),
    }
}

pub async fn request_history(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Path(request_id): Path<Uuid>,
) -> Response {
    match lifecycle.get(request_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return LifecycleError::RequestNotFound(request_id).into_response(),
        Err(e) => return super::store_error("load request", e),
    }

    match lifecycle.history(request_id).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => super::store_error("load request history", e),
    }
}
