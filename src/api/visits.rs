use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;

use crate::lifecycle::{resolve_visit, ClientResolution, LifecycleError, RequestLifecycle};
use crate::messaging;
use crate::storage::SharedBlobStore;

pub async fn list_visits(Extension(lifecycle): Extension<RequestLifecycle>) -> Response {
    match lifecycle.list_visits().await {
        Ok(visits) => (StatusCode::OK, Json(visits)).into_response(),
        Err(e) => super::store_error("list visits", e),
    }
}

/// Multipart fields: `request_id`, `summary_notes`, and any number of `photos`.
pub async fn create_visit(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Extension(blobs): Extension<SharedBlobStore>,
    mut multipart: Multipart,
) -> Response {
    let mut request_id = None;
    let mut summary_notes = String::new();
    let mut photos = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return super::error_response(StatusCode::BAD_REQUEST, e.to_string()),
        };
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "request_id" => {
                let raw = match super::text_from_field(field).await {
                    Ok(t) => t,
                    Err(resp) => return resp,
                };
                match raw.trim().parse::<Uuid>() {
                    Ok(id) => request_id = Some(id),
                    Err(_) => {
                        return super::error_response(StatusCode::BAD_REQUEST, "request_id must be a UUID")
                    }
                }
            }
            "summary_notes" => match super::text_from_field(field).await {
                Ok(t) => summary_notes = t,
                Err(resp) => return resp,
            },
            "photos" => match super::photo_from_field(field).await {
                Ok(Some(photo)) => photos.push(photo),
                Ok(None) => {}
                Err(resp) => return resp,
            },
            _ => {}
        }
    }

    let Some(request_id) = request_id else {
        return super::error_response(StatusCode::BAD_REQUEST, "request_id is required");
    };

    match lifecycle
        .record_visit(request_id, &summary_notes, photos, blobs.as_ref())
        .await
    {
        Ok(visit) => {
            tracing::Span::current()
                .record("table", "visits")
                .record("action", "record_visit")
                .record("request_id", tracing::field::display(request_id))
                .record("business_event", "Visit recorded");
            (StatusCode::CREATED, Json(visit)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_visit(
    Extension(db): Extension<DatabaseConnection>,
    Path(visit_id): Path<Uuid>,
) -> Response {
    match resolve_visit(&db, visit_id).await {
        Ok(Some(linkage)) => (StatusCode::OK, Json(linkage)).into_response(),
        Ok(None) => super::error_response(StatusCode::NOT_FOUND, "Visit not found"),
        Err(e) => super::store_error("load visit", e),
    }
}

/// Composes the visit update text for the client the visit resolves to.
pub async fn visit_update_sms(
    Extension(db): Extension<DatabaseConnection>,
    Path(visit_id): Path<Uuid>,
) -> Response {
    let linkage = match resolve_visit(&db, visit_id).await {
        Ok(Some(l)) => l,
        Ok(None) => return super::error_response(StatusCode::NOT_FOUND, "Visit not found"),
        Err(e) => return super::store_error("load visit", e),
    };

    match (&linkage.client, linkage.resolution) {
        (Some(client), resolution) => {
            let sms = messaging::visit_update_message(client, &linkage.visit);
            (StatusCode::OK, Json(json!({"sms": sms, "resolution": resolution}))).into_response()
        }
        (None, ClientResolution::RequestNotFound) => {
            LifecycleError::RequestNotFound(linkage.visit.request_id).into_response()
        }
        (None, _) => super::error_response(
            StatusCode::NOT_FOUND,
            "No client profile matches the booking phone number",
        ),
    }
}
