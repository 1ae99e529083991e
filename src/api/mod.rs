pub mod auth;
pub mod booking;
pub mod clients;
pub mod dashboard;
pub mod intake;
pub mod middleware;
pub mod pay;
pub mod requests;
pub mod settings;
pub mod testimonials;
pub mod visits;

#[cfg(test)]
mod tests;

use axum::{
    extract::multipart::Field,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, field::display};

use crate::lifecycle::{LifecycleError, PhotoUpload};

/// Public and admin routes. Handlers expect the database, `RequestLifecycle`,
/// `SharedBlobStore`, `TestimonialFeed` and `SessionKey` extensions plus a
/// cookie manager layered on top.
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/api/booking", post(booking::submit_booking))
        .route("/api/intake", post(intake::submit_intake))
        .route("/api/pay", get(pay::list_payment_links))
        .route("/pay/:service_type", get(pay::redirect_to_checkout))
        .route("/api/testimonials", post(testimonials::submit_testimonial))
        .route("/api/testimonials/latest", get(testimonials::latest_testimonial))
        .route(
            "/api/testimonials/latest/stream",
            get(testimonials::stream_latest_testimonial),
        );

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let admin_routes = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/requests", get(requests::list_requests))
        .route("/requests/:id", get(requests::get_request))
        .route("/requests/:id/approve", post(requests::approve_request))
        .route("/requests/:id/decline", post(requests::decline_request))
        .route("/requests/:id/complete", post(requests::complete_request))
        .route("/requests/:id/decline-sms", get(requests::decline_sms))
        .route("/requests/:id/history", get(requests::request_history))
        .route("/clients", get(clients::list_clients))
        .route("/clients/:id", get(clients::get_client))
        .route("/visits", get(visits::list_visits).post(visits::create_visit))
        .route("/visits/:id", get(visits::get_visit))
        .route("/visits/:id/update-sms", get(visits::visit_update_sms))
        .route("/testimonials", get(testimonials::list_testimonials))
        .route("/testimonials/:id", delete(testimonials::delete_testimonial))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::replace_settings),
        )
        .route_layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/admin", auth_routes.merge(admin_routes))
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

/// Store failures are logged with detail and reported generically.
pub fn store_error(action: &str, e: impl std::fmt::Display) -> Response {
    error!("Failed to {}: {}", action, e);
    tracing::Span::current().record("error", display(&e));
    error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {}", action))
}

/// Reads one file part. An empty part (no file chosen) yields `None`.
pub async fn photo_from_field(field: Field<'_>) -> Result<Option<PhotoUpload>, Response> {
    let file_name = field.file_name().unwrap_or("photo.jpg").to_string();
    let content_type = field.content_type().map(str::to_string);
    let data = field
        .bytes()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
    if data.is_empty() {
        return Ok(None);
    }
    Ok(Some(PhotoUpload {
        file_name,
        content_type,
        data: data.to_vec(),
    }))
}

pub async fn text_from_field(field: Field<'_>) -> Result<String, Response> {
    field
        .text()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        match &self {
            LifecycleError::Validation(msg) => error_response(StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            LifecycleError::RequestNotFound(_) => error_response(StatusCode::NOT_FOUND, "Request not found"),
            LifecycleError::InvalidTransition { .. } | LifecycleError::Conflict { .. } => {
                tracing::Span::current().record("error", display(&self));
                error_response(StatusCode::CONFLICT, self.to_string())
            }
            LifecycleError::ConfirmationRequired => {
                error_response(StatusCode::PRECONDITION_REQUIRED, self.to_string())
            }
            LifecycleError::Store(e) => store_error("update the store", e),
            LifecycleError::Blob(e) => store_error("store uploaded photos", e),
        }
    }
}
