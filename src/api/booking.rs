use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::lifecycle::{BookingForm, RequestLifecycle};

pub async fn submit_booking(
    Extension(lifecycle): Extension<RequestLifecycle>,
    Json(payload): Json<BookingForm>,
) -> Response {
    match lifecycle.submit_booking(payload).await {
        Ok(request) => {
            tracing::Span::current()
                .record("table", "requests")
                .record("action", "submit_booking")
                .record("request_id", tracing::field::display(request.id))
                .record(
                    "business_event",
                    format!("Booking requested for {}", request.service_type.short_label()).as_str(),
                );
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": request.id,
                    "status": request.status,
                    "message": "Thanks! We will confirm your booking shortly."
                })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
