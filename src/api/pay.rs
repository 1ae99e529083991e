use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use sea_orm::DatabaseConnection;

use crate::catalog;
use crate::entities::ServiceType;

pub async fn list_payment_links(Extension(db): Extension<DatabaseConnection>) -> Response {
    match catalog::load_settings(&db).await {
        Ok(settings) => (StatusCode::OK, Json(catalog::service_options(settings.as_ref()))).into_response(),
        Err(e) => super::store_error("load payment links", e),
    }
}

/// 303 to the hosted checkout page for `service_type`.
pub async fn redirect_to_checkout(
    Extension(db): Extension<DatabaseConnection>,
    Path(service_type): Path<ServiceType>,
) -> Response {
    let settings = match catalog::load_settings(&db).await {
        Ok(s) => s,
        Err(e) => return super::store_error("load payment links", e),
    };

    match catalog::payment_link(settings.as_ref(), service_type) {
        Some(url) => {
            tracing::Span::current()
                .record("action", "pay_redirect")
                .record("business_event", service_type.key());
            Redirect::to(&url).into_response()
        }
        None => super::error_response(
            StatusCode::NOT_FOUND,
            format!("No payment link for {}", service_type.full_label()),
        ),
    }
}
