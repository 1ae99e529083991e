use axum::{
    extract::{Extension, Request},
    response::{IntoResponse, Response},
    http::StatusCode,
    middleware::Next,
    Json,
};
use tower_cookies::{Cookies, Key};
use serde_json::json;
use uuid::Uuid;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::entities::AdminUser;

pub const SESSION_COOKIE: &str = "petcare_admin";

/// Signing key for the admin session cookie.
#[derive(Clone)]
pub struct SessionKey(pub Key);

/// Authenticated admin, inserted into request extensions by `auth_middleware`.
#[derive(Clone, Copy, Debug)]
pub struct AdminId(pub Uuid);

impl AdminId {
    /// Recorded as the actor of status transitions.
    pub fn actor(&self) -> String {
        format!("admin:{}", self.0)
    }
}

/// Accepts a signed session cookie only while its admin account still exists.
pub async fn auth_middleware(
    Extension(key): Extension<SessionKey>,
    Extension(db): Extension<DatabaseConnection>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let session = cookies
        .signed(&key.0)
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<Uuid>().ok());

    if let Some(admin_id) = session {
        match AdminUser::find_by_id(admin_id).one(&db).await {
            Ok(Some(_)) => {
                tracing::Span::current().record("admin_id", tracing::field::display(admin_id));
                request.extensions_mut().insert(AdminId(admin_id));
                return next.run(request).await;
            }
            Ok(None) => {
                tracing::warn!(%admin_id, "session cookie for a removed admin account");
            }
            Err(e) => return super::store_error("verify admin session", e),
        }
    }
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response()
}
