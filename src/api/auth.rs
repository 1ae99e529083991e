use crate::api::middleware::{SessionKey, SESSION_COOKIE};
use crate::config::AdminSeed;
use crate::entities::{self, admin_user, AdminUser};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Creates the configured admin account unless one with that email exists.
pub async fn ensure_admin(db: &DatabaseConnection, seed: &AdminSeed) -> Result<(), DbErr> {
    let existing = AdminUser::find()
        .filter(admin_user::Column::Email.eq(seed.email.clone()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(&seed.password)
        .map_err(|e| DbErr::Custom(format!("Failed to hash admin password: {}", e)))?;

    admin_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(seed.email.clone()),
        password_hash: Set(password_hash),
        name: Set(seed.name.clone()),
        created_at: Set(entities::now()),
    }
    .insert(db)
    .await?;

    tracing::info!(email = %seed.email, "admin account created");
    Ok(())
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Extension(key): Extension<SessionKey>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let admin = match AdminUser::find()
        .filter(admin_user::Column::Email.eq(payload.email.clone()))
        .one(&db)
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid email or password"})),
            )
                .into_response()
        }
        Err(e) => return super::store_error("look up admin", e),
    };

    let parsed_hash = match PasswordHash::new(&admin.password_hash) {
        Ok(h) => h,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Invalid password hash in DB"})),
            )
                .into_response()
        }
    };

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_ok()
    {
        let mut cookie = Cookie::new(SESSION_COOKIE, admin.id.to_string());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
        cookies.signed(&key.0).add(cookie);

        tracing::Span::current()
            .record("table", "admin_users")
            .record("action", "login_admin")
            .record("admin_id", tracing::field::display(admin.id))
            .record("business_event", "Admin logged in");

        (
            StatusCode::OK,
            Json(json!({"id": admin.id, "email": admin.email, "name": admin.name})),
        )
            .into_response()
    } else {
        tracing::Span::current()
            .record("table", "admin_users")
            .record("action", "login_admin_failed")
            .record("error", "invalid_credentials");

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid email or password"})),
        )
            .into_response()
    }
}

pub async fn logout(cookies: Cookies) -> Response {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);
    (StatusCode::OK, Json(json!({"message": "Logged out"}))).into_response()
}
