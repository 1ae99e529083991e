use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Extension, Router,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tower_cookies::{CookieManagerLayer, Key};
use uuid::Uuid;

use super::middleware::SessionKey;
use crate::config::AdminSeed;
use crate::entities::{AdminUser, RequestStatus};
use crate::feed::TestimonialFeed;
use crate::lifecycle::RequestLifecycle;
use crate::storage::{LocalBlobStore, SharedBlobStore};

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    lifecycle: RequestLifecycle,
    _dir: tempfile::TempDir,
}

const ADMIN_EMAIL: &str = "owner@example.com";
const ADMIN_PASSWORD: &str = "correct horse battery staple";

async fn test_app() -> TestApp {
    let (db, dir) = crate::test_support::test_db().await;
    super::auth::ensure_admin(
        &db,
        &AdminSeed {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Owner".to_string(),
        },
    )
    .await
    .unwrap();

    let blobs: SharedBlobStore = Arc::new(LocalBlobStore::new(dir.path().join("blobs"), "http://localhost:8000"));
    let lifecycle = RequestLifecycle::new(db.clone());
    let router = super::routes()
        .layer(Extension(db.clone()))
        .layer(Extension(lifecycle.clone()))
        .layer(Extension(blobs))
        .layer(Extension(TestimonialFeed::new(None)))
        .layer(Extension(SessionKey(Key::generate())))
        .layer(CookieManagerLayer::new());

    TestApp {
        router,
        db,
        lifecycle,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns the `Cookie` header value for the session.
    async fn login(&self) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/admin/login",
                None,
                Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn book(&self) -> Uuid {
        let response = self
            .send(
                Method::POST,
                "/api/booking",
                None,
                Some(json!({
                    "client_phone": "+15551234567",
                    "service_type": "walk30",
                    "date": "2025-06-01",
                    "time_window": "9am-12pm"
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        body["id"].as_str().unwrap().parse().unwrap()
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let app = test_app().await;

    let response = app.send(Method::GET, "/api/admin/requests", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = app
        .send(Method::GET, "/api/admin/dashboard", Some(&format!("petcare_admin={}", Uuid::new_v4())), None)
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = test_app().await;

    let response = app
        .send(
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"email": ADMIN_EMAIL, "password": "guess"})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn session_of_removed_admin_is_rejected() {
    let app = test_app().await;
    let cookie = app.login().await;
    let ok = app.send(Method::GET, "/api/admin/requests", Some(&cookie), None).await;
    assert_eq!(ok.status(), StatusCode::OK);

    AdminUser::delete_many().exec(&app.db).await.unwrap();

    let response = app.send(Method::GET, "/api/admin/requests", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn decline_without_confirmation_is_428_and_writes_nothing() {
    let app = test_app().await;
    let cookie = app.login().await;
    let id = app.book().await;

    let response = app
        .send(Method::POST, &format!("/api/admin/requests/{}/decline", id), Some(&cookie), Some(json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_REQUIRED);

    let stored = app.lifecycle.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert_eq!(stored.version, 1);
    assert!(app.lifecycle.history(id).await.unwrap().is_empty());

    let confirmed = app
        .send(
            Method::POST,
            &format!("/api/admin/requests/{}/decline", id),
            Some(&cookie),
            Some(json!({"confirm": true})),
        )
        .await;
    assert_eq!(confirmed.status(), StatusCode::OK);
    assert_eq!(body_json(confirmed).await["status"], "declined");
}

#[tokio::test]
async fn stale_version_is_409_and_leaves_request_unchanged() {
    let app = test_app().await;
    let cookie = app.login().await;
    let id = app.book().await;

    let response = app
        .send(
            Method::POST,
            &format!("/api/admin/requests/{}/approve", id),
            Some(&cookie),
            Some(json!({"expected_version": 7})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let stored = app.lifecycle.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert_eq!(stored.version, 1);

    let approved = app
        .send(
            Method::POST,
            &format!("/api/admin/requests/{}/approve", id),
            Some(&cookie),
            Some(json!({"expected_version": 1})),
        )
        .await;
    assert_eq!(approved.status(), StatusCode::OK);
    let body = body_json(approved).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["service_label"], "Walk 30min");
    assert_eq!(body["allowed_actions"], json!(["complete"]));
}

#[tokio::test]
async fn transition_out_of_terminal_state_is_409() {
    let app = test_app().await;
    let cookie = app.login().await;
    let id = app.book().await;
    app.lifecycle
        .decline(id, crate::lifecycle::Confirmation::Confirmed, None, "admin")
        .await
        .unwrap();

    let response = app
        .send(Method::POST, &format!("/api/admin/requests/{}/approve", id), Some(&cookie), None)
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_request_is_404() {
    let app = test_app().await;
    let cookie = app.login().await;

    let response = app
        .send(Method::GET, &format!("/api/admin/requests/{}", Uuid::new_v4()), Some(&cookie), None)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pay_redirects_or_404s_by_service() {
    let app = test_app().await;

    let walk = app.send(Method::GET, "/pay/walk30", None, None).await;
    assert_eq!(walk.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        walk.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some("https://buy.stripe.com/5kQeVfb36cOC1Qz2UV6kg05")
    );

    let medical = app.send(Method::GET, "/pay/homeVisitMedical", None, None).await;
    assert_eq!(medical.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_booking_is_422() {
    let app = test_app().await;

    let response = app
        .send(
            Method::POST,
            "/api/booking",
            None,
            Some(json!({
                "client_phone": " ",
                "service_type": "walk60",
                "date": "2025-06-01",
                "time_window": "9am-12pm"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.lifecycle.list(None).await.unwrap().is_empty());
}
