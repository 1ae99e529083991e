use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::stream::{self, Stream};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::entities::{self, testimonial, Testimonial};
use crate::feed::TestimonialFeed;

#[derive(serde::Deserialize)]
pub struct SubmitTestimonial {
    name: String,
    message: String,
    rating: Option<i32>,
}

/// Testimonial as the home page renders it.
#[derive(Serialize)]
pub struct TestimonialView {
    #[serde(flatten)]
    testimonial: testimonial::Model,
    filled_stars: u8,
    stars: String,
}

impl From<testimonial::Model> for TestimonialView {
    fn from(testimonial: testimonial::Model) -> Self {
        Self {
            filled_stars: testimonial.filled_stars(),
            stars: testimonial.star_string(),
            testimonial,
        }
    }
}

pub async fn submit_testimonial(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<TestimonialFeed>,
    Json(payload): Json<SubmitTestimonial>,
) -> Response {
    let name = payload.name.trim();
    let message = payload.message.trim();
    if name.is_empty() || message.is_empty() {
        return super::error_response(StatusCode::BAD_REQUEST, "Name and message are required");
    }

    let new_testimonial = testimonial::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        message: Set(message.to_string()),
        rating: Set(payload.rating.unwrap_or(testimonial::MAX_STARS)),
        created_at: Set(entities::now()),
    };

    match new_testimonial.insert(&db).await {
        Ok(saved) => {
            if let Err(e) = feed.refresh(&db).await {
                tracing::warn!(error = %e, "failed to refresh testimonial feed");
            }
            crate::metrics::increment_testimonials_submitted();
            tracing::Span::current()
                .record("table", "testimonials")
                .record("action", "submit_testimonial")
                .record("business_event", "Testimonial submitted");
            (StatusCode::CREATED, Json(TestimonialView::from(saved))).into_response()
        }
        Err(e) => super::store_error("save testimonial", e),
    }
}

pub async fn latest_testimonial(Extension(feed): Extension<TestimonialFeed>) -> Response {
    let latest = feed.current().map(TestimonialView::from);
    (StatusCode::OK, Json(latest)).into_response()
}

fn testimonial_event(latest: Option<testimonial::Model>) -> Result<Event, axum::Error> {
    Event::default()
        .event("testimonial")
        .json_data(latest.map(TestimonialView::from))
}

/// Sends the current testimonial, then one event per change.
pub async fn stream_latest_testimonial(
    Extension(feed): Extension<TestimonialFeed>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = feed.subscribe();
    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let latest = rx.borrow_and_update().clone();
        Some((testimonial_event(latest), (rx, false)))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn list_testimonials(Extension(db): Extension<DatabaseConnection>) -> Response {
    match Testimonial::find()
        .order_by_desc(testimonial::Column::CreatedAt)
        .all(&db)
        .await
    {
        Ok(rows) => {
            let views: Vec<TestimonialView> = rows.into_iter().map(TestimonialView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => super::store_error("list testimonials", e),
    }
}

pub async fn delete_testimonial(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<TestimonialFeed>,
    Path(testimonial_id): Path<Uuid>,
) -> Response {
    match Testimonial::delete_by_id(testimonial_id).exec(&db).await {
        Ok(res) if res.rows_affected == 0 => {
            super::error_response(StatusCode::NOT_FOUND, "Testimonial not found")
        }
        Ok(_) => {
            crate::metrics::decrement_testimonials();
            if let Err(e) = feed.refresh(&db).await {
                tracing::warn!(error = %e, "failed to refresh testimonial feed");
            }
            tracing::Span::current()
                .record("table", "testimonials")
                .record("action", "delete_testimonial");
            (StatusCode::OK, Json(json!({"message": "Testimonial deleted"}))).into_response()
        }
        Err(e) => super::store_error("delete testimonial", e),
    }
}
