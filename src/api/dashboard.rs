use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::requests::RequestView;
use crate::entities::RequestStatus;
use crate::lifecycle::RequestLifecycle;

#[derive(Serialize, Default)]
pub struct Bucket {
    count: usize,
    requests: Vec<RequestView>,
}

#[derive(Serialize, Default)]
pub struct Dashboard {
    pending: Bucket,
    approved: Bucket,
    completed: Bucket,
}

/// Open work first; declined requests are left off the dashboard.
pub async fn get_dashboard(Extension(lifecycle): Extension<RequestLifecycle>) -> Response {
    let requests = match lifecycle.list(None).await {
        Ok(r) => r,
        Err(e) => return super::store_error("load dashboard", e),
    };

    let mut dashboard = Dashboard::default();
    for request in requests {
        let bucket = match request.status {
            RequestStatus::Pending => &mut dashboard.pending,
            RequestStatus::Approved => &mut dashboard.approved,
            RequestStatus::Completed => &mut dashboard.completed,
            RequestStatus::Declined => continue,
        };
        bucket.count += 1;
        bucket.requests.push(RequestView::from(request));
    }

    (StatusCode::OK, Json(dashboard)).into_response()
}
