use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, QueryOrder, Set};
use tracing::info;
use uuid::Uuid;

use super::{LifecycleError, RequestLifecycle};
use crate::entities::{self, visit, RequestStatus, Visit};
use crate::storage::{self, sanitize_file_name, BlobStore};

/// A photo received from the visit form, not yet uploaded.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl PhotoUpload {
    fn content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| mime_guess::from_path(&self.file_name).first_or_octet_stream().to_string())
    }
}

impl RequestLifecycle {
    /// Records the visit for a completed request. Photos are uploaded first;
    /// if any later step fails, the photos already uploaded are removed again.
    pub async fn record_visit(
        &self,
        request_id: Uuid,
        summary_notes: &str,
        photos: Vec<PhotoUpload>,
        blobs: &dyn BlobStore,
    ) -> Result<visit::Model, LifecycleError> {
        let summary = summary_notes.trim();
        if summary.is_empty() {
            return Err(LifecycleError::Validation("summary_notes is required".to_string()));
        }

        let request = self
            .get(request_id)
            .await?
            .ok_or(LifecycleError::RequestNotFound(request_id))?;
        if request.status != RequestStatus::Completed {
            return Err(LifecycleError::Validation(format!(
                "visits can only be recorded for completed requests (request is {})",
                request.status
            )));
        }

        let photo_count = photos.len();
        let mut uploaded_paths = Vec::with_capacity(photo_count);
        let mut urls = Vec::with_capacity(photo_count);
        let batch = chrono::Utc::now().timestamp_millis();
        for (index, photo) in photos.into_iter().enumerate() {
            let path = format!("visits/{}_{}_{}", batch, index, sanitize_file_name(&photo.file_name));
            let content_type = photo.content_type();
            match blobs.upload(&path, photo.data, &content_type).await {
                Ok(url) => {
                    uploaded_paths.push(path);
                    urls.push(url);
                }
                Err(e) => {
                    storage::compensate(blobs, &uploaded_paths).await;
                    return Err(e.into());
                }
            }
        }

        let record = visit::ActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(request_id),
            summary_notes: Set(summary.to_string()),
            photos: Set(serde_json::json!(urls)),
            completed_at: Set(entities::now()),
        };

        let saved = storage::commit_or_compensate(blobs, &uploaded_paths, record.insert(self.db())).await?;

        info!(visit_id = %saved.id, %request_id, photos = photo_count, "visit recorded");
        crate::metrics::increment_visits_recorded(photo_count);
        Ok(saved)
    }

    pub async fn get_visit(&self, id: Uuid) -> Result<Option<visit::Model>, DbErr> {
        Visit::find_by_id(id).one(self.db()).await
    }

    pub async fn list_visits(&self) -> Result<Vec<visit::Model>, DbErr> {
        Visit::find()
            .order_by_desc(visit::Column::CompletedAt)
            .all(self.db())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ServiceType;
    use crate::lifecycle::{BookingForm, Confirmation};
    use crate::storage::LocalBlobStore;
    use crate::test_support::test_db;

    fn photo(name: &str) -> PhotoUpload {
        PhotoUpload {
            file_name: name.to_string(),
            content_type: None,
            data: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[tokio::test]
    async fn booking_to_visit_end_to_end() {
        let (db, dir) = test_db().await;
        let blobs = LocalBlobStore::new(dir.path().join("blobs"), "http://localhost:8000");
        let lifecycle = RequestLifecycle::new(db);

        let req = lifecycle
            .submit_booking(BookingForm {
                client_phone: "+15551234567".to_string(),
                service_type: ServiceType::Walk30,
                date: "2025-06-01".to_string(),
                time_window: "9am-12pm".to_string(),
                notes: String::new(),
            })
            .await
            .unwrap();

        let pending = lifecycle.list(Some(RequestStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].service_type.short_label(), "Walk 30min");

        lifecycle.approve(req.id, None, "admin").await.unwrap();
        assert!(lifecycle.list(Some(RequestStatus::Pending)).await.unwrap().is_empty());
        assert_eq!(lifecycle.list(Some(RequestStatus::Approved)).await.unwrap().len(), 1);

        let completion = lifecycle.complete(req.id, None, "admin").await.unwrap();
        assert!(completion.visit_form_path.ends_with(&req.id.to_string()));

        let visit = lifecycle
            .record_visit(req.id, "Walked Rex, no issues", vec![photo("rex.jpg")], &blobs)
            .await
            .unwrap();

        let fetched = lifecycle.get_visit(visit.id).await.unwrap().unwrap();
        assert_eq!(fetched.summary_notes, "Walked Rex, no issues");
        assert_eq!(fetched.photo_urls().len(), 1);
        assert!(fetched.photo_urls()[0].starts_with("http://localhost:8000/uploads/visits/"));
    }

    #[tokio::test]
    async fn visit_needs_a_completed_request() {
        let (db, dir) = test_db().await;
        let blobs = LocalBlobStore::new(dir.path().join("blobs"), "http://localhost:8000");
        let lifecycle = RequestLifecycle::new(db);
        let req = lifecycle
            .submit_booking(BookingForm {
                client_phone: "+15551234567".to_string(),
                service_type: ServiceType::HomeVisit,
                date: "2025-06-02".to_string(),
                time_window: "1pm-3pm".to_string(),
                notes: String::new(),
            })
            .await
            .unwrap();
        lifecycle
            .decline(req.id, Confirmation::Confirmed, None, "admin")
            .await
            .unwrap();

        let err = lifecycle
            .record_visit(req.id, "Should not exist", vec![photo("x.jpg")], &blobs)
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Validation(_)));
        // Rejected before anything was uploaded.
        assert!(!dir.path().join("blobs").exists());
        assert!(lifecycle.list_visits().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn visit_for_unknown_request_is_not_found() {
        let (db, dir) = test_db().await;
        let blobs = LocalBlobStore::new(dir.path().join("blobs"), "http://localhost:8000");
        let lifecycle = RequestLifecycle::new(db);

        let err = lifecycle
            .record_visit(Uuid::new_v4(), "Summary", Vec::new(), &blobs)
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::RequestNotFound(_)));
    }

    #[tokio::test]
    async fn blank_summary_is_rejected() {
        let (db, dir) = test_db().await;
        let blobs = LocalBlobStore::new(dir.path().join("blobs"), "http://localhost:8000");
        let lifecycle = RequestLifecycle::new(db);

        let err = lifecycle
            .record_visit(Uuid::new_v4(), "  \n ", Vec::new(), &blobs)
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Validation(_)));
    }
}
