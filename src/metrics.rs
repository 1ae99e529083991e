use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use sea_orm::Iterable;
use crate::entities::{client, pet, request, testimonial, visit, RequestStatus};

pub async fn init_metrics(db: &DatabaseConnection) {
    // Total Counts
    let client_count = client::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("petcare_clients_total").set(client_count as f64);

    let pet_count = pet::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("petcare_pets_total").set(pet_count as f64);

    let visit_count = visit::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("petcare_visits_total").set(visit_count as f64);

    let testimonial_count = testimonial::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("petcare_testimonials_total").set(testimonial_count as f64);

    // Requests per status, so the pending backlog is visible on a dashboard.
    for status in RequestStatus::iter() {
        let count = request::Entity::find()
            .filter(request::Column::Status.eq(status))
            .count(db)
            .await
            .unwrap_or(0);
        metrics::gauge!("petcare_requests", "status" => status.as_str()).set(count as f64);
    }

    tracing::info!(
        "Initialized metrics: Clients={}, Pets={}, Visits={}, Testimonials={}",
        client_count, pet_count, visit_count, testimonial_count
    );
}

pub fn increment_bookings_submitted(service_type: &str) {
    metrics::counter!("petcare_bookings_submitted_total", "service_type" => service_type.to_string()).increment(1);
    metrics::gauge!("petcare_requests", "status" => "pending").increment(1.0);
}

pub fn record_transition(from: RequestStatus, to: RequestStatus) {
    metrics::counter!("petcare_request_transitions_total", "to" => to.as_str()).increment(1);
    metrics::gauge!("petcare_requests", "status" => from.as_str()).decrement(1.0);
    metrics::gauge!("petcare_requests", "status" => to.as_str()).increment(1.0);
}

pub fn increment_transition_conflicts() {
    metrics::counter!("petcare_request_transition_conflicts_total").increment(1);
}

pub fn increment_visits_recorded(photos: usize) {
    metrics::counter!("petcare_visits_recorded_total").increment(1);
    metrics::counter!("petcare_visit_photos_uploaded_total").increment(photos as u64);
    metrics::gauge!("petcare_visits_total").increment(1.0);
}

pub fn increment_intakes(with_photo: bool) {
    metrics::counter!("petcare_intakes_total", "with_photo" => with_photo.to_string()).increment(1);
    metrics::gauge!("petcare_clients_total").increment(1.0);
    metrics::gauge!("petcare_pets_total").increment(1.0);
}

pub fn increment_orphaned_blobs(count: u64) {
    metrics::counter!("petcare_orphaned_blobs_total").increment(count);
}

pub fn increment_testimonials_submitted() {
    metrics::counter!("petcare_testimonials_submitted_total").increment(1);
    metrics::gauge!("petcare_testimonials_total").increment(1.0);
}

pub fn decrement_testimonials() {
    metrics::gauge!("petcare_testimonials_total").decrement(1.0);
}

pub fn increment_sms_composed(kind: &str) {
    metrics::counter!("petcare_sms_links_composed_total", "kind" => kind.to_string()).increment(1);
}
