use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::intake::{self, IntakeForm};
use crate::storage::SharedBlobStore;

pub async fn submit_intake(
    Extension(db): Extension<DatabaseConnection>,
    Extension(blobs): Extension<SharedBlobStore>,
    mut multipart: Multipart,
) -> Response {
    let mut form = IntakeForm::default();
    let mut photo = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return super::error_response(StatusCode::BAD_REQUEST, e.to_string()),
        };
        let name = field.name().unwrap_or("").to_string();
        if name == "photo" {
            match super::photo_from_field(field).await {
                Ok(p) => photo = p,
                Err(resp) => return resp,
            }
            continue;
        }

        let value = match super::text_from_field(field).await {
            Ok(t) => t,
            Err(resp) => return resp,
        };
        match name.as_str() {
            "owner_name" => form.owner_name = value,
            "phone" => form.phone = value,
            "email" => form.email = value,
            "address" => form.address = value,
            "pet_name" => form.pet_name = value,
            "pet_type" => form.pet_type = value,
            "breed" => form.breed = value,
            "age" => form.age = value,
            "behavior_flags" => form.behavior_flags.push(value),
            "entry_behavior" => form.entry_behavior = value,
            "allergies" => form.allergies = value,
            "medications" => form.medications = value,
            "vet_info" => form.vet_info = value,
            _ => {}
        }
    }

    match intake::register(&db, blobs.as_ref(), form, photo).await {
        Ok((client, pet)) => {
            tracing::Span::current()
                .record("table", "clients")
                .record("action", "submit_intake")
                .record("business_event", format!("Intake received for {}", pet.name).as_str());
            (
                StatusCode::CREATED,
                Json(json!({"client": client, "pet": pet})),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
