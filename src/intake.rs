//! New-client intake: one client profile plus their first pet.

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::entities::{self, client, pet};
use crate::lifecycle::{LifecycleError, PhotoUpload};
use crate::storage::{self, sanitize_file_name, BlobStore};

pub const BEHAVIOR_OPTIONS: &[&str] = &["pulls", "reactive", "scared", "food motivated", "runner", "barker"];

#[derive(Debug, Clone, Default)]
pub struct IntakeForm {
    pub owner_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub pet_name: String,
    pub pet_type: String,
    pub breed: String,
    pub age: String,
    pub behavior_flags: Vec<String>,
    pub entry_behavior: String,
    pub allergies: String,
    pub medications: String,
    pub vet_info: String,
}

impl IntakeForm {
    fn validate(&self) -> Result<(), LifecycleError> {
        let required = [
            ("owner_name", &self.owner_name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("address", &self.address),
            ("pet_name", &self.pet_name),
            ("pet_type", &self.pet_type),
            ("breed", &self.breed),
            ("age", &self.age),
            ("entry_behavior", &self.entry_behavior),
            ("vet_info", &self.vet_info),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(LifecycleError::Validation(format!("{} is required", field)));
        }
        if let Some(flag) = self
            .behavior_flags
            .iter()
            .find(|flag| !BEHAVIOR_OPTIONS.contains(&flag.as_str()))
        {
            return Err(LifecycleError::Validation(format!("unknown behavior flag: {}", flag)));
        }
        Ok(())
    }
}

/// Behavior flags form a set; repeats keep their first position.
fn unique_flags(flags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    flags.into_iter().filter(|flag| seen.insert(flag.clone())).collect()
}

/// Creates the client, uploads the optional pet photo under
/// `pets/<client id>/`, then creates the pet. A failed pet insert removes the photo.
pub async fn register(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
    form: IntakeForm,
    photo: Option<PhotoUpload>,
) -> Result<(client::Model, pet::Model), LifecycleError> {
    form.validate()?;

    let client = client::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(form.owner_name.trim().to_string()),
        phone: Set(form.phone.trim().to_string()),
        email: Set(form.email.trim().to_string()),
        address: Set(form.address.trim().to_string()),
        created_at: Set(entities::now()),
    }
    .insert(db)
    .await?;

    let mut uploaded = Vec::new();
    let mut photo_url = String::new();
    let with_photo = photo.is_some();
    if let Some(photo) = photo {
        let path = format!("pets/{}/{}", client.id, sanitize_file_name(&photo.file_name));
        let content_type = photo
            .content_type
            .clone()
            .unwrap_or_else(|| mime_guess::from_path(&photo.file_name).first_or_octet_stream().to_string());
        photo_url = blobs.upload(&path, photo.data, &content_type).await?;
        uploaded.push(path);
    }

    let flags = unique_flags(form.behavior_flags);
    let record = pet::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(client.id),
        name: Set(form.pet_name.trim().to_string()),
        pet_type: Set(form.pet_type.trim().to_string()),
        breed: Set(form.breed.trim().to_string()),
        age: Set(form.age.trim().to_string()),
        behavior_flags: Set(serde_json::json!(flags)),
        entry_behavior: Set(form.entry_behavior.trim().to_string()),
        allergies: Set(form.allergies.trim().to_string()),
        meds: Set(form.medications.trim().to_string()),
        vet_info: Set(form.vet_info.trim().to_string()),
        photo_url: Set(photo_url),
    };
    let pet = storage::commit_or_compensate(blobs, &uploaded, record.insert(db)).await?;

    info!(client_id = %client.id, pet_id = %pet.id, with_photo, "intake registered");
    crate::metrics::increment_intakes(with_photo);
    Ok((client, pet))
}
