use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{self, ServiceOption};
use crate::entities::{settings, ServiceType};

#[derive(Serialize)]
pub struct SettingsView {
    business_name: String,
    website: String,
    phone: String,
    instagram_url: String,
    /// Effective links, built-in defaults included.
    payment_links: BTreeMap<ServiceType, String>,
    services: Vec<ServiceOption>,
}

impl SettingsView {
    fn build(stored: Option<&settings::Model>) -> Self {
        let services = catalog::service_options(stored);
        let payment_links = services
            .iter()
            .filter_map(|s| s.payment_url.clone().map(|url| (s.service_type, url)))
            .collect();
        Self {
            business_name: stored.map(|s| s.business_name.clone()).unwrap_or_default(),
            website: stored.map(|s| s.website.clone()).unwrap_or_default(),
            phone: stored.map(|s| s.phone.clone()).unwrap_or_default(),
            instagram_url: stored.map(|s| s.instagram_url.clone()).unwrap_or_default(),
            payment_links,
            services,
        }
    }
}

#[derive(Deserialize)]
pub struct ReplaceSettings {
    #[serde(default)]
    business_name: String,
    #[serde(default)]
    website: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    instagram_url: String,
    #[serde(default)]
    payment_links: BTreeMap<ServiceType, String>,
}

/// Writes the singleton row, creating it on first save.
pub async fn save_settings(db: &DatabaseConnection, payload: ReplaceSettings) -> Result<settings::Model, DbErr> {
    let links: BTreeMap<&str, String> = payload
        .payment_links
        .into_iter()
        .map(|(service, url)| (service.key(), url.trim().to_string()))
        .filter(|(_, url)| !url.is_empty())
        .collect();

    let existing = catalog::load_settings(db).await?;
    let mut active = match existing.clone() {
        Some(model) => model.into_active_model(),
        None => settings::ActiveModel {
            id: Set(settings::CONFIG_ID.to_string()),
            ..Default::default()
        },
    };
    active.business_name = Set(payload.business_name.trim().to_string());
    active.website = Set(payload.website.trim().to_string());
    active.phone = Set(payload.phone.trim().to_string());
    active.instagram_url = Set(payload.instagram_url.trim().to_string());
    active.payment_links = Set(serde_json::json!(links));

    if existing.is_some() {
        active.update(db).await
    } else {
        active.insert(db).await
    }
}

pub async fn get_settings(Extension(db): Extension<DatabaseConnection>) -> Response {
    match catalog::load_settings(&db).await {
        Ok(stored) => (StatusCode::OK, Json(SettingsView::build(stored.as_ref()))).into_response(),
        Err(e) => super::store_error("load settings", e),
    }
}

pub async fn replace_settings(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<ReplaceSettings>,
) -> Response {
    match save_settings(&db, payload).await {
        Ok(saved) => {
            tracing::Span::current()
                .record("table", "settings")
                .record("action", "replace_settings")
                .record("business_event", "Settings updated");
            (StatusCode::OK, Json(SettingsView::build(Some(&saved)))).into_response()
        }
        Err(e) => super::store_error("save settings", e),
    }
}
