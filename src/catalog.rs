//! Service catalog: labels, prices and where each service is paid for.

use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use sea_orm::Iterable;
use serde::Serialize;

use crate::entities::settings::{self, CONFIG_ID};
use crate::entities::{ServiceType, Settings};

/// Checkout links used when the settings row, or a key in it, is missing.
const DEFAULT_PAYMENT_LINKS: &[(ServiceType, &str)] = &[
    (ServiceType::Walk30, "https://buy.stripe.com/5kQeVfb36cOC1Qz2UV6kg05"),
    (ServiceType::Walk60, "https://buy.stripe.com/6oU6oJ4EIg0Ocvd9jj6kg04"),
    (ServiceType::HomeVisit, "https://buy.stripe.com/00wdRb3AE4i6eDldzz6kg03"),
];

impl ServiceType {
    /// Wire name, as stored and as used in URLs.
    pub fn key(&self) -> &'static str {
        match self {
            ServiceType::Walk30 => "walk30",
            ServiceType::Walk60 => "walk60",
            ServiceType::HomeVisit => "homeVisit",
            ServiceType::HomeVisitMedical => "homeVisitMedical",
        }
    }

    /// Compact label for admin lists.
    pub fn short_label(&self) -> &'static str {
        match self {
            ServiceType::Walk30 => "Walk 30min",
            ServiceType::Walk60 => "Walk 60min",
            ServiceType::HomeVisit => "Home Visit",
            ServiceType::HomeVisitMedical => "Home Visit + Medical",
        }
    }

    /// Customer-facing label including the price.
    pub fn full_label(&self) -> &'static str {
        match self {
            ServiceType::Walk30 => "Dog Walk - 30 Minutes ($25)",
            ServiceType::Walk60 => "Dog Walk - 60 Minutes ($40)",
            ServiceType::HomeVisit => "Home Visit - Any Animal ($75)",
            ServiceType::HomeVisitMedical => "Home Visit with Medical ($80)",
        }
    }

    pub fn price_usd(&self) -> u32 {
        match self {
            ServiceType::Walk30 => 25,
            ServiceType::Walk60 => 40,
            ServiceType::HomeVisit => 75,
            ServiceType::HomeVisitMedical => 80,
        }
    }

    pub fn default_payment_link(&self) -> Option<&'static str> {
        DEFAULT_PAYMENT_LINKS
            .iter()
            .find(|(service, _)| service == self)
            .map(|(_, url)| *url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOption {
    pub service_type: ServiceType,
    pub label: &'static str,
    pub short_label: &'static str,
    pub price_usd: u32,
    pub payment_url: Option<String>,
}

pub async fn load_settings(db: &DatabaseConnection) -> Result<Option<settings::Model>, DbErr> {
    Settings::find_by_id(CONFIG_ID.to_string()).one(db).await
}

/// Configured checkout URL for a service, falling back to the built-in link.
pub fn payment_link(settings: Option<&settings::Model>, service: ServiceType) -> Option<String> {
    settings
        .and_then(|s| s.payment_links.get(service.key()))
        .and_then(|v| v.as_str())
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string)
        .or_else(|| service.default_payment_link().map(str::to_string))
}

pub fn service_options(settings: Option<&settings::Model>) -> Vec<ServiceOption> {
    ServiceType::iter()
        .map(|service| ServiceOption {
            service_type: service,
            label: service.full_label(),
            short_label: service.short_label(),
            price_usd: service.price_usd(),
            payment_url: payment_link(settings, service),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings_with(links: serde_json::Value) -> settings::Model {
        settings::Model {
            id: CONFIG_ID.to_string(),
            business_name: "Happy Tails".to_string(),
            website: "https://example.com".to_string(),
            phone: "+15550000000".to_string(),
            instagram_url: String::new(),
            payment_links: links,
        }
    }

    #[test]
    fn missing_settings_fall_back_to_builtin_links() {
        assert_eq!(
            payment_link(None, ServiceType::Walk30).as_deref(),
            Some("https://buy.stripe.com/5kQeVfb36cOC1Qz2UV6kg05")
        );
        assert_eq!(payment_link(None, ServiceType::HomeVisitMedical), None);
    }

    #[test]
    fn configured_link_wins_and_blank_entries_fall_back() {
        let settings = settings_with(json!({
            "walk30": "https://pay.example.com/w30",
            "walk60": "  ",
        }));

        assert_eq!(
            payment_link(Some(&settings), ServiceType::Walk30).as_deref(),
            Some("https://pay.example.com/w30")
        );
        assert_eq!(
            payment_link(Some(&settings), ServiceType::Walk60).as_deref(),
            Some("https://buy.stripe.com/6oU6oJ4EIg0Ocvd9jj6kg04")
        );
    }

    #[test]
    fn options_cover_every_service() {
        let options = service_options(None);
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].short_label, "Walk 30min");
        assert_eq!(options[3].label, "Home Visit with Medical ($80)");
    }
}
