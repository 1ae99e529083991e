//! Outbound text messages. The service only composes them: the admin's device
//! opens the `sms:` URI and the messaging app does the sending.

use serde::Serialize;

use crate::entities::{client, request, visit, RequestStatus};

pub struct MessageTemplates;

impl MessageTemplates {
    /// Sent after a booking is declined, inviting the client to propose other times.
    pub fn decline_sms(service_label: &str, date: &str, time_window: &str) -> String {
        format!(
            "Hi! Thanks for your request for {} on {} ({}). \
             Unfortunately we are not available at that time. \
             Reply with a few alternate dates/times and we will do our best to fit you in.",
            service_label, date, time_window
        )
    }

    /// Visit wrap-up with the summary and a numbered list of photo links.
    pub fn visit_update_sms(client_name: &str, summary: &str, photos: &[String]) -> String {
        let mut body = format!("Hi {}! Your pet care visit is complete. {}", client_name, summary);
        if !photos.is_empty() {
            let photo_links = photos
                .iter()
                .enumerate()
                .map(|(i, url)| format!("Photo {}: {}", i + 1, url))
                .collect::<Vec<_>>()
                .join("\n\n");
            body.push_str("\n\nPhotos:\n");
            body.push_str(&photo_links);
        }
        body
    }
}

/// `sms:<phone>?&body=<percent-encoded body>`
pub fn sms_uri(phone: &str, body: &str) -> String {
    format!("sms:{}?&body={}", phone, urlencoding::encode(body))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedSms {
    pub to: String,
    pub body: String,
    pub uri: String,
}

impl ComposedSms {
    pub fn new(to: &str, body: String) -> Self {
        Self {
            to: to.to_string(),
            uri: sms_uri(to, &body),
            body,
        }
    }
}

/// Only declined requests get a decline message.
pub fn decline_message(req: &request::Model) -> Option<ComposedSms> {
    if req.status != RequestStatus::Declined {
        return None;
    }
    let body = MessageTemplates::decline_sms(req.service_type.full_label(), &req.date, &req.time_window);
    crate::metrics::increment_sms_composed("decline");
    Some(ComposedSms::new(&req.client_phone, body))
}

pub fn visit_update_message(client: &client::Model, visit: &visit::Model) -> ComposedSms {
    let body = MessageTemplates::visit_update_sms(&client.name, &visit.summary_notes, &visit.photo_urls());
    crate::metrics::increment_sms_composed("visit_update");
    ComposedSms::new(&client.phone, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{now, ServiceType};
    use uuid::Uuid;

    fn declined_request() -> request::Model {
        request::Model {
            id: Uuid::new_v4(),
            client_id: None,
            pet_ids: serde_json::json!([]),
            service_type: ServiceType::Walk60,
            date: "2025-06-01".to_string(),
            time_window: "9am-12pm".to_string(),
            notes: String::new(),
            status: RequestStatus::Declined,
            client_phone: "+15551234567".to_string(),
            version: 2,
            created_at: now(),
        }
    }

    #[test]
    fn decline_body_names_service_date_and_window() {
        let sms = decline_message(&declined_request()).unwrap();

        assert!(sms.body.contains("Dog Walk - 60 Minutes ($40)"));
        assert!(sms.body.contains("2025-06-01"));
        assert!(sms.body.contains("9am-12pm"));
        assert_eq!(sms.to, "+15551234567");
    }

    #[test]
    fn decline_message_requires_declined_status() {
        let mut req = declined_request();
        req.status = RequestStatus::Pending;
        assert!(decline_message(&req).is_none());
    }

    #[test]
    fn uri_percent_encodes_the_body() {
        let uri = sms_uri("+15551234567", "On 2025-06-01 (9am-12pm)? Yes & thanks");
        assert_eq!(
            uri,
            "sms:+15551234567?&body=On%202025-06-01%20%289am-12pm%29%3F%20Yes%20%26%20thanks"
        );
    }

    #[test]
    fn visit_update_numbers_photos() {
        let body = MessageTemplates::visit_update_sms(
            "Sam",
            "Walked Rex, no issues",
            &["https://x/1.jpg".to_string(), "https://x/2.jpg".to_string()],
        );

        assert_eq!(
            body,
            "Hi Sam! Your pet care visit is complete. Walked Rex, no issues\n\n\
             Photos:\nPhoto 1: https://x/1.jpg\n\nPhoto 2: https://x/2.jpg"
        );
    }

    #[test]
    fn visit_update_without_photos_has_no_photo_section() {
        let body = MessageTemplates::visit_update_sms("Sam", "All good", &[]);
        assert_eq!(body, "Hi Sam! Your pet care visit is complete. All good");
    }
}
