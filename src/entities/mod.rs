pub mod admin_user;
pub mod client;
pub mod pet;
pub mod request;
pub mod request_transition;
pub mod settings;
pub mod testimonial;
pub mod visit;

pub use admin_user::Entity as AdminUser;
pub use client::Entity as Client;
pub use pet::Entity as Pet;
pub use request::Entity as Request;
pub use request_transition::Entity as RequestTransition;
pub use settings::Entity as Settings;
pub use testimonial::Entity as Testimonial;
pub use visit::Entity as Visit;

pub use request::{RequestStatus, ServiceType};

/// Current time in the zoned representation every timestamp column uses.
pub fn now() -> sea_orm::prelude::DateTimeWithTimeZone {
    chrono::Utc::now().fixed_offset()
}
