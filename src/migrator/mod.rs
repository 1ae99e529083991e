use sea_orm_migration::prelude::*;

mod m20250601_000001_create_clients_and_pets;
mod m20250601_000002_create_requests_and_visits;
mod m20250601_000003_create_testimonials_and_settings;
mod m20250615_000001_create_admin_users;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_clients_and_pets::Migration),
            Box::new(m20250601_000002_create_requests_and_visits::Migration),
            Box::new(m20250601_000003_create_testimonials_and_settings::Migration),
            Box::new(m20250615_000001_create_admin_users::Migration),
        ]
    }
}
