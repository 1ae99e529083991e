pub mod api;
pub mod catalog;
pub mod config;
pub mod entities;
pub mod feed;
pub mod intake;
pub mod lifecycle;
pub mod messaging;
pub mod metrics;
pub mod migrator;
pub mod storage;
pub mod telemetry;

pub use sea_orm;
