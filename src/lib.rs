//! ABDM Integration Core: a consent-lifecycle and health-information-exchange
//! orchestrator bridging a clinical HIU with India's Ayushman Bharat Digital
//! Mission gateway (spec.md §1-§9).

pub mod audit;
pub mod auth;
pub mod consent;
pub mod core;
pub mod database;
pub mod gateway;
pub mod hifetch;
pub mod models;
pub mod records;
pub mod webhooksec;
pub mod workers;

pub use core::config::AppConfig;
pub use core::errors::{AppError, AppResult};
