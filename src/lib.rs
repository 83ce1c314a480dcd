pub mod applications;
pub mod auth;
pub mod client;
pub mod config;
pub mod store;
pub mod web;

pub use config::Settings;
pub use web::{AppState, router::build_router};
