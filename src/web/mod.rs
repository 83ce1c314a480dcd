pub mod auth;
pub mod responses;
pub mod router;
pub mod seller_applications;
pub mod state;

pub use responses::{ApiError, ApiFailure, json_error};
pub use state::AppState;
