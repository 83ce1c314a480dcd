//! Client side of seller onboarding: the signed-in session, the HTTP API
//! wrapper, and the headless application form built on top of them.

pub mod api;
pub mod form;
pub mod session;

pub use api::{MarketplaceClient, SellerApplicationGateway, SubmissionError, SubmissionReceipt};
pub use form::{AUTO_CLOSE_DELAY, FormField, FormStatus, SellerApplicationForm};
pub use session::{OFFLINE_TOKEN, Session, SessionUser, ValidationError};
