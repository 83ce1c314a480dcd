use std::fmt;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    applications::SellerApplicationDraft,
    client::session::{Session, SessionUser},
};

pub const SUBMIT_PATH: &str = "/api/seller-applications";
const LOGIN_PATH: &str = "/api/auth/login";

/// Why a submission attempt failed, resolved once when the response arrives.
///
/// Variants are listed in the order they take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Per-field messages returned by the server.
    FieldErrors(Vec<String>),
    /// A message the server put in the body.
    Message(String),
    Unauthorized,
    /// The server could not be reached at all.
    Network { endpoint: String },
    Forbidden,
    BadRequest,
    Generic,
}

impl SubmissionError {
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::FieldErrors(messages) => messages.join(", "),
            SubmissionError::Message(message) => message.clone(),
            SubmissionError::Unauthorized => "Your session has expired or is invalid. Please log out and log in again to submit an application.".to_string(),
            SubmissionError::Network { endpoint } => format!(
                "Unable to connect to server. Please check that {endpoint} is reachable and try again."
            ),
            SubmissionError::Forbidden => {
                "You do not have permission to perform this action.".to_string()
            }
            SubmissionError::BadRequest => {
                "Invalid data provided. Please check all fields.".to_string()
            }
            SubmissionError::Generic => "Failed to submit application. Please try again.".to_string(),
        }
    }
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for SubmissionError {}

/// What a successful submission hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub application_id: Option<Uuid>,
}

/// Seam between the form and the transport.
#[async_trait]
pub trait SellerApplicationGateway: Send + Sync {
    async fn submit(
        &self,
        token: &str,
        draft: &SellerApplicationDraft,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

#[async_trait]
impl<T: SellerApplicationGateway + ?Sized> SellerApplicationGateway for std::sync::Arc<T> {
    async fn submit(
        &self,
        token: &str,
        draft: &SellerApplicationDraft,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        (**self).submit(token, draft).await
    }
}

/// The parts of a submission response the form cares about, read field by field.
#[derive(Debug, Default)]
pub(crate) struct SubmissionBody {
    success: bool,
    message: Option<String>,
    errors: Vec<String>,
    application_id: Option<Uuid>,
}

impl SubmissionBody {
    /// `None` unless the payload is a JSON object.
    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;

        let errors = fields
            .get("errors")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(field_error_message).collect())
            .unwrap_or_default();

        Some(Self {
            success: fields.get("success").and_then(Value::as_bool).unwrap_or(false),
            message: fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            errors,
            application_id: value
                .pointer("/data/id")
                .and_then(Value::as_str)
                .and_then(|id| Uuid::parse_str(id).ok()),
        })
    }
}

/// `msg`, then `message`, then a bare string. Anything else is skipped.
fn field_error_message(entry: &Value) -> Option<String> {
    match entry {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => ["msg", "message"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// Turns a status plus (optionally parsed) body into the submission outcome.
pub(crate) fn classify_response(
    status: StatusCode,
    body: Option<SubmissionBody>,
) -> Result<SubmissionReceipt, SubmissionError> {
    let parsed = body.is_some();
    let body = body.unwrap_or_default();

    if status.is_success() && body.success {
        return Ok(SubmissionReceipt {
            application_id: body.application_id,
        });
    }

    if !body.errors.is_empty() {
        return Err(SubmissionError::FieldErrors(body.errors));
    }

    if let Some(message) = body.message.filter(|message| !message.trim().is_empty()) {
        return Err(SubmissionError::Message(message));
    }

    Err(match status {
        StatusCode::UNAUTHORIZED => SubmissionError::Unauthorized,
        StatusCode::FORBIDDEN => SubmissionError::Forbidden,
        StatusCode::BAD_REQUEST => SubmissionError::BadRequest,
        status if status.is_success() && parsed => {
            SubmissionError::Message("Failed to submit application".to_string())
        }
        _ => SubmissionError::Generic,
    })
}

/// HTTP client for the marketplace API.
#[derive(Clone)]
pub struct MarketplaceClient {
    http: Client,
    base_url: String,
}

impl MarketplaceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Signs in and returns a ready-to-use session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        #[derive(Deserialize)]
        struct LoginBody {
            #[serde(default)]
            success: bool,
            token: Option<String>,
            user: Option<SessionUser>,
            message: Option<String>,
        }

        let response = self
            .http
            .post(format!("{}{LOGIN_PATH}", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("failed to reach login endpoint")?;

        let status = response.status();
        let body: LoginBody = response
            .json()
            .await
            .with_context(|| format!("unexpected login response (status {status})"))?;

        match (body.success, body.token, body.user) {
            (true, Some(token), Some(user)) => Ok(Session::signed_in(user, token)),
            _ => Err(anyhow!(
                body.message
                    .unwrap_or_else(|| format!("login failed with status {status}"))
            )),
        }
    }
}

#[async_trait]
impl SellerApplicationGateway for MarketplaceClient {
    async fn submit(
        &self,
        token: &str,
        draft: &SellerApplicationDraft,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let endpoint = format!("{}{SUBMIT_PATH}", self.base_url);

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(draft)
            .send()
            .await
            .map_err(|err| {
                warn!(?err, %endpoint, "seller application request failed");
                if err.is_connect() || err.is_timeout() || err.is_request() {
                    SubmissionError::Network {
                        endpoint: self.base_url.clone(),
                    }
                } else {
                    SubmissionError::Generic
                }
            })?;

        let status = response.status();
        let body = match response.json::<Value>().await {
            Ok(value) => SubmissionBody::from_json(&value),
            Err(err) => {
                debug!(?err, %status, "seller application response was not JSON");
                None
            }
        };

        classify_response(status, body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::net::TcpListener;

    use super::*;
    use crate::{
        auth::{Role, TokenKeys},
        store::memory::MemoryStore,
        web::{AppState, auth::hash_password, router::build_router},
    };

    fn body(json: Value) -> Option<SubmissionBody> {
        SubmissionBody::from_json(&json)
    }

    fn draft() -> SellerApplicationDraft {
        SellerApplicationDraft {
            business_name: "Kala Crafts".into(),
            business_type: "handicrafts".into(),
            description: "Hand-painted pottery".into(),
            address: "12 Market Road".into(),
            city: "Jaipur".into(),
            state: "Rajasthan".into(),
            pincode: "302001".into(),
            ..Default::default()
        }
    }

    #[test]
    fn success_body_yields_receipt() {
        let id = Uuid::new_v4();
        let receipt = classify_response(
            StatusCode::CREATED,
            body(serde_json::json!({ "success": true, "message": "ok", "data": { "id": id } })),
        )
        .expect("receipt");
        assert_eq!(receipt.application_id, Some(id));
    }

    #[test]
    fn malformed_errors_field_keeps_body_message() {
        let err = classify_response(
            StatusCode::BAD_REQUEST,
            body(serde_json::json!({
                "success": false,
                "message": "Business name taken",
                "errors": "bad"
            })),
        )
        .unwrap_err();
        assert_eq!(err, SubmissionError::Message("Business name taken".into()));
    }

    #[test]
    fn oddly_typed_error_entries_are_skipped() {
        let err = classify_response(
            StatusCode::BAD_REQUEST,
            body(serde_json::json!({
                "success": false,
                "message": "Validation failed",
                "errors": [{ "msg": "Invalid pincode" }, { "msg": 42 }, 7, { "msg": 1, "message": "Invalid IFSC code" }]
            })),
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Invalid pincode, Invalid IFSC code");

        let err = classify_response(
            StatusCode::BAD_REQUEST,
            body(serde_json::json!({ "success": false, "message": "Validation failed", "errors": [{ "msg": 42 }] })),
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Validation failed");
    }

    #[test]
    fn non_object_body_is_treated_as_unparsed() {
        assert!(body(serde_json::json!(["Invalid pincode"])).is_none());
        assert_eq!(
            classify_response(StatusCode::OK, body(serde_json::json!("ok"))),
            Err(SubmissionError::Generic)
        );
    }

    #[test]
    fn field_errors_take_priority_and_are_joined() {
        let err = classify_response(
            StatusCode::BAD_REQUEST,
            body(serde_json::json!({
                "success": false,
                "message": "Validation failed",
                "errors": [{ "msg": "Invalid pincode" }, { "message": "Invalid IFSC code" }, "City is required"]
            })),
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Invalid pincode, Invalid IFSC code, City is required");
    }

    #[test]
    fn single_field_error_is_shown_verbatim() {
        let err = classify_response(
            StatusCode::OK,
            body(serde_json::json!({ "success": false, "errors": [{ "msg": "Invalid pincode" }] })),
        )
        .unwrap_err();
        assert_eq!(err, SubmissionError::FieldErrors(vec!["Invalid pincode".into()]));
        assert_eq!(err.user_message(), "Invalid pincode");
    }

    #[test]
    fn body_message_beats_status_classification() {
        let err = classify_response(
            StatusCode::UNAUTHORIZED,
            body(serde_json::json!({ "success": false, "message": "Token expired. Please login again." })),
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Token expired. Please login again.");
    }

    #[test]
    fn bare_statuses_are_classified() {
        assert_eq!(
            classify_response(StatusCode::UNAUTHORIZED, None),
            Err(SubmissionError::Unauthorized)
        );
        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, None),
            Err(SubmissionError::Forbidden)
        );
        assert_eq!(
            classify_response(StatusCode::BAD_REQUEST, None),
            Err(SubmissionError::BadRequest)
        );
        assert_eq!(
            classify_response(StatusCode::BAD_GATEWAY, None),
            Err(SubmissionError::Generic)
        );
    }

    #[test]
    fn unsuccessful_ok_body_without_details() {
        let err = classify_response(StatusCode::OK, body(serde_json::json!({ "success": false })))
            .unwrap_err();
        assert_eq!(err.user_message(), "Failed to submit application");
    }

    async fn spawn_server(store: Arc<MemoryStore>) -> String {
        let state = AppState::from_parts(store, Arc::new(TokenKeys::new("client-secret", 1)), false);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn submits_against_live_server() {
        let store = Arc::new(MemoryStore::default());
        store.add_user(
            "Asha",
            "asha@example.com",
            &hash_password("secret1").unwrap(),
            Role::Buyer,
        );
        let client = MarketplaceClient::new(spawn_server(store.clone()).await);

        let session = client.login("asha@example.com", "secret1").await.unwrap();
        let token = session.submission_token().unwrap().to_string();

        let mut bad = draft();
        bad.pincode = "1".into();
        let err = client.submit(&token, &bad).await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid pincode");

        let receipt = client.submit(&token, &draft()).await.unwrap();
        assert!(receipt.application_id.is_some());
        assert_eq!(store.application_count(), 1);

        let err = client.submit("a.b.c", &draft()).await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid token. Please login again.");
    }

    #[tokio::test]
    async fn login_failure_surfaces_server_message() {
        let client = MarketplaceClient::new(spawn_server(Arc::new(MemoryStore::default())).await);
        let err = client.login("ghost@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = MarketplaceClient::new(format!("http://{addr}/"));
        let err = client.submit("a.b.c", &draft()).await.unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Network {
                endpoint: format!("http://{addr}")
            }
        );
        assert!(err.user_message().starts_with("Unable to connect to server."));
    }
}
