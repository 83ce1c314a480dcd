use serde::Deserialize;
use uuid::Uuid;

use crate::{
    applications::SellerApplicationDraft,
    auth::{Role, has_token_shape},
};

/// Placeholder some clients store while offline; never a real credential.
pub const OFFLINE_TOKEN: &str = "offline-token";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// What the client remembers about the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<SessionUser>,
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: SessionUser, token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            token: Some(token.into()),
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Returns the credential to send, or the reason the session cannot be used.
    pub fn submission_token(&self) -> Result<&str, ValidationError> {
        if self.user.is_none() {
            return Err(ValidationError::NotSignedIn);
        }

        let token = match self.token.as_deref() {
            Some(token) if !token.is_empty() && token != OFFLINE_TOKEN => token,
            _ => return Err(ValidationError::SessionInvalid),
        };

        if !has_token_shape(token) {
            return Err(ValidationError::SessionTokenMalformed);
        }

        Ok(token)
    }
}

/// Local reasons a submission never reaches the network. Checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    NotSignedIn,
    SessionInvalid,
    SessionTokenMalformed,
    MissingRequiredFields,
}

impl ValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            ValidationError::NotSignedIn => "Please log in to submit a seller application.",
            ValidationError::SessionInvalid => {
                "Your session is invalid. Please log out and log in again."
            }
            ValidationError::SessionTokenMalformed => {
                "Your session token is invalid. Please log out and log in again."
            }
            ValidationError::MissingRequiredFields => "Please fill in all required fields",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Session checks first, then required fields.
pub fn validate_before_submit<'a>(
    session: &'a Session,
    draft: &SellerApplicationDraft,
) -> Result<&'a str, ValidationError> {
    let token = session.submission_token()?;
    if !draft.has_required_fields() {
        return Err(ValidationError::MissingRequiredFields);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            role: Role::Buyer,
        }
    }

    #[test]
    fn anonymous_session_is_rejected_first() {
        let session = Session::anonymous().with_token(Some("offline-token".into()));
        assert_eq!(
            session.submission_token(),
            Err(ValidationError::NotSignedIn)
        );
    }

    #[test]
    fn offline_and_missing_tokens_are_invalid() {
        let offline = Session::signed_in(user(), OFFLINE_TOKEN);
        assert_eq!(
            offline.submission_token(),
            Err(ValidationError::SessionInvalid)
        );

        let missing = Session::signed_in(user(), "x").with_token(None);
        assert_eq!(
            missing.submission_token(),
            Err(ValidationError::SessionInvalid)
        );
    }

    #[test]
    fn two_segment_token_is_malformed() {
        let session = Session::signed_in(user(), "header.payload");
        assert_eq!(
            session.submission_token(),
            Err(ValidationError::SessionTokenMalformed)
        );
    }

    #[test]
    fn session_errors_win_over_field_errors() {
        let session = Session::signed_in(user(), OFFLINE_TOKEN);
        let empty = SellerApplicationDraft::default();
        assert_eq!(
            validate_before_submit(&session, &empty),
            Err(ValidationError::SessionInvalid)
        );

        let session = Session::signed_in(user(), "a.b.c");
        assert_eq!(
            validate_before_submit(&session, &empty),
            Err(ValidationError::MissingRequiredFields)
        );
    }

    #[test]
    fn deserializes_login_user_payload() {
        let id = Uuid::new_v4();
        let user: SessionUser = serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Asha",
            "email": "asha@example.com",
            "role": "seller",
            "createdAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Seller);
    }
}
