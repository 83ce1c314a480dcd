use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::{
    auth::{
        models::{Principal, Role},
        token::{TokenError, has_token_shape},
    },
    web::{AppState, responses::ApiFailure},
};

/// Every way a request can be turned away by the gate or a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingCredentials,
    MalformedToken,
    InvalidToken,
    ExpiredToken,
    UserNotFound,
    Failed,
    NotAuthenticated,
    InsufficientRole,
    AdminRequired,
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::UserNotFound => "user_not_found",
            AuthError::Failed => "failed",
            AuthError::NotAuthenticated => "not_authenticated",
            AuthError::InsufficientRole => "insufficient_role",
            AuthError::AdminRequired => "admin_required",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InsufficientRole | AuthError::AdminRequired => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Authentication required. Please login.",
            AuthError::MalformedToken => "Invalid token format. Please login again.",
            AuthError::InvalidToken => "Invalid token. Please login again.",
            AuthError::ExpiredToken => "Token expired. Please login again.",
            AuthError::UserNotFound => "User not found. Please login again.",
            AuthError::Failed => "Authentication failed. Please login again.",
            AuthError::NotAuthenticated => "Authentication required",
            AuthError::InsufficientRole => "Access denied. Insufficient permissions.",
            AuthError::AdminRequired => "Access denied. Admin privileges required.",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Other(_) => AuthError::Failed,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiFailure::new(self.message()))).into_response()
    }
}

/// Pull the credential out of an `Authorization` value.
///
/// `Bearer <token>` always works. Outside strict mode any header whose second
/// whitespace-separated word is present is accepted too, for older clients.
pub fn extract_bearer(value: &str, strict: bool) -> Option<&str> {
    let token = match value.strip_prefix("Bearer ") {
        Some(rest) => rest.trim(),
        None if strict => return None,
        None => value.split_whitespace().nth(1)?,
    };

    (!token.is_empty()).then_some(token)
}

/// Resolve the principal for a set of request headers.
pub async fn resolve_principal(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token =
        extract_bearer(value, state.strict_bearer()).ok_or(AuthError::MissingCredentials)?;

    if !has_token_shape(token) {
        return Err(AuthError::MalformedToken);
    }

    let claims = state.tokens().verify(token).map_err(|err| {
        if let TokenError::Other(reason) = &err {
            warn!(%reason, "token verification failed unexpectedly");
        }
        AuthError::from(err)
    })?;

    match state.store().find_principal(claims.id).await {
        Ok(Some(principal)) => Ok(principal),
        Ok(None) => Err(AuthError::UserNotFound),
        Err(err) => {
            error!(?err, user_id = %claims.id, "failed to resolve principal");
            Err(AuthError::Failed)
        }
    }
}

/// Gate middleware: attaches the resolved [`Principal`] or answers 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    match resolve_principal(&state, req.headers()).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        Err(err) => {
            warn!(kind = err.kind(), path = %req.uri().path(), "authentication rejected");
            Err(err)
        }
    }
}

/// Fixed allow-list bound when a route is registered.
#[derive(Clone, Copy, Debug)]
pub struct AllowedRoles(pub &'static [Role]);

pub fn check_roles(principal: Option<&Principal>, allowed: &[Role]) -> Result<(), AuthError> {
    let principal = principal.ok_or(AuthError::NotAuthenticated)?;
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole)
    }
}

pub fn check_admin(principal: Option<&Principal>) -> Result<(), AuthError> {
    check_roles(principal, &[Role::Admin]).map_err(|err| match err {
        AuthError::InsufficientRole => AuthError::AdminRequired,
        other => other,
    })
}

/// Role middleware; must sit behind [`authenticate`].
pub async fn authorize(
    State(AllowedRoles(allowed)): State<AllowedRoles>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Err(err) = check_roles(req.extensions().get::<Principal>(), allowed) {
        warn!(kind = err.kind(), path = %req.uri().path(), "authorization rejected");
        return Err(err);
    }
    Ok(next.run(req).await)
}

pub async fn is_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    if let Err(err) = check_admin(req.extensions().get::<Principal>()) {
        warn!(kind = err.kind(), path = %req.uri().path(), "admin check rejected");
        return Err(err);
    }
    Ok(next.run(req).await)
}

/// Handler extractor for the principal attached by [`authenticate`].
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthError::NotAuthenticated)
    }
}
