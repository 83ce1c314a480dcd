use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{Json, extract::State, http::StatusCode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    auth::{CurrentUser, Principal, Role},
    store::NewUser,
    web::{
        AppState,
        responses::{ApiError, json_error, server_error},
    },
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    success: bool,
    token: String,
    expires_in: i64,
    user: Principal,
}

#[derive(Serialize)]
pub struct MeResponse {
    success: bool,
    user: Principal,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(json_error(StatusCode::BAD_REQUEST, "Name is required"));
    }

    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(json_error(StatusCode::BAD_REQUEST, "A valid email is required"));
    }

    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let password_hash = hash_password(&body.password).map_err(|err| {
        error!(?err, "failed to hash password during registration");
        server_error()
    })?;

    let created = state
        .store()
        .create_user(NewUser {
            name: name.to_string(),
            email,
            password_hash,
            role: Role::Buyer,
        })
        .await
        .map_err(|err| {
            error!(?err, "failed to create user");
            server_error()
        })?;

    let Some(user) = created else {
        return Err(json_error(StatusCode::CONFLICT, "Email is already registered"));
    };

    info!(user_id = %user.id, "registered user");
    let session = issue_session(&state, user)?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = body.email.trim().to_lowercase();
    let store = state.store();

    let credentials = match store.find_credentials(&email).await {
        Ok(Some(credentials)) => credentials,
        Ok(None) => return Err(invalid_credentials()),
        Err(err) => {
            error!(?err, "failed to fetch user during login");
            return Err(server_error());
        }
    };

    if !verify_password(&body.password, &credentials.password_hash) {
        return Err(invalid_credentials());
    }

    let user = match store.find_principal(credentials.id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(invalid_credentials()),
        Err(err) => {
            error!(?err, "failed to load principal during login");
            return Err(server_error());
        }
    };

    Ok(Json(issue_session(&state, user)?))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user,
    })
}

fn issue_session(state: &AppState, user: Principal) -> Result<SessionResponse, ApiError> {
    let token = state.tokens().issue(&user).map_err(|err| {
        error!(?err, "failed to issue access token");
        server_error()
    })?;

    Ok(SessionResponse {
        success: true,
        token,
        expires_in: state.tokens().ttl_seconds(),
        user,
    })
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

fn invalid_credentials() -> ApiError {
    json_error(StatusCode::UNAUTHORIZED, "Invalid email or password")
}
