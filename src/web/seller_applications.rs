use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::{error, info};

use crate::{
    applications::{SellerApplication, SellerApplicationDraft, validate_submission},
    auth::{CurrentUser, Role},
    web::{
        AppState,
        responses::{ApiError, ApiFailure, json_error, server_error},
    },
};

#[derive(Serialize)]
pub struct SubmittedResponse {
    success: bool,
    message: &'static str,
    data: SellerApplication,
}

#[derive(Serialize)]
pub struct ApplicationList {
    success: bool,
    count: usize,
    data: Vec<SellerApplication>,
}

impl ApplicationList {
    fn new(data: Vec<SellerApplication>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// `POST /api/seller-applications`
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(draft): Json<SellerApplicationDraft>,
) -> Result<(StatusCode, Json<SubmittedResponse>), ApiError> {
    if user.role == Role::Seller {
        return Err(json_error(StatusCode::BAD_REQUEST, "You are already a seller"));
    }

    let details = validate_submission(&draft).map_err(|errors| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiFailure::with_errors("Validation failed", errors)),
        )
    })?;

    let stored = state
        .store()
        .insert_application(user.id, &details)
        .await
        .map_err(|err| {
            error!(?err, user_id = %user.id, "failed to store seller application");
            server_error()
        })?;

    let Some(application) = stored else {
        return Err(json_error(
            StatusCode::CONFLICT,
            "You already have a pending seller application",
        ));
    };

    info!(application_id = %application.id, user_id = %user.id, "seller application submitted");

    Ok((
        StatusCode::CREATED,
        Json(SubmittedResponse {
            success: true,
            message: "Seller application submitted successfully",
            data: application,
        }),
    ))
}

/// `GET /api/seller-applications/mine`
pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApplicationList>, ApiError> {
    let applications = state.store().applications_for(user.id).await.map_err(|err| {
        error!(?err, user_id = %user.id, "failed to load seller applications");
        server_error()
    })?;
    Ok(Json(ApplicationList::new(applications)))
}

/// `GET /api/seller-applications` (admin)
pub async fn list(State(state): State<AppState>) -> Result<Json<ApplicationList>, ApiError> {
    let applications = state.store().list_applications().await.map_err(|err| {
        error!(?err, "failed to list seller applications");
        server_error()
    })?;
    Ok(Json(ApplicationList::new(applications)))
}
