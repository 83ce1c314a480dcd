use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    auth::{AllowedRoles, Role, authenticate, authorize, is_admin},
    web::{AppState, auth, seller_applications},
};

const APPLICANT_ROLES: AllowedRoles = AllowedRoles(&[Role::Buyer, Role::Seller]);

pub fn build_router(state: AppState) -> Router {
    let applicant_routes = Router::new()
        .route("/api/seller-applications/mine", get(seller_applications::mine))
        .route_layer(middleware::from_fn_with_state(APPLICANT_ROLES, authorize));

    let admin_routes = Router::new()
        .route("/api/seller-applications", get(seller_applications::list))
        .route_layer(middleware::from_fn(is_admin));

    // Everything below requires a resolved principal.
    let gated_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/seller-applications", post(seller_applications::submit))
        .merge(applicant_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .merge(gated_routes)
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
