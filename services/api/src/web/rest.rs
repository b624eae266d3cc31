//! services/api/src/web/rest.rs
//!
//! Contains the handlers for the guarded REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{self, AccountResponse, ErrorResponse, SessionResponse};
use crate::web::state::AppState;
use axum::{extract::State, response::Json, Extension};
use bodycheck_core::{LoginEvent, PublicAccount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::session_handler,
        account_handler,
        admin_overview_handler,
        health_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            AccountResponse,
            SessionResponse,
            ErrorResponse,
            AccountDetailsResponse,
            AdminOverviewResponse,
            LoginEventResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "BodyCheck Demo Shell", description = "Session endpoints consumed by the demo front end.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// The signed-in account plus what the dashboard lets it do.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct AccountDetailsResponse {
    pub account: AccountResponse,
    pub can_edit_reports: bool,
}

/// How many login events the admin overview returns.
pub const RECENT_LOGIN_EVENTS: usize = 50;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct LoginEventResponse {
    pub account_id: Option<String>,
    pub user_email: String,
    pub role: String,
    /// `success`, `account_not_found` or `invalid_credentials`.
    pub outcome: String,
    pub success: bool,
    pub login_at: DateTime<Utc>,
}

impl From<&LoginEvent> for LoginEventResponse {
    fn from(event: &LoginEvent) -> Self {
        let outcome = serde_json::to_value(event.outcome)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            account_id: event.account_id.as_ref().map(|id| id.to_string()),
            user_email: event.email.clone(),
            role: event.role.to_string(),
            outcome,
            success: event.outcome.is_success(),
            login_at: event.login_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct AdminOverviewResponse {
    pub signed_in_as: AccountResponse,
    /// Seed and self-registered accounts, credentials stripped.
    pub accounts: Vec<AccountResponse>,
    /// Most recent login attempts, newest first.
    pub login_events: Vec<LoginEventResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub storage_path: String,
    pub account_count: usize,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /account - The signed-in account and its dashboard permissions
#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "The signed-in account", body = AccountDetailsResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn account_handler(
    Extension(account): Extension<PublicAccount>,
) -> Json<AccountDetailsResponse> {
    Json(AccountDetailsResponse {
        account: AccountResponse::from(&account),
        can_edit_reports: account.role.can_edit_reports(),
    })
}

/// GET /admin/overview - Every known account and recent logins, for administrators
#[utoipa::path(
    get,
    path = "/admin/overview",
    responses(
        (status = 200, description = "All accounts and recent login attempts", body = AdminOverviewResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Signed in without the admin role", body = ErrorResponse)
    )
)]
pub async fn admin_overview_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<PublicAccount>,
) -> Json<AdminOverviewResponse> {
    let store = state.sessions.accounts();
    let accounts = store
        .list_all()
        .await
        .iter()
        .map(|a| AccountResponse::from(&a.to_public()))
        .collect();
    let login_events = store
        .recent_login_events(RECENT_LOGIN_EVENTS)
        .await
        .iter()
        .map(LoginEventResponse::from)
        .collect();

    Json(AdminOverviewResponse {
        signed_in_as: AccountResponse::from(&account),
        accounts,
        login_events,
    })
}

/// GET /health - Liveness plus where the shell keeps its storage
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The shell is up", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let account_count = state.sessions.accounts().list_all().await.len();
    Json(HealthResponse {
        status: "healthy".to_string(),
        storage_path: state.config.storage_path.display().to_string(),
        account_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/auth/signup",
            "/auth/login",
            "/auth/logout",
            "/auth/session",
            "/account",
            "/admin/overview",
            "/health",
        ] {
            assert!(paths.contains(&expected), "{expected} missing from {paths:?}");
        }
    }

    #[test]
    fn failed_login_events_carry_no_account_id() {
        let event = LoginEvent::now(
            None,
            "ghost@x.com",
            bodycheck_core::Role::User,
            bodycheck_core::LoginOutcome::AccountNotFound,
        );
        let response = LoginEventResponse::from(&event);
        assert_eq!(response.outcome, "account_not_found");
        assert!(!response.success);
        assert_eq!(response.account_id, None);
        assert_eq!(response.role, "user");
    }
}
