//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, logout, and the current session.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use bodycheck_core::{AccessError, AuthError, PublicAccount, Role, SessionSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Display name; the email's local part is used when blank.
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
    /// Only `user` may sign up.
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// One of `admin`, `provider` (or `physician`), `nurse`, `user`.
    pub role: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&PublicAccount> for AccountResponse {
    fn from(account: &PublicAccount) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SessionResponse {
    pub account: Option<AccountResponse>,
    pub authenticated: bool,
}

impl From<&SessionSnapshot> for SessionResponse {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            account: snapshot.account.as_ref().map(AccountResponse::from),
            authenticated: snapshot.authenticated,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// The rejection every handler in the shell returns.
pub type Rejection = (StatusCode, Json<ErrorResponse>);

fn rejection(status: StatusCode, code: &str, message: impl ToString) -> Rejection {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        }),
    )
}

pub(crate) fn auth_rejection(e: AuthError) -> Rejection {
    let status = match e {
        AuthError::AccountNotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::SignupRoleNotAllowed { .. } => StatusCode::FORBIDDEN,
        AuthError::AccountAlreadyExists => StatusCode::CONFLICT,
    };
    rejection(status, e.code(), &e)
}

pub(crate) fn access_rejection(e: AccessError) -> Rejection {
    match e {
        AccessError::NotAuthenticated => {
            rejection(StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED", &e)
        }
        AccessError::RoleNotPermitted { .. } => {
            rejection(StatusCode::FORBIDDEN, "ROLE_NOT_PERMITTED", &e)
        }
    }
}

fn parse_role(tag: &str) -> Result<Role, Rejection> {
    Role::from_tag(tag).ok_or_else(|| {
        rejection(
            StatusCode::BAD_REQUEST,
            "UNKNOWN_ROLE",
            format!("'{}' is not a known role", tag),
        )
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a self-service account and sign it in
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AccountResponse),
        (status = 400, description = "Unknown role", body = ErrorResponse),
        (status = 403, description = "Role cannot sign up", body = ErrorResponse),
        (status = 409, description = "Account already exists", body = ErrorResponse)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let role = parse_role(&req.role)?;
    let account = state
        .sessions
        .signup(&req.name, &req.email, &req.password, role)
        .await
        .map_err(auth_rejection)?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// POST /auth/login - Sign in with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AccountResponse),
        (status = 400, description = "Unknown role", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "No account for this email and role", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AccountResponse>, Rejection> {
    let role = parse_role(&req.role)?;
    let account = state
        .sessions
        .login(&req.email, &req.password, role)
        .await
        .map_err(auth_rejection)?;

    Ok(Json(AccountResponse::from(&account)))
}

/// POST /auth/logout - End the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Signed out", body = SessionResponse)
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    state.sessions.logout().await;
    Json(SessionResponse::from(&state.sessions.current_session()))
}

/// GET /auth/session - Who, if anyone, is signed in
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "The current session", body = SessionResponse)
    )
)]
pub async fn session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let snapshot = state.sessions.current_session();
    debug!(authenticated = snapshot.authenticated, "Session read");
    Json(SessionResponse::from(&snapshot))
}
