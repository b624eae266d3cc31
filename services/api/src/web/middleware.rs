//! services/api/src/web/middleware.rs
//!
//! Access-guard middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use bodycheck_core::Role;
use std::sync::Arc;
use tracing::debug;

use crate::web::auth::{access_rejection, Rejection};
use crate::web::state::AppState;

/// Middleware that requires a signed-in session.
///
/// If present, inserts the `PublicAccount` into request extensions for handlers to use.
/// Otherwise returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let snapshot = state.sessions.current_session();
    let account = snapshot
        .require_authenticated()
        .map_err(access_rejection)?
        .clone();

    req.extensions_mut().insert(account);
    Ok(next.run(req).await)
}

/// Middleware that requires a signed-in `admin`; other roles get 403 Forbidden.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let snapshot = state.sessions.current_session();
    let account = snapshot
        .require_role(&[Role::Admin])
        .map_err(|e| {
            debug!(error = %e, path = %req.uri().path(), "Admin route refused");
            access_rejection(e)
        })?
        .clone();

    req.extensions_mut().insert(account);
    Ok(next.run(req).await)
}
