//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use bodycheck_core::SessionManager;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The shell hosts exactly one session, the way one browser profile does.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub config: Arc<Config>,
}
