//! Durable-medium key names. These are a stable contract with data already
//! written by earlier builds of the front end.

/// The active session's public account (JSON object).
pub const SESSION_KEY: &str = "auth_user";

/// The self-registered account table (JSON array).
pub const DYNAMIC_ACCOUNTS_KEY: &str = "auth_users_dynamic";

/// Recent login attempts, oldest first (JSON array). Survives logout.
pub const LOGIN_EVENTS_KEY: &str = "auth_login_events";

/// Scratch values left behind by older login screens. Cleared on logout.
pub const LEGACY_SESSION_KEYS: [&str; 5] = [
    "auth_email",
    "auth_password",
    "auth_role",
    "auth_isAuthenticated",
    "email",
];
