//! services/api/src/bin/openapi.rs
//!
//! Dumps the shell's session contract (signup, login, logout, session,
//! the guarded account and admin routes, health) as an OpenAPI document
//! the front end can generate its client from.
//!
//! Usage: `openapi [OUTPUT]`, defaulting to `bodycheck-shell.openapi.json`.

use api_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "bodycheck-shell.openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let doc = ApiDoc::openapi();
    let route_count = doc.paths.paths.len();
    std::fs::write(&output, doc.to_pretty_json()?)?;

    println!(
        "Wrote {route_count} session routes to {}",
        output.display()
    );
    Ok(())
}
