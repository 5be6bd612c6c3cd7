//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Health check
//!
//! # Shopify webhooks
//! POST /webhooks/shopify/order-complete     - Provision account from order
//! POST /webhooks/shopify/test               - Connectivity check
//! POST /webhooks/shopify/{topic}            - Acknowledge any other topic
//!
//! # User administration
//! POST /admin/users/import                  - Start a spreadsheet import
//! GET  /admin/users/import/{job_id}         - Poll an import job
//! ```

pub mod users;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the Shopify webhook routes router.
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/order-complete", post(webhooks::order_complete))
        .route("/test", post(webhooks::test))
        .route("/{topic}", post(webhooks::acknowledge))
}

/// Create the user administration routes router.
pub fn admin_user_routes() -> Router<AppState> {
    Router::new()
        .route("/import", post(users::start_import))
        .route("/import/{job_id}", get(users::import_status))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/webhooks/shopify", webhook_routes())
        .nest("/admin/users", admin_user_routes())
}
