//! HTTP API module for health, metrics, report and parameter endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
