// HTTP layer - the axum adapter over the core services.

#[path = "error.rs"]
pub mod error;

#[path = "routes/route_catalog.rs"]
pub mod routes;

#[path = "session.rs"]
pub mod session;

#[path = "state.rs"]
pub mod state;
