//! JSON HTTP API.
//!
//! Routes are nested under `/api/`. Everything except health and login
//! sits behind the bearer-token middleware.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, start_server_on, ApiServer};
pub use types::ApiContext;
