//! HTTP API layer.
//!
//! Exposes the booking core as JSON endpoints for the SPA client.
//! Routes are nested under `/api/`; mutating routes sit behind the
//! bearer-token auth middleware.
//!
//! The router is composable — `api_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ServerHandle};
pub use types::ApiContext;
