//! API middleware.
//!
//! Only the bearer-token auth layer lives here; role checks happen in
//! the handlers (per-operation) and in the booking permission table.

pub mod auth;
