//! Request-level API over the clinic core.
//!
//! # Responsibility
//! - Route transport-neutral requests to core services.
//! - Map service outcomes to status codes and JSON bodies.
//! - Resolve host configuration from the environment.
//!
//! # Invariants
//! - `router::dispatch` never panics on caller input.
//! - Token issuance and password hashing stay with the host; requests
//!   arrive with the authenticated user id already attached.

pub mod config;
pub mod context;
mod handlers;
pub mod http;
pub mod router;

pub use config::ApiConfig;
pub use context::ApiContext;
pub use http::{ApiError, ApiRequest, ApiResponse, Method};
pub use router::{dispatch, Route};
