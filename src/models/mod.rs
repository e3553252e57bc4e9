//! Request and Response models for the cache server API
//!
//! Header parsing for inserts and the JSON bodies used by health checks and
//! error responses.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ExpiresRequest, EXPIRES_AT_HEADER, EXPIRES_SEC_HEADER};
pub use responses::{ErrorResponse, HealthResponse};
