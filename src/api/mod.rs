//! API Module
//!
//! HTTP handlers and routing for the cache server.
//!
//! # Endpoints
//! - `GET /` - Health check
//! - `GET /<key>` - Retrieve a value
//! - `HEAD /<key>` - Check that a key exists
//! - `POST /<key>` - Store a value (TTL via headers)
//! - `DELETE /<key>` - Delete a key

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
