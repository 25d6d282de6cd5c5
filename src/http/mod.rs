//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the catalog and streaming endpoints
//! - Basic-auth middleware checking the shared password
//! - Request handlers and error-to-status mapping
//! - CORS and request tracing middleware

pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
