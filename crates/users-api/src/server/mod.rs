//! Axum HTTP server, routing, and handlers.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Map store outcomes to status codes and JSON bodies.

pub mod handlers;
pub mod router;
pub mod state;
