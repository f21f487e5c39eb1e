//! Wire types and errors shared across the `users-api` workspace.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
