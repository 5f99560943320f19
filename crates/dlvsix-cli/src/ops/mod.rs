//! Command implementations.

pub mod context;
pub mod download;
pub mod error;
pub mod install;

pub use context::Context;
pub use error::AppError;
