//! Shared types and on-disk formats for dlvsix.
//!
//! Nothing in this crate performs I/O. The engine in `dlvsix-core` builds on
//! these records to talk to the marketplace and to rewrite the host editor's
//! extension registry.

pub mod hash;
pub mod identity;
pub mod manifest;
pub mod platform;
pub mod product;
pub mod registry;

// Re-exports
pub use hash::*;
pub use identity::*;
pub use manifest::*;
pub use platform::*;
pub use product::*;
pub use registry::*;
