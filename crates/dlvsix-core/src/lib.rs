pub mod acquire;
pub mod cache;
pub mod distributions;
pub mod install;
pub mod inventory;
pub mod io;
pub mod manifest;
pub mod marketplace;
pub mod naming;
pub mod paths;
pub mod product;
pub mod registry;
pub mod summary;

pub mod reporter;

#[cfg(test)]
mod testutil;

pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("dlvsix-core/", env!("CARGO_PKG_VERSION"));

/// Maximum number of transfers in flight at once.
pub const DOWNLOAD_CONCURRENCY: usize = 10;
