//! Fatal, user-facing errors

use dlvsix_core::inventory::InventoryError;
use dlvsix_core::marketplace::ResolveError;
use dlvsix_core::product::ProductError;
use dlvsix_core::registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(
        "Unable to load the marketplace service url from product.json. Supply it via --marketplace-url"
    )]
    NoMarketplaceUrl,

    #[error(
        "Unable to load the update url from product.json. Supply it via --update-url or disable distributions via --extensions-only"
    )]
    NoUpdateUrl,

    #[error(
        "Fetching VSCodium distributions is not supported: its update API only serves the latest build. Pass --extensions-only to skip them"
    )]
    CodiumDistributions,

    #[error("Unable to determine the home directory; pass --code-home")]
    NoHome,

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Marketplace(#[from] ResolveError),

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl AppError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }
}
