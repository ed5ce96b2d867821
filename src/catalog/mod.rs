pub mod memory;

use async_trait::async_trait;

use crate::models::product::Product;

pub use memory::InMemoryCatalog;

/// Resolves a verified product id to product metadata.
/// Implementations: InMemoryCatalog (file-backed). The dashboard's hosted
/// database plugs in here as another implementation.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Returns `Ok(None)` when the id is unknown.
    async fn find(&self, product_id: &str) -> anyhow::Result<Option<Product>>;
}
