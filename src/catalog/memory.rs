//! In-memory product catalog.
//!
//! Loaded at startup from a JSON or YAML file (a list of products) and
//! swappable at runtime via `reload`.
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ProductLookup;
use crate::models::product::Product;

/// Shared, cheaply-cloneable catalog.
#[derive(Clone, Default)]
pub struct InMemoryCatalog(Arc<RwLock<HashMap<String, Product>>>);

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: Vec<Product>) -> anyhow::Result<Self> {
        Ok(Self(Arc::new(RwLock::new(index_by_id(products)?))))
    }

    /// Load a catalog file. `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let products = read_products(path.as_ref()).await?;
        Self::from_products(products)
    }

    /// Replace the entire catalog with a fresh set of products.
    pub async fn reload(&self, products: Vec<Product>) -> anyhow::Result<()> {
        let indexed = index_by_id(products)?;
        *self.0.write().await = indexed;
        Ok(())
    }

    /// Add or replace a single product, returning the entry it replaced.
    ///
    /// Unlike `from_products` and `reload`, which reject a batch containing the
    /// same id twice, this is an upsert: an existing product with the same id
    /// is overwritten.
    pub async fn insert(&self, product: Product) -> Option<Product> {
        self.0.write().await.insert(product.id.clone(), product)
    }

    pub async fn len(&self) -> usize {
        self.0.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.read().await.is_empty()
    }
}

#[async_trait]
impl ProductLookup for InMemoryCatalog {
    async fn find(&self, product_id: &str) -> anyhow::Result<Option<Product>> {
        Ok(self.0.read().await.get(product_id).cloned())
    }
}

async fn read_products(path: &Path) -> anyhow::Result<Vec<Product>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read catalog file {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let products = if is_yaml {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML catalog {}", path.display()))?
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON catalog {}", path.display()))?
    };
    Ok(products)
}

fn index_by_id(products: Vec<Product>) -> anyhow::Result<HashMap<String, Product>> {
    let mut map = HashMap::with_capacity(products.len());
    for product in products {
        if map.contains_key(&product.id) {
            anyhow::bail!("duplicate product id '{}' in catalog", product.id);
        }
        map.insert(product.id.clone(), product);
    }
    Ok(map)
}
