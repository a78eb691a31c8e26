//! Lazy in-memory catalogue cache.

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::GatewayError;
use crate::gomanage::client::GoManageClient;
use crate::gomanage::pagination;
use crate::gomanage::types::Catalogue;

/// Load-once, serve-many cache of upstream catalogues.
///
/// A slot is either empty (never loaded, or invalidated) or holds the complete
/// set retrieved at last load; there is no partial state. The cache has no TTL
/// of its own: only `invalidate` or a process restart clears a loaded slot.
pub struct CatalogueCache {
  client: GoManageClient,
  customers: Mutex<Vec<Value>>,
  products: Mutex<Vec<Value>>,
}

impl CatalogueCache {
  pub fn new(client: GoManageClient) -> Self {
    Self {
      client,
      customers: Mutex::new(Vec::new()),
      products: Mutex::new(Vec::new()),
    }
  }

  fn slot(&self, kind: Catalogue) -> &Mutex<Vec<Value>> {
    match kind {
      Catalogue::Customers => &self.customers,
      Catalogue::Products => &self.products,
    }
  }

  /// Load the catalogue if it has never been loaded (or was invalidated),
  /// returning the number of cached entries.
  ///
  /// The slot lock is held across the fetch, so concurrent requests against an
  /// empty slot trigger a single paginated load.
  pub async fn ensure_loaded(&self, kind: Catalogue) -> Result<usize, GatewayError> {
    let mut entries = self.slot(kind).lock().await;
    if entries.is_empty() {
      info!("Downloading {} catalogue", kind);
      *entries = pagination::load_all(&self.client, kind.list_endpoint()).await?;
      info!("Loaded {} {}", entries.len(), kind);
    }
    Ok(entries.len())
  }

  /// Snapshot of the current entries; empty when never loaded.
  pub async fn get(&self, kind: Catalogue) -> Vec<Value> {
    self.slot(kind).lock().await.clone()
  }

  /// Entry count without triggering a load.
  pub async fn count(&self, kind: Catalogue) -> usize {
    self.slot(kind).lock().await.len()
  }

  /// Clear the catalogue so the next `ensure_loaded` refetches it.
  pub async fn invalidate(&self, kind: Catalogue) {
    self.slot(kind).lock().await.clear();
    info!("Invalidated {} cache", kind);
  }
}
