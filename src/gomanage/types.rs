//! Wire shapes and endpoint mapping for the GoManage API.

use serde::Deserialize;
use serde_json::Value;

/// First page of sales invoices, sampled by the analytics dashboard.
pub const SALES_INVOICES_ENDPOINT: &str = "/gomanage/web/data/apitmt-sales-invoices/List";

/// One page of a GoManage list endpoint.
///
/// Records are opaque to the gateway; their schema belongs to upstream.
#[derive(Debug, Deserialize)]
pub struct PageResponse {
  #[serde(default)]
  pub page_entries: Vec<Value>,
  #[serde(default)]
  pub total_entries: u64,
}

/// Catalogue kinds cached by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalogue {
  Customers,
  Products,
}

impl Catalogue {
  /// Upstream list endpoint for this catalogue.
  pub fn list_endpoint(self) -> &'static str {
    match self {
      Catalogue::Customers => "/gomanage/web/data/apitmt-customers/List",
      Catalogue::Products => "/gomanage/web/data/apitmt-products/List",
    }
  }

  /// Upstream create endpoint for this catalogue.
  pub fn create_endpoint(self) -> &'static str {
    match self {
      Catalogue::Customers => "/gomanage/web/data/apitmt-customers",
      Catalogue::Products => "/gomanage/web/data/apitmt-products",
    }
  }
}

impl std::fmt::Display for Catalogue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Catalogue::Customers => write!(f, "customers"),
      Catalogue::Products => write!(f, "products"),
    }
  }
}
