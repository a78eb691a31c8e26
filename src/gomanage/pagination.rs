//! Full retrieval of page-based upstream list endpoints.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::GatewayError;
use crate::gomanage::client::GoManageClient;
use crate::gomanage::types::PageResponse;

pub const PAGE_SIZE: u64 = 500;

/// Fetch every page of a GoManage list endpoint, in order.
///
/// Stops once the accumulated count reaches the reported `total_entries`, or
/// as soon as a page comes back empty, so a malformed total can never make
/// the loop run forever.
pub async fn load_all(
  client: &GoManageClient,
  endpoint: &str,
) -> Result<Vec<Value>, GatewayError> {
  let mut entries: Vec<Value> = Vec::new();
  let mut page = 1u64;

  loop {
    let query = [("page", page.to_string()), ("size", PAGE_SIZE.to_string())];
    let data = client.call(Method::GET, endpoint, Some(&query), None).await?;
    let response: PageResponse = serde_json::from_value(data)?;

    let fetched = response.page_entries.len();
    entries.extend(response.page_entries);
    debug!(
      "{}: page {} returned {} entries ({} accumulated, {} reported)",
      endpoint,
      page,
      fetched,
      entries.len(),
      response.total_entries
    );

    if entries.len() as u64 >= response.total_entries || fetched == 0 {
      break;
    }
    page += 1;
  }

  Ok(entries)
}
