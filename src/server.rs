//! Axum HTTP surface of the gateway.
//!
//! Handlers translate requests into calls against the GoManage client and the
//! catalogue cache, and shape the JSON responses. Validation lives here; the
//! core only ever sees well-formed requests.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::cache::CatalogueCache;
use crate::chat;
use crate::config::Config;
use crate::error::GatewayError;
use crate::gomanage::client::GoManageClient;
use crate::gomanage::types::{Catalogue, SALES_INVOICES_ENDPOINT};

const REQUIRED_CUSTOMER_FIELDS: [&str; 3] = ["business_name", "name", "vat_number"];

/// Shared state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
  pub client: GoManageClient,
  pub cache: Arc<CatalogueCache>,
}

impl AppState {
  pub fn new(config: Config) -> Result<Self, GatewayError> {
    let client = GoManageClient::new(config)?;
    let cache = Arc::new(CatalogueCache::new(client.clone()));
    Ok(Self { client, cache })
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/api/auth", post(auth))
    .route("/api/customers", get(list_customers).post(create_customer))
    .route("/api/products", get(list_products))
    .route("/api/analytics/dashboard", get(analytics_dashboard))
    .route("/api/chat/mcp", post(chat_mcp))
    .with_state(state)
}

/// Start the gateway bound to the given port.
pub async fn run(config: Config, port: u16) -> color_eyre::Result<()> {
  let state = AppState::new(config)?;
  let app = router(state);

  let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
  info!("Starting gateway on {}", addr);
  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

/// POST /api/auth: establish a session and warm both catalogues.
async fn auth(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
  state.client.ensure_session().await?;
  let customers = state.cache.ensure_loaded(Catalogue::Customers).await?;
  let products = state.cache.ensure_loaded(Catalogue::Products).await?;

  Ok(Json(json!({
    "status": "success",
    "session_id": state.client.session_preview().await,
    "customers_loaded": customers,
    "products_loaded": products,
  })))
}

#[derive(Debug, Deserialize)]
struct ListParams {
  #[serde(default = "first_page")]
  page: usize,
  #[serde(default = "default_per_page")]
  per_page: usize,
  #[serde(default)]
  search: String,
}

fn first_page() -> usize {
  1
}

fn default_per_page() -> usize {
  50
}

async fn list_customers(
  State(state): State<AppState>,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, GatewayError> {
  list_catalogue(&state, Catalogue::Customers, &params).await
}

async fn list_products(
  State(state): State<AppState>,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, GatewayError> {
  list_catalogue(&state, Catalogue::Products, &params).await
}

/// Paged, optionally substring-filtered view over one cached catalogue.
async fn list_catalogue(
  state: &AppState,
  kind: Catalogue,
  params: &ListParams,
) -> Result<Json<Value>, GatewayError> {
  state.cache.ensure_loaded(kind).await?;
  let mut rows = state.cache.get(kind).await;

  // Substring match over the whole serialized record, like the upstream UI.
  let search = params.search.trim().to_lowercase();
  if !search.is_empty() {
    rows.retain(|row| row.to_string().to_lowercase().contains(&search));
  }

  let total = rows.len();
  let page = params.page.max(1);
  let per_page = params.per_page.max(1);
  let entries: Vec<Value> = rows
    .into_iter()
    .skip((page - 1) * per_page)
    .take(per_page)
    .collect();

  let mut body = Map::new();
  body.insert(kind.to_string(), Value::Array(entries));
  body.insert(
    "pagination".into(),
    json!({
      "page": page,
      "per_page": per_page,
      "total": total,
      "pages": total.div_ceil(per_page),
    }),
  );
  Ok(Json(Value::Object(body)))
}

/// POST /api/customers: create the record upstream and drop the stale cache.
async fn create_customer(
  State(state): State<AppState>,
  Json(payload): Json<Value>,
) -> Result<Json<Value>, GatewayError> {
  let missing: Vec<String> = REQUIRED_CUSTOMER_FIELDS
    .iter()
    .filter(|field| is_blank(payload.get(**field)))
    .map(|field| field.to_string())
    .collect();
  if !missing.is_empty() {
    return Err(GatewayError::Validation { missing });
  }

  let created = state
    .client
    .call(Method::POST, Catalogue::Customers.create_endpoint(), None, Some(&payload))
    .await?;
  state.cache.invalidate(Catalogue::Customers).await;

  Ok(Json(json!({ "status": "success", "customer": created })))
}

fn is_blank(value: Option<&Value>) -> bool {
  match value {
    None | Some(Value::Null) => true,
    Some(Value::String(s)) => s.trim().is_empty(),
    Some(_) => false,
  }
}

/// GET /api/analytics/dashboard: customer aggregates plus a sales sample.
async fn analytics_dashboard(
  State(state): State<AppState>,
) -> Result<Json<Value>, GatewayError> {
  state.cache.ensure_loaded(Catalogue::Customers).await?;
  let customers = state.cache.get(Catalogue::Customers).await;

  let mut by_type: HashMap<String, u64> = HashMap::new();
  let mut provinces: HashMap<String, u64> = HashMap::new();
  for customer in &customers {
    let kind = customer.get("tip_cli").and_then(Value::as_str).unwrap_or("otros");
    *by_type.entry(kind.to_string()).or_default() += 1;
    let province = customer
      .get("province_name")
      .and_then(Value::as_str)
      .unwrap_or("Sin provincia");
    *provinces.entry(province.to_string()).or_default() += 1;
  }

  let mut top_provinces: Vec<(String, u64)> = provinces.into_iter().collect();
  top_provinces.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  top_provinces.truncate(10);
  let top_provinces: Vec<Value> = top_provinces
    .into_iter()
    .map(|(province, count)| json!({ "province": province, "count": count }))
    .collect();

  // First page of invoices only, enough for a headline number.
  let sales = state
    .client
    .call(
      Method::GET,
      SALES_INVOICES_ENDPOINT,
      Some(&[("size", "100".to_string())]),
      None,
    )
    .await?;
  let invoices = sales
    .get("page_entries")
    .and_then(Value::as_array)
    .cloned()
    .unwrap_or_default();
  let total_sales: f64 = invoices.iter().map(invoice_total).sum();

  Ok(Json(json!({
    "customers": {
      "total": customers.len(),
      "by_type": by_type,
      "top_provinces": top_provinces,
    },
    "sales": {
      "sample": invoices.len(),
      "total_sample_amount": total_sales,
    },
  })))
}

fn invoice_total(invoice: &Value) -> f64 {
  match invoice.get("total") {
    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
    Some(Value::String(s)) => s.parse().unwrap_or(0.0),
    _ => 0.0,
  }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
  #[serde(default)]
  question: String,
}

/// POST /api/chat/mcp: canned keyword-matched answer.
async fn chat_mcp(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
  let question = request.question.trim();
  if question.is_empty() {
    return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Pregunta vacía" })))
      .into_response();
  }

  let cached = state.cache.count(Catalogue::Customers).await;
  Json(json!({
    "response": chat::answer(question, cached),
    "timestamp": Utc::now().to_rfc3339(),
  }))
  .into_response()
}
