//! In-process mock of the GoManage upstream for tests.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::config::Config;

/// Mutable behavior switches and call counters for the mock upstream.
#[derive(Debug, Default)]
pub struct UpstreamState {
  pub auth_calls: usize,
  pub list_calls: usize,
  pub create_calls: usize,
  pub unauthorized_hits: usize,
  pub sessions_issued: usize,
  pub current_token: Option<String>,
  pub customers: Vec<Value>,
  pub products: Vec<Value>,
  pub invoices: Vec<Value>,
  /// Reported `total_entries`, when different from the real count.
  pub total_override: Option<u64>,
  /// Answer the login request with a 500.
  pub fail_auth: bool,
  /// Log in successfully but without a Set-Cookie header.
  pub omit_session_cookie: bool,
  /// Reject every data request with a 401 regardless of the token.
  pub always_unauthorized: bool,
  /// Reject customer creation with this status and a JSON error body.
  pub reject_create: Option<u16>,
}

type Shared = Arc<Mutex<UpstreamState>>;

/// A mock GoManage server bound to an ephemeral local port.
pub struct MockUpstream {
  pub state: Shared,
  pub addr: SocketAddr,
}

impl MockUpstream {
  pub async fn start(state: UpstreamState) -> Self {
    let shared: Shared = Arc::new(Mutex::new(state));
    let app = Router::new()
      .route("/gomanage/static/auth/j_spring_security_check", post(login))
      .route("/gomanage/web/data/apitmt-customers/List", get(list_customers))
      .route("/gomanage/web/data/apitmt-products/List", get(list_products))
      .route("/gomanage/web/data/apitmt-sales-invoices/List", get(list_invoices))
      .route("/gomanage/web/data/apitmt-customers", post(create_customer))
      .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    Self { state: shared, addr }
  }

  /// Gateway config pointed at this mock, with a comfortable session TTL.
  pub fn config(&self) -> Config {
    self.config_with_ttl(3600)
  }

  pub fn config_with_ttl(&self, session_ttl_secs: u64) -> Config {
    Config {
      base_url: url::Url::parse(&format!("http://{}", self.addr)).unwrap(),
      username: "user".into(),
      password: "pass".into(),
      auth_token: "test-token".into(),
      connect_timeout: std::time::Duration::from_secs(5),
      read_timeout: std::time::Duration::from_secs(5),
      session_ttl_secs,
    }
  }

  /// Drop the current token so the next data request sees a 401.
  pub fn revoke_session(&self) {
    self.state.lock().unwrap().current_token = None;
  }

  pub fn auth_calls(&self) -> usize {
    self.state.lock().unwrap().auth_calls
  }

  pub fn list_calls(&self) -> usize {
    self.state.lock().unwrap().list_calls
  }

  pub fn create_calls(&self) -> usize {
    self.state.lock().unwrap().create_calls
  }

  pub fn unauthorized_hits(&self) -> usize {
    self.state.lock().unwrap().unauthorized_hits
  }
}

/// A synthetic customer record in the upstream's field vocabulary.
pub fn customer(n: usize) -> Value {
  json!({
    "id": n,
    "business_name": format!("Cliente {n}"),
    "name": format!("Cliente {n} SL"),
    "vat_number": format!("B{n:08}"),
    "tip_cli": if n % 2 == 0 { "empresa" } else { "autonomo" },
    "province_name": format!("Provincia {}", n % 3),
  })
}

pub fn customers(count: usize) -> Vec<Value> {
  (0..count).map(customer).collect()
}

async fn login(State(state): State<Shared>) -> Response {
  let mut st = state.lock().unwrap();
  st.auth_calls += 1;
  if st.fail_auth {
    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
  }
  if st.omit_session_cookie {
    return StatusCode::OK.into_response();
  }

  st.sessions_issued += 1;
  let token = format!("mock-session-{:04}", st.sessions_issued);
  st.current_token = Some(token.clone());
  (
    [(header::SET_COOKIE, format!("JSESSIONID={token}; Path=/; HttpOnly"))],
    "",
  )
    .into_response()
}

fn authorized(st: &mut UpstreamState, headers: &HeaderMap) -> bool {
  let cookie = headers
    .get(header::COOKIE)
    .and_then(|value| value.to_str().ok())
    .unwrap_or("");
  let ok = !st.always_unauthorized
    && match &st.current_token {
      Some(token) => cookie.contains(&format!("JSESSIONID={token}")),
      None => false,
    };
  if !ok {
    st.unauthorized_hits += 1;
  }
  ok
}

#[derive(Debug, Deserialize)]
struct PageParams {
  #[serde(default = "first_page")]
  page: usize,
  #[serde(default = "default_size")]
  size: usize,
}

fn first_page() -> usize {
  1
}

fn default_size() -> usize {
  100
}

fn page_response(rows: &[Value], params: &PageParams, total_override: Option<u64>) -> Json<Value> {
  let start = params.page.saturating_sub(1) * params.size;
  let entries: Vec<Value> = rows.iter().skip(start).take(params.size).cloned().collect();
  let total = total_override.unwrap_or(rows.len() as u64);
  Json(json!({ "page_entries": entries, "total_entries": total }))
}

async fn list_customers(
  State(state): State<Shared>,
  headers: HeaderMap,
  Query(params): Query<PageParams>,
) -> Response {
  let mut st = state.lock().unwrap();
  if !authorized(&mut st, &headers) {
    return StatusCode::UNAUTHORIZED.into_response();
  }
  st.list_calls += 1;
  let rows = st.customers.clone();
  page_response(&rows, &params, st.total_override).into_response()
}

async fn list_products(
  State(state): State<Shared>,
  headers: HeaderMap,
  Query(params): Query<PageParams>,
) -> Response {
  let mut st = state.lock().unwrap();
  if !authorized(&mut st, &headers) {
    return StatusCode::UNAUTHORIZED.into_response();
  }
  st.list_calls += 1;
  let rows = st.products.clone();
  page_response(&rows, &params, None).into_response()
}

async fn list_invoices(
  State(state): State<Shared>,
  headers: HeaderMap,
  Query(params): Query<PageParams>,
) -> Response {
  let mut st = state.lock().unwrap();
  if !authorized(&mut st, &headers) {
    return StatusCode::UNAUTHORIZED.into_response();
  }
  let rows = st.invoices.clone();
  page_response(&rows, &params, None).into_response()
}

async fn create_customer(
  State(state): State<Shared>,
  headers: HeaderMap,
  Json(payload): Json<Value>,
) -> Response {
  let mut st = state.lock().unwrap();
  if !authorized(&mut st, &headers) {
    return StatusCode::UNAUTHORIZED.into_response();
  }
  if let Some(status) = st.reject_create {
    return (
      StatusCode::from_u16(status).unwrap(),
      Json(json!({ "error": "rejected by upstream" })),
    )
      .into_response();
  }

  st.create_calls += 1;
  let mut record = payload;
  if let Value::Object(fields) = &mut record {
    fields.insert("id".into(), json!(st.customers.len()));
  }
  st.customers.push(record.clone());
  Json(record).into_response()
}
