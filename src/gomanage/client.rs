use chrono::{DateTime, Duration, Utc};
use reqwest::{header, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::error::GatewayError;

const LOGIN_PATH: &str = "/gomanage/static/auth/j_spring_security_check";
const SESSION_COOKIE: &str = "JSESSIONID";

/// The single shared session credential.
#[derive(Debug, Clone)]
struct Session {
  token: String,
  expires_at: DateTime<Utc>,
}

impl Session {
  fn is_valid(&self) -> bool {
    self.expires_at > Utc::now()
  }
}

/// GoManage API client.
///
/// Owns the process-wide session and hides its acquisition and renewal from
/// callers: every `call` checks the session first and performs at most one
/// re-authentication plus one retry when upstream answers 401.
#[derive(Clone)]
pub struct GoManageClient {
  http: reqwest::Client,
  config: Arc<Config>,
  session: Arc<RwLock<Option<Session>>>,
}

impl GoManageClient {
  pub fn new(config: Config) -> Result<Self, GatewayError> {
    // Login answers with a redirect; following it would lose the Set-Cookie.
    let http = reqwest::Client::builder()
      .connect_timeout(config.connect_timeout)
      .timeout(config.read_timeout)
      .redirect(reqwest::redirect::Policy::none())
      .build()?;

    Ok(Self {
      http,
      config: Arc::new(config),
      session: Arc::new(RwLock::new(None)),
    })
  }

  /// First characters of the current session token, for diagnostics.
  pub async fn session_preview(&self) -> Option<String> {
    let session = self.session.read().await;
    session
      .as_ref()
      .map(|s| format!("{}…", s.token.chars().take(8).collect::<String>()))
  }

  /// Authenticate only if the session is absent or expired.
  ///
  /// The write lock serializes concurrent renewals; whoever gets it second
  /// finds a fresh session and performs no network call.
  pub async fn ensure_session(&self) -> Result<(), GatewayError> {
    {
      let session = self.session.read().await;
      if session.as_ref().is_some_and(Session::is_valid) {
        return Ok(());
      }
    }

    let mut slot = self.session.write().await;
    if !slot.as_ref().is_some_and(Session::is_valid) {
      *slot = Some(self.authenticate().await?);
    }
    Ok(())
  }

  /// Replace the session unconditionally, used after upstream rejects a token
  /// the gateway still considered valid.
  async fn refresh_session(&self) -> Result<(), GatewayError> {
    let mut slot = self.session.write().await;
    *slot = Some(self.authenticate().await?);
    Ok(())
  }

  /// Form-based login; extracts the session cookie from the response.
  async fn authenticate(&self) -> Result<Session, GatewayError> {
    info!("Authenticating to GoManage as {}", self.config.username);

    let response = self
      .http
      .post(self.endpoint_url(LOGIN_PATH))
      .form(&[
        ("j_username", self.config.username.as_str()),
        ("j_password", self.config.password.as_str()),
      ])
      .send()
      .await
      .map_err(|e| GatewayError::Auth(format!("login request failed: {e}")))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
      return Err(GatewayError::Auth(format!("login rejected with status {status}")));
    }

    let token = response
      .headers()
      .get_all(header::SET_COOKIE)
      .iter()
      .filter_map(|value| value.to_str().ok())
      .find_map(session_cookie_value)
      .ok_or_else(|| {
        GatewayError::Auth(format!("no {SESSION_COOKIE} cookie in login response"))
      })?;

    let expires_at = Utc::now() + Duration::seconds(self.config.session_ttl_secs as i64);
    info!("Session established, expires at {}", expires_at.to_rfc3339());

    Ok(Session { token, expires_at })
  }

  /// Issue an authenticated request and decode the JSON response.
  ///
  /// A 401 triggers exactly one re-authentication and one retry; a second 401
  /// or any other non-success status surfaces as `Upstream`.
  pub async fn call(
    &self,
    method: Method,
    path: &str,
    query: Option<&[(&str, String)]>,
    body: Option<&Value>,
  ) -> Result<Value, GatewayError> {
    self.ensure_session().await?;

    let response = self.send_raw(method.clone(), path, query, body).await?;
    let response = if response.status() == StatusCode::UNAUTHORIZED {
      info!("401 from upstream, refreshing session and retrying");
      self.refresh_session().await?;
      self.send_raw(method, path, query, body).await?
    } else {
      response
    };

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(GatewayError::Upstream { status: status.as_u16(), body });
    }

    Ok(response.json().await?)
  }

  async fn send_raw(
    &self,
    method: Method,
    path: &str,
    query: Option<&[(&str, String)]>,
    body: Option<&Value>,
  ) -> Result<reqwest::Response, GatewayError> {
    let token = {
      let session = self.session.read().await;
      session.as_ref().map(|s| s.token.clone())
    }
    .ok_or_else(|| GatewayError::Auth("no active session".into()))?;

    let mut request = self
      .http
      .request(method, self.endpoint_url(path))
      .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
      .header(header::AUTHORIZATION, format!("oecp {}", self.config.auth_token))
      .header(header::ACCEPT, "application/json");

    if let Some(query) = query {
      request = request.query(query);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    Ok(request.send().await?)
  }

  fn endpoint_url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.as_str().trim_end_matches('/'), path)
  }
}

/// Extract the session token from one `Set-Cookie` header value.
fn session_cookie_value(header: &str) -> Option<String> {
  let (name, rest) = header.split_once('=')?;
  if name.trim() != SESSION_COOKIE {
    return None;
  }
  let value = rest.split(';').next()?.trim();
  if value.is_empty() {
    None
  } else {
    Some(value.to_string())
  }
}
