use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use url::Url;

/// Gateway settings, taken from environment variables with the upstream's
/// conventional defaults.
#[derive(Debug, Clone)]
pub struct Config {
  /// Base URL of the GoManage instance
  pub base_url: Url,
  pub username: String,
  pub password: String,
  /// Fixed bearer-style token sent as `Authorization: oecp <token>`
  pub auth_token: String,
  pub connect_timeout: Duration,
  pub read_timeout: Duration,
  /// How long a session token is trusted before re-authenticating
  pub session_ttl_secs: u64,
}

impl Config {
  /// Load configuration from the environment.
  ///
  /// Recognized variables:
  /// - `GOMANAGE_BASE_URL` (default `http://localhost:8181`)
  /// - `GOMANAGE_USERNAME` / `GOMANAGE_PASSWORD` / `GOMANAGE_AUTH_TOKEN`
  /// - `CONNECT_TIMEOUT` / `READ_TIMEOUT` (seconds, fractional allowed)
  /// - `CACHE_TTL` (seconds; doubles as the session TTL)
  pub fn from_env() -> Result<Self> {
    let base_url = env_or("GOMANAGE_BASE_URL", "http://localhost:8181");
    let base_url = Url::parse(&base_url)
      .map_err(|e| eyre!("Invalid GOMANAGE_BASE_URL '{}': {}", base_url, e))?;

    Ok(Self {
      base_url,
      username: env_or("GOMANAGE_USERNAME", "user"),
      password: env_or("GOMANAGE_PASSWORD", "pass"),
      auth_token: env_or("GOMANAGE_AUTH_TOKEN", ""),
      connect_timeout: seconds_var("CONNECT_TIMEOUT", 10.0)?,
      read_timeout: seconds_var("READ_TIMEOUT", 25.0)?,
      session_ttl_secs: parse_seconds(std::env::var("CACHE_TTL").ok(), 7200)?,
    })
  }
}

fn env_or(name: &str, default: &str) -> String {
  std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn seconds_var(name: &str, default: f64) -> Result<Duration> {
  match std::env::var(name) {
    Ok(raw) => {
      let secs: f64 = raw
        .parse()
        .map_err(|_| eyre!("{} must be a number of seconds, got '{}'", name, raw))?;
      if !secs.is_finite() || secs < 0.0 {
        return Err(eyre!("{} must be a non-negative number of seconds, got '{}'", name, raw));
      }
      Ok(Duration::from_secs_f64(secs))
    }
    Err(_) => Ok(Duration::from_secs_f64(default)),
  }
}

fn parse_seconds(raw: Option<String>, default: u64) -> Result<u64> {
  match raw {
    Some(raw) => raw
      .parse()
      .map_err(|_| eyre!("CACHE_TTL must be a whole number of seconds, got '{}'", raw)),
    None => Ok(default),
  }
}
