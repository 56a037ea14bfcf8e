use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_ORIGIN: &str = "http://localhost:5000";
pub const API_PREFIX: &str = "/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_API_ORIGIN: &str = "QUIZHUB_API_ORIGIN";
pub const ENV_API_TIMEOUT_MS: &str = "QUIZHUB_API_TIMEOUT_MS";

pub const REFRESH_PATH: &str = "/Auth/accessToken";
pub const LOGIN_VIEW_PATH: &str = "/auth/login";

/// Endpoints reached before a session exists; never credentialed.
pub const AUTH_EXEMPT_PATHS: [&str; 10] = [
  "/Auth/login",
  "/Auth/registerStudent",
  "/Auth/registerTeacher",
  "/Auth/send_otp_student",
  "/Auth/send_otp_teacher",
  "/Auth/checkEmail",
  "/Auth/verifyOTP",
  "/Auth/resetPasswordOTP",
  "/Auth/googleLoginStudent",
  "/Auth/googleLoginTeacher",
];

/// Views that stay reachable without a session.
pub const PUBLIC_PATHS: [&str; 6] = [
  "/",
  "/auth/login",
  "/auth/register",
  "/auth/forgot",
  "/browse",
  "/quiz/preview",
];

#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub base_url: String,
  pub timeout: Duration,
  pub auth_exempt_paths: Vec<String>,
  pub public_paths: Vec<String>,
  pub login_path: String,
  pub refresh_path: String,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self::with_origin(DEFAULT_ORIGIN)
  }
}

impl ClientConfig {
  pub fn with_origin(origin: &str) -> Self {
    Self {
      base_url: format!("{}{API_PREFIX}", origin.trim().trim_end_matches('/')),
      timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
      auth_exempt_paths: AUTH_EXEMPT_PATHS.iter().map(|s| s.to_string()).collect(),
      public_paths: PUBLIC_PATHS.iter().map(|s| s.to_string()).collect(),
      login_path: LOGIN_VIEW_PATH.to_string(),
      refresh_path: REFRESH_PATH.to_string(),
    }
  }

  /// Reads `.env` if present, then the process environment.
  ///
  /// | Env Var                  | Default                 |
  /// |--------------------------|-------------------------|
  /// | `QUIZHUB_API_ORIGIN`     | `http://localhost:5000` |
  /// | `QUIZHUB_API_TIMEOUT_MS` | `30000`                 |
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let origin = read_non_empty(&lookup, ENV_API_ORIGIN);
    let mut config = Self::with_origin(origin.as_deref().unwrap_or(DEFAULT_ORIGIN));

    if let Some(raw) = read_non_empty(&lookup, ENV_API_TIMEOUT_MS) {
      let ms = raw
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or(ConfigError::InvalidValue {
          name: ENV_API_TIMEOUT_MS,
          expected: "a positive number of milliseconds",
          value: raw.clone(),
        })?;
      config.timeout = Duration::from_millis(ms);
    }

    Ok(config)
  }

  pub fn timeout_ms(&self) -> u64 {
    self.timeout.as_millis().min(u64::MAX as u128) as u64
  }

  /// Joins a request path onto the base address. Absolute URLs pass through.
  pub fn url_for(&self, path: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
      return path.to_string();
    }
    if path.starts_with('/') {
      format!("{}{path}", self.base_url)
    } else {
      format!("{}/{path}", self.base_url)
    }
  }

  pub fn is_auth_exempt(&self, path: &str) -> bool {
    self
      .auth_exempt_paths
      .iter()
      .any(|exempt| path.contains(exempt.as_str()))
  }
}

fn read_non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
  let value = lookup(name)?;
  let trimmed = value.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_string())
  }
}
