use crate::error::ApiError;
use crate::redact::redact_secrets;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// A fully prepared request: absolute URL, final headers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub headers: HeaderMap,
  pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("request timed out")]
  Timeout,
  #[error("network error: {0}")]
  Network(String),
}

/// Moves one request over the wire. Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
  http: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
    Ok(Self {
      http: reqwest::Client::builder().timeout(timeout).build()?,
    })
  }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
  if err.is_timeout() {
    TransportError::Timeout
  } else {
    TransportError::Network(redact_secrets(&err.to_string()).into_owned())
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let mut builder = self
      .http
      .request(request.method, request.url)
      .headers(request.headers);
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let res = builder.send().await.map_err(map_reqwest_error)?;
    let status = res.status().as_u16();
    let body = res.text().await.map_err(map_reqwest_error)?;
    Ok(HttpResponse { status, body })
  }
}

/// Bounds a send by `timeout` regardless of what the transport does.
pub(crate) async fn send_with_timeout(
  transport: &dyn Transport,
  request: HttpRequest,
  timeout: Duration,
) -> Result<HttpResponse, ApiError> {
  let timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
  match tokio::time::timeout(timeout, transport.send(request)).await {
    Err(_) | Ok(Err(TransportError::Timeout)) => Err(ApiError::Timeout { timeout_ms }),
    Ok(Err(TransportError::Network(message))) => Err(ApiError::Network { message }),
    Ok(Ok(response)) => Ok(response),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_2xx_counts_as_success() {
    let ok = HttpResponse { status: 204, body: String::new() };
    let unauthorized = HttpResponse { status: 401, body: String::new() };
    let redirect = HttpResponse { status: 302, body: String::new() };
    assert!(ok.is_success());
    assert!(!unauthorized.is_success());
    assert!(!redirect.is_success());
  }

  #[tokio::test]
  async fn unusable_url_is_a_network_error() {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    let err = transport
      .send(HttpRequest {
        method: Method::GET,
        url: "not a url".to_string(),
        headers: HeaderMap::new(),
        body: None,
      })
      .await
      .unwrap_err();
    assert!(matches!(err, TransportError::Network(_)));
  }
}
