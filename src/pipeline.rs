//! Ordered request/response stages composed when the client is built.
//!
//! Request layers only touch headers; the dispatch loop owns URL building,
//! timeouts and the retry budget. Response layers see failed attempts and
//! may ask for exactly one re-dispatch.

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::SessionStore;
use crate::types::{ApiRequest, Attempt};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;

pub trait RequestLayer: Send + Sync {
    fn apply(&self, request: &ApiRequest, headers: &mut HeaderMap) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Propagate,
    Retry,
}

#[async_trait]
pub trait ResponseLayer: Send + Sync {
    async fn on_error(&self, request: &ApiRequest, attempt: Attempt, error: &ApiError) -> Recovery;
}

#[derive(Clone, Default)]
pub struct Pipeline {
    request_layers: Vec<Arc<dyn RequestLayer>>,
    response_layers: Vec<Arc<dyn ResponseLayer>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_layer(mut self, layer: Arc<dyn RequestLayer>) -> Self {
        self.request_layers.push(layer);
        self
    }

    pub fn with_response_layer(mut self, layer: Arc<dyn ResponseLayer>) -> Self {
        self.response_layers.push(layer);
        self
    }

    /// Runs every request layer in order, then applies per-call headers.
    /// Credentials only ever come from the layers.
    pub fn prepare_headers(&self, request: &ApiRequest) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        for layer in &self.request_layers {
            layer.apply(request, &mut headers)?;
        }
        for (name, value) in &request.config().headers {
            if *name == AUTHORIZATION {
                continue;
            }
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// First layer to ask for a retry wins.
    pub async fn recover(&self, request: &ApiRequest, attempt: Attempt, error: &ApiError) -> Recovery {
        for layer in &self.response_layers {
            if layer.on_error(request, attempt, error).await == Recovery::Retry {
                return Recovery::Retry;
            }
        }
        Recovery::Propagate
    }
}

pub struct JsonHeaders;

impl RequestLayer for JsonHeaders {
    fn apply(&self, request: &ApiRequest, headers: &mut HeaderMap) -> Result<(), ApiError> {
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if request.body().is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(())
    }
}

/// Attaches `Authorization: Bearer <token>` unless the path is auth-exempt.
/// The token is read at dispatch time so a retry sees a refreshed value.
pub struct BearerAuth {
    config: Arc<ClientConfig>,
    session: SessionStore,
}

impl BearerAuth {
    pub fn new(config: Arc<ClientConfig>, session: SessionStore) -> Self {
        Self { config, session }
    }
}

impl RequestLayer for BearerAuth {
    fn apply(&self, request: &ApiRequest, headers: &mut HeaderMap) -> Result<(), ApiError> {
        if self.config.is_auth_exempt(request.path()) {
            headers.remove(AUTHORIZATION);
            return Ok(());
        }
        let Some(token) = self.session.access_token() else {
            return Ok(());
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| ApiError::InvalidRequest("access token is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}
