use crate::config::ClientConfig;
use crate::error::{ApiError, RefreshError};
use crate::navigation::{is_public_path, Navigator};
use crate::pipeline::{Recovery, ResponseLayer};
use crate::redact::redact_secrets;
use crate::session::SessionStore;
use crate::transport::{send_with_timeout, HttpRequest, Transport};
use crate::types::{ApiRequest, Attempt, RefreshTokenRequest, RefreshTokenResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use std::sync::Arc;

/// Exchanges the stored refresh token for a new access token.
///
/// The call goes straight to the transport: it carries no bearer header and
/// a 401 here never recurses into recovery.
#[derive(Clone)]
pub struct TokenRefresher {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    session: SessionStore,
}

impl TokenRefresher {
    pub fn new(config: Arc<ClientConfig>, transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self {
            config,
            transport,
            session,
        }
    }

    /// On success the new token is already persisted.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;
        let user = self.session.current_user().ok_or(RefreshError::MissingUser)?;
        let account_id = user
            .account_id
            .as_number()
            .ok_or_else(|| RefreshError::NonNumericAccountId(user.account_id.to_string()))?;

        let body = serde_json::to_value(RefreshTokenRequest {
            account_id,
            refresh_token: refresh_token.trim(),
        })
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let request = HttpRequest {
            method: Method::POST,
            url: self.config.url_for(&self.config.refresh_path),
            headers,
            body: Some(body),
        };

        let response = send_with_timeout(self.transport.as_ref(), request, self.config.timeout).await?;
        if !response.is_success() {
            tracing::debug!(
                status = response.status,
                body = %redact_secrets(&response.body),
                "Refresh endpoint rejected the refresh token"
            );
            return Err(ApiError::Status {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        let parsed: RefreshTokenResponse = serde_json::from_str(&response.body).unwrap_or_default();
        let access_token = parsed
            .into_access_token()
            .ok_or(RefreshError::MissingAccessToken)?;

        self.session.set_access_token(&access_token)?;
        Ok(access_token)
    }
}

/// Turns a first-attempt 401 into refresh-then-retry. When the refresh
/// fails the session is ended and the original error goes back to the caller.
pub struct TokenRefresh {
    config: Arc<ClientConfig>,
    refresher: TokenRefresher,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl TokenRefresh {
    pub fn new(
        config: Arc<ClientConfig>,
        refresher: TokenRefresher,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            refresher,
            session,
            navigator,
        }
    }

    fn end_session(&self) {
        let _ = self.session.clear();

        let current = self.navigator.current_path();
        if is_public_path(&current, &self.config.public_paths) {
            tracing::debug!(path = %current, "Session ended on a public view, staying put");
            return;
        }
        tracing::info!(from = %current, to = %self.config.login_path, "Session ended, redirecting to login");
        self.navigator.replace(&self.config.login_path);
    }
}

#[async_trait]
impl ResponseLayer for TokenRefresh {
    async fn on_error(&self, request: &ApiRequest, attempt: Attempt, error: &ApiError) -> Recovery {
        if !error.is_unauthorized() || attempt.is_retry() {
            return Recovery::Propagate;
        }

        tracing::info!(path = %request.path(), "Access token rejected, refreshing");
        match self.refresher.refresh().await {
            Ok(_) => {
                tracing::info!(path = %request.path(), "Access token refreshed, retrying");
                Recovery::Retry
            }
            Err(e) => {
                tracing::warn!(path = %request.path(), error = %e, "Token refresh failed");
                self.end_session();
                Recovery::Propagate
            }
        }
    }
}
