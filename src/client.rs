use crate::config::ClientConfig;
use crate::error::{ApiError, StorageError};
use crate::navigation::{HistoryNavigator, Navigator};
use crate::pipeline::{BearerAuth, JsonHeaders, Pipeline, Recovery, RequestLayer};
use crate::redact::redact_secrets;
use crate::refresh::{TokenRefresh, TokenRefresher};
use crate::session::{KeyValueStorage, MemoryStorage, SessionStore};
use crate::transport::{send_with_timeout, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::types::{ApiRequest, Attempt, RequestConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("http client setup failed")]
    Http(#[from] reqwest::Error),
}

/// Authenticated client for the quiz backend. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    session: SessionStore,
    pipeline: Pipeline,
}

pub struct ApiClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn KeyValueStorage>>,
    navigator: Option<Arc<dyn Navigator>>,
    transport: Option<Arc<dyn Transport>>,
    extra_layers: Vec<Arc<dyn RequestLayer>>,
}

impl ApiClientBuilder {
    pub fn storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Runs after the JSON and bearer layers.
    pub fn request_layer(mut self, layer: Arc<dyn RequestLayer>) -> Self {
        self.extra_layers.push(layer);
        self
    }

    pub fn build(self) -> Result<ApiClient, BuildError> {
        let config = Arc::new(self.config);
        let storage: Arc<dyn KeyValueStorage> = match self.storage {
            Some(s) => s,
            None => Arc::new(MemoryStorage::new()),
        };
        let navigator: Arc<dyn Navigator> = match self.navigator {
            Some(n) => n,
            None => Arc::new(HistoryNavigator::new("/")),
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(config.timeout)?),
        };
        let session = SessionStore::new(storage);

        let refresher = TokenRefresher::new(config.clone(), transport.clone(), session.clone());
        let mut pipeline = Pipeline::new()
            .with_request_layer(Arc::new(JsonHeaders))
            .with_request_layer(Arc::new(BearerAuth::new(config.clone(), session.clone())));
        for layer in self.extra_layers {
            pipeline = pipeline.with_request_layer(layer);
        }
        let pipeline = pipeline.with_response_layer(Arc::new(TokenRefresh::new(
            config.clone(),
            refresher,
            session.clone(),
            navigator,
        )));

        Ok(ApiClient {
            config,
            transport,
            session,
            pipeline,
        })
    }
}

fn to_json_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    let text = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    serde_json::from_str(text).map_err(|e| ApiError::Decode {
        message: e.to_string(),
        body: response.body.clone(),
    })
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            storage: None,
            navigator: None,
            transport: None,
            extra_layers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Forgets all credentials. No network call, no navigation.
    pub fn logout(&self) -> Result<(), StorageError> {
        tracing::info!("Clearing session");
        self.session.clear()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_with<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path).with_config(config)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::post(path).with_body(to_json_body(body)?)).await
    }

    pub async fn post_with<T, B>(&self, path: &str, body: &B, config: RequestConfig) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::post(path).with_body(to_json_body(body)?).with_config(config);
        self.send(request).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::put(path).with_body(to_json_body(body)?)).await
    }

    pub async fn put_with<T, B>(&self, path: &str, body: &B, config: RequestConfig) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::put(path).with_body(to_json_body(body)?).with_config(config);
        self.send(request).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::patch(path).with_body(to_json_body(body)?)).await
    }

    pub async fn patch_with<T, B>(&self, path: &str, body: &B, config: RequestConfig) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::patch(path).with_body(to_json_body(body)?).with_config(config);
        self.send(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    pub async fn delete_with<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path).with_config(config)).await
    }

    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(&request).await?;
        decode(response)
    }

    /// Dispatches `request`, allowing the response layers one retry.
    pub async fn execute(&self, request: &ApiRequest) -> Result<HttpResponse, ApiError> {
        let mut attempt = Attempt::Initial;
        loop {
            let err = match self.dispatch(request, attempt).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            let recovery = self.pipeline.recover(request, attempt, &err).await;
            match (recovery, attempt.next()) {
                (Recovery::Retry, Some(next)) => attempt = next,
                _ => return Err(err),
            }
        }
    }

    async fn dispatch(&self, request: &ApiRequest, attempt: Attempt) -> Result<HttpResponse, ApiError> {
        let headers = self.pipeline.prepare_headers(request)?;
        let http_request = HttpRequest {
            method: request.method().clone(),
            url: self.config.url_for(&request.target()),
            headers,
            body: request.body().cloned(),
        };

        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            ?attempt,
            "Dispatching request"
        );

        let response = send_with_timeout(self.transport.as_ref(), http_request, self.config.timeout)
            .await
            .inspect_err(|e| {
                tracing::debug!(path = %request.path(), error = %e, "Request failed without a response");
            })?;

        if response.is_success() {
            return Ok(response);
        }

        tracing::debug!(
            path = %request.path(),
            status = response.status,
            body = %redact_secrets(&response.body),
            "Request failed"
        );
        Err(ApiError::Status {
            status: response.status,
            body: response.body,
        })
    }
}
