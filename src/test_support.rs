use crate::error::StorageError;
use crate::session::{KeyValueStorage, MemoryStorage, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER};
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Fake backend: answers through a closure and records every request.
pub(crate) struct ScriptedTransport {
    handler: Box<Handler>,
    delay: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count_matching(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

pub(crate) fn bearer_of(request: &HttpRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub(crate) fn logged_in_storage(access: &str, refresh: &str, user: Value) -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.set(KEY_ACCESS_TOKEN, access).unwrap();
    storage.set(KEY_REFRESH_TOKEN, refresh).unwrap();
    storage.set(KEY_USER, &user.to_string()).unwrap();
    storage
}

pub(crate) fn shared(storage: &MemoryStorage) -> Arc<dyn KeyValueStorage> {
    Arc::new(storage.clone())
}

/// Memory storage that refuses to write the access token.
pub(crate) struct ReadOnlyAccessToken(pub(crate) MemoryStorage);

impl KeyValueStorage for ReadOnlyAccessToken {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == KEY_ACCESS_TOKEN {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.0.remove(key)
    }
}
