//! Authenticated HTTP session client for the QuizHub backend.
//!
//! [`ApiClient`] attaches the stored access token to every protected call,
//! and when the backend answers `401` it exchanges the refresh token for a
//! new access token and retries the call once. If that exchange fails the
//! session is cleared and, unless the user is on a public view, the
//! [`Navigator`] is sent to the login view.

mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod pipeline;
pub mod redact;
mod refresh;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use client::{ApiClient, ApiClientBuilder, BuildError};
pub use config::ClientConfig;
pub use error::{ApiError, ErrorCode, RefreshError, StorageError};
pub use navigation::{HistoryNavigator, Navigator};
pub use refresh::{TokenRefresh, TokenRefresher};
pub use session::{KeyValueStorage, KeyringStorage, MemoryStorage, SessionStore};
pub use types::{AccountId, ApiRequest, Attempt, CurrentUser, LoginSession, RequestConfig};
