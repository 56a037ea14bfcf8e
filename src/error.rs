use thiserror::Error;

/// Distinguishes failures without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Timeout,
    Network,
    Status,
    Decode,
    InvalidRequest,
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("server responded with status {status}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {message}")]
    Decode { message: String, body: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Network { .. } => ErrorCode::Network,
            Self::Status { .. } => ErrorCode::Status,
            Self::Decode { .. } => ErrorCode::Decode,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } | Self::Decode { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("secure storage is unavailable")]
    Unavailable,
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("stored value for {key} is corrupt")]
    Corrupt { key: &'static str },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Why a 401 could not be recovered from.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,
    #[error("no user record stored")]
    MissingUser,
    #[error("account id {0:?} is not numeric")]
    NonNumericAccountId(String),
    #[error("refresh call failed: {0}")]
    Rejected(#[from] ApiError),
    #[error("refresh response carried no access token")]
    MissingAccessToken,
    #[error("could not persist refreshed token: {0}")]
    Persist(#[from] StorageError),
}
