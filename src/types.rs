use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backends hand out both numeric and string account ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountId {
    Number(i64),
    Text(String),
}

impl AccountId {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

impl From<AccountId> for Value {
    fn from(id: AccountId) -> Self {
        match id {
            AccountId::Number(n) => Value::from(n),
            AccountId::Text(s) => Value::String(s),
        }
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredUser")]
pub struct CurrentUser {
    pub account_id: AccountId,
    pub role: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stored user record as written by the login flow. `accountId` wins over
/// `id`; an `id` that loses stays in `extra`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(default)]
    account_id: Option<AccountId>,
    #[serde(default)]
    id: Option<AccountId>,
    role: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<StoredUser> for CurrentUser {
    type Error = &'static str;

    fn try_from(stored: StoredUser) -> Result<Self, Self::Error> {
        let StoredUser {
            account_id,
            id,
            role,
            mut extra,
        } = stored;
        let account_id = match (account_id, id) {
            (Some(account_id), Some(id)) => {
                extra.insert("id".to_string(), id.into());
                account_id
            }
            (Some(account_id), None) => account_id,
            (None, Some(id)) => id,
            (None, None) => return Err("missing field `accountId`"),
        };
        Ok(Self {
            account_id,
            role,
            extra,
        })
    }
}

impl CurrentUser {
    pub fn new(account_id: AccountId, role: impl Into<String>) -> Self {
        Self {
            account_id,
            role: role.into(),
            extra: Map::new(),
        }
    }
}

/// Everything a successful login leaves behind.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: CurrentUser,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshTokenRequest<'a> {
    pub account_id: i64,
    pub refresh_token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub data: Option<Box<RefreshTokenResponse>>,
}

impl RefreshTokenResponse {
    pub(crate) fn into_access_token(self) -> Option<String> {
        let direct = self
            .access_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        direct.or_else(|| self.data.and_then(|d| d.into_access_token()))
    }
}

/// Per-call extras: headers applied after the pipeline, plus query parameters.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
}

impl RequestConfig {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Immutable description of one logical call. Retries reuse it unchanged.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    config: RequestConfig,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            config: RequestConfig::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Path with the configured query string appended.
    pub fn target(&self) -> String {
        if self.config.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .config
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let sep = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{sep}{query}", self.path)
    }
}

/// Which dispatch of a request this is. A request gets at most one retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Retry,
}

impl Attempt {
    pub fn next(self) -> Option<Attempt> {
        match self {
            Self::Initial => Some(Self::Retry),
            Self::Retry => None,
        }
    }

    pub fn is_retry(self) -> bool {
        self == Self::Retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(AccountId::Number(42).as_number(), Some(42));
        assert_eq!(AccountId::Text(" 17 ".to_string()).as_number(), Some(17));
        assert_eq!(AccountId::Text("abc".to_string()).as_number(), None);
    }

    #[test]
    fn current_user_reads_id_alias_and_keeps_extra_fields() {
        let user: CurrentUser = serde_json::from_value(json!({
            "id": "12",
            "role": "teacher",
            "fullName": "Lan"
        }))
        .unwrap();
        assert_eq!(user.account_id, AccountId::Text("12".to_string()));
        assert_eq!(user.role, "teacher");
        assert_eq!(user.extra.get("fullName"), Some(&json!("Lan")));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["accountId"], json!("12"));
        assert_eq!(back["fullName"], json!("Lan"));
    }

    #[test]
    fn current_user_prefers_account_id_over_id() {
        let user: CurrentUser =
            serde_json::from_value(json!({ "id": 3, "accountId": 7, "role": "student" })).unwrap();
        assert_eq!(user.account_id, AccountId::Number(7));
        assert_eq!(user.extra.get("id"), Some(&json!(3)));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back, json!({ "accountId": 7, "id": 3, "role": "student" }));
    }

    #[test]
    fn current_user_without_any_id_is_rejected() {
        let err = serde_json::from_value::<CurrentUser>(json!({ "role": "student" })).unwrap_err();
        assert!(err.to_string().contains("accountId"));
    }

    #[test]
    fn refresh_response_reads_top_level_or_data_envelope() {
        let top: RefreshTokenResponse =
            serde_json::from_value(json!({ "accessToken": "abc" })).unwrap();
        assert_eq!(top.into_access_token().as_deref(), Some("abc"));

        let nested: RefreshTokenResponse =
            serde_json::from_value(json!({ "data": { "accessToken": "xyz" } })).unwrap();
        assert_eq!(nested.into_access_token().as_deref(), Some("xyz"));

        let empty: RefreshTokenResponse =
            serde_json::from_value(json!({ "accessToken": "  " })).unwrap();
        assert_eq!(empty.into_access_token(), None);
    }

    #[test]
    fn refresh_request_serializes_camel_case() {
        let body = serde_json::to_value(RefreshTokenRequest {
            account_id: 7,
            refresh_token: "r-1",
        })
        .unwrap();
        assert_eq!(body, json!({ "accountId": 7, "refreshToken": "r-1" }));
    }

    #[test]
    fn target_encodes_query_parameters() {
        let req = ApiRequest::get("/Quiz/search")
            .with_config(RequestConfig::default().query("q", "café quiz").query("page", "2"));
        assert_eq!(req.target(), "/Quiz/search?q=caf%C3%A9%20quiz&page=2");

        let req = ApiRequest::get("/Quiz?sort=new").with_config(RequestConfig::default().query("page", "1"));
        assert_eq!(req.target(), "/Quiz?sort=new&page=1");
    }

    #[test]
    fn attempt_allows_a_single_retry() {
        assert_eq!(Attempt::Initial.next(), Some(Attempt::Retry));
        assert_eq!(Attempt::Retry.next(), None);
        assert!(Attempt::Retry.is_retry());
    }
}
