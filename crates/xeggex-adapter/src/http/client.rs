/*
[INPUT]:  HTTP configuration (base URLs, timeouts) and optional credentials
[OUTPUT]: Configured reqwest client with public / signed request helpers
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::path::Path;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::http::{RequestSigner, Result, XeggexError};

/// Base URLs for XeggeX API
const BASE_URL: &str = "https://xeggex.com/api/v2";
const WS_URL: &str = "wss://ws.xeggex.com";
const ERROR_BODY_MAX_BYTES: usize = 512;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub ws_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            ws_url: WS_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Main HTTP client for XeggeX API
#[derive(Debug)]
pub struct XeggexClient {
    http_client: Client,
    base_url: String,
    ws_url: String,
    credentials: Option<Credentials>,
    signer: Option<RequestSigner>,
}

impl XeggexClient {
    /// Create a new client with default configuration
    pub fn new(credentials: Option<Credentials>) -> Result<Self> {
        Self::with_config(ClientConfig::default(), credentials)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig, credentials: Option<Credentials>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        // Validate once so request building never sees a bad base.
        Url::parse(&config.base_url)?;

        let signer = credentials.as_ref().map(RequestSigner::new).transpose()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ws_url: config.ws_url,
            credentials,
            signer,
        })
    }

    /// Create a client with credentials from a settings file.
    ///
    /// Falls back to unauthenticated mode when the file or a key is missing.
    pub fn from_settings_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_settings_file_with_config(path, ClientConfig::default())
    }

    pub fn from_settings_file_with_config(
        path: impl AsRef<Path>,
        config: ClientConfig,
    ) -> Result<Self> {
        let credentials = Credentials::from_settings_file(path)?;
        Self::with_config(config, credentials)
    }

    /// Get credentials if set
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    /// WebSocket endpoint configured for this client
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Signer for private calls; errors before any I/O when unauthenticated
    pub fn signer(&self) -> Result<&RequestSigner> {
        self.signer.as_ref().ok_or(XeggexError::Unauthenticated)
    }

    /// Build full URL for an endpoint path plus query parameters
    pub(crate) fn endpoint_url(&self, endpoint: &str, query: &Query) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.pairs());
        }
        Ok(url)
    }

    /// GET without authentication headers
    pub(crate) async fn get_public<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Query,
    ) -> Result<T> {
        let url = self.endpoint_url(endpoint, &query)?;
        let builder = self.http_client.request(Method::GET, url);
        self.send_json(builder).await
    }

    /// GET with signed headers; the signature covers the full URL
    pub(crate) async fn get_private<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Query,
    ) -> Result<T> {
        let signer = self.signer()?;
        let url = self.endpoint_url(endpoint, &query)?;
        let signed = signer.sign_now(url.as_str(), "")?;

        let builder = self
            .http_client
            .request(Method::GET, url)
            .headers(signed.headers);
        self.send_json(builder).await
    }

    /// POST a compact JSON body with signed headers
    pub(crate) async fn post_private<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let signer = self.signer()?;
        let url = self.endpoint_url(endpoint, &Query::new())?;
        let body = serde_json::to_string(body)?;
        let signed = signer.sign_now(url.as_str(), &body)?;

        let builder = self
            .http_client
            .request(Method::POST, url)
            .headers(signed.headers)
            .body(body);
        self.send_json(builder).await
    }

    /// Send a request and decode a JSON response.
    ///
    /// Non-2xx statuses, non-JSON bodies and `{"error": ...}` payloads become errors.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(1);
            warn!(url = %url.path(), retry_after, "rate limited");
            return Err(XeggexError::RateLimit { retry_after });
        }

        let body = response.text().await?;
        debug!(url = %url.path(), status = status.as_u16(), bytes = body.len(), "http response");

        if !status.is_success() {
            return Err(XeggexError::api_error(status, error_message(&body)));
        }

        if !content_type.starts_with("application/json") {
            warn!(
                url = %url.path(),
                content_type = %content_type,
                body = %truncate(&body, ERROR_BODY_MAX_BYTES),
                "endpoint returned non-JSON body"
            );
            return Err(XeggexError::InvalidResponse(format!(
                "Endpoint should be returning JSON, got '{content_type}' instead"
            )));
        }

        let value: Value = serde_json::from_str(&body)?;
        if let Some(message) = error_field(&value) {
            return Err(XeggexError::api_error(status, message));
        }

        Ok(serde_json::from_value(value)?)
    }
}

/// Ordered query parameters; `None` values are skipped
#[derive(Debug, Clone, Default)]
pub(crate) struct Query(Vec<(&'static str, String)>);

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(mut self, key: &'static str, value: impl ToString) -> Self {
        self.0.push((key, value.to_string()));
        self
    }

    pub(crate) fn push_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

/// Percent-encode one path segment
pub(crate) fn path_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Market symbol in a path: the '/' between base and quote stays literal
pub(crate) fn path_symbol(symbol: &str) -> String {
    symbol.split('/').map(path_segment).collect::<Vec<_>>().join("/")
}

fn error_field(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) => Some(message.clone()),
        other => Some(
            other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        ),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            error_field(&value).or_else(|| {
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| truncate(body, ERROR_BODY_MAX_BYTES))
}

fn truncate(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> XeggexClient {
        XeggexClient::with_config(ClientConfig::default(), None).unwrap()
    }

    #[test]
    fn test_endpoint_url_keeps_api_prefix() {
        let url = client().endpoint_url("/balances", &Query::new()).unwrap();
        assert_eq!(url.as_str(), "https://xeggex.com/api/v2/balances");
    }

    #[test]
    fn test_endpoint_url_encodes_query() {
        let query = Query::new()
            .push("symbol", "XRG/USDT")
            .push_opt("ticker", None::<&str>)
            .push("limit", 100);
        let url = client().endpoint_url("/gettrades", &query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://xeggex.com/api/v2/gettrades?symbol=XRG%2FUSDT&limit=100"
        );
    }

    #[test]
    fn test_path_encoding() {
        assert_eq!(path_segment("XRG/USDT"), "XRG%2FUSDT");
        assert_eq!(path_symbol("XRG/USDT"), "XRG/USDT");
        assert_eq!(path_symbol("XRG/US?DT"), "XRG/US%3FDT");
    }

    #[test]
    fn test_signer_requires_credentials() {
        assert!(matches!(client().signer(), Err(XeggexError::Unauthenticated)));

        let authed =
            XeggexClient::new(Some(Credentials::new("access", "secret"))).unwrap();
        assert!(authed.is_authenticated());
        assert_eq!(authed.signer().unwrap().access_key(), "access");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"Invalid symbol"}"#), "Invalid symbol");
        assert_eq!(error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message("plain text"), "plain text");
        assert_eq!(error_field(&serde_json::json!({"error": null})), None);
    }
}
