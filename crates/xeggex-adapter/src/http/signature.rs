/*
[INPUT]:  Request URL (with query), body, nonce and API credentials
[OUTPUT]: Signed request headers (X-API-KEY / X-API-NONCE / X-API-SIGN) and WS login params
[POS]:    HTTP layer - request signing for authenticated endpoints
[UPDATE]: When changing signing algorithm or header format
*/

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::auth::{Credentials, HmacSigner};
use crate::http::{Result, XeggexError};

pub const API_KEY_HEADER: &str = "X-API-KEY";
pub const API_NONCE_HEADER: &str = "X-API-NONCE";
pub const API_SIGN_HEADER: &str = "X-API-SIGN";

const LOGIN_NONCE_LEN: usize = 20;

/// Signature and headers for one HTTP call
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub nonce: u64,
    pub signature: String,
    pub headers: HeaderMap,
}

/// Signs HTTP requests and WebSocket logins for private endpoints
#[derive(Debug, Clone)]
pub struct RequestSigner {
    access_key: String,
    signer: HmacSigner,
}

impl RequestSigner {
    /// Create a request signer from an API key pair
    pub fn new(credentials: &Credentials) -> Result<Self> {
        if credentials.access_key.trim().is_empty() {
            return Err(XeggexError::Signing("access key is empty".to_string()));
        }

        Ok(Self {
            access_key: credentials.access_key.clone(),
            signer: HmacSigner::new(&credentials.secret_key)?,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Canonical string covered by the signature.
    ///
    /// Format: "{access_key}{url}{body}{nonce}"; the URL carries the encoded
    /// query string for GET requests, the body is the compact JSON for POST.
    pub fn payload(&self, url: &str, body: &str, nonce: u64) -> String {
        format!("{}{url}{body}{nonce}", self.access_key)
    }

    /// Sign a request with an explicit nonce
    pub fn sign_request(&self, url: &str, body: &str, nonce: u64) -> Result<SignedRequest> {
        let signature = self.signer.sign_hex(&self.payload(url, body, nonce));

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, header_value(&self.access_key)?);
        headers.insert(API_NONCE_HEADER, header_value(&nonce.to_string())?);
        headers.insert(API_SIGN_HEADER, header_value(&signature)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(SignedRequest {
            nonce,
            signature,
            headers,
        })
    }

    /// Sign a request using the current time as nonce
    pub fn sign_now(&self, url: &str, body: &str) -> Result<SignedRequest> {
        self.sign_request(url, body, current_nonce())
    }

    /// WebSocket `login` params with a fresh random nonce
    pub fn login_params(&self) -> Value {
        self.login_params_with_nonce(&random_login_nonce())
    }

    /// WebSocket `login` params: the signature covers the nonce only
    pub fn login_params_with_nonce(&self, nonce: &str) -> Value {
        json!({
            "algo": "HS256",
            "pKey": self.access_key,
            "nonce": nonce,
            "signature": self.signer.sign_hex(nonce),
        })
    }
}

/// Sign one request with optional credentials.
///
/// Fails with `Unauthenticated` when no credentials are configured.
pub fn sign(
    credentials: Option<&Credentials>,
    url: &str,
    body: &str,
    nonce: u64,
) -> Result<SignedRequest> {
    let credentials = credentials.ok_or(XeggexError::Unauthenticated)?;
    RequestSigner::new(credentials)?.sign_request(url, body, nonce)
}

/// Milliseconds since the Unix epoch
pub fn current_nonce() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

fn random_login_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LOGIN_NONCE_LEN)
        .map(char::from)
        .collect()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| XeggexError::Signing(format!("invalid header value: {err}")))
}
