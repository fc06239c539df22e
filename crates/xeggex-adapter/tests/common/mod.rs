/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for xeggex-adapter tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use wiremock::{Match, MockServer, Request};
use xeggex_adapter::{ClientConfig, Credentials, HmacSigner, XeggexClient};

pub const ACCESS_KEY: &str = "test-access-key";
pub const SECRET_KEY: &str = "test-secret-key";

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_credentials() -> Credentials {
    Credentials::new(ACCESS_KEY, SECRET_KEY)
}

/// REST client pointed at the mock server
pub fn mock_client(server: &MockServer, credentials: Option<Credentials>) -> XeggexClient {
    let config = ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::default()
    };
    XeggexClient::with_config(config, credentials).expect("client init")
}

/// Write a settings file to a unique temp path
pub fn write_settings_file(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("xeggex_settings_{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).expect("write settings file");
    path
}

/// Matches requests whose X-API-SIGN is the HMAC of `access_key + url + body + nonce`.
///
/// Holds the mock server's base URI: wiremock reports the request URL with
/// a `localhost` host while the client signs the address it actually dialed.
pub struct ValidSignature(pub String);

impl ValidSignature {
    pub fn for_server(server: &MockServer) -> Self {
        Self(server.uri())
    }

    fn signed_url(&self, request: &Request) -> String {
        let mut url = format!("{}{}", self.0.trim_end_matches('/'), request.url.path());
        if let Some(query) = request.url.query() {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl Match for ValidSignature {
    fn matches(&self, request: &Request) -> bool {
        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let (Some(key), Some(nonce), Some(signature)) = (
            header("X-API-KEY"),
            header("X-API-NONCE"),
            header("X-API-SIGN"),
        ) else {
            return false;
        };

        let body = String::from_utf8_lossy(&request.body);
        let payload = format!("{key}{}{body}{nonce}", self.signed_url(request));
        let signer = HmacSigner::new(SECRET_KEY).expect("signer");
        key == ACCESS_KEY && signer.verify_hex(&payload, &signature)
    }
}

enum ServerAction {
    Send(String),
    Drop,
}

/// Single-connection WebSocket server recording every text frame it receives
pub struct MockWsServer {
    pub url: String,
    frames: mpsc::UnboundedReceiver<Value>,
    actions: mpsc::UnboundedSender<ServerAction>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (frames_tx, frames) = mpsc::unbounded_channel();
        let (actions, mut actions_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };

            loop {
                tokio::select! {
                    action = actions_rx.recv() => match action {
                        Some(ServerAction::Send(text)) => {
                            if ws.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        // drop the socket without a close handshake
                        Some(ServerAction::Drop) | None => break,
                    },
                    incoming = ws.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                                let _ = frames_tx.send(value);
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            // flush the close reply so the client's handshake completes
                            let _ = ws.close(None).await;
                            break;
                        }
                        Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            frames,
            actions,
        }
    }

    /// Next frame sent by the client; panics after a timeout
    pub async fn next_frame(&mut self) -> Value {
        tokio::time::timeout(FRAME_TIMEOUT, self.frames.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("client connection ended")
    }

    /// Every frame received until the connection ends
    pub async fn remaining_frames(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = tokio::time::timeout(FRAME_TIMEOUT, self.frames.recv()).await {
            frames.push(frame);
        }
        frames
    }

    /// Frame received within `wait`, if any
    pub async fn try_next_frame(&mut self, wait: Duration) -> Option<Value> {
        tokio::time::timeout(wait, self.frames.recv()).await.ok().flatten()
    }

    pub fn send(&self, frame: Value) {
        let _ = self.actions.send(ServerAction::Send(frame.to_string()));
    }

    pub fn reply(&self, id: &Value, result: Value) {
        self.send(serde_json::json!({"jsonrpc": "2.0", "result": result, "id": id}));
    }

    pub fn reply_error(&self, id: &Value, code: i32, message: &str) {
        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": code, "message": message},
            "id": id
        }));
    }

    /// Read the next frame, check its method and acknowledge it
    pub async fn ack(&mut self, method: &str) -> Value {
        let frame = self.next_frame().await;
        assert_eq!(frame["method"], method, "unexpected frame: {frame}");
        self.reply(&frame["id"], Value::Bool(true));
        frame
    }

    /// Kill the connection without a close frame
    pub fn drop_connection(&self) {
        let _ = self.actions.send(ServerAction::Drop);
    }
}
