/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public XeggeX adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::{Credentials, DEFAULT_SETTINGS_FILE, HmacSigner};

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    ErrorKind,
    RequestSigner,
    Result,
    SignedRequest,
    XeggexClient,
    XeggexError,
    sign,
};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    Notification,
    Subscription,
    SubscriptionState,
    Topic,
    TopicKey,
    TopicKind,
    XeggexWebSocket,
};
