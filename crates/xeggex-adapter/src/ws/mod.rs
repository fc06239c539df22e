/*
[INPUT]:  WebSocket URL, credentials and topic selections
[OUTPUT]: Multiplexed real-time streams and RPC calls
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new topics or changing connection logic
*/

pub mod client;
pub mod message;
pub mod subscription;

pub use client::XeggexWebSocket;
pub use message::{InboundFrame, Notification, SubscriptionState, Topic, TopicKey, TopicKind};
pub use subscription::Subscription;
