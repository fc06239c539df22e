/*
[INPUT]:  Topic selections from callers and raw WebSocket text frames
[OUTPUT]: Subscribe / unsubscribe / request frames, routing keys, parsed inbound frames
[POS]:    WebSocket layer - message encoding, parsing and topic routing
[UPDATE]: When adding new topics, notification methods or frame formats
*/

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::http::{Result, XeggexError};
use crate::types::RpcError;

/// Stream kinds offered by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Ticker,
    Orderbook,
    Trades,
    Candles,
    Reports,
}

impl TopicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicKind::Ticker => "ticker",
            TopicKind::Orderbook => "orderbook",
            TopicKind::Trades => "trades",
            TopicKind::Candles => "candles",
            TopicKind::Reports => "reports",
        }
    }

    pub fn subscribe_method(&self) -> &'static str {
        match self {
            TopicKind::Ticker => "subscribeTicker",
            TopicKind::Orderbook => "subscribeOrderbook",
            TopicKind::Trades => "subscribeTrades",
            TopicKind::Candles => "subscribeCandles",
            TopicKind::Reports => "subscribeReports",
        }
    }

    pub fn unsubscribe_method(&self) -> &'static str {
        match self {
            TopicKind::Ticker => "unsubscribeTicker",
            TopicKind::Orderbook => "unsubscribeOrderbook",
            TopicKind::Trades => "unsubscribeTrades",
            TopicKind::Candles => "unsubscribeCandles",
            TopicKind::Reports => "unsubscribeReports",
        }
    }

    /// `method` values the server uses when pushing data for this topic
    pub fn notification_methods(&self) -> &'static [&'static str] {
        match self {
            TopicKind::Ticker => &["ticker"],
            TopicKind::Orderbook => &["snapshotOrderbook", "updateOrderbook"],
            TopicKind::Trades => &["snapshotTrades", "updateTrades"],
            TopicKind::Candles => &["snapshotCandles", "updateCandles"],
            TopicKind::Reports => &["activeOrders", "report"],
        }
    }

    pub fn from_notification_method(method: &str) -> Option<Self> {
        [
            TopicKind::Ticker,
            TopicKind::Orderbook,
            TopicKind::Trades,
            TopicKind::Candles,
            TopicKind::Reports,
        ]
        .into_iter()
        .find(|kind| kind.notification_methods().contains(&method))
    }

    /// Private topics need a logged-in connection
    pub fn is_private(&self) -> bool {
        matches!(self, TopicKind::Reports)
    }
}

/// A topic selection: kind plus parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    Ticker {
        symbol: String,
    },
    Orderbook {
        symbol: String,
        limit: Option<u32>,
    },
    Trades {
        symbol: String,
    },
    /// `period` in minutes (5, 15, 30, 60, 180, 240, 480, 720, 1440)
    Candles {
        symbol: String,
        period: u32,
        limit: Option<u32>,
    },
    Reports,
}

impl Topic {
    pub fn ticker(symbol: impl Into<String>) -> Self {
        Topic::Ticker {
            symbol: symbol.into(),
        }
    }

    pub fn orderbook(symbol: impl Into<String>, limit: Option<u32>) -> Self {
        Topic::Orderbook {
            symbol: symbol.into(),
            limit,
        }
    }

    pub fn trades(symbol: impl Into<String>) -> Self {
        Topic::Trades {
            symbol: symbol.into(),
        }
    }

    pub fn candles(symbol: impl Into<String>, period: u32, limit: Option<u32>) -> Self {
        Topic::Candles {
            symbol: symbol.into(),
            period,
            limit,
        }
    }

    pub fn kind(&self) -> TopicKind {
        match self {
            Topic::Ticker { .. } => TopicKind::Ticker,
            Topic::Orderbook { .. } => TopicKind::Orderbook,
            Topic::Trades { .. } => TopicKind::Trades,
            Topic::Candles { .. } => TopicKind::Candles,
            Topic::Reports => TopicKind::Reports,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Topic::Ticker { symbol }
            | Topic::Orderbook { symbol, .. }
            | Topic::Trades { symbol }
            | Topic::Candles { symbol, .. } => Some(symbol),
            Topic::Reports => None,
        }
    }

    /// Routing key; `limit` is not part of it
    pub fn key(&self) -> TopicKey {
        let period = match self {
            Topic::Candles { period, .. } => Some(*period),
            _ => None,
        };
        TopicKey::new(self.kind(), self.symbol(), period)
    }

    /// Symbols go out uppercased, matching the routing key
    pub fn subscribe_params(&self) -> Value {
        match self {
            Topic::Ticker { symbol } | Topic::Trades { symbol } => json!({ "symbol": symbol.to_uppercase() }),
            Topic::Orderbook { symbol, limit } => {
                let mut params = Map::new();
                params.insert("symbol".to_string(), json!(symbol.to_uppercase()));
                if let Some(limit) = limit {
                    params.insert("limit".to_string(), json!(limit));
                }
                Value::Object(params)
            }
            Topic::Candles {
                symbol,
                period,
                limit,
            } => {
                let mut params = Map::new();
                params.insert("symbol".to_string(), json!(symbol.to_uppercase()));
                params.insert("period".to_string(), json!(period));
                if let Some(limit) = limit {
                    params.insert("limit".to_string(), json!(limit));
                }
                Value::Object(params)
            }
            Topic::Reports => json!({}),
        }
    }

    pub fn unsubscribe_params(&self) -> Value {
        match self {
            Topic::Ticker { symbol } | Topic::Orderbook { symbol, .. } | Topic::Trades { symbol } => {
                json!({ "symbol": symbol.to_uppercase() })
            }
            Topic::Candles { symbol, period, .. } => json!({ "symbol": symbol.to_uppercase(), "period": period }),
            Topic::Reports => json!({}),
        }
    }
}

/// Routing key `(kind, symbol, period)` that ties notifications to a subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicKey {
    pub kind: TopicKind,
    pub symbol: Option<String>,
    pub period: Option<u32>,
}

impl TopicKey {
    /// Symbols compare case-insensitively
    pub fn new(kind: TopicKind, symbol: Option<&str>, period: Option<u32>) -> Self {
        Self {
            kind,
            symbol: symbol.map(str::to_uppercase),
            period,
        }
    }

    /// Derive the key from a notification; `None` for unknown methods
    pub fn from_notification(method: &str, params: &Value) -> Option<Self> {
        let kind = TopicKind::from_notification_method(method)?;
        let key = match kind {
            TopicKind::Reports => TopicKey::new(kind, None, None),
            TopicKind::Candles => {
                TopicKey::new(kind, params_symbol(params), params_period(params))
            }
            _ => TopicKey::new(kind, params_symbol(params), None),
        };
        Some(key)
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if let Some(symbol) = &self.symbol {
            write!(f, ":{symbol}")?;
        }
        if let Some(period) = self.period {
            write!(f, ":{period}")?;
        }
        Ok(())
    }
}

fn params_symbol(params: &Value) -> Option<&str> {
    params.get("symbol").and_then(Value::as_str)
}

fn params_period(params: &Value) -> Option<u32> {
    match params.get("period")? {
        Value::Number(number) => number.as_u64().and_then(|period| u32::try_from(period).ok()),
        Value::String(raw) => raw.parse().ok(),
        _ => None,
    }
}

/// Lifecycle of one subscription on a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Subscribe frame sent, acknowledgement pending
    Requested,
    Active,
    /// Delivery stopped, unsubscribe frame being sent
    Cancelling,
    Closed,
}

impl SubscriptionState {
    pub fn is_live(&self) -> bool {
        matches!(self, SubscriptionState::Requested | SubscriptionState::Active)
    }
}

/// Server push routed to a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    pub fn topic_kind(&self) -> Option<TopicKind> {
        TopicKind::from_notification_method(&self.method)
    }

    pub fn symbol(&self) -> Option<&str> {
        params_symbol(&self.params)
    }

    /// Snapshots carry full state, updates carry deltas
    pub fn is_snapshot(&self) -> bool {
        self.method.starts_with("snapshot") || self.method == "activeOrders"
    }

    /// Decode the payload: `params.data` when present, otherwise `params`
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self.params.get("data").unwrap_or(&self.params);
        Ok(T::deserialize(payload)?)
    }
}

/// Decoded server frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Answer to a request carrying our `id`
    Reply {
        id: u64,
        outcome: std::result::Result<Value, RpcError>,
    },
    Notification(Notification),
    /// Valid JSON that is neither a reply nor a notification
    Other(Value),
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(text)?;

        if let Some(id) = value.get("id").filter(|id| !id.is_null()) {
            let id = reply_id(id).ok_or_else(|| {
                XeggexError::InvalidResponse(format!("unexpected reply id: {id}"))
            })?;
            let outcome = match value.get_mut("error").map(Value::take) {
                Some(error) if !error.is_null() => Err(rpc_error(error)),
                _ => Ok(value.get_mut("result").map(Value::take).unwrap_or(Value::Null)),
            };
            return Ok(InboundFrame::Reply { id, outcome });
        }

        if value.get("method").is_some_and(Value::is_string) {
            let notification: Notification = serde_json::from_value(value)?;
            return Ok(InboundFrame::Notification(notification));
        }

        Ok(InboundFrame::Other(value))
    }
}

fn reply_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) => raw.parse().ok(),
        _ => None,
    }
}

fn rpc_error(error: Value) -> RpcError {
    match error {
        Value::String(message) => RpcError {
            code: 0,
            message,
            description: None,
        },
        other => serde_json::from_value(other.clone()).unwrap_or_else(|_| RpcError {
            code: 0,
            message: other.to_string(),
            description: None,
        }),
    }
}

/// JSON-RPC style request frame: `{"method", "params", "id"}`
pub fn encode_request(method: &str, params: Value, id: u64) -> String {
    json!({
        "method": method,
        "params": params,
        "id": id,
    })
    .to_string()
}

impl From<RpcError> for XeggexError {
    fn from(error: RpcError) -> Self {
        XeggexError::Api {
            code: error.code,
            message: error.display_message(),
        }
    }
}
