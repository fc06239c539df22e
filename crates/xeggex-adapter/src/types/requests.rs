/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust request structs with serialization and argument validation
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{CancelSide, OrderType, Side, SortOrder};
use crate::http::{Result, XeggexError};

const HISTORY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// New order, shared by the REST and WebSocket order endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str_option")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_provided_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_validate: Option<bool>,
}

impl CreateOrderRequest {
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: Some(OrderType::Limit),
            quantity,
            price: Some(price),
            user_provided_id: None,
            strict_validate: None,
        }
    }

    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: Some(OrderType::Market),
            quantity,
            price: None,
            user_provided_id: None,
            strict_validate: None,
        }
    }

    pub fn with_user_provided_id(mut self, id: impl Into<String>) -> Self {
        self.user_provided_id = Some(id.into());
        self
    }

    pub fn with_strict_validate(mut self, strict: bool) -> Self {
        self.strict_validate = Some(strict);
        self
    }

    /// Limit orders (the exchange default type) need a price
    pub fn validate(&self) -> Result<()> {
        let is_limit = matches!(self.order_type, None | Some(OrderType::Limit));
        if is_limit && self.price.is_none() {
            return Err(XeggexError::InvalidRequest(
                "Specify price for a limit order".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelAllOrdersRequest {
    pub symbol: String,
    pub side: CancelSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    pub ticker: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

/// WebSocket cancel: exactly one of the two ids must be set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsCancelOrderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_provided_id: Option<String>,
}

impl WsCancelOrderRequest {
    pub fn by_order_id(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            user_provided_id: None,
        }
    }

    pub fn by_user_provided_id(id: impl Into<String>) -> Self {
        Self {
            order_id: None,
            user_provided_id: Some(id.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.order_id.is_some() == self.user_provided_id.is_some() {
            return Err(XeggexError::InvalidRequest(
                "You have to unambiguously specify order ID to cancel it".to_string(),
            ));
        }
        Ok(())
    }
}

/// WebSocket `getTrades` query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeHistoryQuery {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "history_time"
    )]
    pub from: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "history_time"
    )]
    pub till: Option<DateTime<Utc>>,
}

impl TradeHistoryQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            limit: None,
            offset: None,
            sort: None,
            from: None,
            till: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_range(mut self, from: DateTime<Utc>, till: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.till = Some(till);
        self
    }

    /// `from` and `till` go together
    pub fn validate(&self) -> Result<()> {
        if self.from.is_some() != self.till.is_some() {
            return Err(XeggexError::InvalidRequest(
                "When using from or till, then both are required".to_string(),
            ));
        }
        Ok(())
    }
}

mod history_time {
    use super::HISTORY_TIME_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => {
                serializer.serialize_str(&value.format(HISTORY_TIME_FORMAT).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|raw| {
            NaiveDateTime::parse_from_str(&raw, HISTORY_TIME_FORMAT)
                .map(|naive| naive.and_utc())
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
