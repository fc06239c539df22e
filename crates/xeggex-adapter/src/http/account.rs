/*
[INPUT]:  Query parameters and signed API key headers
[OUTPUT]: Account data (balances, deposits, withdrawals, orders, trades)
[POS]:    HTTP layer - account endpoints (require credentials)
[UPDATE]: When adding new account endpoints or changing query parameters
*/

use crate::http::client::{Query, path_segment};
use crate::http::{Result, XeggexClient};
use crate::types::{Balance, DepositAddress, Order, OrderStatus, Trade, Transfer};

impl XeggexClient {
    /// Detailed balance for every asset on the account
    ///
    /// GET /balances
    pub async fn get_balances(&self) -> Result<Vec<Balance>> {
        self.get_private("/balances", Query::new()).await
    }

    /// Balances where available, pending or held is non-zero
    pub async fn get_nonzero_balances(&self) -> Result<Vec<Balance>> {
        let balances = self.get_balances().await?;
        Ok(balances.into_iter().filter(Balance::is_nonzero).collect())
    }

    /// GET /getdepositaddress/{ticker}
    pub async fn get_deposit_address(&self, ticker: &str) -> Result<DepositAddress> {
        let endpoint = format!("/getdepositaddress/{}", path_segment(ticker));
        self.get_private(&endpoint, Query::new()).await
    }

    /// Account deposits; `limit` is capped at 500 by the exchange
    ///
    /// GET /getdeposits?ticker={ticker}&limit={limit}&skip={skip}
    pub async fn get_deposits(
        &self,
        limit: u32,
        skip: u32,
        ticker: Option<&str>,
    ) -> Result<Vec<Transfer>> {
        let query = Query::new()
            .push_opt("ticker", ticker)
            .push("limit", limit)
            .push("skip", skip);
        self.get_private("/getdeposits", query).await
    }

    /// Account withdrawals, newest first
    ///
    /// GET /getwithdrawals?ticker={ticker}&limit={limit}&skip={skip}
    pub async fn get_withdrawals(
        &self,
        limit: u32,
        skip: u32,
        ticker: Option<&str>,
    ) -> Result<Vec<Transfer>> {
        let query = Query::new()
            .push_opt("ticker", ticker)
            .push("limit", limit)
            .push("skip", skip);
        self.get_private("/getwithdrawals", query).await
    }

    /// Get an order by exchange id or user provided id
    ///
    /// GET /getorder/{order_id}
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let endpoint = format!("/getorder/{}", path_segment(order_id));
        self.get_private(&endpoint, Query::new()).await
    }

    /// Orders filtered by status, newest first
    ///
    /// GET /getorders?symbol={symbol}&status={status}&limit={limit}&skip={skip}
    pub async fn get_my_orders(
        &self,
        status: OrderStatus,
        limit: u32,
        skip: u32,
        symbol: Option<&str>,
    ) -> Result<Vec<Order>> {
        let query = Query::new()
            .push_opt("symbol", symbol)
            .push("status", status.as_str())
            .push("limit", limit)
            .push("skip", skip);
        self.get_private("/getorders", query).await
    }

    /// Spot trades, newest first
    ///
    /// GET /gettrades?limit={limit}&skip={skip}&symbol={symbol}
    pub async fn get_trades(&self, limit: u32, skip: u32, symbol: Option<&str>) -> Result<Vec<Trade>> {
        let query = Query::new()
            .push("limit", limit)
            .push("skip", skip)
            .push_opt("symbol", symbol);
        self.get_private("/gettrades", query).await
    }

    /// Spot trades after `since` (ms timestamp), oldest first
    ///
    /// GET /gettradesince?since={since}&limit={limit}&skip={skip}&symbol={symbol}
    pub async fn get_trades_since(
        &self,
        since: i64,
        limit: u32,
        skip: u32,
        symbol: Option<&str>,
    ) -> Result<Vec<Trade>> {
        let query = Query::new()
            .push("since", since)
            .push("limit", limit)
            .push("skip", skip)
            .push_opt("symbol", symbol);
        self.get_private("/gettradesince", query).await
    }

    /// Pool trades, newest first
    ///
    /// GET /getpooltrades?limit={limit}&skip={skip}&symbol={symbol}
    pub async fn get_pool_trades(
        &self,
        limit: u32,
        skip: u32,
        symbol: Option<&str>,
    ) -> Result<Vec<Trade>> {
        let query = Query::new()
            .push("limit", limit)
            .push("skip", skip)
            .push_opt("symbol", symbol);
        self.get_private("/getpooltrades", query).await
    }

    /// Pool trades after `since` (ms timestamp), oldest first
    ///
    /// GET /getpooltradessince?since={since}&limit={limit}&skip={skip}&symbol={symbol}
    pub async fn get_pool_trades_since(
        &self,
        since: i64,
        limit: u32,
        skip: u32,
        symbol: Option<&str>,
    ) -> Result<Vec<Trade>> {
        let query = Query::new()
            .push("since", since)
            .push("limit", limit)
            .push("skip", skip)
            .push_opt("symbol", symbol);
        self.get_private("/getpooltradessince", query).await
    }
}
