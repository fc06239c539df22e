/*
[INPUT]:  Order / withdrawal requests with body signature headers
[OUTPUT]: Order responses and confirmation
[POS]:    HTTP layer - trading endpoints (require credentials + body signature)
[UPDATE]: When adding new trading endpoints or changing order flow
*/

use tracing::info;

use crate::http::{Result, XeggexClient};
use crate::types::{
    ActionResponse, CancelAllOrdersRequest, CancelOrderRequest, CancelSide, CreateOrderRequest,
    CreateWithdrawalRequest, Order,
};

impl XeggexClient {
    /// Create a new order
    ///
    /// POST /createorder
    /// Limit orders without a price are rejected before anything is sent.
    pub async fn create_order(&self, req: &CreateOrderRequest) -> Result<Order> {
        req.validate()?;
        let order: Order = self.post_private("/createorder", req).await?;
        info!(
            order_id = %order.id,
            symbol = %req.symbol,
            side = ?req.side,
            quantity = %req.quantity,
            "order created"
        );
        Ok(order)
    }

    /// Cancel an order by exchange id
    ///
    /// POST /cancelorder
    pub async fn cancel_order(&self, order_id: &str) -> Result<ActionResponse> {
        let req = CancelOrderRequest {
            id: order_id.to_string(),
        };
        self.post_private("/cancelorder", &req).await
    }

    /// Cancel all orders of a market, optionally one side only
    ///
    /// POST /cancelallorders
    pub async fn cancel_all_orders(&self, symbol: &str, side: CancelSide) -> Result<ActionResponse> {
        let req = CancelAllOrdersRequest {
            symbol: symbol.to_string(),
            side,
        };
        self.post_private("/cancelallorders", &req).await
    }

    /// POST /createwithdrawal
    pub async fn create_withdrawal(&self, req: &CreateWithdrawalRequest) -> Result<ActionResponse> {
        let response: ActionResponse = self.post_private("/createwithdrawal", req).await?;
        info!(ticker = %req.ticker, quantity = %req.quantity, "withdrawal requested");
        Ok(response)
    }
}
