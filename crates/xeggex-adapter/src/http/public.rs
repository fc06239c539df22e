/*
[INPUT]:  Asset / market / pool identifiers
[OUTPUT]: Market data (assets, markets, pools, order books)
[POS]:    HTTP layer - public market data endpoints (no auth required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use crate::http::client::{Query, path_segment, path_symbol};
use crate::http::{Result, XeggexClient};
use crate::types::{Asset, Market, OrderBook, Pool};

impl XeggexClient {
    /// List all assets
    ///
    /// GET /asset/getlist
    pub async fn get_assets(&self) -> Result<Vec<Asset>> {
        self.get_public("/asset/getlist", Query::new()).await
    }

    /// GET /asset/getbyid/{asset_id}
    pub async fn get_asset_by_id(&self, asset_id: &str) -> Result<Asset> {
        let endpoint = format!("/asset/getbyid/{}", path_segment(asset_id));
        self.get_public(&endpoint, Query::new()).await
    }

    /// GET /asset/getbyticker/{ticker}
    pub async fn get_asset_by_ticker(&self, ticker: &str) -> Result<Asset> {
        let endpoint = format!("/asset/getbyticker/{}", path_segment(ticker));
        self.get_public(&endpoint, Query::new()).await
    }

    /// List all markets
    ///
    /// GET /market/getlist
    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        self.get_public("/market/getlist", Query::new()).await
    }

    /// GET /market/getbyid/{market_id}
    pub async fn get_market_by_id(&self, market_id: &str) -> Result<Market> {
        let endpoint = format!("/market/getbyid/{}", path_segment(market_id));
        self.get_public(&endpoint, Query::new()).await
    }

    /// Query market by symbol, e.g. "XRG/LTC"
    ///
    /// GET /market/getbysymbol/{symbol}
    pub async fn get_market_by_symbol(&self, symbol: &str) -> Result<Market> {
        let endpoint = format!("/market/getbysymbol/{}", path_symbol(symbol));
        self.get_public(&endpoint, Query::new()).await
    }

    /// List all liquidity pools
    ///
    /// GET /pool/getlist
    pub async fn get_pools(&self) -> Result<Vec<Pool>> {
        self.get_public("/pool/getlist", Query::new()).await
    }

    /// GET /pool/getbyid/{pool_id}
    pub async fn get_pool_by_id(&self, pool_id: &str) -> Result<Pool> {
        let endpoint = format!("/pool/getbyid/{}", path_segment(pool_id));
        self.get_public(&endpoint, Query::new()).await
    }

    /// GET /pool/getbysymbol/{symbol}
    pub async fn get_pool_by_symbol(&self, symbol: &str) -> Result<Pool> {
        let endpoint = format!("/pool/getbysymbol/{}", path_symbol(symbol));
        self.get_public(&endpoint, Query::new()).await
    }

    /// Query order book by market symbol
    ///
    /// GET /market/getorderbookbysymbol/{symbol}
    pub async fn get_orderbook_by_symbol(&self, symbol: &str) -> Result<OrderBook> {
        let endpoint = format!("/market/getorderbookbysymbol/{}", path_symbol(symbol));
        self.get_public(&endpoint, Query::new()).await
    }

    /// GET /market/getorderbookbymarketid/{market_id}
    pub async fn get_orderbook_by_market_id(&self, market_id: &str) -> Result<OrderBook> {
        let endpoint = format!("/market/getorderbookbymarketid/{}", path_segment(market_id));
        self.get_public(&endpoint, Query::new()).await
    }
}
