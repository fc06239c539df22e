/*
[INPUT]:  Market symbol (e.g., "XRG/USDT")
[OUTPUT]: Market data (markets, assets, order book)
[POS]:    Examples - public market data queries
[UPDATE]: When adding new market data endpoints
*/

use xeggex_adapter::*;

/// Example: Query market data (no credentials required)
#[tokio::main]
async fn main() {
    println!("=== XeggeX Market Data Example ===\n");

    let client = match XeggexClient::new(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ HTTP client created (public endpoints only)\n");

    let symbol = "XRG/USDT";

    println!("Querying market {}...", symbol);
    match client.get_market_by_symbol(symbol).await {
        Ok(market) => println!("✓ Market {} last price {:?}", market.symbol, market.last_price),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nQuerying order book for {}...", symbol);
    match client.get_orderbook_by_symbol(symbol).await {
        Ok(book) => println!(
            "✓ Best bid {:?} / best ask {:?}",
            book.best_bid().map(|level| level.price),
            book.best_ask().map(|level| level.price)
        ),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nListing assets...");
    match client.get_assets().await {
        Ok(assets) => println!("✓ {} assets listed", assets.len()),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\n✓ Market data example complete");
}
