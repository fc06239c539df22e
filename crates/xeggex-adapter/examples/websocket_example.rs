/*
[INPUT]:  WebSocket URL and market symbol
[OUTPUT]: Live trade notifications
[POS]:    Examples - WebSocket stream handling
[UPDATE]: When WebSocket API changes
*/

use xeggex_adapter::*;

/// Example: stream a handful of trades, then unsubscribe and close
#[tokio::main]
async fn main() {
    println!("=== XeggeX WebSocket Example ===\n");

    let client = match XeggexClient::new(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    let ws = match client.connect_websocket().await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            return;
        }
    };
    println!("✓ Connected to {}", client.ws_url());

    let mut trades = match ws.subscribe_trades("XRG/USDT").await {
        Ok(subscription) => subscription,
        Err(e) => {
            eprintln!("Failed to subscribe: {}", e);
            return;
        }
    };
    println!("✓ Subscribed to {}\n", trades.key());

    for _ in 0..5 {
        match trades.next().await {
            Some(Ok(notification)) => {
                println!("{} {}", notification.method, notification.params)
            }
            Some(Err(e)) => {
                println!("✗ Error: {}", e);
                break;
            }
            None => break,
        }
    }

    trades.cancel().await;
    if let Err(e) = ws.close().await {
        println!("✗ Close error: {}", e);
    }
    println!("\n✓ WebSocket example complete");
}
