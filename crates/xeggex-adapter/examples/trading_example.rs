/*
[INPUT]:  Settings file with access_key / secret_key
[OUTPUT]: Balances, open orders and an order round trip
[POS]:    Examples - signed account and trading calls
[UPDATE]: When trading endpoints change
*/

use rust_decimal::Decimal;
use xeggex_adapter::*;

/// Example: signed account calls and a limit order round trip
///
/// Reads credentials from `xeggex_settings.json` in the working directory.
#[tokio::main]
async fn main() {
    println!("=== XeggeX Trading Example ===\n");

    let client = match XeggexClient::from_settings_file(DEFAULT_SETTINGS_FILE) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    if !client.is_authenticated() {
        println!("✗ No credentials in {}; private calls will fail", DEFAULT_SETTINGS_FILE);
    }

    println!("Fetching non-zero balances...");
    match client.get_nonzero_balances().await {
        Ok(balances) => {
            for balance in balances {
                println!("  {} available={} held={}", balance.asset, balance.available, balance.held);
            }
        }
        Err(e) => println!("✗ Error: {}", e),
    }

    let order = CreateOrderRequest::limit("XRG/USDT", Side::Buy, Decimal::from(100), Decimal::new(1, 4))
        .with_user_provided_id("example-order-1");

    println!("\nPlacing limit order...");
    let placed = match client.create_order(&order).await {
        Ok(placed) => {
            println!("✓ Order {} status {}", placed.id, placed.status);
            placed
        }
        Err(e) => {
            println!("✗ Error: {}", e);
            return;
        }
    };

    println!("\nCancelling order {}...", placed.id);
    match client.cancel_order(&placed.id).await {
        Ok(response) => println!("✓ Cancelled: {}", response.success),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\n✓ Trading example complete");
}
