/*
[INPUT]:  Parsed subcommand arguments and a configured client
[OUTPUT]: JSON on stdout; stream notifications until shutdown
[POS]:    Binary - subcommand implementations
[UPDATE]: When adding subcommands or changing output format
*/

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use xeggex_adapter::{OrderStatus, Topic, XeggexClient};

use crate::TopicArg;

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("encode output")?);
    Ok(())
}

pub(crate) fn check(client: &XeggexClient) -> Result<()> {
    if client.is_authenticated() {
        println!("authenticated");
    } else {
        println!("unauthenticated (public endpoints only)");
    }
    Ok(())
}

pub(crate) async fn assets(client: &XeggexClient) -> Result<()> {
    let assets = client.get_assets().await.context("get assets")?;
    print_json(&assets)
}

pub(crate) async fn markets(client: &XeggexClient, symbol: Option<&str>) -> Result<()> {
    match symbol {
        Some(symbol) => {
            let market = client
                .get_market_by_symbol(symbol)
                .await
                .with_context(|| format!("get market {symbol}"))?;
            print_json(&market)
        }
        None => {
            let markets = client.get_markets().await.context("get markets")?;
            print_json(&markets)
        }
    }
}

pub(crate) async fn orderbook(client: &XeggexClient, symbol: &str) -> Result<()> {
    let book = client
        .get_orderbook_by_symbol(symbol)
        .await
        .with_context(|| format!("get order book {symbol}"))?;
    print_json(&book)
}

pub(crate) async fn balances(client: &XeggexClient, nonzero: bool) -> Result<()> {
    let balances = if nonzero {
        client.get_nonzero_balances().await
    } else {
        client.get_balances().await
    }
    .context("get balances")?;
    print_json(&balances)
}

pub(crate) async fn orders(
    client: &XeggexClient,
    status: OrderStatus,
    symbol: Option<&str>,
    limit: u32,
) -> Result<()> {
    let orders = client
        .get_my_orders(status, limit, 0, symbol)
        .await
        .context("get orders")?;
    print_json(&orders)
}

pub(crate) fn topic_from_args(
    topic: TopicArg,
    symbol: Option<String>,
    period: u32,
    limit: Option<u32>,
) -> Result<Topic> {
    if topic == TopicArg::Reports {
        return Ok(Topic::Reports);
    }
    let Some(symbol) = symbol else {
        bail!("a market symbol is required for {topic:?}");
    };
    Ok(match topic {
        TopicArg::Ticker => Topic::ticker(symbol),
        TopicArg::Orderbook => Topic::orderbook(symbol, limit),
        TopicArg::Trades => Topic::trades(symbol),
        TopicArg::Candles => Topic::candles(symbol, period, limit),
        TopicArg::Reports => Topic::Reports,
    })
}

/// Print notifications as JSON lines until shutdown or the stream ends
pub(crate) async fn stream(client: &XeggexClient, topic: Topic, shutdown: CancellationToken) -> Result<()> {
    let ws = client.connect_websocket().await.context("connect websocket")?;
    let mut subscription = ws.subscribe(topic).await.context("subscribe")?;
    info!(topic = %subscription.key(), "streaming");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown signal received");
                break;
            }
            item = subscription.next() => match item {
                Some(Ok(notification)) => {
                    let line = serde_json::json!({
                        "method": notification.method,
                        "params": notification.params,
                    });
                    println!("{line}");
                }
                Some(Err(err)) => {
                    warn!(error = %err, "stream ended with error");
                    return Err(err).context("stream");
                }
                None => break,
            },
        }
    }

    subscription.cancel().await;
    ws.close().await.context("close websocket")?;
    info!("websocket closed");
    Ok(())
}
