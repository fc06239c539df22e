/*
[INPUT]:  WebSocket test scenarios against a local mock server
[OUTPUT]: Test results for the subscription multiplexer and WS RPC
[POS]:    Integration tests - WebSocket
[UPDATE]: When WebSocket client changes
*/

mod common;

use std::time::Duration;

use common::{ACCESS_KEY, MockWsServer, SECRET_KEY, test_credentials};
use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde_json::json;
use tokio_test::assert_ok;
use xeggex_adapter::{
    ClientConfig, CreateOrderRequest, ErrorKind, HmacSigner, Side, Topic, TradeHistoryQuery,
    WsCancelOrderRequest, XeggexClient, XeggexError, XeggexWebSocket,
};

const QUIET: Duration = Duration::from_millis(200);

fn trades_update(symbol: &str, seq: u32) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "method": "updateTrades",
        "params": {"symbol": symbol, "data": [{"id": format!("t{seq}"), "price": "0.01", "quantity": "1"}]}
    })
}

#[tokio::test]
async fn test_three_trades_then_cancel() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let mut trades = assert_ok!(ws.subscribe_trades("XRG/USDT").await);
    let subscribe = server.ack("subscribeTrades").await;
    assert_eq!(subscribe["params"], json!({"symbol": "XRG/USDT"}));

    server.send(json!({
        "method": "snapshotTrades",
        "params": {"symbol": "XRG/USDT", "data": [{"id": "t0"}]}
    }));
    server.send(trades_update("XRG/USDT", 1));
    server.send(trades_update("XRG/USDT", 2));

    let mut methods = Vec::new();
    for _ in 0..3 {
        let notification = assert_ok!(trades.next().await.expect("notification"));
        methods.push(notification.method);
    }
    assert_eq!(methods, vec!["snapshotTrades", "updateTrades", "updateTrades"]);

    trades.cancel().await;
    server.send(trades_update("XRG/USDT", 3));
    assert!(trades.next().await.is_none());

    let unsubscribe = server.next_frame().await;
    assert_eq!(unsubscribe["method"], "unsubscribeTrades");
    assert_eq!(unsubscribe["params"], json!({"symbol": "XRG/USDT"}));
    server.reply(&unsubscribe["id"], json!(true));

    // a second cancel is a no-op
    trades.cancel().await;
    drop(trades);

    assert_ok!(ws.close().await);
    let rest = server.remaining_frames().await;
    assert!(
        rest.iter().all(|frame| frame["method"] != "unsubscribeTrades"),
        "extra unsubscribe frames: {rest:?}"
    );
}

#[tokio::test]
async fn test_connection_drop_ends_every_subscription() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let mut trades = assert_ok!(ws.subscribe_trades("XRG/USDT").await);
    server.ack("subscribeTrades").await;
    let mut ticker = assert_ok!(ws.subscribe_ticker("XRG/USDT").await);
    server.ack("subscribeTicker").await;

    server.drop_connection();

    for subscription in [&mut trades, &mut ticker] {
        let err = subscription
            .next()
            .await
            .expect("transport error item")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(subscription.next().await.is_none());
    }

    drop(trades);
    drop(ticker);
    assert!(server.remaining_frames().await.is_empty());

    let err = ws.subscribe_trades("LTC/USDT").await.unwrap_err();
    assert!(matches!(err, XeggexError::ConnectionClosed));
}

#[tokio::test]
async fn test_cancel_before_acknowledgement() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let mut ticker = assert_ok!(ws.subscribe_ticker("XRG/USDT").await);
    let subscribe = server.next_frame().await;
    assert_eq!(subscribe["method"], "subscribeTicker");

    tokio::time::timeout(Duration::from_secs(1), ticker.cancel())
        .await
        .expect("cancel must not wait for the server");
    assert!(assert_ok!(ws.active_topics().await).is_empty());

    let unsubscribe = server.next_frame().await;
    assert_eq!(unsubscribe["method"], "unsubscribeTicker");

    // late acknowledgement and data for the cancelled topic are dropped
    server.reply(&subscribe["id"], json!(true));
    server.send(json!({"method": "ticker", "params": {"symbol": "XRG/USDT", "lastPrice": "0.01"}}));
    assert!(ticker.next().await.is_none());

    // the connection stays usable
    let mut other = assert_ok!(ws.subscribe_ticker("LTC/USDT").await);
    server.ack("subscribeTicker").await;
    server.send(json!({"method": "ticker", "params": {"symbol": "LTC/USDT", "lastPrice": "0.02"}}));
    let notification = assert_ok!(other.next().await.expect("ticker"));
    assert_eq!(notification.params["lastPrice"], "0.02");
}

#[tokio::test]
async fn test_active_topics_track_subscribe_and_cancel() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let _trades = assert_ok!(ws.subscribe_trades("XRG/USDT").await);
    server.ack("subscribeTrades").await;
    let mut ticker = assert_ok!(ws.subscribe_ticker("XRG/USDT").await);
    server.ack("subscribeTicker").await;
    let _candles = assert_ok!(ws.subscribe_candles("XRG/USDT", 5, Some(10)).await);
    let candles_frame = server.ack("subscribeCandles").await;
    assert_eq!(
        candles_frame["params"],
        json!({"symbol": "XRG/USDT", "period": 5, "limit": 10})
    );

    ticker.cancel().await;

    let mut expected = vec![
        Topic::trades("XRG/USDT").key(),
        Topic::candles("XRG/USDT", 5, None).key(),
    ];
    expected.sort();
    assert_eq!(assert_ok!(ws.active_topics().await), expected);
}

#[tokio::test]
async fn test_notifications_routed_per_topic_in_order() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let mut xrg = assert_ok!(ws.subscribe_trades("XRG/USDT").await);
    server.ack("subscribeTrades").await;
    let mut ltc = assert_ok!(ws.subscribe_trades("LTC/USDT").await);
    server.ack("subscribeTrades").await;
    let mut candles_5 = assert_ok!(ws.subscribe_candles("XRG/USDT", 5, None).await);
    server.ack("subscribeCandles").await;
    let mut candles_15 = assert_ok!(ws.subscribe_candles("XRG/USDT", 15, None).await);
    server.ack("subscribeCandles").await;

    for seq in 0..3 {
        server.send(trades_update("XRG/USDT", seq));
        server.send(trades_update("LTC/USDT", seq));
        server.send(json!({
            "method": "updateCandles",
            "params": {"symbol": "XRG/USDT", "period": 15, "data": [{"seq": seq}]}
        }));
    }
    server.send(json!({
        "method": "updateCandles",
        "params": {"symbol": "XRG/USDT", "period": 5, "data": [{"seq": 99}]}
    }));
    // nobody listens to this one
    server.send(trades_update("DOGE/USDT", 0));

    for seq in 0..3 {
        let item = assert_ok!(xrg.next().await.expect("xrg"));
        assert_eq!(item.symbol(), Some("XRG/USDT"));
        assert_eq!(item.params["data"][0]["id"], format!("t{seq}"));

        let item = assert_ok!(ltc.next().await.expect("ltc"));
        assert_eq!(item.symbol(), Some("LTC/USDT"));
        assert_eq!(item.params["data"][0]["id"], format!("t{seq}"));

        let item = assert_ok!(candles_15.next().await.expect("candles 15"));
        assert_eq!(item.params["data"][0]["seq"], seq);
    }
    let item = assert_ok!(candles_5.next().await.expect("candles 5"));
    assert_eq!(item.params["data"][0]["seq"], 99);
}

#[tokio::test]
async fn test_subscription_is_a_stream() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let orderbook = assert_ok!(ws.subscribe_orderbook("XRG/USDT", Some(20)).await);
    let frame = server.ack("subscribeOrderbook").await;
    assert_eq!(frame["params"], json!({"symbol": "XRG/USDT", "limit": 20}));

    server.send(json!({
        "method": "snapshotOrderbook",
        "params": {"symbol": "XRG/USDT", "bids": [], "asks": []}
    }));
    server.send(json!({
        "method": "updateOrderbook",
        "params": {"symbol": "XRG/USDT", "bids": [{"price": "0.01", "quantity": "5"}], "asks": []}
    }));

    let items: Vec<_> = orderbook.take(2).collect().await;
    assert!(items[0].as_ref().unwrap().is_snapshot());
    assert!(!items[1].as_ref().unwrap().is_snapshot());

    // dropping the stream unsubscribes
    let unsubscribe = server.next_frame().await;
    assert_eq!(unsubscribe["method"], "unsubscribeOrderbook");
    assert_eq!(unsubscribe["params"], json!({"symbol": "XRG/USDT"}));
}

#[tokio::test]
async fn test_duplicate_subscription_rejected() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let _first = assert_ok!(ws.subscribe_trades("XRG/USDT").await);
    server.ack("subscribeTrades").await;

    let err = ws.subscribe_trades("xrg/usdt").await.unwrap_err();
    assert!(matches!(err, XeggexError::AlreadySubscribed(_)));
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(server.try_next_frame(QUIET).await.is_none());
}

#[tokio::test]
async fn test_subscribe_error_reply_ends_subscription() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let mut trades = assert_ok!(ws.subscribe_trades("XRG/NOPE").await);
    let frame = server.next_frame().await;
    server.reply_error(&frame["id"], 2001, "Symbol not found");

    let err = trades.next().await.expect("error item").unwrap_err();
    assert!(matches!(err, XeggexError::Api { code: 2001, .. }));
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(trades.next().await.is_none());
    assert!(assert_ok!(ws.active_topics().await).is_empty());
}

#[tokio::test]
async fn test_reports_require_credentials() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let err = ws.subscribe_reports().await.unwrap_err();
    assert!(matches!(err, XeggexError::Unauthenticated));
    let err = ws.get_trading_balance().await.unwrap_err();
    assert!(matches!(err, XeggexError::Unauthenticated));
    assert!(server.try_next_frame(QUIET).await.is_none());
}

#[tokio::test]
async fn test_reports_log_in_first() {
    let mut server = MockWsServer::start().await;
    let credentials = test_credentials();
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, Some(&credentials)).await);

    let (reports, login) = tokio::join!(ws.subscribe_reports(), async {
        let login = server.ack("login").await;
        server.ack("subscribeReports").await;
        login
    });
    let mut reports = assert_ok!(reports);

    let params = &login["params"];
    assert_eq!(params["algo"], "HS256");
    assert_eq!(params["pKey"], ACCESS_KEY);
    let nonce = params["nonce"].as_str().expect("nonce");
    assert_eq!(nonce.len(), 20);
    let expected = HmacSigner::new(SECRET_KEY).unwrap().sign_hex(nonce);
    assert_eq!(params["signature"], expected);

    server.send(json!({"method": "activeOrders", "params": [{"id": "o1"}]}));
    server.send(json!({"method": "report", "params": {"id": "o1", "status": "Filled"}}));
    let snapshot = assert_ok!(reports.next().await.expect("active orders"));
    assert!(snapshot.is_snapshot());
    let report = assert_ok!(reports.next().await.expect("report"));
    assert_eq!(report.params["status"], "Filled");

    // already logged in: the next private call goes straight out
    let (balance, _) = tokio::join!(ws.get_trading_balance(), async {
        let frame = server.next_frame().await;
        assert_eq!(frame["method"], "getTradingBalance");
        server.reply(&frame["id"], json!([{"asset": "XRG", "available": "1"}]));
    });
    assert_eq!(assert_ok!(balance)[0]["asset"], "XRG");
}

#[tokio::test]
async fn test_failed_login_fails_private_subscription() {
    let mut server = MockWsServer::start().await;
    let credentials = test_credentials();
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, Some(&credentials)).await);

    let (reports, _) = tokio::join!(ws.subscribe_reports(), async {
        let frame = server.next_frame().await;
        assert_eq!(frame["method"], "login");
        server.reply_error(&frame["id"], 10, "Authorization failed");
    });

    let err = reports.unwrap_err();
    assert!(matches!(err, XeggexError::Api { code: 10, .. }));
    assert!(server.try_next_frame(QUIET).await.is_none());

    // a failed login is not remembered
    let (balance, _) = tokio::join!(ws.get_trading_balance(), async {
        server.ack("login").await;
        let frame = server.next_frame().await;
        assert_eq!(frame["method"], "getTradingBalance");
        server.reply(&frame["id"], json!([]));
    });
    assert_ok!(balance);
}

#[tokio::test]
async fn test_concurrent_private_calls_share_one_login() {
    let mut server = MockWsServer::start().await;
    let credentials = test_credentials();
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, Some(&credentials)).await);

    let (balance, orders, _) = tokio::join!(
        ws.get_trading_balance(),
        ws.get_active_orders(None),
        async {
            server.ack("login").await;
            let mut methods = Vec::new();
            for _ in 0..2 {
                let frame = server.next_frame().await;
                methods.push(frame["method"].as_str().unwrap_or_default().to_string());
                server.reply(&frame["id"], json!([]));
            }
            methods.sort();
            assert_eq!(methods, vec!["getOrders", "getTradingBalance"]);
        }
    );

    assert_ok!(balance);
    assert_ok!(orders);
    assert!(server.try_next_frame(QUIET).await.is_none());
}

#[tokio::test]
async fn test_public_rpc_round_trip() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let (market, _) = tokio::join!(ws.get_market("XRG/USDT"), async {
        let frame = server.next_frame().await;
        assert_eq!(frame["method"], "getMarket");
        assert_eq!(frame["params"], json!({"symbol": "XRG/USDT"}));
        server.reply(&frame["id"], json!({"id": "m1", "symbol": "XRG/USDT"}));
    });
    assert_eq!(assert_ok!(market)["id"], "m1");

    let (missing, _) = tokio::join!(ws.get_asset("NOPE"), async {
        let frame = server.next_frame().await;
        assert_eq!(frame["params"], json!({"ticker": "NOPE"}));
        server.reply_error(&frame["id"], 404, "Asset not found");
    });
    assert!(matches!(missing.unwrap_err(), XeggexError::Api { code: 404, .. }));
}

#[tokio::test]
async fn test_rpc_arguments_validated_before_sending() {
    let mut server = MockWsServer::start().await;
    let credentials = test_credentials();
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, Some(&credentials)).await);

    let mut no_price = CreateOrderRequest::market("XRG/USDT", Side::Buy, Decimal::ONE);
    no_price.order_type = None;
    let err = ws.create_order(&no_price).await.unwrap_err();
    assert!(matches!(err, XeggexError::InvalidRequest(_)));

    let ambiguous = WsCancelOrderRequest {
        order_id: Some("o1".to_string()),
        user_provided_id: Some("mine".to_string()),
    };
    assert!(matches!(
        ws.cancel_order(&ambiguous).await.unwrap_err(),
        XeggexError::InvalidRequest(_)
    ));

    let mut half_range = TradeHistoryQuery::new("XRG/USDT");
    half_range.from = Some(chrono::Utc::now());
    assert!(matches!(
        ws.get_trade_history(&half_range).await.unwrap_err(),
        XeggexError::InvalidRequest(_)
    ));

    assert!(server.try_next_frame(QUIET).await.is_none());
}

#[tokio::test]
async fn test_close_unsubscribes_live_topics() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let mut trades = assert_ok!(ws.subscribe_trades("XRG/USDT").await);
    server.ack("subscribeTrades").await;
    let mut candles = assert_ok!(ws.subscribe_candles("XRG/USDT", 60, None).await);
    server.ack("subscribeCandles").await;

    assert_ok!(ws.close().await);

    assert!(trades.next().await.is_none());
    assert!(candles.next().await.is_none());

    let frames = server.remaining_frames().await;
    let methods: Vec<_> = frames.iter().map(|frame| frame["method"].clone()).collect();
    assert_eq!(methods, vec![json!("unsubscribeTrades"), json!("unsubscribeCandles")]);
    assert_eq!(frames[1]["params"], json!({"symbol": "XRG/USDT", "period": 60}));
}

#[tokio::test]
async fn test_close_with_unread_market_data_still_unsubscribes() {
    let mut server = MockWsServer::start().await;
    let ws = assert_ok!(XeggexWebSocket::connect(&server.url, None).await);

    let _trades = assert_ok!(ws.subscribe_trades("XRG/USDT").await);
    server.ack("subscribeTrades").await;
    let _ticker = assert_ok!(ws.subscribe_ticker("LTC/USDT").await);
    server.ack("subscribeTicker").await;
    for seq in 0..50 {
        server.send(trades_update("XRG/USDT", seq));
    }

    assert_ok!(ws.close().await);

    let methods: Vec<_> = server
        .remaining_frames()
        .await
        .iter()
        .map(|frame| frame["method"].clone())
        .collect();
    assert_eq!(methods, vec![json!("unsubscribeTrades"), json!("unsubscribeTicker")]);
}

#[tokio::test]
async fn test_client_opens_websocket_from_config() {
    let mut server = MockWsServer::start().await;
    let config = ClientConfig {
        ws_url: server.url.clone(),
        ..ClientConfig::default()
    };
    let client = assert_ok!(XeggexClient::with_config(config, None));
    let ws = assert_ok!(client.connect_websocket().await);
    assert!(!ws.is_authenticated());

    let (markets, _) = tokio::join!(ws.get_markets(), async {
        let frame = server.next_frame().await;
        assert_eq!(frame["method"], "getMarkets");
        server.reply(&frame["id"], json!([]));
    });
    assert_eq!(assert_ok!(markets), json!([]));

    drop(ws);
    let frames = server.remaining_frames().await;
    assert!(frames.is_empty());
}
