/*
[INPUT]:  WebSocket URL, optional API credentials, topic selections and RPC calls
[OUTPUT]: Per-topic notification streams and RPC replies over one connection
[POS]:    WebSocket layer - connection driver and subscription multiplexer
[UPDATE]: When adding new RPC methods or changing connection logic
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value, json};
use tokio::net::TcpStream;
use tokio::sync::{OnceCell, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::http::{RequestSigner, Result, XeggexClient, XeggexError};
use crate::types::{CreateOrderRequest, RpcError, TradeHistoryQuery, WsCancelOrderRequest};
use crate::ws::message::{
    InboundFrame, Notification, SubscriptionState, Topic, TopicKey, encode_request,
};
use crate::ws::subscription::Subscription;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;
type NotificationSink = mpsc::UnboundedSender<Result<Notification>>;

const MESSAGE_SAMPLE_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

static MESSAGE_SAMPLE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Instructions from handles to the connection driver
#[derive(Debug)]
pub(crate) enum Command {
    Request {
        method: String,
        params: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    Subscribe {
        topic: Topic,
        sink: NotificationSink,
        reply: oneshot::Sender<Result<u64>>,
    },
    Unsubscribe {
        id: u64,
        done: Option<oneshot::Sender<()>>,
    },
    Topics {
        reply: oneshot::Sender<Vec<(TopicKey, SubscriptionState)>>,
    },
    Close {
        done: Option<oneshot::Sender<()>>,
    },
}

/// One WebSocket connection multiplexing RPC calls and topic subscriptions.
///
/// A single driver task owns the socket. Dropping the handle behaves like
/// [`XeggexWebSocket::close`] without waiting for it.
#[derive(Debug)]
pub struct XeggexWebSocket {
    commands: mpsc::UnboundedSender<Command>,
    signer: Option<RequestSigner>,
    login_once: OnceCell<()>,
    driver: Option<JoinHandle<()>>,
}

impl XeggexWebSocket {
    /// Open a connection; credentials are only needed for private topics and RPCs
    pub async fn connect(url: &str, credentials: Option<&Credentials>) -> Result<Self> {
        let signer = credentials.map(RequestSigner::new).transpose()?;
        let (stream, _response) = connect_async(url).await?;
        info!(url, "ws connected");

        let (commands, receiver) = mpsc::unbounded_channel();
        let driver = tokio::spawn(Driver::default().run(stream, receiver));

        Ok(Self {
            commands,
            signer,
            login_once: OnceCell::new(),
            driver: Some(driver),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    /// Send one request frame and wait for the reply with the same id
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (reply, response) = oneshot::channel();
        self.send_command(Command::Request {
            method: method.to_string(),
            params,
            reply,
        })?;
        response.await.map_err(|_| XeggexError::ConnectionClosed)?
    }

    /// Authenticate the connection.
    ///
    /// Runs at most once per connection; concurrent callers share one login
    /// exchange and a failed login is retried by the next caller.
    pub async fn login(&self) -> Result<()> {
        let signer = self.signer.as_ref().ok_or(XeggexError::Unauthenticated)?;
        self.login_once
            .get_or_try_init(|| async {
                let result = self.request("login", signer.login_params()).await?;
                if result == Value::Bool(false) {
                    return Err(XeggexError::Api {
                        code: 0,
                        message: "login rejected".to_string(),
                    });
                }
                info!(access_key = signer.access_key(), "ws logged in");
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Subscribe to a topic; private topics log in first
    pub async fn subscribe(&self, topic: Topic) -> Result<Subscription> {
        if topic.kind().is_private() {
            self.login().await?;
        }

        let key = topic.key();
        let (sink, receiver) = mpsc::unbounded_channel();
        let (reply, response) = oneshot::channel();
        self.send_command(Command::Subscribe { topic, sink, reply })?;
        let id = response.await.map_err(|_| XeggexError::ConnectionClosed)??;

        Ok(Subscription::new(id, key, receiver, self.commands.clone()))
    }

    pub async fn subscribe_ticker(&self, symbol: &str) -> Result<Subscription> {
        self.subscribe(Topic::ticker(symbol)).await
    }

    /// `limit`: levels per side, exchange default 100
    pub async fn subscribe_orderbook(&self, symbol: &str, limit: Option<u32>) -> Result<Subscription> {
        self.subscribe(Topic::orderbook(symbol, limit)).await
    }

    pub async fn subscribe_trades(&self, symbol: &str) -> Result<Subscription> {
        self.subscribe(Topic::trades(symbol)).await
    }

    pub async fn subscribe_candles(
        &self,
        symbol: &str,
        period: u32,
        limit: Option<u32>,
    ) -> Result<Subscription> {
        self.subscribe(Topic::candles(symbol, period, limit)).await
    }

    /// Own order reports (private)
    pub async fn subscribe_reports(&self) -> Result<Subscription> {
        self.subscribe(Topic::Reports).await
    }

    /// Every subscription still known to the driver with its state
    pub async fn subscriptions(&self) -> Result<Vec<(TopicKey, SubscriptionState)>> {
        let (reply, response) = oneshot::channel();
        self.send_command(Command::Topics { reply })?;
        response.await.map_err(|_| XeggexError::ConnectionClosed)
    }

    /// Routing keys of subscriptions that are requested or active, sorted
    pub async fn active_topics(&self) -> Result<Vec<TopicKey>> {
        let subscriptions = self.subscriptions().await?;
        Ok(subscriptions
            .into_iter()
            .filter(|(_, state)| state.is_live())
            .map(|(key, _)| key)
            .collect())
    }

    /// Unsubscribe everything, send a close frame and stop the driver
    pub async fn close(mut self) -> Result<()> {
        let (done, finished) = oneshot::channel();
        if self.commands.send(Command::Close { done: Some(done) }).is_ok() {
            let _ = finished.await;
        }
        if let Some(driver) = self.driver.take() {
            let _ = driver.await;
        }
        Ok(())
    }

    fn send_command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| XeggexError::ConnectionClosed)
    }

    // Public RPC

    pub async fn get_assets(&self) -> Result<Value> {
        self.request("getAssets", json!({})).await
    }

    pub async fn get_asset(&self, ticker: &str) -> Result<Value> {
        self.request("getAsset", json!({ "ticker": ticker })).await
    }

    pub async fn get_markets(&self) -> Result<Value> {
        self.request("getMarkets", json!({})).await
    }

    pub async fn get_market(&self, symbol: &str) -> Result<Value> {
        self.request("getMarket", json!({ "symbol": symbol })).await
    }

    /// Market trade history; `from` and `till` must be given together
    pub async fn get_trade_history(&self, query: &TradeHistoryQuery) -> Result<Value> {
        query.validate()?;
        self.request("getTrades", serde_json::to_value(query)?).await
    }

    // Private RPC

    pub async fn create_order(&self, req: &CreateOrderRequest) -> Result<Value> {
        req.validate()?;
        self.login().await?;
        self.request("newOrder", serde_json::to_value(req)?).await
    }

    pub async fn cancel_order(&self, req: &WsCancelOrderRequest) -> Result<Value> {
        req.validate()?;
        self.login().await?;
        self.request("cancelOrder", serde_json::to_value(req)?).await
    }

    pub async fn get_active_orders(&self, symbol: Option<&str>) -> Result<Value> {
        self.login().await?;
        let mut params = Map::new();
        if let Some(symbol) = symbol {
            params.insert("symbol".to_string(), json!(symbol));
        }
        self.request("getOrders", Value::Object(params)).await
    }

    pub async fn get_trading_balance(&self) -> Result<Value> {
        self.login().await?;
        self.request("getTradingBalance", json!({})).await
    }
}

impl Drop for XeggexWebSocket {
    fn drop(&mut self) {
        if self.driver.is_some() {
            let _ = self.commands.send(Command::Close { done: None });
        }
    }
}

impl XeggexClient {
    /// Open a WebSocket connection using this client's URL and credentials
    pub async fn connect_websocket(&self) -> Result<XeggexWebSocket> {
        XeggexWebSocket::connect(self.ws_url(), self.credentials()).await
    }
}

enum Pending {
    Request(oneshot::Sender<Result<Value>>),
    Subscribe,
    Unsubscribe(TopicKey),
}

struct Entry {
    topic: Topic,
    key: TopicKey,
    state: SubscriptionState,
    sink: NotificationSink,
}

/// Socket owner; the only mutator of the subscription table
#[derive(Default)]
struct Driver {
    next_id: u64,
    pending: HashMap<u64, Pending>,
    routes: HashMap<TopicKey, u64>,
    subscriptions: HashMap<u64, Entry>,
}

impl Driver {
    async fn run(mut self, stream: WsStream, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Close { done }) => {
                            self.shutdown(&mut write, &mut read).await;
                            if let Some(done) = done {
                                let _ = done.send(());
                            }
                            break;
                        }
                        Some(command) => self.handle_command(command, &mut write).await,
                        None => {
                            self.shutdown(&mut write, &mut read).await;
                            break;
                        }
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => self.handle_text(text.as_str()),
                        Some(Ok(WsMessage::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => self.handle_text(text),
                            Err(err) => warn!(error = %err, bytes = bytes.len(), "ws binary frame is not utf-8"),
                        },
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(frame = ?frame, "ws closed by server");
                            self.fail_all();
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(error = %err, "ws connection failed");
                            self.fail_all();
                            break;
                        }
                        None => {
                            info!("ws stream ended");
                            self.fail_all();
                            break;
                        }
                    }
                }
            }
        }

        debug!("ws driver stopped");
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    async fn handle_command(&mut self, command: Command, write: &mut WsWriter) {
        match command {
            Command::Request {
                method,
                params,
                reply,
            } => {
                let id = self.next_id();
                let frame = encode_request(&method, params, id);
                match write.send(WsMessage::Text(frame.into())).await {
                    Ok(()) => {
                        debug!(method = %method, id, "ws request sent");
                        self.pending.insert(id, Pending::Request(reply));
                    }
                    Err(err) => {
                        let _ = reply.send(Err(err.into()));
                    }
                }
            }
            Command::Subscribe { topic, sink, reply } => {
                let result = self.subscribe(topic, sink, write).await;
                let _ = reply.send(result);
            }
            Command::Unsubscribe { id, done } => {
                self.unsubscribe(id, write).await;
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Command::Topics { reply } => {
                let mut topics: Vec<_> = self
                    .subscriptions
                    .values()
                    .map(|entry| (entry.key.clone(), entry.state))
                    .collect();
                topics.sort_by(|a, b| a.0.cmp(&b.0));
                let _ = reply.send(topics);
            }
            // handled by the run loop
            Command::Close { .. } => {}
        }
    }

    async fn subscribe(
        &mut self,
        topic: Topic,
        sink: NotificationSink,
        write: &mut WsWriter,
    ) -> Result<u64> {
        let key = topic.key();
        if self.routes.contains_key(&key) {
            return Err(XeggexError::AlreadySubscribed(key.to_string()));
        }

        let id = self.next_id();
        let method = topic.kind().subscribe_method();
        let frame = encode_request(method, topic.subscribe_params(), id);
        write.send(WsMessage::Text(frame.into())).await?;
        info!(action = "subscribe", method, topic = %key, id, "ws subscription sent");

        self.pending.insert(id, Pending::Subscribe);
        self.routes.insert(key.clone(), id);
        self.subscriptions.insert(
            id,
            Entry {
                topic,
                key,
                state: SubscriptionState::Requested,
                sink,
            },
        );
        Ok(id)
    }

    /// Remove a subscription and send its unsubscribe frame best-effort
    async fn unsubscribe(&mut self, id: u64, write: &mut WsWriter) {
        let Some(mut entry) = self.subscriptions.remove(&id) else {
            return;
        };
        self.routes.remove(&entry.key);
        entry.state = SubscriptionState::Cancelling;
        self.send_unsubscribe(&entry, write).await;
        entry.state = SubscriptionState::Closed;
        debug!(topic = %entry.key, state = ?entry.state, "ws subscription removed");
    }

    async fn send_unsubscribe(&mut self, entry: &Entry, write: &mut WsWriter) {
        let request_id = self.next_id();
        let method = entry.topic.kind().unsubscribe_method();
        let frame = encode_request(method, entry.topic.unsubscribe_params(), request_id);
        match write.send(WsMessage::Text(frame.into())).await {
            Ok(()) => {
                info!(action = "unsubscribe", method, topic = %entry.key, id = request_id, "ws subscription sent");
                self.pending
                    .insert(request_id, Pending::Unsubscribe(entry.key.clone()));
            }
            Err(err) => {
                warn!(topic = %entry.key, error = %err, "ws unsubscribe send failed");
            }
        }
    }

    /// Orderly teardown: unsubscribe live topics, then finish the close handshake
    async fn shutdown(&mut self, write: &mut WsWriter, read: &mut WsReader) {
        let mut ids: Vec<u64> = self.subscriptions.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            self.unsubscribe(id, write).await;
        }
        self.pending.clear();

        if let Err(err) = write.send(WsMessage::Close(None)).await {
            debug!(error = %err, "ws close frame not sent");
        } else {
            // read until the peer's close reply; releasing a socket with unread data resets it
            let drained = tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
                while let Some(incoming) = read.next().await {
                    match incoming {
                        Ok(WsMessage::Close(frame)) => {
                            debug!(frame = ?frame, "ws close acknowledged");
                            break;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            debug!(error = %err, "ws read failed during close");
                            break;
                        }
                    }
                }
            })
            .await;
            if drained.is_err() {
                warn!("ws close handshake timed out");
            }
        }
        info!("ws connection closed");
    }

    /// Connection lost: every consumer gets one transport error, nothing is sent
    fn fail_all(&mut self) {
        for (_, entry) in self.subscriptions.drain() {
            let _ = entry.sink.send(Err(XeggexError::ConnectionClosed));
        }
        self.routes.clear();
        for (_, pending) in self.pending.drain() {
            if let Pending::Request(reply) = pending {
                let _ = reply.send(Err(XeggexError::ConnectionClosed));
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        match InboundFrame::parse(text) {
            Ok(InboundFrame::Reply { id, outcome }) => self.handle_reply(id, outcome),
            Ok(InboundFrame::Notification(notification)) => self.route(notification),
            Ok(InboundFrame::Other(_)) => {
                debug!(message = %truncate_for_log(text, RAW_LOG_MAX_BYTES), "ws frame ignored");
            }
            Err(err) => {
                warn!(
                    error = %err,
                    bytes = text.len(),
                    message = %truncate_for_log(text, RAW_LOG_MAX_BYTES),
                    "ws message parse failed"
                );
            }
        }
    }

    fn handle_reply(&mut self, id: u64, outcome: std::result::Result<Value, RpcError>) {
        match self.pending.remove(&id) {
            Some(Pending::Request(reply)) => {
                let _ = reply.send(outcome.map_err(XeggexError::from));
            }
            Some(Pending::Subscribe) => self.handle_subscribe_ack(id, outcome),
            Some(Pending::Unsubscribe(key)) => match outcome {
                Ok(_) => debug!(topic = %key, id, "ws unsubscribe acknowledged"),
                Err(err) => warn!(topic = %key, id, error = %err.display_message(), "ws unsubscribe rejected"),
            },
            None => warn!(id, "ws reply for unknown request"),
        }
    }

    fn handle_subscribe_ack(&mut self, id: u64, outcome: std::result::Result<Value, RpcError>) {
        match outcome {
            Ok(_) => match self.subscriptions.get_mut(&id) {
                Some(entry) => {
                    entry.state = SubscriptionState::Active;
                    debug!(topic = %entry.key, id, "ws subscription active");
                }
                None => debug!(id, "ws ack for cancelled subscription"),
            },
            Err(err) => {
                let Some(entry) = self.subscriptions.remove(&id) else {
                    return;
                };
                self.routes.remove(&entry.key);
                warn!(topic = %entry.key, id, error = %err.display_message(), "ws subscription rejected");
                let _ = entry.sink.send(Err(err.into()));
            }
        }
    }

    fn route(&mut self, notification: Notification) {
        let Some(key) = TopicKey::from_notification(&notification.method, &notification.params)
        else {
            warn!(method = %notification.method, "ws notification with unknown method");
            return;
        };
        let Some(entry) = self
            .routes
            .get(&key)
            .and_then(|id| self.subscriptions.get(id))
        else {
            warn!(method = %notification.method, topic = %key, "ws notification without subscriber");
            return;
        };

        log_message_sample_once(&notification, &key);
        if entry.sink.send(Ok(notification)).is_err() {
            debug!(topic = %key, "ws subscriber gone");
        }
    }
}

fn log_message_sample_once(notification: &Notification, key: &TopicKey) {
    let count = MESSAGE_SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MESSAGE_SAMPLE_LIMIT {
        return;
    }
    info!(
        sample_index = count + 1,
        sample_limit = MESSAGE_SAMPLE_LIMIT,
        method = %notification.method,
        topic = %key,
        "ws message sample"
    );
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}
