/*
[INPUT]:  Per-subscription channel fed by the connection driver
[OUTPUT]: Pull-based stream of notifications for one topic
[POS]:    WebSocket layer - consumer side of a subscription
[UPDATE]: When changing cancellation or delivery semantics
*/

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::http::Result;
use crate::ws::client::Command;
use crate::ws::message::{Notification, TopicKey};

/// Live subscription to one topic.
///
/// Yields notifications in arrival order. The sequence ends (`None`) after
/// `cancel`, after the connection is closed, or after a transport error item.
/// Dropping the handle unsubscribes as well.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    key: TopicKey,
    receiver: mpsc::UnboundedReceiver<Result<Notification>>,
    commands: mpsc::UnboundedSender<Command>,
    cancelled: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        key: TopicKey,
        receiver: mpsc::UnboundedReceiver<Result<Notification>>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            id,
            key,
            receiver,
            commands,
            cancelled: false,
        }
    }

    /// Request id of the subscribe frame
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &TopicKey {
        &self.key
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Next notification, or `None` once the subscription has ended
    pub async fn next(&mut self) -> Option<Result<Notification>> {
        if self.cancelled {
            return None;
        }
        self.receiver.recv().await
    }

    /// Stop delivery and unsubscribe.
    ///
    /// Returns once the unsubscribe frame has been handed to the socket (or the
    /// connection turned out to be gone). Never waits for the server.
    pub async fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.receiver.close();

        let (done, finished) = oneshot::channel();
        let command = Command::Unsubscribe {
            id: self.id,
            done: Some(done),
        };
        if self.commands.send(command).is_err() {
            debug!(topic = %self.key, "ws connection gone, nothing to unsubscribe");
            return;
        }
        let _ = finished.await;
    }
}

impl Stream for Subscription {
    type Item = Result<Notification>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancelled {
            return Poll::Ready(None);
        }
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.cancelled {
            let _ = self.commands.send(Command::Unsubscribe {
                id: self.id,
                done: None,
            });
        }
    }
}
