//! Message transports between the background process and its peers.
//!
//! - [`LegacyPort`]: the single persistent duplex connection to the legacy
//!   component.
//! - [`BroadcastBus`]: the runtime message bus reaching every content script
//!   and extension page.
//!
//! Delivery is synchronous and ordered per transport; only waiting for a
//! reply is asynchronous. A peer that never answers simply never resolves
//! its [`PendingReply`].

mod bus;
mod port;

pub use bus::{BroadcastBus, BusListener, BusPublisher, BusSender};
pub use port::{LegacyPort, PortPeer};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::protocol::Message;

/// Receiver of peer-originated messages, consumed by the broker.
pub type PeerReceiver = mpsc::UnboundedReceiver<Message>;

/// A message as seen by a receiving peer, with an optional reply slot.
#[derive(Debug)]
pub struct Envelope {
    pub message: Message,
    reply: Option<oneshot::Sender<Message>>,
}

impl Envelope {
    pub(crate) fn new(message: Message) -> (Self, oneshot::Receiver<Message>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                message,
                reply: Some(tx),
            },
            rx,
        )
    }

    /// Answer the sender. Returns `false` if the sender stopped waiting.
    ///
    /// Dropping an envelope without replying means "no reply".
    pub fn reply(mut self, message: Message) -> bool {
        match self.reply.take() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }
}

/// Outstanding replies for one sent message.
#[derive(Debug, Default)]
pub struct PendingReply {
    waiting: Vec<oneshot::Receiver<Message>>,
}

impl PendingReply {
    pub(crate) fn from_receivers(waiting: Vec<oneshot::Receiver<Message>>) -> Self {
        Self { waiting }
    }

    /// Nobody can reply.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Resolve to the first reply any receiver sends.
    ///
    /// Resolves to `None` once every receiver has dropped its envelope
    /// without replying. Never resolves while a receiver holds on to an
    /// unanswered envelope.
    pub async fn first(self) -> Option<Message> {
        let mut waiting: FuturesUnordered<_> = self.waiting.into_iter().collect();
        while let Some(result) = waiting.next().await {
            if let Ok(message) = result {
                return Some(message);
            }
        }
        None
    }
}

/// An outbound channel to one or more peers.
pub trait Transport: Send + Sync {
    /// Channel name for diagnostics.
    fn name(&self) -> &str;

    /// Deliver `message` now. Fails if nobody can receive it.
    fn send(&self, message: Message) -> anyhow::Result<PendingReply>;
}
