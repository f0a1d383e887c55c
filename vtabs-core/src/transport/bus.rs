//! Runtime broadcast bus.
//!
//! Any context may publish to the background process, and the background
//! process may send to every live listener at once. A send resolves to the
//! first reply any listener gives.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{Envelope, PeerReceiver, PendingReply, Transport};
use crate::protocol::Message;

const BUS_NAME: &str = "runtime";

type ListenerTable = Arc<Mutex<Vec<mpsc::UnboundedSender<Envelope>>>>;

/// The bus itself. Hands out listeners, publishers and the broker's sender.
///
/// The runtime listener returned by [`BroadcastBus::new`] closes once every
/// clone of the bus and every [`BusPublisher`] has been dropped. A
/// [`BusSender`] does not keep it open.
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    listeners: ListenerTable,
    inbound: mpsc::UnboundedSender<Message>,
}

/// Sending half used by the background process. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BusSender {
    listeners: ListenerTable,
}

/// A context receiving messages from the background process.
#[derive(Debug)]
pub struct BusListener {
    incoming: mpsc::UnboundedReceiver<Envelope>,
}

/// A context's handle for posting to the background process.
#[derive(Debug, Clone)]
pub struct BusPublisher {
    outbound: mpsc::UnboundedSender<Message>,
}

impl BroadcastBus {
    /// Create the bus and the background process's runtime listener.
    pub fn new() -> (Self, PeerReceiver) {
        let (inbound, listener) = mpsc::unbounded_channel();
        (
            Self {
                listeners: Arc::new(Mutex::new(Vec::new())),
                inbound,
            },
            listener,
        )
    }

    /// Register a new listening context.
    pub fn subscribe(&self) -> BusListener {
        let (tx, incoming) = mpsc::unbounded_channel();
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        BusListener { incoming }
    }

    pub fn publisher(&self) -> BusPublisher {
        BusPublisher {
            outbound: self.inbound.clone(),
        }
    }

    pub fn sender(&self) -> BusSender {
        BusSender {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl Transport for BusSender {
    fn name(&self) -> &str {
        BUS_NAME
    }

    fn send(&self, message: Message) -> anyhow::Result<PendingReply> {
        let mut listeners = self
            .listeners
            .lock()
            .map_err(|_| anyhow::anyhow!("Bus listener table poisoned"))?;

        let mut waiting = Vec::with_capacity(listeners.len());
        listeners.retain(|listener| {
            let (envelope, reply) = Envelope::new(message.clone());
            if listener.send(envelope).is_ok() {
                waiting.push(reply);
                true
            } else {
                false
            }
        });

        if waiting.is_empty() {
            anyhow::bail!("Could not establish connection. Receiving end does not exist.");
        }

        Ok(PendingReply::from_receivers(waiting))
    }
}

impl BusListener {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.incoming.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.incoming.try_recv().ok()
    }
}

impl BusPublisher {
    /// Post a message to the background process.
    pub fn post(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_without_listeners_fails() {
        let (bus, _rx) = BroadcastBus::new();
        assert!(bus.sender().send(Message::Reset).is_err());
    }

    #[test]
    fn test_send_reaches_every_listener() {
        let (bus, _rx) = BroadcastBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.sender().send(Message::ToggleDisplayHotkey).unwrap();

        assert_eq!(a.try_recv().unwrap().message, Message::ToggleDisplayHotkey);
        assert_eq!(b.try_recv().unwrap().message, Message::ToggleDisplayHotkey);
    }

    #[test]
    fn test_send_skips_dropped_listeners() {
        let (bus, _rx) = BroadcastBus::new();
        let sender = bus.sender();
        drop(bus.subscribe());
        assert!(sender.send(Message::Reset).is_err());

        let mut kept = bus.subscribe();
        let pending = sender.send(Message::Reset).unwrap();
        assert!(!pending.is_empty());
        assert_eq!(kept.try_recv().unwrap().message, Message::Reset);
    }

    #[tokio::test]
    async fn test_first_reply_wins() {
        let (bus, _rx) = BroadcastBus::new();
        let mut silent = bus.subscribe();
        let mut answering = bus.subscribe();

        let pending = bus.sender().send(Message::Reset).unwrap();

        drop(silent.try_recv().unwrap());
        answering
            .try_recv()
            .unwrap()
            .reply(Message::post("compact", json!(true)));

        assert_eq!(pending.first().await, Some(Message::post("compact", json!(true))));
    }

    #[tokio::test]
    async fn test_publisher_reaches_runtime_listener() {
        let (bus, mut rx) = BroadcastBus::new();
        let publisher = bus.publisher();

        assert!(publisher.post(Message::DebugLog { value: json!("hi") }));
        assert_eq!(rx.recv().await, Some(Message::DebugLog { value: json!("hi") }));
    }

    #[tokio::test]
    async fn test_runtime_listener_closes_without_bus_or_publishers() {
        let (bus, mut rx) = BroadcastBus::new();
        let publisher = bus.publisher();
        let sender = bus.sender();
        drop(bus);

        assert!(publisher.post(Message::Reset));
        drop(publisher);

        assert_eq!(rx.recv().await, Some(Message::Reset));
        assert_eq!(rx.recv().await, None);
        drop(sender);
    }
}
