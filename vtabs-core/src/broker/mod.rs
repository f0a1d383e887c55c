//! Sync broker.
//!
//! Mediates setting propagation between the [`SettingsStore`] and the two
//! peer channels: the persistent legacy port and the runtime broadcast bus.
//! Every inbound message, whatever its origin, goes through
//! [`SyncBroker::dispatch_incoming`]. Replies to messages the broker sends are
//! queued as new inbound messages, tagged with a hop count so reply chains
//! stay bounded.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::{BridgeConfig, SettingName};
use crate::protocol::Message;
use crate::store::{SettingsStore, StorageChange};
use crate::transport::{PeerReceiver, Transport};

// =============================================================================
// Inbound Queue
// =============================================================================

/// Where an inbound message came from. Used for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Posted by the legacy component on its port.
    Legacy,
    /// Posted by a context on the broadcast bus.
    Broadcast,
    /// Reply to a message the broker sent on the named channel.
    Reply(String),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Broadcast => write!(f, "broadcast"),
            Self::Reply(channel) => write!(f, "reply:{channel}"),
        }
    }
}

#[derive(Debug)]
struct Queued {
    message: Message,
    origin: Origin,
    hops: u8,
}

/// Peer-originated message streams: the port listener and the runtime
/// listener.
#[derive(Debug)]
pub struct PeerInbound {
    pub legacy: PeerReceiver,
    pub broadcast: PeerReceiver,
}

/// Which channel a relay goes out on.
#[derive(Debug, Clone, Copy)]
enum Channel {
    Legacy,
    Broadcast,
}

// =============================================================================
// Broker
// =============================================================================

/// Coordinates settings between the store and both peer channels.
///
/// Owns no persistent state. The legacy port is injected at construction and
/// lives as long as the broker; it is never reopened.
pub struct SyncBroker {
    store: SettingsStore,
    legacy: Arc<dyn Transport>,
    bus: Arc<dyn Transport>,
    queue_tx: mpsc::UnboundedSender<Queued>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<Queued>>>,
    startup_delay: Duration,
    max_reply_hops: u8,
}

impl std::fmt::Debug for SyncBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBroker")
            .field("legacy", &self.legacy.name())
            .field("bus", &self.bus.name())
            .field("startup_delay", &self.startup_delay)
            .field("max_reply_hops", &self.max_reply_hops)
            .finish()
    }
}

impl SyncBroker {
    pub fn new(
        store: SettingsStore,
        legacy: Arc<dyn Transport>,
        bus: Arc<dyn Transport>,
        config: &BridgeConfig,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            store,
            legacy,
            bus,
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
            startup_delay: config.startup_delay(),
            max_reply_hops: config.max_reply_hops,
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Send the whole stored mapping over the bus as `settings.post-all`.
    pub async fn broadcast_all_settings(&self) {
        self.broadcast_all(0).await;
    }

    /// Tell every peer that `name` changed.
    ///
    /// Always rebroadcasts the full mapping, sends `settings.toggleDisplayHotkey`
    /// if the hotkey changed, then re-reads the value and posts it on both
    /// channels. Nothing is de-duplicated.
    pub async fn announce_change(&self, name: &str) {
        self.announce(name, 0).await;
    }

    /// Send on the legacy port. A reply is queued as a new inbound message.
    pub fn relay_to_legacy(&self, message: Message) {
        self.relay(Channel::Legacy, message, 0);
    }

    /// Send on the bus. A reply is queued as a new inbound message.
    pub fn relay_to_broadcast(&self, message: Message) {
        self.relay(Channel::Broadcast, message, 0);
    }

    async fn broadcast_all(&self, hops: u8) {
        let value = self.store.get_all().await;
        self.relay(Channel::Broadcast, Message::PostAll { value }, hops);
    }

    async fn announce(&self, name: &str, hops: u8) {
        self.broadcast_all(hops).await;

        if name == SettingName::ToggleDisplayHotkey.as_str() {
            self.relay(Channel::Broadcast, Message::ToggleDisplayHotkey, hops);
        }

        let value = self.store.get(name).await.unwrap_or(Value::Null);
        let message = Message::post(name, value);
        self.relay(Channel::Legacy, message.clone(), hops);
        self.relay(Channel::Broadcast, message, hops);
    }

    fn relay(&self, channel: Channel, message: Message, hops: u8) {
        let transport = match channel {
            Channel::Legacy => &self.legacy,
            Channel::Broadcast => &self.bus,
        };
        let kind = message.type_tag();

        let pending = match transport.send(message) {
            Ok(pending) => pending,
            Err(e) => {
                debug!(channel = %transport.name(), message_type = kind, error = %e, "Send failed, dropping message");
                return;
            }
        };

        if pending.is_empty() {
            return;
        }

        let queue = self.queue_tx.clone();
        let origin = Origin::Reply(transport.name().to_string());
        tokio::spawn(async move {
            if let Some(reply) = pending.first().await {
                let _ = queue.send(Queued {
                    message: reply,
                    origin,
                    hops: hops.saturating_add(1),
                });
            }
        });
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Handle one inbound message, regardless of which channel it came from.
    pub async fn dispatch_incoming(&self, message: Message) {
        self.dispatch(message, 0).await;
    }

    async fn dispatch(&self, message: Message, hops: u8) {
        match message {
            Message::Post { name, value } => {
                // A peer is telling us its value; persist only
                self.store.set(&name, value).await;
            }
            Message::PostToSdk { name, value } => {
                self.store.set(&name, value.clone()).await;
                self.relay(Channel::Broadcast, Message::Post { name, value }, hops);
            }
            Message::Reset => {
                for name in self.store.restore_defaults().await {
                    self.announce(name.as_str(), hops).await;
                }
            }
            Message::DebugLog { value } => {
                if self.store.debug_enabled().await {
                    match value {
                        Value::String(line) => info!(target: "vtabs::peer", "{line}"),
                        other => info!(target: "vtabs::peer", "{other}"),
                    }
                }
            }
            Message::Get { .. } | Message::PostAll { .. } | Message::ToggleDisplayHotkey => {
                debug!(message_type = message.type_tag(), "Ignoring peer-handled message");
            }
        }
    }

    async fn dispatch_queued(&self, queued: Queued) {
        if queued.hops > self.max_reply_hops {
            warn!(
                origin = %queued.origin,
                message_type = queued.message.type_tag(),
                hops = queued.hops,
                "Reply chain too long, dropping message"
            );
            return;
        }
        debug!(origin = %queued.origin, message_type = queued.message.type_tag(), hops = queued.hops, "Dispatching");
        self.dispatch(queued.message, queued.hops).await;
    }

    // =========================================================================
    // Startup & Event Loop
    // =========================================================================

    /// Bootstrap the peers.
    ///
    /// Broadcasts the stored mapping, waits the configured delay, asks the
    /// legacy peer for every recognized setting, and returns a subscription to
    /// storage changes. The delay is a best-effort wait for the legacy side to
    /// finish initializing; the protocol has no readiness signal.
    pub async fn startup(&self) -> broadcast::Receiver<StorageChange> {
        self.broadcast_all_settings().await;

        tokio::time::sleep(self.startup_delay).await;

        // Every recognized name is requested, `compact` included.
        for name in SettingName::ALL {
            self.relay_to_legacy(Message::get(name));
        }
        info!(settings = SettingName::ALL.len(), "Requested settings from legacy peer");

        self.store.subscribe()
    }

    /// Run the broker until both peer listeners have closed.
    ///
    /// Dispatches peer messages and queued replies in arrival order. Once
    /// startup completes, every storage change triggers a full broadcast.
    /// Replies already queued when the last listener closes are still
    /// dispatched; replies still in flight are dropped.
    /// May only be called once; later calls return immediately.
    pub async fn run(&self, inbound: PeerInbound) {
        let queue = match self.queue_rx.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(mut queue) = queue else {
            warn!("Broker is already running");
            return;
        };

        let PeerInbound {
            mut legacy,
            broadcast: mut runtime,
        } = inbound;
        let mut legacy_open = true;
        let mut runtime_open = true;
        let mut changes: Option<broadcast::Receiver<StorageChange>> = None;

        let startup = self.startup();
        tokio::pin!(startup);
        let mut started = false;

        loop {
            if !legacy_open && !runtime_open {
                while let Ok(queued) = queue.try_recv() {
                    self.dispatch_queued(queued).await;
                }
                info!("Every peer listener closed, broker stopping");
                return;
            }

            tokio::select! {
                subscription = &mut startup, if !started => {
                    started = true;
                    changes = Some(subscription);
                }
                message = legacy.recv(), if legacy_open => match message {
                    Some(message) => self.dispatch_queued(Queued { message, origin: Origin::Legacy, hops: 0 }).await,
                    None => {
                        warn!("Legacy port closed");
                        legacy_open = false;
                    }
                },
                message = runtime.recv(), if runtime_open => match message {
                    Some(message) => self.dispatch_queued(Queued { message, origin: Origin::Broadcast, hops: 0 }).await,
                    None => {
                        debug!("Runtime listener closed");
                        runtime_open = false;
                    }
                },
                Some(queued) = queue.recv() => self.dispatch_queued(queued).await,
                change = next_change(&mut changes) => match change {
                    Ok(change) => {
                        debug!(setting = %change.key, "Storage changed");
                        self.broadcast_all_settings().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Storage change listener lagged");
                        self.broadcast_all_settings().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => changes = None,
                },
            }
        }
    }
}

async fn next_change(
    changes: &mut Option<broadcast::Receiver<StorageChange>>,
) -> Result<StorageChange, broadcast::error::RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// Tests
// =============================================================================
