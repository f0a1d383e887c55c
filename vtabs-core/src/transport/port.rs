//! Persistent duplex connection to the legacy component.

use tokio::sync::mpsc;

use super::{Envelope, PeerReceiver, PendingReply, Transport};
use crate::protocol::Message;

/// Broker-side handle of the legacy connection.
///
/// Opened once with [`LegacyPort::connect`] and never reopened. After the
/// peer end is dropped every send fails.
#[derive(Debug)]
pub struct LegacyPort {
    name: String,
    outbound: mpsc::UnboundedSender<Envelope>,
}

/// Legacy-side end of the connection.
#[derive(Debug)]
pub struct PortPeer {
    name: String,
    incoming: mpsc::UnboundedReceiver<Envelope>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl LegacyPort {
    /// Open the named connection.
    ///
    /// Returns the broker's handle, the legacy side's handle, and the
    /// receiver of messages the legacy side posts (the port listener).
    pub fn connect(name: impl Into<String>) -> (Self, PortPeer, PeerReceiver) {
        let name = name.into();
        let (to_peer, incoming) = mpsc::unbounded_channel();
        let (from_peer, listener) = mpsc::unbounded_channel();

        tracing::debug!(port = %name, "Legacy port connected");

        (
            Self {
                name: name.clone(),
                outbound: to_peer,
            },
            PortPeer {
                name,
                incoming,
                outbound: from_peer,
            },
            listener,
        )
    }
}

impl Transport for LegacyPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: Message) -> anyhow::Result<PendingReply> {
        let (envelope, reply) = Envelope::new(message);
        self.outbound
            .send(envelope)
            .map_err(|_| anyhow::anyhow!("Port '{}' is disconnected", self.name))?;
        Ok(PendingReply::from_receivers(vec![reply]))
    }
}

impl PortPeer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next message from the background process. `None` once the broker side
    /// is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.incoming.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.incoming.try_recv().ok()
    }

    /// Post a message to the background process.
    pub fn post(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }
}
