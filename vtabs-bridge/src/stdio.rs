//! Legacy port over stdio.
//!
//! The legacy component talks to the host one JSON message per line: lines
//! read from the input are posted to the broker, and everything the broker
//! sends on the port or the runtime bus is written to the output. The legacy
//! side listens on both, so it sees `settings.post-all`,
//! `settings.toggleDisplayHotkey` and rebroadcast posts too. There is no
//! request correlation on this wire, so the legacy side answers a
//! `settings.get` with a fresh `settings.post` line rather than a reply.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};
use vtabs_core::{BusListener, Message, PortPeer};

/// Pump messages between the legacy peer and a line-oriented stream.
///
/// Returns when the input reaches end of file or the broker side of the port
/// goes away.
pub async fn pump<R, W>(
    mut peer: PortPeer,
    mut bus: BusListener,
    reader: R,
    writer: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut bus_open = true;

    loop {
        tokio::select! {
            biased;

            envelope = peer.recv() => {
                let Some(envelope) = envelope else {
                    debug!(port = %peer.name(), "Broker side of port closed");
                    break;
                };
                write_message(writer, &envelope.message).await?;
            }
            envelope = bus.recv(), if bus_open => match envelope {
                Some(envelope) => {
                    trace!(message_type = envelope.message.type_tag(), "Broadcast");
                    write_message(writer, &envelope.message).await?;
                }
                None => {
                    debug!("Bus closed");
                    bus_open = false;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!(port = %peer.name(), "Legacy input closed");
                    break;
                };
                forward_line(&peer, &line);
            }
        }
    }

    Ok(())
}

async fn write_message<W>(writer: &mut W, message: &Message) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn forward_line(peer: &PortPeer, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match serde_json::from_str::<Message>(line) {
        Ok(message) => {
            if !peer.post(message) {
                debug!("Broker stopped listening, dropping legacy message");
            }
        }
        Err(e) => warn!(error = %e, line, "Skipping malformed legacy message"),
    }
}
