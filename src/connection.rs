//! Connection manager for the runner's live status channel.
//!
//! One manager task owns at most one websocket at a time. Any close,
//! error, or failed connect schedules exactly one reconnect after a
//! fixed delay; a manual reconnect request cancels the pending delay
//! and replaces the current channel immediately. Every channel gets a
//! generation ticket from [`GenerationGate`], and only events admitted
//! by the gate reach the reducer, so a stale channel that is still
//! draining can never be misattributed to its replacement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use crate::protocol::StatusEvent;
use crate::state::ConnectionStatus;

#[derive(Debug)]
pub enum ChannelEvent {
    Connection(ConnectionStatus),
    Status(StatusEvent),
}

enum Command {
    Reconnect,
    Shutdown,
}

/// Monotonic generation counter. Opening a new generation invalidates
/// every ticket handed out before it.
#[derive(Clone, Default)]
pub struct GenerationGate(Arc<AtomicU64>);

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the next generation ticket, retiring all prior ones.
    pub fn open(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True only for the most recently opened ticket.
    pub fn admits(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}

pub struct ConnectionManager {
    commands: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

impl ConnectionManager {
    /// Spawns the manager task. Events (connection transitions and
    /// parsed status updates) arrive on the returned receiver.
    pub fn spawn(url: Url, reconnect_delay: Duration) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let handle = tokio::spawn(run(url, reconnect_delay, events_tx, commands_rx));
        (
            ConnectionManager {
                commands: commands_tx,
                handle,
            },
            events_rx,
        )
    }

    /// Drops the current channel (if any), cancels a pending reconnect
    /// delay, and connects again now.
    pub fn reconnect(&self) {
        let _ = self.commands.try_send(Command::Reconnect);
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.handle.await;
    }
}

async fn run(
    url: Url,
    reconnect_delay: Duration,
    events: mpsc::Sender<ChannelEvent>,
    mut commands: mpsc::Receiver<Command>,
) {
    let gate = GenerationGate::new();
    let mut first_attempt = true;

    loop {
        let status = if first_attempt {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Reconnecting
        };
        first_attempt = false;
        if events.send(ChannelEvent::Connection(status)).await.is_err() {
            return;
        }

        // The previous channel's stream was dropped before this point;
        // its ticket is retired the moment we open the next one.
        let ticket = gate.open();

        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                debug!("status channel open (generation {ticket})");
                if events
                    .send(ChannelEvent::Connection(ConnectionStatus::Open))
                    .await
                    .is_err()
                {
                    return;
                }

                let (_write, mut read) = ws.split();
                loop {
                    tokio::select! {
                        message = read.next() => match message {
                            Some(Ok(Message::Text(text))) => {
                                if !gate.admits(ticket) {
                                    break;
                                }
                                match serde_json::from_str::<StatusEvent>(&text) {
                                    Ok(event) => {
                                        if events.send(ChannelEvent::Status(event)).await.is_err() {
                                            return;
                                        }
                                    }
                                    // Protocol error: log, drop, keep the
                                    // channel open.
                                    Err(e) => warn!("malformed status event dropped: {e}"),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("status channel error: {e}");
                                break;
                            }
                        },
                        command = commands.recv() => match command {
                            Some(Command::Reconnect) => break,
                            Some(Command::Shutdown) | None => return,
                        }
                    }
                }

                if events
                    .send(ChannelEvent::Connection(ConnectionStatus::Closed))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                warn!("status channel connect failed: {e}");
                if events
                    .send(ChannelEvent::Connection(ConnectionStatus::Closed))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        // Exactly one reconnect attempt per close, after a fixed delay.
        // A manual reconnect lands here too and skips the wait.
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            command = commands.recv() => match command {
                Some(Command::Reconnect) => {}
                Some(Command::Shutdown) | None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ticket_is_not_admitted_after_replacement() {
        let gate = GenerationGate::new();
        let first = gate.open();
        assert!(gate.admits(first));

        let second = gate.open();
        assert!(!gate.admits(first));
        assert!(gate.admits(second));
    }

    #[test]
    fn fake_stale_channel_events_are_rejected() {
        // Simulates a channel that keeps emitting after its
        // replacement: every emission checks its own ticket.
        let gate = GenerationGate::new();
        let stale = gate.open();
        let fresh = gate.open();

        let emitted: Vec<u64> = vec![stale, fresh, stale, stale, fresh];
        let admitted: Vec<u64> = emitted
            .into_iter()
            .filter(|ticket| gate.admits(*ticket))
            .collect();
        assert_eq!(admitted, vec![fresh, fresh]);
    }
}
