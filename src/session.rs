//! Per-connection session
//!
//! A session is transport-agnostic: it writes [`ServerMessage`]s into an
//! outbound channel (drained by the transport's writer task) and reads text
//! frames from any `Stream<Item = String>`.
//!
//! Lifecycle: `start` sends the status snapshot and the app list, then spawns
//! the status ticker and the notification generator under one
//! `CancellationToken`. `run` drives the receive loop until the stream ends or
//! the writer goes away, then `close` cancels and joins both producers.

use futures_util::{Stream, StreamExt};
use phoneos_protocol::ServerMessage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::config::ServerConfig;
use crate::core::notifications;
use crate::core::state::StateStore;
use crate::dispatch::Dispatcher;

/// Sender half of a session's outbound queue
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("peer disconnected before the session started")]
    PeerGone,
}

/// Timing for the periodic producers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub status_interval: Duration,
    pub notification_min_delay: Duration,
    pub notification_max_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for SessionConfig {
    fn from(config: &ServerConfig) -> Self {
        let (min, max) = config.notification_delay();
        Self {
            status_interval: config.status_interval(),
            notification_min_delay: min,
            notification_max_delay: max,
        }
    }
}

/// One connected client
pub struct Session {
    id: u64,
    dispatcher: Dispatcher,
    outbound: Outbound,
    cancel: CancellationToken,
    producers: Vec<JoinHandle<()>>,
}

impl Session {
    /// Send the initial snapshot and app list, then start the producers.
    pub fn start(
        id: u64,
        dispatcher: Dispatcher,
        config: SessionConfig,
        outbound: Outbound,
    ) -> Result<Self, SessionError> {
        let store = Arc::clone(dispatcher.store());

        outbound
            .send(ServerMessage::Status(store.snapshot()))
            .map_err(|_| SessionError::PeerGone)?;
        outbound
            .send(ServerMessage::Apps { apps: store.list_apps() })
            .map_err(|_| SessionError::PeerGone)?;

        let cancel = CancellationToken::new();
        let producers = vec![
            tokio::spawn(status_ticker(
                id,
                Arc::clone(&store),
                outbound.clone(),
                config.status_interval,
                cancel.child_token(),
            )),
            tokio::spawn(notification_generator(
                id,
                store,
                outbound.clone(),
                (config.notification_min_delay, config.notification_max_delay),
                cancel.child_token(),
            )),
        ];

        info!("Session {} active", id);
        Ok(Self {
            id,
            dispatcher,
            outbound,
            cancel,
            producers,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive loop. Returns once the inbound stream ends or the outbound
    /// side is closed; the session is torn down before returning.
    pub async fn run<S>(mut self, inbound: S)
    where
        S: Stream<Item = String>,
    {
        tokio::pin!(inbound);

        loop {
            let text = tokio::select! {
                text = inbound.next() => match text {
                    Some(text) => text,
                    None => break,
                },
                _ = self.outbound.closed() => {
                    debug!("Session {} writer closed", self.id);
                    break;
                }
            };

            if let Some(reply) = self.dispatcher.dispatch(&text) {
                if self.outbound.send(reply).is_err() {
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// Cancel both producers and wait for them to finish
    pub async fn close(mut self) {
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        for producer in self.producers.drain(..) {
            let _ = producer.await;
        }
        info!("Session {} closed", self.id);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Push a fresh status snapshot every `period`
async fn status_ticker(
    session: u64,
    store: Arc<StateStore>,
    outbound: Outbound,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if cancel.is_cancelled() {
            break;
        }
        if outbound.send(ServerMessage::Status(store.snapshot())).is_err() {
            debug!("Session {} status ticker: peer gone", session);
            break;
        }
    }
}

/// Deliver a random canned notification after each random delay
async fn notification_generator(
    session: u64,
    store: Arc<StateStore>,
    outbound: Outbound,
    (min_delay, max_delay): (Duration, Duration),
    cancel: CancellationToken,
) {
    loop {
        let delay = notifications::random_delay(min_delay, max_delay);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = time::sleep(delay) => {}
        }
        if cancel.is_cancelled() || outbound.is_closed() {
            break;
        }

        let canned = notifications::pick_random();
        let notification = store.append_notification(canned.title, canned.message);
        debug!(
            "Session {} notification #{}: {}",
            session, notification.id, notification.title
        );

        let message = ServerMessage::Notification {
            title: notification.title,
            message: notification.message,
        };
        if outbound.send(message).is_err() {
            debug!("Session {} notification generator: peer gone", session);
            break;
        }
    }
}
