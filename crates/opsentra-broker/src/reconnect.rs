//! Broker reconnection state machine (spec §4.4), grounded in the "dynamic
//! `setTimeout` reconnection" REDESIGN FLAG (spec §9): an explicit state
//! machine owned by a single task instead of recursive timers.
//!
//! `Disconnected → Connecting → Connected → Channeling → Ready → Errored → Disconnected`
//! Backoff starts at 5s, multiplies by 1.5 per failed attempt, caps at 30s,
//! and resets to base once `Ready` is reached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lapin::options::ExchangeDeclareOptions;
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{info, warn};

use crate::error::PublishError;
use crate::topology;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const BACKOFF_BASE: Duration = Duration::from_secs(5);
const BACKOFF_MAX: Duration = Duration::from_secs(30);
const BACKOFF_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disconnected,
    Connecting,
    Connected,
    Channeling,
    Ready,
    Errored,
}

pub struct Reconnector {
    url: String,
    state: State,
    backoff: Duration,
    connection: Option<Connection>,
    channel: Option<Channel>,
    healthy: Arc<AtomicBool>,
}

impl Reconnector {
    pub fn new(url: impl Into<String>) -> Self {
        Reconnector {
            url: url.into(),
            state: State::Disconnected,
            backoff: BACKOFF_BASE,
            connection: None,
            channel: None,
            healthy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A shared snapshot of whether this connection last reached `Ready`,
    /// for the Aggregator's health endpoint (spec §4.9 "health reporting
    /// detail").
    pub fn healthy_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.healthy)
    }

    /// Force the next `ensure_ready()` call to reconnect from scratch
    /// instead of handing back the same channel (spec §4.4: "persistent
    /// failure on a channel already believed `Ready` triggers reconnect").
    /// Callers use this after a publish/consume failure on a channel the
    /// reconnector still thinks is healthy.
    pub fn invalidate(&mut self) {
        self.state = State::Errored;
        self.connection = None;
        self.channel = None;
        self.healthy.store(false, Ordering::Relaxed);
    }

    /// Drive the state machine until a channel with the exchange declared
    /// is `Ready`, looping through reconnect/backoff as needed. Only
    /// returns an error if the caller's cancellation signal is not wired
    /// in by the owning task — in practice this runs inside a `select!`
    /// alongside a shutdown token.
    pub async fn ensure_ready(&mut self) -> Result<Channel, PublishError> {
        loop {
            match self.state {
                State::Disconnected => {
                    self.state = State::Connecting;
                }
                State::Connecting => match tokio::time::timeout(
                    CONNECT_TIMEOUT,
                    Connection::connect(&self.url, ConnectionProperties::default()),
                )
                .await
                {
                    Ok(Ok(conn)) => {
                        info!("broker connection established");
                        self.connection = Some(conn);
                        self.state = State::Connected;
                    }
                    Ok(Err(err)) => {
                        warn!(error = %err, "broker connect failed");
                        self.state = State::Errored;
                    }
                    Err(_) => {
                        warn!("broker connect timed out");
                        self.state = State::Errored;
                    }
                },
                State::Connected => {
                    let conn = self.connection.as_ref().expect("connected state has a connection");
                    match conn.create_channel().await {
                        Ok(channel) => {
                            self.channel = Some(channel);
                            self.state = State::Channeling;
                        }
                        Err(err) => {
                            warn!(error = %err, "broker channel creation failed");
                            self.state = State::Errored;
                        }
                    }
                }
                State::Channeling => {
                    let channel = self.channel.as_ref().expect("channeling state has a channel");
                    match channel
                        .exchange_declare(
                            topology::EXCHANGE,
                            ExchangeKind::Topic,
                            ExchangeDeclareOptions {
                                durable: true,
                                ..Default::default()
                            },
                            FieldTable::default(),
                        )
                        .await
                    {
                        Ok(()) => self.state = State::Ready,
                        Err(err) => {
                            warn!(error = %err, "exchange declare failed");
                            self.state = State::Errored;
                        }
                    }
                }
                State::Ready => {
                    self.backoff = BACKOFF_BASE;
                    self.healthy.store(true, Ordering::Relaxed);
                    return Ok(self.channel.clone().expect("ready state has a channel"));
                }
                State::Errored => {
                    self.healthy.store(false, Ordering::Relaxed);
                    tokio::time::sleep(self.backoff).await;
                    self.backoff = self
                        .backoff
                        .mul_f64(BACKOFF_MULTIPLIER)
                        .min(BACKOFF_MAX);
                    self.connection = None;
                    self.channel = None;
                    self.state = State::Disconnected;
                }
            }
        }
    }
}
