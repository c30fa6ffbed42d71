//! Command dispatcher bound to one server.
//!
//! A [`Connection`] owns a worker task that drains the pending queue one
//! round-trip at a time. Results go to the callback channel as
//! [`CommandEvent`]s; user code never runs on the worker.
//!
//! ```text
//!  Idle ──► Dispatching ──► Idle
//!   │            │
//!   └────────────┴──► Terminated   (close, or too many failures)
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::BansheeError;
use crate::message::{Command, Link};
use crate::network::queue::{CommandQueue, Enqueued, PendingCommand};
use crate::network::transport::{Endpoint, TcpTransport, Transport};

/// Where a connection delivers its results.
pub type EventSender = mpsc::Sender<CommandEvent>;

/// Consecutive failed round-trips that end a connection.
pub const DEFAULT_MAX_FAILURES: u32 = 2;

// ── CommandEvent ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    /// A round-trip succeeded. `params` are the ones actually sent.
    Handled {
        command: Command,
        params: Option<Bytes>,
        response: Bytes,
    },
    /// Too many consecutive failures; the connection is terminated and
    /// will not deliver anything else.
    ConnectionLost,
}

// ── ConnectionConfig ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub max_failures: u32,
    /// Picks the per-command timeout set.
    pub link: Link,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            link: Link::Wifi,
        }
    }
}

// ── DispatchPhase ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPhase {
    /// Waiting for work.
    #[default]
    Idle,
    /// A round-trip is in flight.
    Dispatching,
    /// Closed or lost. Terminal.
    Terminated,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Dispatching => write!(f, "Dispatching"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

impl DispatchPhase {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Valid from: `Idle`.
    pub fn begin_dispatch(&mut self) -> Result<(), BansheeError> {
        match self {
            Self::Idle => {
                *self = Self::Dispatching;
                Ok(())
            }
            _ => Err(BansheeError::InvalidTransition(
                "cannot dispatch: not in Idle state",
            )),
        }
    }

    /// Valid from: `Dispatching`.
    pub fn finish_dispatch(&mut self) -> Result<(), BansheeError> {
        match self {
            Self::Dispatching => {
                *self = Self::Idle;
                Ok(())
            }
            _ => Err(BansheeError::InvalidTransition(
                "cannot finish dispatch: not in Dispatching state",
            )),
        }
    }

    /// Valid from: `Idle`, `Dispatching`.
    pub fn terminate(&mut self) -> Result<(), BansheeError> {
        match self {
            Self::Idle | Self::Dispatching => {
                *self = Self::Terminated;
                Ok(())
            }
            Self::Terminated => Err(BansheeError::InvalidTransition(
                "already terminated",
            )),
        }
    }
}

// ── Shared state ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct State {
    queue: CommandQueue,
    failures: u32,
    phase: DispatchPhase,
}

struct Shared {
    endpoint: Endpoint,
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
    wake: Notify,
    shutdown: CancellationToken,
    callback: watch::Sender<Option<EventSender>>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send `event` to the current callback. A full channel holds the
    /// worker until there is room, the callback is swapped, or the
    /// connection shuts down; a swap retargets the pending event.
    async fn deliver(&self, event: CommandEvent) {
        let mut slot = self.callback.subscribe();
        loop {
            let current = slot.borrow_and_update().clone();
            let Some(tx) = current else {
                trace!(endpoint = %self.endpoint, "no callback, dropping event");
                return;
            };
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                changed = slot.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    debug!(endpoint = %self.endpoint, "callback swapped during delivery");
                }
                permit = tx.reserve() => {
                    match permit {
                        Ok(permit) => permit.send(event),
                        Err(_) => {
                            trace!(endpoint = %self.endpoint, "callback receiver gone, dropping event");
                        }
                    }
                    return;
                }
            }
        }
    }

    /// Apply a phase change under the state lock, logging a rejected one.
    fn transition(&self, result: Result<(), BansheeError>) {
        if let Err(e) = result {
            warn!(endpoint = %self.endpoint, error = %e, "dispatch phase");
        }
    }
}

// ── Connection ───────────────────────────────────────────────────

/// Handle to a server connection and its worker. Dropping it closes the
/// connection.
pub struct Connection {
    shared: Arc<Shared>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.shared.endpoint)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Connection {
    /// Connect over TCP. Must be called inside a tokio runtime.
    pub fn open(endpoint: Endpoint, config: ConnectionConfig, events: Option<EventSender>) -> Self {
        Self::with_transport(endpoint, config, Arc::new(TcpTransport::new()), events)
    }

    pub fn with_transport(
        endpoint: Endpoint,
        config: ConnectionConfig,
        transport: Arc<dyn Transport>,
        events: Option<EventSender>,
    ) -> Self {
        let shared = Arc::new(Shared {
            endpoint,
            config,
            transport,
            state: Mutex::new(State::default()),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
            callback: watch::Sender::new(events),
        });
        info!(endpoint = %shared.endpoint, link = ?config.link, "connection opened");
        tokio::spawn(run_worker(Arc::clone(&shared)));
        Self { shared }
    }

    /// Queue a command, merging it into a pending one of the same kind.
    pub fn send_command(&self, command: Command, params: Option<Bytes>) -> Enqueued {
        self.send_command_with(command, params, true)
    }

    pub fn send_command_with(
        &self,
        command: Command,
        params: Option<Bytes>,
        coalesce: bool,
    ) -> Enqueued {
        let outcome = {
            let mut state = self.shared.state();
            if state.phase.is_terminated() {
                Enqueued::Ignored
            } else {
                state.queue.push(command, params, coalesce)
            }
        };
        trace!(endpoint = %self.shared.endpoint, %command, ?outcome, "send command");
        if outcome.is_accepted() {
            self.shared.wake.notify_one();
        }
        outcome
    }

    /// Stop the worker. A round-trip already in flight completes but its
    /// result is discarded. Idempotent.
    pub fn close(&self) {
        let closed = {
            let mut state = self.shared.state();
            state.queue.clear();
            state.phase.terminate().is_ok()
        };
        self.shared.shutdown.cancel();
        if closed {
            info!(endpoint = %self.shared.endpoint, "connection closed");
        }
    }

    /// Swap the result channel. `None` drops results from now on.
    pub fn update_callback(&self, events: Option<EventSender>) {
        self.shared.callback.send_replace(events);
    }

    pub fn phase(&self) -> DispatchPhase {
        self.shared.state().phase
    }

    /// Pending commands, oldest first. Excludes the one in flight.
    pub fn pending(&self) -> Vec<PendingCommand> {
        self.shared.state().queue.snapshot()
    }

    /// Params of the newest pending `command`, for merging a follow-up
    /// request into it.
    pub fn pending_params(&self, command: Command) -> Option<Bytes> {
        self.shared.state().queue.params_for(command)
    }

    /// Consecutive failed round-trips so far.
    pub fn failures(&self) -> u32 {
        self.shared.state().failures
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    pub fn config(&self) -> ConnectionConfig {
        self.shared.config
    }

    pub fn is_closed(&self) -> bool {
        self.phase().is_terminated()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Worker ───────────────────────────────────────────────────────

async fn run_worker(shared: Arc<Shared>) {
    let max_failures = shared.config.max_failures.max(1);

    loop {
        let next = {
            let mut state = shared.state();
            if state.phase.is_terminated() {
                break;
            }
            let entry = state.queue.pop();
            if entry.is_some() {
                shared.transition(state.phase.begin_dispatch());
            }
            entry
        };

        let Some(entry) = next else {
            tokio::select! {
                _ = shared.wake.notified() => {}
                _ = shared.shutdown.cancelled() => break,
            }
            continue;
        };

        let timeout = entry.command.timeout(shared.config.link);
        let response = shared
            .transport
            .round_trip(
                &shared.endpoint,
                entry.command.code(),
                entry.params.as_deref(),
                timeout,
            )
            .await;

        if shared.shutdown.is_cancelled() {
            break;
        }

        match response {
            Some(response) => {
                {
                    let mut state = shared.state();
                    if state.phase.is_terminated() {
                        break;
                    }
                    state.failures = 0;
                    shared.transition(state.phase.finish_dispatch());
                }
                debug!(
                    endpoint = %shared.endpoint,
                    command = %entry.command,
                    len = response.len(),
                    "command handled"
                );
                shared
                    .deliver(CommandEvent::Handled {
                        command: entry.command,
                        params: entry.params,
                        response,
                    })
                    .await;
            }
            None => {
                let (failures, lost) = {
                    let mut state = shared.state();
                    if state.phase.is_terminated() {
                        break;
                    }
                    if entry.command == Command::Cover {
                        state.queue.finish_cover(entry.params.as_deref());
                    }
                    state.failures += 1;
                    let lost = state.failures >= max_failures;
                    if lost {
                        state.queue.clear();
                        shared.transition(state.phase.terminate());
                    } else {
                        shared.transition(state.phase.finish_dispatch());
                    }
                    (state.failures, lost)
                };
                warn!(
                    endpoint = %shared.endpoint,
                    command = %entry.command,
                    failures,
                    "command failed"
                );
                if lost {
                    warn!(endpoint = %shared.endpoint, "connection lost");
                    shared.deliver(CommandEvent::ConnectionLost).await;
                    shared.shutdown.cancel();
                    break;
                }
            }
        }
    }

    debug!(endpoint = %shared.endpoint, "worker stopped");
}
