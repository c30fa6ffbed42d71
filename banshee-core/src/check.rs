//! Server reachability and credential check.
//!
//! Sends the probe code with no params. The server answers `[1]` when the
//! password id is accepted and `[0]` when it is not; no answer at all
//! means the server is unreachable.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::message::PROBE_CODE;
use crate::network::{Endpoint, TcpTransport, Transport};
use crate::server::ServerId;

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Unreachable = -1,
    Rejected = 0,
    Accepted = 1,
}

impl ServerStatus {
    pub fn from_response(response: Option<&[u8]>) -> Self {
        match response.and_then(|r| r.first()) {
            None => ServerStatus::Unreachable,
            Some(0) => ServerStatus::Rejected,
            Some(_) => ServerStatus::Accepted,
        }
    }

    pub fn code(self) -> i8 {
        self as i8
    }

    pub fn is_accepted(self) -> bool {
        self == ServerStatus::Accepted
    }
}

/// Result of a background check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub server: ServerId,
    pub status: ServerStatus,
}

/// Probe `endpoint` inline.
pub async fn check_server(
    transport: &dyn Transport,
    endpoint: &Endpoint,
    timeout: Duration,
) -> ServerStatus {
    let response = transport.round_trip(endpoint, PROBE_CODE, None, timeout).await;
    let status = ServerStatus::from_response(response.as_deref());
    debug!(%endpoint, ?status, "server check");
    status
}

/// One-shot background probe.
pub struct ServerCheck;

impl ServerCheck {
    /// Probe over TCP and report through a weak handle to `reply`: if
    /// every strong sender is gone by then, the report is dropped.
    pub fn spawn(
        server: ServerId,
        endpoint: Endpoint,
        timeout: Duration,
        reply: &mpsc::Sender<CheckReport>,
    ) -> JoinHandle<()> {
        Self::spawn_with_transport(server, endpoint, timeout, Arc::new(TcpTransport::new()), reply)
    }

    pub fn spawn_with_transport(
        server: ServerId,
        endpoint: Endpoint,
        timeout: Duration,
        transport: Arc<dyn Transport>,
        reply: &mpsc::Sender<CheckReport>,
    ) -> JoinHandle<()> {
        let reply = reply.downgrade();
        tokio::spawn(async move {
            let status = check_server(transport.as_ref(), &endpoint, timeout).await;
            match reply.upgrade() {
                Some(tx) => {
                    let _ = tx.send(CheckReport { server, status }).await;
                }
                None => debug!(server, "check result has no receiver"),
            }
        })
    }
}
