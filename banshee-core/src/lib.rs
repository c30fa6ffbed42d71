//! # banshee-core
//!
//! Client core for the Banshee remote listener protocol.
//!
//! This crate contains:
//! - **Codec**: bounds-checked little-endian primitives and length-prefixed strings
//! - **Protocol**: request builders and reply decoders per command, plus `Reply`
//! - **Network**: `TcpTransport` and the `Connection` dispatcher with its worker
//! - **Check**: server reachability / credential probe
//! - **Server**: server records with alias resolution and a `ServerStore`
//! - **Library**: library database and cover caches
//! - **Session**: owner of the active connection and the stores
//! - **Error**: `BansheeError`, a `thiserror`-based error enum

pub mod check;
pub mod codec;
pub mod error;
pub mod library;
pub mod message;
pub mod network;
pub mod protocol;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod test_utils;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use check::{CheckReport, DEFAULT_CHECK_TIMEOUT, ServerCheck, ServerStatus, check_server};
pub use error::BansheeError;
pub use library::{CoverStore, DiskCache, LibraryCache};
pub use message::{Command, Link, PROBE_CODE, Repeat, Shuffle};
pub use network::{
    CommandEvent, Connection, ConnectionConfig, DispatchPhase, Endpoint, Enqueued, EventSender,
    PendingCommand, TcpTransport, Transport,
};
pub use protocol::Reply;
pub use server::{DEFAULT_PORT, MemoryServerStore, Server, ServerId, ServerStore};
pub use session::{Session, SessionNotice};
