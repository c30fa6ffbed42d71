//! Domain-specific error types for the Banshee remote protocol.
//!
//! Decoding and store operations return `Result<T, BansheeError>`.
//! Transport failures never surface here: they are absorbed by the
//! dispatcher and reported in-band (see [`crate::CommandEvent`]).

use std::time::Duration;
use thiserror::Error;

use crate::server::ServerId;

/// The canonical error type for the Banshee remote client.
#[derive(Debug, Error)]
pub enum BansheeError {
    // ── Codec Errors ─────────────────────────────────────────────
    /// A response (or params buffer) is shorter than its layout requires.
    #[error("malformed {what}: needed {needed} bytes, got {available}")]
    MalformedResponse {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A length-prefixed string did not contain valid UTF-8.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// Request parameters do not match the requested operation.
    #[error("invalid params: {0}")]
    InvalidParams(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// A round-trip exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// An operation needs an active connection but there is none.
    #[error("not connected")]
    NotConnected,

    /// A dispatcher phase change was requested from the wrong phase.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Store Errors ─────────────────────────────────────────────
    /// No server with this id exists in the store.
    #[error("unknown server id {0}")]
    UnknownServer(ServerId),

    /// A server record violates a store rule.
    #[error("invalid server: {0}")]
    InvalidServer(&'static str),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl BansheeError {
    /// Shorthand for a truncated buffer.
    pub(crate) fn truncated(what: &'static str, needed: usize, available: usize) -> Self {
        BansheeError::MalformedResponse {
            what,
            needed,
            available,
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for BansheeError {
    fn from(s: String) -> Self {
        BansheeError::Other(s)
    }
}

impl From<&str> for BansheeError {
    fn from(s: &str) -> Self {
        BansheeError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BansheeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        BansheeError::ChannelClosed
    }
}
