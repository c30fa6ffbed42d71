//! One request per TCP connection.
//!
//! ```text
//! request:   code (u8) | password id (u16) | params
//! response:  every byte until the server closes the socket
//! ```
//!
//! Transport failures are not errors to the caller: unknown host,
//! refused connection, I/O errors, timeouts and empty replies all come
//! back as `None`. The dispatcher counts those; nothing else needs to
//! tell them apart.

use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::codec::hex_preview;

/// Frame bytes in front of the params.
pub const FRAME_HEADER_LEN: usize = 3;

// ── Endpoint ─────────────────────────────────────────────────────

/// Where to send requests, and the credential that goes with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub password_id: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, password_id: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password_id,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Build a complete request frame.
pub fn encode_frame(code: u8, password_id: u16, params: Option<&[u8]>) -> Bytes {
    let params = params.unwrap_or_default();
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + params.len());
    buf.put_u8(code);
    buf.put_u16_le(password_id);
    buf.put_slice(params);
    buf.freeze()
}

// ── Transport ────────────────────────────────────────────────────

/// A single request/response exchange with the server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `code` and `params` to `endpoint` and return the response,
    /// or `None` if the exchange failed, timed out or returned nothing.
    async fn round_trip(
        &self,
        endpoint: &Endpoint,
        code: u8,
        params: Option<&[u8]>,
        timeout: Duration,
    ) -> Option<Bytes>;
}

/// Opens a fresh TCP connection for every round-trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(endpoint: &Endpoint, frame: &[u8]) -> io::Result<Vec<u8>> {
        let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        stream.set_nodelay(true)?;
        stream.write_all(frame).await?;
        stream.flush().await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok(response)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn round_trip(
        &self,
        endpoint: &Endpoint,
        code: u8,
        params: Option<&[u8]>,
        timeout: Duration,
    ) -> Option<Bytes> {
        let frame = encode_frame(code, endpoint.password_id, params);
        trace!(%endpoint, code, frame = %hex_preview(&frame, 16), "sending request");

        match tokio::time::timeout(timeout, Self::exchange(endpoint, &frame)).await {
            Ok(Ok(response)) if response.is_empty() => {
                debug!(%endpoint, code, "empty response");
                None
            }
            Ok(Ok(response)) => {
                debug!(%endpoint, code, len = response.len(), "round-trip complete");
                Some(Bytes::from(response))
            }
            Ok(Err(e)) => {
                debug!(%endpoint, code, error = %e, "round-trip failed");
                None
            }
            Err(_) => {
                debug!(%endpoint, code, ?timeout, "round-trip timed out");
                None
            }
        }
    }
}
