//! Test utilities for dispatcher, check and session tests.
//!
//! `MockTransport` stands in for the network: it records every call and
//! answers from a script, optionally holding each round-trip until the
//! test releases it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Notify, Semaphore, mpsc};

use crate::network::{CommandEvent, Endpoint, Transport};

pub fn test_endpoint() -> Endpoint {
    Endpoint::new("127.0.0.1", 8484, 7)
}

/// Next event, failing the test after two seconds.
pub async fn recv_event(rx: &mut mpsc::Receiver<CommandEvent>) -> CommandEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: Endpoint,
    pub code: u8,
    pub params: Option<Bytes>,
    pub timeout: Duration,
}

pub struct MockTransport {
    script: Mutex<VecDeque<Option<Bytes>>>,
    fallback: Option<Bytes>,
    calls: Mutex<Vec<Call>>,
    gate: Option<Semaphore>,
    entered: Notify,
}

impl MockTransport {
    /// Answers every call with `response`.
    pub fn new(response: Option<Bytes>) -> Self {
        Self::scripted([], response)
    }

    /// Answers from `script` in order, then with `fallback`.
    pub fn scripted(
        script: impl IntoIterator<Item = Option<Bytes>>,
        fallback: Option<Bytes>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: Mutex::new(Vec::new()),
            gate: None,
            entered: Notify::new(),
        }
    }

    /// Like [`MockTransport::new`], but each round-trip waits for
    /// [`MockTransport::release`].
    pub fn gated(response: Option<Bytes>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(response)
        }
    }

    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Wait until a round-trip has started.
    pub async fn wait_entered(&self) {
        tokio::time::timeout(Duration::from_secs(2), self.entered.notified())
            .await
            .expect("no round-trip started");
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn round_trip(
        &self,
        endpoint: &Endpoint,
        code: u8,
        params: Option<&[u8]>,
        timeout: Duration,
    ) -> Option<Bytes> {
        self.calls.lock().unwrap().push(Call {
            endpoint: endpoint.clone(),
            code,
            params: params.map(Bytes::copy_from_slice),
            timeout,
        });
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}
