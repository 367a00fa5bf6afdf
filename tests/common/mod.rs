//! Shared helpers for integration tests: a recording transport stub that
//! stands in for the RPC boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use control_link::{ControlLinkError, ControlRequest, RequestTransport, Result};

/// Captures every request the link sends; the next send can be scripted to
/// fail with a chosen error.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<ControlRequest>>,
    fail_next: Mutex<Option<ControlLinkError>>,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<ControlRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Drain the captured requests, returning them.
    pub fn take_sent(&self) -> Vec<ControlRequest> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Script the next `send` to fail with `err` instead of recording.
    pub fn fail_next(&self, err: ControlLinkError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestTransport for RecordingTransport {
    async fn send(&self, request: ControlRequest) -> Result<JsonValue> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(request);
        Ok(JsonValue::Null)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Initialize test logging once; repeat calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("debug"),
    )
    .is_test(true)
    .try_init();
}
