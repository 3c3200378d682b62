//! Test doubles for transport and clock

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use parking_lot::Mutex;
use tally_client::SystemCalls;
use tokio::sync::Semaphore;

use crate::transport::{Transport, UploadOutcome, UploadRequest};

/// Transport that records requests and answers from a script
pub(crate) struct MockTransport {
    requests: Mutex<Vec<UploadRequest>>,
    script: Mutex<VecDeque<UploadOutcome>>,
    fallback: UploadOutcome,
    gate: Option<Semaphore>,
}

impl MockTransport {
    /// Answers every request with `status`
    pub(crate) fn responding(status: u16) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback: UploadOutcome::status(status),
            gate: None,
        }
    }

    /// Fails every request below HTTP
    pub(crate) fn unreachable() -> Self {
        Self {
            fallback: UploadOutcome::network_error("connection refused"),
            ..Self::responding(0)
        }
    }

    /// Answer the next request with `outcome` before falling back
    pub(crate) fn then(self, outcome: UploadOutcome) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    /// Hold every response until `release` is called
    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: UploadRequest) -> UploadOutcome {
        self.requests.lock().push(request);
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Deterministic UUIDs and clock
pub(crate) struct FixedSystemCalls;

pub(crate) const FIXED_UUID: &str = "00000000-0000-4000-8000-000000000000";

pub(crate) fn fixed_now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 5, 6, 7, 8, 9)
        .unwrap()
}

impl SystemCalls for FixedSystemCalls {
    fn generate_uuid(&self) -> String {
        FIXED_UUID.to_string()
    }

    fn now(&self) -> DateTime<FixedOffset> {
        fixed_now()
    }
}
