//! Forget-me request
//!
//! When a user who had consented opts out, collect is told to erase their
//! data with a single `ddnaForgetMe` event. The request is retried on each
//! attempt until it lands (204, no network error); after that the forgetter
//! never sends again.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use serde::Serialize;
use tally_client::SystemCalls;
use tally_client::timestamp::format_timestamp;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::consent::ConsentGate;
use crate::transport::{Transport, UploadRequest};

/// Event name collect recognizes as an erasure request
pub const FORGET_EVENT_NAME: &str = "ddnaForgetMe";

/// What a call to [`Forgetter::attempt_to_forget`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgetStatus {
    Sent,
    InFlight,
    AlreadyForgotten,
    NoRuntime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForgetState {
    Idle,
    InFlight,
    Forgotten,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForgetPayload<'a> {
    event_list: [ForgetEvent<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForgetEvent<'a> {
    event_name: &'a str,
    #[serde(rename = "userID")]
    user_id: &'a str,
    #[serde(rename = "eventUUID")]
    event_uuid: String,
    event_timestamp: String,
    event_version: i64,
    event_params: ForgetParams<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForgetParams<'a> {
    client_version: &'a str,
    sdk_method: &'a str,
}

/// Sends the erasure request at most once successfully
pub struct Forgetter {
    consent: Arc<dyn ConsentGate>,
    transport: Arc<dyn Transport>,
    system: Arc<dyn SystemCalls>,
    client_version: String,
    state: Arc<Mutex<ForgetState>>,
}

impl Forgetter {
    pub fn new(
        consent: Arc<dyn ConsentGate>,
        transport: Arc<dyn Transport>,
        system: Arc<dyn SystemCalls>,
        client_version: impl Into<String>,
    ) -> Self {
        Self {
            consent,
            transport,
            system,
            client_version: client_version.into(),
            state: Arc::new(Mutex::new(ForgetState::Idle)),
        }
    }

    /// Whether the erasure request has landed
    pub fn forgotten(&self) -> bool {
        *self.state.lock() == ForgetState::Forgotten
    }

    /// Post the forget-me event unless one is outstanding or already landed
    ///
    /// `on_forgotten` runs once, on the runtime, after a 204.
    pub fn attempt_to_forget(
        &self,
        collect_url: &str,
        user_id: &str,
        timestamp: &DateTime<FixedOffset>,
        calling_method: &str,
        on_forgotten: impl FnOnce() + Send + 'static,
    ) -> ForgetStatus {
        let Ok(runtime) = Handle::try_current() else {
            warn!("forget request outside a tokio runtime, not sent");
            return ForgetStatus::NoRuntime;
        };

        {
            let mut state = self.state.lock();
            match *state {
                ForgetState::InFlight => return ForgetStatus::InFlight,
                ForgetState::Forgotten => return ForgetStatus::AlreadyForgotten,
                ForgetState::Idle => *state = ForgetState::InFlight,
            }
        }

        let body = self.build_event(user_id, timestamp, calling_method);
        let mut request = UploadRequest::post(collect_url, body);
        if self.consent.geo_ip_checked() && self.consent.opting_out() {
            request = request.with_headers(self.consent.required_headers());
        }

        debug!(url = collect_url, "sending forget request");

        let state = Arc::clone(&self.state);
        let transport = Arc::clone(&self.transport);
        runtime.spawn(async move {
            let outcome = transport.send(request).await;
            if outcome.is_accepted() {
                *state.lock() = ForgetState::Forgotten;
                info!("forget request accepted");
                on_forgotten();
            } else {
                *state.lock() = ForgetState::Idle;
                warn!(
                    status = outcome.status,
                    error = outcome.network_error.as_deref(),
                    "forget request failed, will retry"
                );
            }
        });

        ForgetStatus::Sent
    }

    fn build_event(
        &self,
        user_id: &str,
        timestamp: &DateTime<FixedOffset>,
        calling_method: &str,
    ) -> Vec<u8> {
        let payload = ForgetPayload {
            event_list: [ForgetEvent {
                event_name: FORGET_EVENT_NAME,
                user_id,
                event_uuid: self.system.generate_uuid(),
                event_timestamp: format_timestamp(timestamp),
                event_version: 1,
                event_params: ForgetParams {
                    client_version: &self.client_version,
                    sdk_method: calling_method,
                },
            }],
        };
        // Plain strings and integers always serialize.
        serde_json::to_vec(&payload).unwrap_or_default()
    }
}
