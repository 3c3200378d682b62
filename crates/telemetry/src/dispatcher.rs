//! Upload dispatcher
//!
//! Takes a snapshot of the active buffer, posts it to the collect endpoint on
//! the tokio runtime and, once the response is in, either drops the sent
//! prefix or persists the buffer for a later retry.
//!
//! ```text
//!           flush()                      response
//!   Idle ───────────────▶ InFlight ─────────────────▶ Idle
//!    │  watermark = len      │   204 / 400: clear_up_to(watermark)
//!    │  body = serialize()   │              clear_disk_cache()
//!    │                       │   otherwise: flush_to_disk()
//!    └ empty: stay Idle      └ flush(): warn, no-op
//! ```
//!
//! At most one upload is outstanding. Events recorded while it is in flight
//! land past the watermark and survive the clear.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::consent::ConsentGate;
use crate::slot::BufferSlot;
use crate::transport::{Transport, UploadOutcome, UploadRequest};

/// What a call to [`Dispatcher::flush`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// An upload was started
    Dispatched {
        /// Buffer length at snapshot time; cleared up to here on success
        watermark: usize,
        /// Payload size
        bytes: usize,
    },
    /// No complete events to send
    NothingToSend,
    /// An earlier upload is still outstanding
    AlreadyInFlight,
    /// Geo-IP not checked or consent not given
    ConsentRequired,
    /// Analytics are disabled
    Disabled,
    /// Called outside a tokio runtime
    NoRuntime,
}

/// How the last finished upload went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// 204, sent events cleared
    Accepted,
    /// 400, sent events discarded as malformed
    Rejected,
    /// Anything else, events kept and persisted to disk
    Failed(UploadOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DispatchState {
    Idle { last: Option<UploadResult> },
    InFlight { watermark: usize, generation: u64 },
}

/// Single-flight uploader for a [`BufferSlot`]
pub struct Dispatcher {
    slot: BufferSlot,
    consent: Arc<dyn ConsentGate>,
    transport: Arc<dyn Transport>,
    collect_url: String,
    state: Arc<watch::Sender<DispatchState>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("collect_url", &self.collect_url)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        slot: BufferSlot,
        consent: Arc<dyn ConsentGate>,
        transport: Arc<dyn Transport>,
        collect_url: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(DispatchState::Idle { last: None });
        Self {
            slot,
            consent,
            transport,
            collect_url: collect_url.into(),
            state: Arc::new(state),
        }
    }

    #[inline]
    pub fn collect_url(&self) -> &str {
        &self.collect_url
    }

    /// Whether an upload is outstanding
    pub fn in_flight(&self) -> bool {
        matches!(*self.state.borrow(), DispatchState::InFlight { .. })
    }

    /// Result of the most recent finished upload
    pub fn last_result(&self) -> Option<UploadResult> {
        match &*self.state.borrow() {
            DispatchState::Idle { last } => last.clone(),
            DispatchState::InFlight { .. } => None,
        }
    }

    /// Start uploading the buffered events
    ///
    /// Never blocks on the network; the response is handled on a spawned task.
    pub fn flush(&self) -> FlushStatus {
        let Ok(runtime) = Handle::try_current() else {
            warn!("flush called outside a tokio runtime, events cannot be sent");
            return FlushStatus::NoRuntime;
        };

        let mut status = FlushStatus::AlreadyInFlight;
        let mut body = None;

        self.state.send_if_modified(|state| {
            if matches!(state, DispatchState::InFlight { .. }) {
                warn!("dispatcher is already flushing");
                return false;
            }
            if !self.consent.geo_ip_checked() || !self.consent.consent_given() {
                warn!("required consent wasn't checked and given, events cannot be sent");
                status = FlushStatus::ConsentRequired;
                return false;
            }

            let (generation, (watermark, payload)) =
                self.slot.with_current(|buffer| (buffer.len(), buffer.serialize()));
            let Some(payload) = payload else {
                status = FlushStatus::NothingToSend;
                return false;
            };

            status = FlushStatus::Dispatched {
                watermark,
                bytes: payload.len(),
            };
            body = Some(payload);
            *state = DispatchState::InFlight {
                watermark,
                generation,
            };
            true
        });

        let Some(body) = body else {
            return status;
        };

        let request = UploadRequest::post(&self.collect_url, body)
            .with_headers(self.consent.required_headers());
        debug!(
            url = %self.collect_url,
            bytes = request.body.len(),
            "uploading events"
        );

        let slot = self.slot.clone();
        let state = Arc::clone(&self.state);
        let transport = Arc::clone(&self.transport);
        runtime.spawn(async move {
            let outcome = transport.send(request).await;
            complete(&slot, &state, outcome);
        });

        status
    }

    /// Wait until no upload is outstanding and return its result
    pub async fn wait_idle(&self) -> Option<UploadResult> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| matches!(state, DispatchState::Idle { .. }))
            .await
            .ok()?;
        match &*state {
            DispatchState::Idle { last } => last.clone(),
            DispatchState::InFlight { .. } => None,
        }
    }
}

fn complete(slot: &BufferSlot, state: &watch::Sender<DispatchState>, outcome: UploadOutcome) {
    let DispatchState::InFlight {
        watermark,
        generation,
    } = *state.borrow()
    else {
        warn!("upload completed without a flush in progress");
        return;
    };

    let result = if outcome.is_accepted() || outcome.is_rejected() {
        let cleared = slot.with_generation(generation, |buffer| {
            buffer.clear_up_to(watermark);
            buffer.clear_disk_cache();
        });
        if cleared.is_none() {
            debug!("buffer swapped during upload, nothing to clear");
        }

        if outcome.is_rejected() {
            warn!(
                watermark,
                "events upload failed due to malformed JSON, sent events have been discarded"
            );
            UploadResult::Rejected
        } else {
            info!(watermark, "events uploaded successfully");
            UploadResult::Accepted
        }
    } else {
        // Persist in case the process exits before connectivity returns.
        slot.with(|buffer| buffer.flush_to_disk());
        match &outcome.network_error {
            Some(error) => warn!(%error, "events failed to upload (network error), will retry at next flush"),
            None => warn!(status = outcome.status, "events failed to upload, will retry at next flush"),
        }
        UploadResult::Failed(outcome)
    };

    state.send_replace(DispatchState::Idle { last: Some(result) });
}
