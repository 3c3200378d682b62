//! Analytics facade
//!
//! Owns the buffer slot and wires it to the dispatcher, consent state and
//! forgetter. Consent transitions swap the recording buffer for the revoked
//! one and back; producers never check consent themselves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tally_client::{Buffer, DefaultSystemCalls, EventBuffer, EventParams, Identity, SystemCalls};
use tracing::{debug, info};

use crate::consent::{ConsentGate, ConsentState};
use crate::dispatcher::{Dispatcher, FlushStatus, UploadResult};
use crate::error::TelemetryError;
use crate::forgetter::{ForgetStatus, Forgetter};
use crate::slot::BufferSlot;
use crate::transport::{DEFAULT_UPLOAD_TIMEOUT, HttpTransport, Transport};

/// `sdkMethod` reported by forget requests
pub const FORGET_CALLING_METHOD: &str = "tally.Analytics.opt_out";

/// Builder for [`Analytics`]
pub struct AnalyticsBuilder {
    collect_url: String,
    buffer: EventBuffer,
    transport: Option<Arc<dyn Transport>>,
    consent: Option<Arc<ConsentState>>,
    system: Arc<dyn SystemCalls>,
    client_version: String,
    upload_timeout: Duration,
}

impl AnalyticsBuilder {
    /// Use a custom transport instead of HTTP
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing consent state
    #[must_use]
    pub fn consent(mut self, consent: Arc<ConsentState>) -> Self {
        self.consent = Some(consent);
        self
    }

    #[must_use]
    pub fn system_calls(mut self, system: Arc<dyn SystemCalls>) -> Self {
        self.system = system;
        self
    }

    /// Version reported in forget requests
    #[must_use]
    pub fn client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    /// Request timeout for the default HTTP transport
    #[must_use]
    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Analytics, TelemetryError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.upload_timeout)?),
        };
        let consent = self.consent.unwrap_or_default();
        let gate: Arc<dyn ConsentGate> = consent.clone();

        let slot = BufferSlot::recording(self.buffer);
        let dispatcher = Dispatcher::new(
            slot.clone(),
            gate.clone(),
            transport.clone(),
            self.collect_url.clone(),
        );
        let forgetter = Forgetter::new(gate, transport, self.system.clone(), self.client_version);

        debug!(collect_url = %self.collect_url, "analytics configured");

        Ok(Analytics {
            slot,
            parked: Mutex::new(None),
            dispatcher,
            forgetter,
            consent,
            system: self.system,
            identity: Mutex::new(Identity::default()),
            enabled: AtomicBool::new(true),
        })
    }
}

/// Event recording, upload and consent handling for one project
pub struct Analytics {
    slot: BufferSlot,
    /// Recording buffer set aside while the slot is revoked
    parked: Mutex<Option<EventBuffer>>,
    dispatcher: Dispatcher,
    forgetter: Forgetter,
    consent: Arc<ConsentState>,
    system: Arc<dyn SystemCalls>,
    identity: Mutex<Identity>,
    enabled: AtomicBool,
}

impl Analytics {
    /// Start building a facade posting to `collect_url` and recording into `buffer`
    pub fn builder(collect_url: impl Into<String>, buffer: EventBuffer) -> AnalyticsBuilder {
        AnalyticsBuilder {
            collect_url: collect_url.into(),
            buffer,
            transport: None,
            consent: None,
            system: Arc::new(DefaultSystemCalls),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Restore cached events and apply any standing opt-out
    pub fn initialize(&self) {
        if !self.is_enabled() {
            return;
        }
        self.slot.with(|buffer| buffer.load_from_disk());
        self.apply_standing_consent();
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn slot(&self) -> &BufferSlot {
        &self.slot
    }

    #[inline]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[inline]
    pub fn consent(&self) -> &Arc<ConsentState> {
        &self.consent
    }

    /// Whether the forget request has landed
    pub fn forgotten(&self) -> bool {
        self.forgetter.forgotten()
    }

    /// Replace the identity written into events
    pub fn set_identity(&self, identity: Identity) {
        if let Some(parked) = self.parked.lock().as_mut() {
            parked.set_identity(identity.clone());
        }
        self.slot.set_identity(identity.clone());
        *self.identity.lock() = identity;
    }

    /// Start a new session and return its ID
    pub fn new_session(&self) -> String {
        let session_id = self.system.generate_uuid();
        let mut identity = self.identity.lock().clone();
        identity.session_id = session_id.clone();
        self.set_identity(identity);
        debug!(%session_id, "new session started");
        session_id
    }

    /// Record an event stamped with the current time
    pub fn record_event(
        &self,
        name: &str,
        version: Option<i64>,
        include_identity: bool,
        params: &EventParams,
    ) {
        if !self.is_enabled() {
            return;
        }
        let now = self.system.now();
        self.slot
            .with(|buffer| buffer.record_event(name, &now, version, include_identity, params));
    }

    /// Upload buffered events, and retry a pending forget request
    pub fn flush(&self) -> FlushStatus {
        if !self.is_enabled() {
            return FlushStatus::Disabled;
        }

        let status = if self.consent.geo_ip_checked() && self.consent.consent_given() {
            let identity = self.identity.lock().clone();
            self.slot.set_identity(identity);
            self.dispatcher.flush()
        } else {
            FlushStatus::ConsentRequired
        };

        if self.consent.opting_out() {
            self.send_forget_request();
        }

        status
    }

    /// Wait for the outstanding upload, if any
    pub async fn wait_idle(&self) -> Option<UploadResult> {
        self.dispatcher.wait_idle().await
    }

    /// Turn recording on or off
    ///
    /// Disabling clears all buffered and cached events.
    pub fn set_enabled(&self, enabled: bool) {
        match (enabled, self.is_enabled()) {
            (true, false) => {
                self.reinstate();
                self.enabled.store(true, Ordering::Release);
                self.apply_standing_consent();
                info!("analytics enabled");
            }
            (false, true) => {
                self.revoke();
                self.enabled.store(false, Ordering::Release);
                info!("analytics disabled");
            }
            _ => {}
        }
    }

    /// Consent identifiers the user still has to answer
    pub fn required_consents(&self) -> Vec<String> {
        self.consent.required_consents()
    }

    /// Record the user's opt-in answer for a consent flow
    pub fn provide_opt_in_consent(
        &self,
        identifier: &str,
        consent: bool,
    ) -> Result<(), TelemetryError> {
        if !self.consent.geo_ip_checked() {
            return Err(TelemetryError::ConsentFlowNotKnown);
        }

        if !consent {
            if self.consent.is_consent_given_for(identifier) {
                self.consent.begin_opt_out(Some(identifier));
                self.revoke_with_forget();
                return Ok(());
            }
            self.revoke();
        } else if self.is_enabled() {
            self.reinstate();
        }

        self.consent.set_user_consent(identifier, consent);
        Ok(())
    }

    /// Opt the user out, asking collect to forget them if they had consented
    pub fn opt_out(&self) {
        if self.consent.consent_denied() {
            info!("user has opted out, cached events discarded and no more will be collected");
        } else {
            info!("user has opted out and is being forgotten");
        }

        if self.consent.consent_given() {
            self.consent.begin_opt_out(None);
            self.revoke_with_forget();
            return;
        }

        if self.consent.opting_out() {
            self.revoke_with_forget();
            return;
        }

        self.revoke();
        self.consent.deny_all();
    }

    fn apply_standing_consent(&self) {
        if self.consent.geo_ip_checked()
            && (self.consent.consent_denied() || self.consent.opting_out())
        {
            self.opt_out();
        }
    }

    fn revoke(&self) {
        if let Some(buffer) = self.slot.revoke() {
            *self.parked.lock() = Some(buffer);
        }
    }

    fn reinstate(&self) {
        if let Some(buffer) = self.parked.lock().take() {
            self.slot.reinstate(buffer);
        }
    }

    fn revoke_with_forget(&self) {
        self.revoke();
        self.send_forget_request();
    }

    fn send_forget_request(&self) -> ForgetStatus {
        let user_id = self.identity.lock().install_id.clone();
        let consent = Arc::clone(&self.consent);
        self.forgetter.attempt_to_forget(
            self.dispatcher.collect_url(),
            &user_id,
            &self.system.now(),
            FORGET_CALLING_METHOD,
            move || consent.finish_opt_out(),
        )
    }
}
