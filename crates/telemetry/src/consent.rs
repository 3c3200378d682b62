//! Consent tracking
//!
//! Uploads only happen once a geo-IP lookup has decided which consent flow
//! applies to the user and that flow's consent has been given. The lookup
//! itself is performed by the host; its result is fed in through
//! [`ConsentState::set_geo_ip_result`].

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, info};

/// Read-only view of consent used by the dispatcher and forgetter
pub trait ConsentGate: Send + Sync {
    /// Whether the geo-IP lookup has completed
    fn geo_ip_checked(&self) -> bool;

    /// Whether events may be uploaded
    fn consent_given(&self) -> bool;

    /// Whether an opt-out has started but the forget request has not landed
    fn opting_out(&self) -> bool;

    /// Headers every upload must carry
    fn required_headers(&self) -> HashMap<String, String>;
}

/// Outcome of the geo-IP lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentFlow {
    /// No opt-in consent needed in the user's region
    NotRequired,
    /// Opt-in consent under the named legislation identifier (e.g. `pipl`)
    Required(String),
}

#[derive(Debug, Default)]
struct ConsentInner {
    flow: Option<ConsentFlow>,
    decisions: HashMap<String, bool>,
    denied_all: bool,
    opting_out: HashSet<String>,
    opting_out_all: bool,
}

impl ConsentInner {
    fn is_opting_out(&self) -> bool {
        self.opting_out_all || !self.opting_out.is_empty()
    }
}

/// In-memory consent state
#[derive(Debug, Default)]
pub struct ConsentState {
    inner: RwLock<ConsentInner>,
}

impl ConsentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the geo-IP lookup result
    pub fn set_geo_ip_result(&self, flow: ConsentFlow) {
        debug!(?flow, "geo-ip consent flow resolved");
        self.inner.write().flow = Some(flow);
    }

    /// Consent flow decided by the geo-IP lookup, if it has run
    pub fn flow(&self) -> Option<ConsentFlow> {
        self.inner.read().flow.clone()
    }

    /// Identifiers the user still has to answer for
    pub fn required_consents(&self) -> Vec<String> {
        let inner = self.inner.read();
        match &inner.flow {
            Some(ConsentFlow::Required(id))
                if !inner.denied_all && !inner.decisions.contains_key(id) =>
            {
                vec![id.clone()]
            }
            _ => Vec::new(),
        }
    }

    /// Record the user's answer for a consent identifier
    pub fn set_user_consent(&self, identifier: &str, consent: bool) {
        info!(identifier, consent, "user consent recorded");
        let mut inner = self.inner.write();
        inner.decisions.insert(identifier.to_string(), consent);
        if consent {
            inner.denied_all = false;
        }
    }

    /// Whether the user said yes for `identifier`
    pub fn is_consent_given_for(&self, identifier: &str) -> bool {
        self.inner.read().decisions.get(identifier) == Some(&true)
    }

    /// Whether the user has refused uploads
    pub fn consent_denied(&self) -> bool {
        let inner = self.inner.read();
        if inner.denied_all {
            return true;
        }
        match &inner.flow {
            Some(ConsentFlow::Required(id)) => inner.decisions.get(id) == Some(&false),
            _ => false,
        }
    }

    /// Start forgetting the user, for one identifier or for everything
    pub fn begin_opt_out(&self, identifier: Option<&str>) {
        let mut inner = self.inner.write();
        match identifier {
            Some(id) => {
                inner.opting_out.insert(id.to_string());
                inner.decisions.insert(id.to_string(), false);
            }
            None => inner.opting_out_all = true,
        }
        debug!(identifier, "opt-out started");
    }

    /// The forget request landed; from now on everything is denied
    pub fn finish_opt_out(&self) {
        let mut inner = self.inner.write();
        inner.opting_out.clear();
        inner.opting_out_all = false;
        inner.denied_all = true;
        info!("opt-out complete, user has been forgotten");
    }

    /// Deny uploads for every consent flow
    pub fn deny_all(&self) {
        self.inner.write().denied_all = true;
    }
}

impl ConsentGate for ConsentState {
    fn geo_ip_checked(&self) -> bool {
        self.inner.read().flow.is_some()
    }

    fn consent_given(&self) -> bool {
        let inner = self.inner.read();
        if inner.denied_all || inner.is_opting_out() {
            return false;
        }
        match &inner.flow {
            Some(ConsentFlow::NotRequired) => true,
            Some(ConsentFlow::Required(id)) => inner.decisions.get(id) == Some(&true),
            None => false,
        }
    }

    fn opting_out(&self) -> bool {
        self.inner.read().is_opting_out()
    }

    fn required_headers(&self) -> HashMap<String, String> {
        let inner = self.inner.read();
        let Some(ConsentFlow::Required(id)) = &inner.flow else {
            return HashMap::new();
        };
        let Some(&decision) = inner.decisions.get(id) else {
            return HashMap::new();
        };
        let value = decision.to_string();
        let id = id.to_uppercase();
        HashMap::from([
            (format!("{id}_CONSENT"), value.clone()),
            (format!("{id}_EXPORT"), value),
        ])
    }
}
