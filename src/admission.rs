//! Request admission: credential checks plus the per-credential sliding
//! window.
//!
//! [`AdmissionController::admit`] is a synchronous decision over in-memory
//! state. It never fails and never blocks on I/O; callers pass in the
//! current time so one reading is used for both eviction and counting.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::rate_limit::{HistoryStore, RateLimitPolicy};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No credential, or an empty one.
    Unauthenticated,
    /// Credential is not in the registry.
    Forbidden,
    /// Quota used up for this window.
    RateLimited { retry_after_secs: u64 },
    /// Counted and allowed through. `count` is how many admitted requests
    /// are now inside the window, this one included.
    Admitted { count: usize },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    // Status the transport answers with, None means pass-through
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Decision::Unauthenticated => Some(StatusCode::UNAUTHORIZED),
            Decision::Forbidden => Some(StatusCode::FORBIDDEN),
            Decision::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Decision::Admitted { .. } => None,
        }
    }

    // Label for the admission metric
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Unauthenticated => "unauthenticated",
            Decision::Forbidden => "forbidden",
            Decision::RateLimited { .. } => "rate_limited",
            Decision::Admitted { .. } => "admitted",
        }
    }
}

// Set of credentials accepted by the gateway, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    keys: HashSet<String>,
}

impl CredentialRegistry {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.is_empty())
            .collect();
        Self { keys }
    }

    pub fn contains(&self, credential: &str) -> bool {
        self.keys.contains(credential)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub struct AdmissionController {
    registry: CredentialRegistry,
    policy: RateLimitPolicy,
    store: HistoryStore,
}

impl AdmissionController {
    pub fn new(registry: CredentialRegistry, policy: RateLimitPolicy) -> Self {
        Self {
            registry,
            policy,
            store: HistoryStore::new(),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    // Number of credentials that have a history. Bounded by the registry.
    pub fn tracked_credentials(&self) -> usize {
        self.store.len()
    }

    pub fn admit(&self, credential: &str, now: DateTime<Utc>) -> Decision {
        if credential.is_empty() {
            return Decision::Unauthenticated;
        }

        if !self.registry.contains(credential) {
            return Decision::Forbidden;
        }

        // Only registered credentials get a history, so the store can't
        // grow past the registry size.
        let history = self.store.history(credential);

        // evict + count + append all happen under this credential's lock
        let mut history = history.lock();
        match history.try_record(now, &self.policy) {
            Some(count) => Decision::Admitted { count },
            None => Decision::RateLimited {
                retry_after_secs: self.policy.retry_after_secs(),
            },
        }
    }
}

/// Short, stable stand-in for a credential in logs.
pub fn fingerprint(credential: &str) -> String {
    let digest = Sha256::digest(credential.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}
