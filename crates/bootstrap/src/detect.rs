//! Initialization detector: flag record first, relational store as the
//! source of truth.

use {
    agentdesk_store::BootstrapStore,
    serde::Serialize,
    tracing::{debug, warn},
};

use crate::{
    flag::{FlagRecord, FlagStore},
    state::{SystemState, Transition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitSource {
    Flag,
    Database,
}

/// Outcome of an initialization check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub initialized: bool,
    pub source: InitSource,
    pub detail: String,
    /// The flag record, when it short-circuited the check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_users: Option<u64>,
    /// Set when the store could not be queried. `initialized` is then false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_error: Option<String>,
}

impl InitReport {
    pub fn state(&self) -> SystemState {
        let event = if self.backend_error.is_some() {
            Transition::BackendFailed
        } else if self.initialized {
            Transition::DetectedInitialized
        } else {
            Transition::DetectedFresh
        };
        SystemState::Unchecked.apply(event)
    }
}

/// Decide whether the system has been initialized. Read-only and infallible:
/// flag problems fall through to the store, and store failures are reported
/// as "not initialized" with the cause in `backend_error`.
pub async fn check_initialized(store: &dyn BootstrapStore, flags: &dyn FlagStore) -> InitReport {
    match flags.read().await {
        Ok(Some(record)) if record.initialized => {
            debug!(timestamp = %record.timestamp, "initialized per flag record");
            return InitReport {
                initialized: true,
                source: InitSource::Flag,
                detail: format!("initialization flag recorded at {}", record.timestamp),
                flag: Some(record),
                active_users: None,
                backend_error: None,
            };
        },
        Ok(_) => {},
        Err(e) => warn!(error = %e, "ignoring unreadable initialization flag"),
    }

    match store.count_active_users().await {
        Ok(count) => InitReport {
            initialized: count > 0,
            source: InitSource::Database,
            detail: if count > 0 {
                format!("{count} active user(s) found")
            } else {
                "no active users found".to_string()
            },
            flag: None,
            active_users: Some(count),
            backend_error: None,
        },
        Err(e) => {
            warn!(error = %e, "initialization check could not reach the database");
            InitReport {
                initialized: false,
                source: InitSource::Database,
                detail: "database unreachable; treating system as not initialized".to_string(),
                flag: None,
                active_users: None,
                backend_error: Some(e.to_string()),
            }
        },
    }
}
