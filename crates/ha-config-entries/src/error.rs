//! Error types
//!
//! [`ConfigEntryError`] is raised by integrations during setup and decides
//! which state the entry lands in. [`ConfigEntriesError`] is returned by the
//! manager itself.

use thiserror::Error;

use crate::entry::ConfigEntryState;
use crate::state_machine::InvalidTransition;

/// Failure reported by an integration's setup
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigEntryError {
    /// Transient; setup is retried with backoff
    #[error("not ready: {0}")]
    NotReady(String),

    /// Credentials were rejected; the entry needs reauthentication
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Permanent failure
    #[error("setup failed: {0}")]
    Error(String),
}

#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists for domain {domain} with unique_id {unique_id}")]
    AlreadyExists { domain: String, unique_id: String },

    #[error("Cannot unload entry in state {0:?}")]
    CannotUnload(ConfigEntryState),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;
