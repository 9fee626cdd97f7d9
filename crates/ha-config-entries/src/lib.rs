//! Config Entries
//!
//! A config entry is one configured instance of an integration. This crate
//! owns its lifecycle: setup (with retry on transient failures), forwarding
//! to entity platforms, update listeners, unload hooks, unload and reload.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - one integration instance, with typed runtime data
//! - [`ConfigEntryState`] - lifecycle state, transitions checked by the FSM
//! - [`ConfigEntries`] - manager driving setup/unload through the
//!   [`IntegrationHandler`] and [`PlatformHandler`] an integration registers
//! - [`ConfigEntryError`] - how an integration reports a failed setup

pub mod entry;
pub mod error;
pub mod handler;
pub mod manager;
pub mod state_machine;

pub use entry::{
    ConfigEntry, ConfigEntryDisabledBy, ConfigEntrySource, ConfigEntryState, ConfigEntryUpdate,
    UnloadHook, UpdateListener,
};
pub use error::{ConfigEntriesError, ConfigEntriesResult, ConfigEntryError};
pub use handler::{IntegrationHandler, PlatformHandler, SetupOutcome};
pub use manager::ConfigEntries;
pub use state_machine::{calculate_retry_delay, InvalidTransition};
