//! Context type for tracking who started an action

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Origin of an event or service call
///
/// `user_id` is `None` for calls made by the system itself (timers, other
/// integrations); admin-only services rely on that distinction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this context (ULID)
    pub id: String,

    /// User that initiated this action, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Context that caused this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Context {
    /// A fresh system context
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: None,
            parent_id: None,
        }
    }

    /// A fresh context attributed to a user
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::new()
        }
    }

    /// A context caused by this one, keeping the same user
    pub fn child(&self) -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: self.user_id.clone(),
            parent_id: Some(self.id.clone()),
        }
    }

    /// True when no user is attached
    pub fn is_system(&self) -> bool {
        self.user_id.is_none()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
