//! `ActionRef`: the stable key an action is known by.
//!
//! Hosts often derive action names from their own symbolic constants (an
//! enum variant, a handler type).  The origin is kept for diagnostics only:
//! equality, ordering and hashing use the canonical name, and the wire form
//! is the bare name string.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A named unit of work dispatched to an external executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ActionRef {
    name: String,
    origin: Option<String>,
}

impl ActionRef {
    /// A plain string action.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
        }
    }

    /// An action derived from a symbolic constant, e.g. `("OrderAction", "Charge")`.
    pub fn symbolic(origin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Some(origin.into()),
        }
    }

    /// Canonical name used across executor, storage and history.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

impl PartialEq for ActionRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ActionRef {}

impl PartialEq<str> for ActionRef {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for ActionRef {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl Hash for ActionRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for ActionRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ActionRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for ActionRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ActionRef {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&ActionRef> for ActionRef {
    fn from(action: &ActionRef) -> Self {
        action.clone()
    }
}

impl From<ActionRef> for String {
    fn from(action: ActionRef) -> Self {
        action.name
    }
}
