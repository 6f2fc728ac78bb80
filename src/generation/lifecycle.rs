use crate::{Error, ErrorContext, Result};
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// Failed to install, or superseded by a newer version.
    Redundant,
}

impl LifecycleState {
    fn can_move_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installing, Redundant)
                | (Installed, Activating)
                | (Installed, Redundant)
                | (Activating, Active)
                | (Active, Redundant)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Lifecycle of one cache version. Illegal transitions are rejected.
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Parsed),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(LifecycleState::Redundant)
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Moves to `next`, returning the previous state.
    pub fn transition(&self, next: LifecycleState) -> Result<LifecycleState> {
        let mut st = self.state.lock().map_err(|_| {
            Error::lifecycle_with_context(
                "lifecycle lock poisoned",
                ErrorContext::new().with_source("lifecycle"),
            )
        })?;
        let prev = *st;
        if !prev.can_move_to(next) {
            return Err(Error::lifecycle_with_context(
                format!("illegal transition {} -> {}", prev, next),
                ErrorContext::new().with_source("lifecycle"),
            ));
        }
        *st = next;
        Ok(prev)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
