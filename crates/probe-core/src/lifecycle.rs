//! Driver activation lifecycle.
//!
//! Drivers move between two states, `Inactive` and `Active`. The guard
//! rules that every driver shares (no double activation, accessors only
//! while active) live in [`ActivationGuard`], which a driver owns by
//! composition. Extra work that must happen on every transition is
//! provided by an injected [`LifecycleHooks`] implementation.
//!
//! ```text
//!   Inactive ──activate()──▶ Active ──deactivate()──▶ Inactive
//! ```

use crate::error::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::Serialize;

/// Activation state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    /// No session exists.
    #[default]
    Inactive,
    /// A session is running and accessors may be used.
    Active,
}

impl std::fmt::Display for ActivationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivationState::Inactive => write!(f, "inactive"),
            ActivationState::Active => write!(f, "active"),
        }
    }
}

/// Hooks run after a driver finished its own activation work and before it
/// reports deactivation complete.
///
/// Errors returned here are propagated unchanged by the driver.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Called once the driver's own activation steps succeeded.
    async fn on_activate(&self, _driver: &str) -> ProbeResult<()> {
        Ok(())
    }

    /// Called after the driver released its resources.
    async fn on_deactivate(&self, _driver: &str) -> ProbeResult<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}

/// Tracks the activation state of one driver instance.
#[derive(Debug, Clone)]
pub struct ActivationGuard {
    driver: String,
    state: ActivationState,
}

impl ActivationGuard {
    /// Create a guard in the `Inactive` state.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            state: ActivationState::Inactive,
        }
    }

    /// Name used in error messages.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Current state.
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Whether the driver is active.
    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }

    /// Fail with [`ProbeError::NotActive`] unless the driver is active.
    pub fn check_active(&self) -> ProbeResult<()> {
        match self.state {
            ActivationState::Active => Ok(()),
            ActivationState::Inactive => Err(ProbeError::NotActive {
                driver: self.driver.clone(),
            }),
        }
    }

    /// Fail with [`ProbeError::AlreadyActive`] unless the driver is inactive.
    pub fn check_inactive(&self) -> ProbeResult<()> {
        match self.state {
            ActivationState::Inactive => Ok(()),
            ActivationState::Active => Err(ProbeError::AlreadyActive {
                driver: self.driver.clone(),
            }),
        }
    }

    /// Record a completed transition to `Active`.
    pub fn mark_active(&mut self) {
        self.state = ActivationState::Active;
    }

    /// Record a completed transition to `Inactive`.
    pub fn mark_inactive(&mut self) {
        self.state = ActivationState::Inactive;
    }
}

/// A driver that can be activated and deactivated.
#[async_trait]
pub trait Activatable: Send {
    /// Transition `Inactive -> Active`.
    async fn activate(&mut self) -> ProbeResult<()>;

    /// Transition `Active -> Inactive`.
    async fn deactivate(&mut self) -> ProbeResult<()>;

    /// Current state.
    fn state(&self) -> ActivationState;
}
