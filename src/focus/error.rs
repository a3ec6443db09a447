//! Error taxonomy for the focus engine.
//!
//! Authorization and enforcement failures are recoverable and surface to the
//! user as notifications. Strict-lock rejections are expected policy outcomes.
//! Configuration errors are caught when the catalog is mutated and never reach
//! the evaluator.

use thiserror::Error;
use uuid::Uuid;

use crate::focus::session::SessionState;

/// The host refused or failed to grant the restriction capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The user (or host policy) denied the request
    #[error("Restriction capability was denied")]
    Denied,

    /// The request could not be completed
    #[error("Authorization request failed: {0}")]
    Host(String),
}

/// An apply/clear call into the enforcement boundary failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnforcementError {
    /// The enforcement hook could not be started
    #[error("Failed to run enforcement hook '{command}': {message}")]
    Spawn { command: String, message: String },

    /// The enforcement hook ran but reported failure
    #[error("Enforcement hook '{command}' exited with status {status}")]
    HookFailed { command: String, status: i32 },

    /// The enforcement boundary is not configured
    #[error("Enforcement boundary is not configured: {0}")]
    NotConfigured(String),
}

/// A strict session cannot be cancelled or paused before it completes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Session is strict and cannot be stopped before it completes ({remaining_secs}s remaining)")]
pub struct SessionLockedError {
    pub remaining_secs: i64,
}

/// Illegal session state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Locked(#[from] SessionLockedError),

    #[error("Cannot {action} a session that is {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },
}

/// Degenerate schedule definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleConfigError {
    #[error("Schedule must be active on at least one day")]
    EmptyDays,

    #[error("Schedule start and end time are identical ({0}); zero-width windows never activate")]
    ZeroWidthWindow(String),
}

/// Invalid activation rule or mode definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleConfigError {
    #[error(transparent)]
    Schedule(#[from] ScheduleConfigError),

    #[error("App limit rule must list at least one app")]
    EmptyAppLimits,

    #[error("App limit for '{0}' must be greater than zero minutes")]
    ZeroAppLimit(String),

    #[error("Flow session duration must be greater than zero minutes")]
    ZeroFlowDuration,

    #[error("Focus mode name cannot be empty")]
    EmptyName,
}

/// Catalog mutation failures
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid focus mode: {0}")]
    InvalidRule(#[from] RuleConfigError),

    #[error("Focus mode not found: {0}")]
    NotFound(Uuid),

    #[error("Focus mode already exists: {0}")]
    DuplicateId(Uuid),

    #[error("Focus mode '{0}' has no flow session rule")]
    NotAFlowMode(String),

    #[error("Focus mode '{0}' is disabled")]
    Disabled(String),

    #[error("Focus mode '{0}' has no live session")]
    NoSession(String),

    #[error("Focus mode '{0}' already has a live session")]
    SessionAlreadyRunning(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

impl CatalogError {
    /// Whether this failure is a strict-lock rejection rather than a fault
    pub fn is_strict_lock(&self) -> bool {
        matches!(self, CatalogError::Session(SessionError::Locked(_)))
    }
}

impl From<SessionLockedError> for CatalogError {
    fn from(err: SessionLockedError) -> Self {
        CatalogError::Session(SessionError::Locked(err))
    }
}

/// Errors reported upward by one evaluation tick
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Applying or clearing failed; the last applied scope is retained
    #[error("Failed to update restrictions: {0}")]
    RestrictionApply(#[from] EnforcementError),
}
