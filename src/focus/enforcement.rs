use std::collections::BTreeSet;
use std::process::Command;
use tracing::{debug, info};

use crate::focus::error::EnforcementError;
use crate::focus::mode::AppSelector;

/// Set of apps targeted by a restriction
pub type Scope = BTreeSet<AppSelector>;

/// Decision handed to the enforcement boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestrictionCommand {
    Apply(Scope),
    Clear,
}

impl RestrictionCommand {
    /// An empty scope clears, anything else applies
    pub fn for_scope(scope: Scope) -> Self {
        if scope.is_empty() {
            RestrictionCommand::Clear
        } else {
            RestrictionCommand::Apply(scope)
        }
    }
}

/// OS-level mechanism that actually shields applications.
///
/// Only the restriction engine calls into this.
pub trait EnforcementBoundary: Send + Sync {
    fn apply_restriction(&self, scope: &Scope) -> Result<(), EnforcementError>;
    fn clear_restriction(&self) -> Result<(), EnforcementError>;
}

/// Dry-run backend that only logs decisions
#[derive(Debug, Default)]
pub struct LogOnlyEnforcer;

impl EnforcementBoundary for LogOnlyEnforcer {
    fn apply_restriction(&self, scope: &Scope) -> Result<(), EnforcementError> {
        info!("[dry run] Would restrict: {}", format_scope(scope));
        Ok(())
    }

    fn clear_restriction(&self) -> Result<(), EnforcementError> {
        info!("[dry run] Would clear all restrictions");
        Ok(())
    }
}

/// Runs external hook commands; app selectors are appended to the apply
/// command as arguments
#[derive(Debug, Clone)]
pub struct CommandEnforcer {
    apply_command: Vec<String>,
    clear_command: Vec<String>,
}

impl CommandEnforcer {
    pub fn new(apply_command: Vec<String>, clear_command: Vec<String>) -> Self {
        Self {
            apply_command,
            clear_command,
        }
    }

    fn run(argv: &[String], extra: impl IntoIterator<Item = String>) -> Result<(), EnforcementError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| EnforcementError::NotConfigured("empty hook command".to_string()))?;

        let output = Command::new(program)
            .args(args)
            .args(extra)
            .output()
            .map_err(|e| EnforcementError::Spawn {
                command: program.clone(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            debug!("Hook '{}' succeeded", program);
            Ok(())
        } else {
            Err(EnforcementError::HookFailed {
                command: program.clone(),
                status: output.status.code().unwrap_or(-1),
            })
        }
    }
}

impl EnforcementBoundary for CommandEnforcer {
    fn apply_restriction(&self, scope: &Scope) -> Result<(), EnforcementError> {
        Self::run(&self.apply_command, scope.iter().map(|app| app.to_string()))
    }

    fn clear_restriction(&self) -> Result<(), EnforcementError> {
        Self::run(&self.clear_command, std::iter::empty())
    }
}

/// Comma separated list for logs and CLI output
pub fn format_scope(scope: &Scope) -> String {
    if scope.is_empty() {
        return "(nothing)".to_string();
    }
    scope
        .iter()
        .map(|app| app.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
