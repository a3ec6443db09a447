use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use uuid::Uuid;

use crate::focus::{AppSelector, AuthorizationStatus, Evaluation, SessionState};

const STATE_VERSION: &str = "1.0";

/// Snapshot of a live flow session for `free-focus status`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSummary {
    pub mode_id: Uuid,
    pub state: SessionState,
    pub strict: bool,
    pub remaining_secs: i64,
}

/// Runtime state written by the agent after every evaluation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentState {
    /// State version
    pub version: String,

    /// Unique identifier for this agent run
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    /// Local time of the last evaluation
    pub last_evaluated: Option<NaiveDateTime>,

    /// Scope the enforcement boundary last accepted
    #[serde(default)]
    pub applied_scope: BTreeSet<AppSelector>,

    #[serde(default)]
    pub active_modes: Vec<Uuid>,

    #[serde(default)]
    pub sessions: Vec<SessionSummary>,

    #[serde(default)]
    pub authorization: AuthorizationStatus,

    /// Hash of the catalog file the agent last loaded
    pub catalog_hash: Option<String>,

    pub next_wake: Option<NaiveDateTime>,

    /// Last enforcement failure, cleared on the next success
    pub last_error: Option<String>,
}

impl AgentState {
    /// Create a new agent state
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            last_evaluated: None,
            applied_scope: BTreeSet::new(),
            active_modes: Vec::new(),
            sessions: Vec::new(),
            authorization: AuthorizationStatus::NotDetermined,
            catalog_hash: None,
            next_wake: None,
            last_error: None,
        }
    }

    /// Load agent state from file
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: AgentState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        // Validate state version
        if state.version != STATE_VERSION {
            tracing::warn!(
                "State file version mismatch (expected {}, got {}). Ignoring it.",
                STATE_VERSION,
                state.version
            );
            return Ok(None);
        }

        Ok(Some(state))
    }

    /// Save agent state to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;

        // Write atomically
        crate::platform::common::atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        Ok(())
    }

    /// Update state after an evaluation
    pub fn update_evaluated(&mut self, now: NaiveDateTime, evaluation: &Evaluation, applied: Option<&BTreeSet<AppSelector>>) {
        self.last_evaluated = Some(now);
        self.authorization = evaluation.authorization;
        self.active_modes = evaluation.active_modes.clone();
        self.next_wake = evaluation.next_transition;
        self.applied_scope = applied.cloned().unwrap_or_default();
        self.last_error = None;
    }

    /// Record an enforcement failure; the applied scope is left as it was
    pub fn update_failed(&mut self, now: NaiveDateTime, error: String) {
        self.last_evaluated = Some(now);
        self.last_error = Some(error);
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new()
    }
}
