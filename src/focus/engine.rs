use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::focus::auth::{AuthorizationState, AuthorizationStatus};
use crate::focus::catalog::{FinishedSession, FocusModeCatalog, SharedCatalog};
use crate::focus::enforcement::{format_scope, EnforcementBoundary, RestrictionCommand, Scope};
use crate::focus::error::EngineError;
use crate::focus::mode::{ActivationRule, FocusMode};
use crate::focus::schedule::ScheduleEvaluator;
use crate::focus::session::SessionState;
use crate::focus::usage::UsageSnapshot;

/// What the engine last got the boundary to accept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedScope {
    /// Nothing confirmed yet since startup
    Unknown,
    Cleared,
    Applied(Scope),
}

impl AppliedScope {
    fn matches(&self, command: &RestrictionCommand) -> bool {
        match (self, command) {
            (AppliedScope::Cleared, RestrictionCommand::Clear) => true,
            (AppliedScope::Applied(current), RestrictionCommand::Apply(target)) => current == target,
            _ => false,
        }
    }

    pub fn scope(&self) -> Option<&Scope> {
        match self {
            AppliedScope::Applied(scope) => Some(scope),
            _ => None,
        }
    }
}

/// Outcome of one evaluation tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub authorization: AuthorizationStatus,

    /// Enabled modes whose activation rule currently holds
    pub active_modes: Vec<Uuid>,

    /// Union of the active modes' scopes
    pub target: Scope,

    /// Command forwarded to the boundary this tick, if the scope changed
    pub forwarded: Option<RestrictionCommand>,

    /// Next instant at which a schedule flips or a session ends
    pub next_transition: Option<NaiveDateTime>,

    pub finished_sessions: Vec<FinishedSession>,
}

/// The policy decision loop body.
///
/// Each tick recomputes the active modes, unions their scopes and forwards
/// only scope changes to the enforcement boundary.
pub struct RestrictionEngine {
    catalog: SharedCatalog,
    authorization: Arc<AuthorizationState>,
    enforcer: Arc<dyn EnforcementBoundary>,
    applied: AppliedScope,
}

impl RestrictionEngine {
    pub fn new(
        catalog: SharedCatalog,
        authorization: Arc<AuthorizationState>,
        enforcer: Arc<dyn EnforcementBoundary>,
    ) -> Self {
        Self {
            catalog,
            authorization,
            enforcer,
            applied: AppliedScope::Unknown,
        }
    }

    pub fn applied(&self) -> &AppliedScope {
        &self.applied
    }

    /// Run one evaluation against `now` and today's usage counters.
    ///
    /// On a boundary failure the previously applied scope is kept, so the
    /// same change is attempted again on the next tick.
    pub async fn evaluate(
        &mut self,
        now: NaiveDateTime,
        usage: &UsageSnapshot,
    ) -> Result<Evaluation, EngineError> {
        let authorization = self.authorization.current_status();

        // Sessions are ticked and modes read under one lock so a tick never
        // sees a half-applied catalog edit
        let (finished_sessions, decision) = {
            let mut catalog = self.catalog.write().await;
            let finished = catalog.tick_sessions(now);
            (finished, decide(&catalog, now, usage))
        };

        let mut evaluation = Evaluation {
            authorization,
            active_modes: decision.active_modes,
            target: decision.target,
            forwarded: None,
            next_transition: decision.next_transition,
            finished_sessions,
        };

        let command = if authorization.is_approved() {
            RestrictionCommand::for_scope(evaluation.target.clone())
        } else {
            debug!("Authorization is {:?}, restrictions stay cleared", authorization);
            RestrictionCommand::Clear
        };

        if self.applied.matches(&command) {
            return Ok(evaluation);
        }

        self.forward(&command)?;
        evaluation.forwarded = Some(command);
        Ok(evaluation)
    }

    /// Clear restrictions on the way out, if any may be in place
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        if self.applied == AppliedScope::Cleared {
            return Ok(());
        }
        self.forward(&RestrictionCommand::Clear)
    }

    fn forward(&mut self, command: &RestrictionCommand) -> Result<(), EngineError> {
        let result = match command {
            RestrictionCommand::Apply(scope) => self.enforcer.apply_restriction(scope),
            RestrictionCommand::Clear => self.enforcer.clear_restriction(),
        };

        match result {
            Ok(()) => {
                self.applied = match command {
                    RestrictionCommand::Apply(scope) => {
                        info!("Restricting: {}", format_scope(scope));
                        AppliedScope::Applied(scope.clone())
                    }
                    RestrictionCommand::Clear => {
                        info!("Restrictions cleared");
                        AppliedScope::Cleared
                    }
                };
                Ok(())
            }
            Err(e) => {
                error!("Enforcement boundary rejected {:?}: {}", command, e);
                Err(EngineError::RestrictionApply(e))
            }
        }
    }
}

/// Active modes, their scope union and the next wake-up instant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decision {
    pub active_modes: Vec<Uuid>,
    pub target: Scope,
    pub next_transition: Option<NaiveDateTime>,
}

/// Evaluate every enabled mode. Scopes are additive: an app blocked by any
/// active mode stays blocked.
pub fn decide(catalog: &FocusModeCatalog, now: NaiveDateTime, usage: &UsageSnapshot) -> Decision {
    let mut decision = Decision::default();

    for mode in catalog.list().iter().filter(|m| m.enabled) {
        let session_running = catalog
            .session(mode.id)
            .is_some_and(|s| s.state() == SessionState::Running);

        if let Some(scope) = mode_scope(mode, session_running, now, usage) {
            decision.active_modes.push(mode.id);
            decision.target.extend(scope);
        }

        let next = match &mode.rule {
            Some(ActivationRule::Schedule(schedule)) => ScheduleEvaluator::next_transition(schedule, now),
            Some(ActivationRule::FlowSession(_)) => catalog.session(mode.id).and_then(|s| {
                s.ends_at(now).or_else(|| s.break_ends_at())
            }),
            _ => None,
        };

        if let Some(next) = next {
            decision.next_transition = Some(match decision.next_transition {
                Some(current) => current.min(next),
                None => next,
            });
        }
    }

    decision
}

/// Scope a mode contributes right now, `None` if it is not active
fn mode_scope(
    mode: &FocusMode,
    session_running: bool,
    now: NaiveDateTime,
    usage: &UsageSnapshot,
) -> Option<Scope> {
    let rule = mode.rule.as_ref()?;

    match rule {
        ActivationRule::Schedule(schedule) => {
            ScheduleEvaluator::is_active(schedule, now).then(|| mode.blocked_apps.clone())
        }
        ActivationRule::PickupLimit(limit) => {
            (usage.unlocks >= limit.max_unlocks).then(|| mode.blocked_apps.clone())
        }
        ActivationRule::AppLimits { limits } => {
            let exceeded: Scope = limits
                .iter()
                .filter(|l| usage.usage_of(&l.app) >= l.time_limit())
                .map(|l| l.app.clone())
                .collect();
            (!exceeded.is_empty()).then_some(exceeded)
        }
        ActivationRule::FlowSession(_) => session_running.then(|| mode.blocked_apps.clone()),
    }
}
