use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, MissedTickBehavior};

use super::{AgentConfig, AgentState, SessionSummary, WakeScheduler};
use crate::focus::error::CatalogError;
use crate::focus::{
    format_scope, AuthorizationBoundary, AuthorizationState, AuthorizationStatus, CatalogStore, FocusModeCatalog,
    GrantFileAuthorizer, JsonUsageFile, RestrictionEngine, SharedCatalog, UsageSnapshot, UsageSource,
    YamlCatalogStore,
};

/// How often the catalog file and grant are re-read for external edits
const WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Current local wall-clock time
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Everything the agent loop owns
struct Agent {
    store: Arc<YamlCatalogStore>,
    catalog: SharedCatalog,
    authorization: Arc<AuthorizationState>,
    auth_request: Option<JoinHandle<()>>,
    usage: Arc<dyn UsageSource>,
    engine: RestrictionEngine,
    scheduler: WakeScheduler,
    state: AgentState,
    state_path: PathBuf,
}

/// Run the agent in the foreground until Ctrl+C.
///
/// With `flow`, a flow session for that mode is started before the first
/// evaluation. The session can then be controlled by typing `pause`,
/// `resume`, `cancel` or `status` on stdin.
pub async fn run_agent_daemon(config: AgentConfig, flow: Option<String>) -> Result<()> {
    let mut agent = Agent::new(&config)?;

    tracing::info!("Starting focus agent");
    tracing::info!("Catalog: {}", agent.store.path().display());
    tracing::info!("Tick interval: {} seconds", config.agent.tick_interval);

    // Evaluation starts as NotDetermined; the answer arrives on the status channel
    agent.request_authorization();

    if let Some(query) = flow {
        agent.start_flow(&query).await?;
    }

    let notifier = agent.catalog.read().await.change_notifier();
    let mut auth_rx = agent.authorization.subscribe();
    let mut watch = interval(WATCH_INTERVAL);
    watch.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    let mut next_transition = agent.evaluate().await;

    loop {
        let deadline = agent.scheduler.deadline(local_now(), next_transition);

        tokio::select! {
            _ = sleep_until(deadline) => {}
            _ = notifier.notified() => {
                tracing::debug!("Catalog changed (revision {})", agent.catalog.read().await.revision());
            }
            changed = auth_rx.changed() => {
                if changed.is_err() {
                    anyhow::bail!("Authorization state dropped");
                }
                tracing::debug!("Authorization status is now {:?}", *auth_rx.borrow_and_update());
            }
            _ = watch.tick() => {
                agent.request_authorization();
                if !agent.reload_if_changed().await {
                    continue;
                }
            }
            line = console.next_line(), if console_open => {
                match line {
                    Ok(Some(line)) => {
                        agent.handle_console(line.trim()).await;
                    }
                    Ok(None) => console_open = false,
                    Err(e) => {
                        tracing::debug!("Console closed: {}", e);
                        console_open = false;
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                if agent.refuse_stop().await {
                    continue;
                }
                tracing::info!("Stopping focus agent");
                break;
            }
        }

        next_transition = agent.evaluate().await;
    }

    agent.shutdown();
    Ok(())
}

impl Agent {
    fn new(config: &AgentConfig) -> Result<Self> {
        let authorizer = Arc::new(GrantFileAuthorizer::new(config.grant_path()?));
        Self::with_authorizer(config, authorizer)
    }

    fn with_authorizer(config: &AgentConfig, authorizer: Arc<dyn AuthorizationBoundary>) -> Result<Self> {
        let store = Arc::new(YamlCatalogStore::new(config.catalog_path()?));
        let catalog = FocusModeCatalog::load(store.clone())?.into_shared();

        let authorization = Arc::new(AuthorizationState::new(authorizer));

        let engine = RestrictionEngine::new(catalog.clone(), authorization.clone(), config.build_enforcer());

        let mut state = AgentState::new();
        state.catalog_hash = store.content_hash()?;

        Ok(Self {
            store,
            catalog,
            authorization,
            auth_request: None,
            usage: Arc::new(JsonUsageFile::new(config.usage_path()?)),
            engine,
            scheduler: WakeScheduler::new(config.agent.tick_interval),
            state,
            state_path: config.state_path()?,
        })
    }

    async fn start_flow(&mut self, query: &str) -> Result<()> {
        let mut catalog = self.catalog.write().await;
        let id = catalog
            .find(query)
            .map(|m| m.id)
            .with_context(|| format!("No focus mode matches '{}'", query))?;

        let now = local_now();
        let session = catalog.start_session(id, now)?;
        if let Some(ends_at) = session.ends_at(now) {
            tracing::info!("Flow session ends at {}", ends_at.format("%H:%M"));
        }
        Ok(())
    }

    /// Flow session control typed on the console. Returns the outcome of
    /// pause, resume and cancel.
    async fn handle_console(&self, input: &str) -> Option<Result<(), CatalogError>> {
        let now = local_now();
        let mut catalog = self.catalog.write().await;

        let Some(id) = catalog.sessions().map(|(id, _)| id).next() else {
            if !input.is_empty() {
                tracing::info!("No flow session is running");
            }
            return None;
        };
        let name = catalog.get(id).map(|m| m.name.clone()).unwrap_or_default();

        let result = match input {
            "" => return None,
            "pause" => catalog.pause_session(id, now),
            "resume" => catalog.resume_session(id, now),
            "cancel" => catalog.cancel_session(id, now),
            "status" => {
                if let Some(session) = catalog.session(id) {
                    tracing::info!(
                        "'{}' is {:?}: started {}, {} of {} left",
                        name,
                        session.state(),
                        session.started_at().map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
                        crate::commands::utils::format_duration(session.remaining(now)),
                        crate::commands::utils::format_duration(session.duration())
                    );
                }
                return None;
            }
            other => {
                tracing::warn!("Unknown command '{}' (try pause, resume, cancel, status)", other);
                return None;
            }
        };

        match (&result, console_log_level(&result)) {
            (Ok(()), _) => tracing::info!("Flow session '{}': {} done", name, input),
            (Err(e), tracing::Level::INFO) => tracing::info!("'{}' is strict: {}", name, e),
            (Err(e), _) => tracing::warn!("Cannot {} '{}': {}", input, name, e),
        }
        Some(result)
    }

    /// One evaluation tick. Returns the next known transition.
    async fn evaluate(&mut self) -> Option<NaiveDateTime> {
        let now = local_now();
        let usage = self.read_usage(now);

        let next_transition = match self.engine.evaluate(now, &usage).await {
            Ok(evaluation) => {
                for finished in &evaluation.finished_sessions {
                    tracing::info!("Flow session for '{}' is {:?}", finished.mode_name, finished.state);
                }
                if let Some(command) = &evaluation.forwarded {
                    tracing::debug!("Forwarded {:?}", command);
                }
                self.state.update_evaluated(now, &evaluation, self.engine.applied().scope());
                evaluation.next_transition
            }
            Err(e) => {
                // Applied scope is unchanged; the next tick retries
                tracing::error!("Evaluation failed: {:#}", e);
                self.state.update_failed(now, e.to_string());
                None
            }
        };

        self.state.sessions = self.session_summaries(now).await;
        if let Err(e) = self.state.save(&self.state_path) {
            tracing::warn!("Failed to save agent state: {:#}", e);
        }

        next_transition
    }

    fn read_usage(&self, now: NaiveDateTime) -> UsageSnapshot {
        let today = now.date();
        match self.usage.snapshot(today) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Failed to read usage, treating counters as zero: {:#}", e);
                UsageSnapshot::empty(today)
            }
        }
    }

    async fn session_summaries(&self, now: NaiveDateTime) -> Vec<SessionSummary> {
        let catalog = self.catalog.read().await;
        catalog
            .sessions()
            .map(|(mode_id, session)| SessionSummary {
                mode_id,
                state: session.state(),
                strict: session.is_strict(),
                remaining_secs: session.remaining(now).num_seconds(),
            })
            .collect()
    }

    /// Re-read the grant in the background so `free-focus authorize`/`revoke`
    /// take effect. At most one request is in flight; its result reaches the
    /// loop through the status channel.
    fn request_authorization(&mut self) {
        if self.auth_request.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!("Authorization request still pending");
            return;
        }

        let authorization = self.authorization.clone();
        self.auth_request = Some(tokio::spawn(async move {
            let before = authorization.current_status();
            match authorization.request_authorization().await {
                Ok(_) => {}
                Err(e) if before == AuthorizationStatus::Denied => tracing::debug!("Authorization: {}", e),
                // Denial is not fatal: restrictions stay cleared until a grant appears
                Err(e) => tracing::warn!("Restrictions stay off until authorized: {}", e),
            }
        }));
    }

    /// Reload the catalog when the file content changed. Returns whether it did.
    async fn reload_if_changed(&mut self) -> bool {
        let hash = match self.store.content_hash() {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!("Failed to check catalog file: {:#}", e);
                return false;
            }
        };

        if hash == self.state.catalog_hash {
            return false;
        }

        let modes = match self.store.load() {
            Ok(modes) => modes,
            Err(e) => {
                // Keep evaluating the last good catalog
                tracing::error!("Catalog edit rejected: {:#}", e);
                self.state.catalog_hash = hash;
                return false;
            }
        };

        tracing::info!(
            "Catalog changed (hash: {})",
            hash.as_deref().map(short_hash).unwrap_or("none")
        );

        if let Err(e) = self.catalog.write().await.reload(modes, local_now()) {
            tracing::error!("Failed to apply catalog edit: {}", e);
            return false;
        }

        self.state.catalog_hash = hash;
        true
    }

    /// A running strict flow session cannot be escaped by stopping the agent
    async fn refuse_stop(&self) -> bool {
        let now = local_now();
        let catalog = self.catalog.read().await;

        let locked = catalog
            .sessions()
            .find(|(_, session)| session.is_strict() && session.state().is_live());

        match locked {
            Some((id, session)) => {
                let name = catalog.get(id).map(|m| m.name.as_str()).unwrap_or("unknown");
                tracing::info!(
                    "Strict flow session '{}' is running ({} remaining), not stopping",
                    name,
                    crate::commands::utils::format_duration(session.remaining(now))
                );
                true
            }
            None => false,
        }
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.auth_request.take() {
            task.abort();
        }

        match self.engine.shutdown() {
            Ok(()) => self.state.applied_scope.clear(),
            Err(e) => {
                tracing::error!(
                    "Failed to clear restrictions on shutdown ({} still applied): {}",
                    self.engine.applied().scope().map(format_scope).unwrap_or_default(),
                    e
                );
            }
        }

        if let Err(e) = self.state.save(&self.state_path) {
            tracing::warn!("Failed to save agent state: {:#}", e);
        }
    }
}

/// Strict-lock refusals are expected policy, so they log at info
fn console_log_level(result: &Result<(), CatalogError>) -> tracing::Level {
    match result {
        Err(e) if !e.is_strict_lock() => tracing::Level::WARN,
        _ => tracing::Level::INFO,
    }
}

/// Abbreviated `sha256:` hash for logs
pub fn short_hash(hash: &str) -> &str {
    let end = hash.len().min("sha256:".len() + 12);
    &hash[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::AgentSettings;
    use crate::focus::compute_content_hash;
    use crate::focus::engine::AppliedScope;
    use crate::focus::{ActivationRule, DayOfWeek, FocusMode, Schedule, SessionState};
    use chrono::NaiveTime;

    fn test_config(dir: &std::path::Path) -> AgentConfig {
        let mut config = AgentConfig {
            agent: AgentSettings {
                catalog_path: Some(dir.join("focus-modes.yaml")),
                usage_path: Some(dir.join("usage.json")),
                state_path: Some(dir.join("state.json")),
                ..Default::default()
            },
            ..Default::default()
        };
        config.authorization.grant_path = Some(dir.join("grant.json"));
        config
    }

    fn all_day(name: &str, apps: &[&str]) -> FocusMode {
        let start = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(23, 59, 0).unwrap();
        FocusMode::new(
            name,
            Some(ActivationRule::Schedule(Schedule::new(start, end, DayOfWeek::ALL))),
        )
        .with_blocked_apps(apps.iter().copied())
    }

    #[test]
    fn short_hash_truncates() {
        let hash = compute_content_hash("modes: []");
        assert_eq!(short_hash(&hash).len(), 19);
        assert_eq!(short_hash("sha256:ab"), "sha256:ab");
    }

    #[tokio::test]
    async fn agent_reloads_external_catalog_edit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let mut agent = Agent::new(&config).unwrap();

        assert!(!agent.reload_if_changed().await);

        // An edit made by another process
        let store = YamlCatalogStore::new(config.catalog_path().unwrap());
        store.save(&[all_day("Everything", &["slack"])]).unwrap();

        assert!(agent.reload_if_changed().await);
        assert_eq!(agent.catalog.read().await.list().len(), 1);
        assert!(!agent.reload_if_changed().await);
    }

    #[tokio::test]
    async fn agent_keeps_catalog_on_broken_edit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());

        let store = YamlCatalogStore::new(config.catalog_path().unwrap());
        store.save(&[all_day("Everything", &["slack"])]).unwrap();
        let mut agent = Agent::new(&config).unwrap();

        std::fs::write(config.catalog_path().unwrap(), "modes: [not valid").unwrap();
        assert!(!agent.reload_if_changed().await);
        assert_eq!(agent.catalog.read().await.list().len(), 1);
    }

    #[tokio::test]
    async fn agent_evaluation_writes_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());

        let store = YamlCatalogStore::new(config.catalog_path().unwrap());
        store.save(&[all_day("Everything", &["slack"])]).unwrap();
        GrantFileAuthorizer::new(config.grant_path().unwrap()).grant().unwrap();

        let mut agent = Agent::new(&config).unwrap();
        agent.authorization.request_authorization().await.unwrap();
        agent.evaluate().await;

        let state = AgentState::load(&config.state_path().unwrap()).unwrap().unwrap();
        assert_eq!(state.authorization, AuthorizationStatus::Approved);
        assert_eq!(state.catalog_hash, store.content_hash().unwrap());
        assert!(state.last_evaluated.is_some());

        agent.shutdown();
        let state = AgentState::load(&config.state_path().unwrap()).unwrap().unwrap();
        assert!(state.applied_scope.is_empty());
    }

    /// Host that answers only once the test lets it
    struct GatedAuthorizer {
        release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl AuthorizationBoundary for GatedAuthorizer {
        fn request_authorization(
            &self,
        ) -> std::result::Result<AuthorizationStatus, crate::focus::error::AuthorizationError> {
            let release = self.release.lock().unwrap();
            release.recv().unwrap();
            Ok(AuthorizationStatus::Approved)
        }
    }

    #[tokio::test]
    async fn agent_evaluates_while_authorization_pending() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        // Zero pickups allowed keeps the mode active at any hour
        let always = FocusMode::new(
            "No Phone",
            Some(ActivationRule::PickupLimit(crate::focus::PickupLimit { max_unlocks: 0 })),
        )
        .with_blocked_apps(["slack"]);
        YamlCatalogStore::new(config.catalog_path().unwrap())
            .save(&[always])
            .unwrap();

        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let authorizer = Arc::new(GatedAuthorizer {
            release: std::sync::Mutex::new(release_rx),
        });
        let mut agent = Agent::with_authorizer(&config, authorizer).unwrap();
        let mut auth_rx = agent.authorization.subscribe();

        agent.request_authorization();
        // A second request while the first is pending is not queued
        agent.request_authorization();

        // Pending counts as not authorized and does not hold up the tick
        tokio::time::timeout(Duration::from_secs(5), agent.evaluate())
            .await
            .unwrap();
        assert_eq!(agent.authorization.current_status(), AuthorizationStatus::NotDetermined);
        assert_eq!(agent.engine.applied(), &AppliedScope::Cleared);

        release_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), auth_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*auth_rx.borrow(), AuthorizationStatus::Approved);

        agent.evaluate().await;
        let applied = agent.engine.applied().scope().cloned().unwrap_or_default();
        assert_eq!(format_scope(&applied), "slack");
    }

    fn flow_mode(strict: bool) -> FocusMode {
        FocusMode::new(
            "Deep Work",
            Some(ActivationRule::FlowSession(crate::focus::FlowSession {
                duration_minutes: 25,
                break_minutes: 0,
            })),
        )
        .strict(strict)
    }

    #[tokio::test]
    async fn agent_console_controls_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        YamlCatalogStore::new(config.catalog_path().unwrap())
            .save(&[flow_mode(false)])
            .unwrap();

        let mut agent = Agent::new(&config).unwrap();
        assert!(agent.handle_console("pause").await.is_none());

        agent.start_flow("deep work").await.unwrap();
        let state = |agent: &Agent| {
            let catalog = agent.catalog.try_read().unwrap();
            catalog.sessions().map(|(_, s)| s.state()).next()
        };

        assert!(agent.handle_console("pause").await.unwrap().is_ok());
        assert_eq!(state(&agent), Some(SessionState::Paused));

        assert!(agent.handle_console("resume").await.unwrap().is_ok());
        assert_eq!(state(&agent), Some(SessionState::Running));

        assert!(agent.handle_console("status").await.is_none());
        assert!(agent.handle_console("bogus").await.is_none());

        assert!(agent.handle_console("cancel").await.unwrap().is_ok());
        assert_eq!(state(&agent), None);
    }

    #[tokio::test]
    async fn agent_console_refuses_strict_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        YamlCatalogStore::new(config.catalog_path().unwrap())
            .save(&[flow_mode(true)])
            .unwrap();

        let mut agent = Agent::new(&config).unwrap();
        agent.start_flow("deep work").await.unwrap();

        for command in ["pause", "cancel"] {
            let result = agent.handle_console(command).await.unwrap();
            assert!(result.as_ref().unwrap_err().is_strict_lock());
            assert_eq!(console_log_level(&result), tracing::Level::INFO);
        }

        let catalog = agent.catalog.read().await;
        let (_, session) = catalog.sessions().next().unwrap();
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn console_failures_log_as_warnings() {
        let result = Err(CatalogError::NoSession("Deep Work".to_string()));
        assert_eq!(console_log_level(&result), tracing::Level::WARN);
        assert_eq!(console_log_level(&Ok(())), tracing::Level::INFO);
    }

    #[tokio::test]
    async fn agent_refuses_stop_during_strict_flow() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());

        let flow = FocusMode::new(
            "Deep Work",
            Some(ActivationRule::FlowSession(crate::focus::FlowSession {
                duration_minutes: 25,
                break_minutes: 0,
            })),
        )
        .strict(true);
        YamlCatalogStore::new(config.catalog_path().unwrap()).save(&[flow]).unwrap();

        let mut agent = Agent::new(&config).unwrap();
        assert!(!agent.refuse_stop().await);

        agent.start_flow("deep work").await.unwrap();
        assert!(agent.refuse_stop().await);
    }
}
