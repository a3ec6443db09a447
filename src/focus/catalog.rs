use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::focus::error::{CatalogError, SessionError};
use crate::focus::mode::FocusMode;
use crate::focus::session::{SessionState, SessionTimer};

/// Current catalog file version
const CATALOG_VERSION: &str = "1.0";

/// Catalog shared between the engine loop and command handlers
pub type SharedCatalog = Arc<RwLock<FocusModeCatalog>>;

/// Persistence collaborator: load at startup, save on every mutation
pub trait CatalogStore: Send + Sync {
    fn load(&self) -> Result<Vec<FocusMode>>;
    fn save(&self, modes: &[FocusMode]) -> Result<()>;
}

/// On-disk catalog layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogFile {
    pub version: String,

    #[serde(default)]
    pub modes: Vec<FocusMode>,
}

/// YAML file backed catalog store
pub struct YamlCatalogStore {
    path: PathBuf,
}

impl YamlCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the file content, `None` if the file does not exist
    pub fn content_hash(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read catalog file: {}", self.path.display()))?;

        Ok(Some(compute_content_hash(&content)))
    }
}

impl CatalogStore for YamlCatalogStore {
    fn load(&self) -> Result<Vec<FocusMode>> {
        if !self.path.exists() {
            debug!("No catalog file at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read catalog file: {}", self.path.display()))?;

        let file: CatalogFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML catalog file: {}", self.path.display()))?;

        if file.version != CATALOG_VERSION {
            warn!(
                "Catalog file version mismatch (expected {}, got {}), loading anyway",
                CATALOG_VERSION, file.version
            );
        }

        Ok(file.modes)
    }

    fn save(&self, modes: &[FocusMode]) -> Result<()> {
        let file = CatalogFile {
            version: CATALOG_VERSION.to_string(),
            modes: modes.to_vec(),
        };

        let content = serde_yaml::to_string(&file).context("Failed to serialize catalog to YAML")?;

        crate::platform::common::atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write catalog file: {}", self.path.display()))?;

        Ok(())
    }
}

/// Compute SHA-256 hash of catalog content
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("sha256:{}", hex)
}

/// A session that completed or was cancelled during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    pub mode_id: Uuid,
    pub mode_name: String,
    pub state: SessionState,
}

/// Focus mode definitions keyed by id, plus their live flow sessions
pub struct FocusModeCatalog {
    modes: Vec<FocusMode>,
    sessions: HashMap<Uuid, SessionTimer>,
    store: Option<Arc<dyn CatalogStore>>,
    revision: u64,
    changed: Arc<Notify>,
}

impl FocusModeCatalog {
    /// Catalog without persistence
    pub fn in_memory() -> Self {
        Self {
            modes: Vec::new(),
            sessions: HashMap::new(),
            store: None,
            revision: 0,
            changed: Arc::new(Notify::new()),
        }
    }

    /// Load definitions from the store. Invalid modes are skipped so they
    /// never reach the evaluator.
    pub fn load(store: Arc<dyn CatalogStore>) -> Result<Self> {
        let loaded = store.load().context("Failed to load focus modes")?;

        let mut catalog = Self::in_memory();
        catalog.modes = Self::accept_valid(loaded);
        catalog.store = Some(store);

        info!("Loaded {} focus mode(s)", catalog.modes.len());
        Ok(catalog)
    }

    pub fn into_shared(self) -> SharedCatalog {
        Arc::new(RwLock::new(self))
    }

    pub fn list(&self) -> &[FocusMode] {
        &self.modes
    }

    pub fn get(&self, id: Uuid) -> Option<&FocusMode> {
        self.modes.iter().find(|m| m.id == id)
    }

    /// Look up by full id, id prefix, or case-insensitive name
    pub fn find(&self, query: &str) -> Option<&FocusMode> {
        if let Ok(id) = Uuid::parse_str(query) {
            return self.get(id);
        }

        let lower = query.to_lowercase();
        self.modes
            .iter()
            .find(|m| m.name.to_lowercase() == lower)
            .or_else(|| {
                let mut matches = self
                    .modes
                    .iter()
                    .filter(|m| m.id.simple().to_string().starts_with(&lower));
                match (matches.next(), matches.next()) {
                    (Some(only), None) if !lower.is_empty() => Some(only),
                    _ => None,
                }
            })
    }

    /// Incremented on every successful mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Signalled after every successful mutation
    pub fn change_notifier(&self) -> Arc<Notify> {
        self.changed.clone()
    }

    pub fn add(&mut self, mode: FocusMode) -> Result<Uuid, CatalogError> {
        mode.validate()?;

        if self.get(mode.id).is_some() {
            return Err(CatalogError::DuplicateId(mode.id));
        }

        let id = mode.id;
        let name = mode.name.clone();
        let mut modes = self.modes.clone();
        modes.push(mode);
        self.commit(modes)?;

        info!("Added focus mode '{}' ({})", name, id);
        Ok(id)
    }

    /// Replace a mode's definition. Takes effect on the next evaluation.
    pub fn update(&mut self, mode: FocusMode, now: NaiveDateTime) -> Result<(), CatalogError> {
        mode.validate()?;

        let pos = self
            .modes
            .iter()
            .position(|m| m.id == mode.id)
            .ok_or(CatalogError::NotFound(mode.id))?;

        // A live session cannot outlive its flow rule
        let ends_session = !mode.enabled || mode.flow_session().is_none();
        if ends_session {
            self.ensure_session_can_end(mode.id, now)?;
        }

        let id = mode.id;
        let name = mode.name.clone();
        let mut modes = self.modes.clone();
        modes[pos] = mode;
        self.commit(modes)?;

        if ends_session {
            self.drop_session(id);
        }

        debug!("Updated focus mode '{}'", name);
        Ok(())
    }

    /// Remove a mode and end its live session
    pub fn remove(&mut self, id: Uuid, now: NaiveDateTime) -> Result<FocusMode, CatalogError> {
        let pos = self
            .modes
            .iter()
            .position(|m| m.id == id)
            .ok_or(CatalogError::NotFound(id))?;

        self.ensure_session_can_end(id, now)?;

        let mut modes = self.modes.clone();
        let removed = modes.remove(pos);
        self.commit(modes)?;
        self.drop_session(id);

        info!("Removed focus mode '{}' ({})", removed.name, id);
        Ok(removed)
    }

    pub fn set_enabled(&mut self, id: Uuid, enabled: bool, now: NaiveDateTime) -> Result<(), CatalogError> {
        let mut mode = self.get(id).cloned().ok_or(CatalogError::NotFound(id))?;
        if mode.enabled == enabled {
            return Ok(());
        }
        mode.enabled = enabled;
        self.update(mode, now)
    }

    /// Replace every definition with what an external edit left in the store.
    ///
    /// Sessions of modes that disappeared are cancelled; a strict session
    /// that cannot be cancelled keeps its old definition until it finishes.
    pub fn reload(&mut self, modes: Vec<FocusMode>, now: NaiveDateTime) -> Result<(), CatalogError> {
        let mut accepted = Self::accept_valid(modes);

        let orphaned: Vec<Uuid> = self
            .sessions
            .keys()
            .filter(|id| {
                accepted
                    .iter()
                    .find(|m| m.id == **id)
                    .map(|m| !m.enabled || m.flow_session().is_none())
                    .unwrap_or(true)
            })
            .copied()
            .collect();

        for id in orphaned {
            match self.ensure_session_can_end(id, now) {
                Ok(()) => self.drop_session(id),
                Err(e) if e.is_strict_lock() => {
                    info!("Keeping strict session for mode {} until it completes", id);
                    if let Some(old) = self.get(id).cloned() {
                        accepted.retain(|m| m.id != id);
                        accepted.push(old);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        self.modes = accepted;
        self.bump();
        info!("Reloaded {} focus mode(s)", self.modes.len());
        Ok(())
    }

    /// Start the flow session configured on a mode
    pub fn start_session(&mut self, id: Uuid, now: NaiveDateTime) -> Result<&SessionTimer, CatalogError> {
        let mode = self.get(id).ok_or(CatalogError::NotFound(id))?;

        if !mode.enabled {
            return Err(CatalogError::Disabled(mode.name.clone()));
        }

        let flow = *mode
            .flow_session()
            .ok_or_else(|| CatalogError::NotAFlowMode(mode.name.clone()))?;

        if self.sessions.get(&id).is_some_and(|s| s.state().is_live()) {
            return Err(CatalogError::SessionAlreadyRunning(mode.name.clone()));
        }

        let mut session = SessionTimer::new(mode.strict, flow.break_time());
        session.start(flow.duration(), now)?;

        info!(
            "Started {} minute flow session for '{}'{}",
            flow.duration_minutes,
            mode.name,
            if mode.strict { " (strict)" } else { "" }
        );

        self.sessions.insert(id, session);
        self.bump();
        Ok(&self.sessions[&id])
    }

    pub fn pause_session(&mut self, id: Uuid, now: NaiveDateTime) -> Result<(), CatalogError> {
        let session = self.live_session_mut(id, now)?;
        session.pause(now)?;
        self.bump();
        Ok(())
    }

    pub fn resume_session(&mut self, id: Uuid, now: NaiveDateTime) -> Result<(), CatalogError> {
        let session = self.live_session_mut(id, now)?;
        session.resume(now)?;
        self.bump();
        Ok(())
    }

    /// Cancel a mode's session. Strict sessions are refused until complete.
    pub fn cancel_session(&mut self, id: Uuid, now: NaiveDateTime) -> Result<(), CatalogError> {
        self.live_session_mut(id, now)?.cancel(now)?;
        self.drop_session(id);
        self.bump();
        Ok(())
    }

    pub fn session(&self, id: Uuid) -> Option<&SessionTimer> {
        self.sessions.get(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = (Uuid, &SessionTimer)> {
        self.sessions.iter().map(|(id, s)| (*id, s))
    }

    /// Advance every session and drop the ones that finished
    pub fn tick_sessions(&mut self, now: NaiveDateTime) -> Vec<FinishedSession> {
        let mut finished = Vec::new();

        for (id, session) in self.sessions.iter_mut() {
            let state = session.tick(now);
            if state.is_finished() {
                let mode_name = self
                    .modes
                    .iter()
                    .find(|m| m.id == *id)
                    .map(|m| m.name.clone())
                    .unwrap_or_default();
                finished.push(FinishedSession {
                    mode_id: *id,
                    mode_name,
                    state,
                });
            }
        }

        for done in &finished {
            self.sessions.remove(&done.mode_id);
            info!("Flow session for '{}' {:?}", done.mode_name, done.state);
        }

        finished
    }

    /// Fails if the mode's session refuses to end. Nothing changes here so a
    /// failed commit leaves the session running.
    fn ensure_session_can_end(&self, id: Uuid, now: NaiveDateTime) -> Result<(), CatalogError> {
        let Some(session) = self.sessions.get(&id) else {
            return Ok(());
        };

        match session.clone().cancel(now) {
            Ok(()) | Err(SessionError::InvalidTransition { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn drop_session(&mut self, id: Uuid) {
        if self.sessions.remove(&id).is_some() {
            debug!("Ended flow session for mode {}", id);
        }
    }

    fn live_session_mut(&mut self, id: Uuid, now: NaiveDateTime) -> Result<&mut SessionTimer, CatalogError> {
        let name = self
            .get(id)
            .map(|m| m.name.clone())
            .ok_or(CatalogError::NotFound(id))?;

        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| CatalogError::NoSession(name.clone()))?;

        if session.tick(now).is_finished() {
            return Err(CatalogError::NoSession(name));
        }

        Ok(session)
    }

    fn accept_valid(modes: Vec<FocusMode>) -> Vec<FocusMode> {
        let mut seen = std::collections::HashSet::new();
        modes
            .into_iter()
            .filter(|mode| match mode.validate() {
                Ok(()) if seen.insert(mode.id) => true,
                Ok(()) => {
                    warn!("Skipping duplicate focus mode id {}", mode.id);
                    false
                }
                Err(e) => {
                    warn!("Skipping invalid focus mode '{}': {}", mode.name, e);
                    false
                }
            })
            .collect()
    }

    fn commit(&mut self, modes: Vec<FocusMode>) -> Result<(), CatalogError> {
        if let Some(store) = &self.store {
            store.save(&modes)?;
        }
        self.modes = modes;
        self.bump();
        Ok(())
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.changed.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::mode::{ActivationRule, DayOfWeek, FlowSession, Schedule};
    use chrono::{NaiveDate, NaiveTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 19)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn schedule_mode(name: &str) -> FocusMode {
        FocusMode::new(
            name,
            Some(ActivationRule::Schedule(Schedule::new(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                DayOfWeek::WEEKDAYS,
            ))),
        )
        .with_blocked_apps(["slack"])
    }

    fn flow_mode(strict: bool) -> FocusMode {
        FocusMode::new(
            "Deep Work",
            Some(ActivationRule::FlowSession(FlowSession {
                duration_minutes: 25,
                break_minutes: 5,
            })),
        )
        .strict(strict)
        .with_blocked_apps(["discord"])
    }

    #[test]
    fn test_add_and_list() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(schedule_mode("Work")).unwrap();

        assert_eq!(catalog.list().len(), 1);
        assert_eq!(catalog.get(id).unwrap().name, "Work");
        assert_eq!(catalog.revision(), 1);
    }

    #[test]
    fn test_add_rejects_empty_days() {
        let mut catalog = FocusModeCatalog::in_memory();
        let mut mode = schedule_mode("Broken");
        if let Some(ActivationRule::Schedule(schedule)) = &mut mode.rule {
            schedule.days.clear();
        }

        let err = catalog.add(mode).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRule(_)));
        assert!(catalog.list().is_empty());
        assert_eq!(catalog.revision(), 0);
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut catalog = FocusModeCatalog::in_memory();
        let mode = schedule_mode("Work");
        catalog.add(mode.clone()).unwrap();
        assert!(matches!(catalog.add(mode), Err(CatalogError::DuplicateId(_))));
    }

    #[test]
    fn test_names_need_not_be_unique() {
        let mut catalog = FocusModeCatalog::in_memory();
        catalog.add(schedule_mode("Work")).unwrap();
        catalog.add(schedule_mode("Work")).unwrap();
        assert_eq!(catalog.list().len(), 2);
    }

    #[test]
    fn test_update_keeps_identity() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(schedule_mode("Work")).unwrap();

        let mut edited = catalog.get(id).unwrap().clone();
        edited.name = "Office".to_string();
        catalog.update(edited, now()).unwrap();

        assert_eq!(catalog.get(id).unwrap().name, "Office");
        assert!(catalog.find("office").is_some());
    }

    #[test]
    fn test_update_unknown_mode() {
        let mut catalog = FocusModeCatalog::in_memory();
        let result = catalog.update(schedule_mode("Ghost"), now());
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_remove_cancels_session() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(flow_mode(false)).unwrap();
        catalog.start_session(id, now()).unwrap();

        catalog.remove(id, now() + chrono::Duration::minutes(5)).unwrap();
        assert!(catalog.session(id).is_none());
        assert!(catalog.list().is_empty());
    }

    #[test]
    fn test_remove_refused_while_strict_session_runs() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(flow_mode(true)).unwrap();
        catalog.start_session(id, now()).unwrap();

        let err = catalog.remove(id, now() + chrono::Duration::minutes(5)).unwrap_err();
        assert!(err.is_strict_lock());
        assert!(catalog.get(id).is_some());
        assert_eq!(catalog.session(id).unwrap().state(), SessionState::Running);

        // Once the session is over the mode can go
        catalog.remove(id, now() + chrono::Duration::minutes(25)).unwrap();
        assert!(catalog.get(id).is_none());
    }

    #[test]
    fn test_start_session_requires_flow_rule() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(schedule_mode("Work")).unwrap();
        assert!(matches!(
            catalog.start_session(id, now()),
            Err(CatalogError::NotAFlowMode(_))
        ));
    }

    #[test]
    fn test_start_session_twice() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(flow_mode(false)).unwrap();
        catalog.start_session(id, now()).unwrap();
        assert!(matches!(
            catalog.start_session(id, now()),
            Err(CatalogError::SessionAlreadyRunning(_))
        ));
    }

    #[test]
    fn test_tick_sessions_reports_completion() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(flow_mode(true)).unwrap();
        catalog.start_session(id, now()).unwrap();

        assert!(catalog.tick_sessions(now() + chrono::Duration::minutes(10)).is_empty());

        let finished = catalog.tick_sessions(now() + chrono::Duration::minutes(25));
        assert_eq!(
            finished,
            vec![FinishedSession {
                mode_id: id,
                mode_name: "Deep Work".to_string(),
                state: SessionState::Completed,
            }]
        );
        assert!(catalog.session(id).is_none());
    }

    #[test]
    fn test_cancel_session_without_session() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(flow_mode(false)).unwrap();
        assert!(matches!(
            catalog.cancel_session(id, now()),
            Err(CatalogError::NoSession(_))
        ));
    }

    #[test]
    fn test_disable_cancels_session() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(flow_mode(false)).unwrap();
        catalog.start_session(id, now()).unwrap();

        catalog.set_enabled(id, false, now()).unwrap();
        assert!(catalog.session(id).is_none());
        assert!(!catalog.get(id).unwrap().enabled);
    }

    #[test]
    fn test_find_by_prefix() {
        let mut catalog = FocusModeCatalog::in_memory();
        let id = catalog.add(schedule_mode("Work")).unwrap();
        let prefix = &id.simple().to_string()[..8];

        assert_eq!(catalog.find(prefix).unwrap().id, id);
        assert_eq!(catalog.find(&id.to_string()).unwrap().id, id);
        assert!(catalog.find("nothing").is_none());
    }

    #[test]
    fn test_reload_keeps_strict_session_mode() {
        let mut catalog = FocusModeCatalog::in_memory();
        let strict_id = catalog.add(flow_mode(true)).unwrap();
        catalog.start_session(strict_id, now()).unwrap();

        catalog.reload(vec![schedule_mode("Work")], now()).unwrap();

        assert_eq!(catalog.list().len(), 2);
        assert!(catalog.get(strict_id).is_some());
        assert!(catalog.session(strict_id).is_some());
    }

    #[test]
    fn test_reload_cancels_orphaned_sessions() {
        let mut catalog = FocusModeCatalog::in_memory();
        let removed_id = catalog.add(flow_mode(false)).unwrap();
        let disabled_id = catalog.add(flow_mode(false)).unwrap();
        catalog.start_session(removed_id, now()).unwrap();
        catalog.start_session(disabled_id, now()).unwrap();

        let mut disabled = catalog.get(disabled_id).unwrap().clone();
        disabled.enabled = false;
        catalog.reload(vec![disabled], now() + chrono::Duration::minutes(5)).unwrap();

        assert!(catalog.get(removed_id).is_none());
        assert!(catalog.session(removed_id).is_none());
        assert!(!catalog.get(disabled_id).unwrap().enabled);
        assert!(catalog.session(disabled_id).is_none());
    }

    /// Store whose saves can be switched to fail
    #[derive(Default)]
    struct FlakyStore {
        failing: std::sync::atomic::AtomicBool,
    }

    impl CatalogStore for FlakyStore {
        fn load(&self) -> Result<Vec<FocusMode>> {
            Ok(Vec::new())
        }

        fn save(&self, _modes: &[FocusMode]) -> Result<()> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            Ok(())
        }
    }

    #[test]
    fn test_failed_save_keeps_session() {
        let store = Arc::new(FlakyStore::default());
        let mut catalog = FocusModeCatalog::load(store.clone()).unwrap();
        let id = catalog.add(flow_mode(false)).unwrap();
        catalog.start_session(id, now()).unwrap();

        store.failing.store(true, std::sync::atomic::Ordering::SeqCst);
        let later = now() + chrono::Duration::minutes(5);

        assert!(matches!(catalog.remove(id, later), Err(CatalogError::Persist(_))));
        assert!(matches!(
            catalog.set_enabled(id, false, later),
            Err(CatalogError::Persist(_))
        ));
        assert!(catalog.get(id).unwrap().enabled);
        assert_eq!(catalog.session(id).unwrap().state(), SessionState::Running);

        // Once the store recovers the removal goes through
        store.failing.store(false, std::sync::atomic::Ordering::SeqCst);
        catalog.remove(id, later).unwrap();
        assert!(catalog.get(id).is_none());
        assert!(catalog.session(id).is_none());
    }

    #[test]
    fn test_yaml_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("focus-modes.yaml");
        let store: Arc<dyn CatalogStore> = Arc::new(YamlCatalogStore::new(&path));

        let mut catalog = FocusModeCatalog::load(store.clone()).unwrap();
        assert!(catalog.list().is_empty());

        let id = catalog.add(schedule_mode("Work")).unwrap();
        assert!(path.exists());

        let reloaded = FocusModeCatalog::load(store).unwrap();
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.get(id).unwrap(), catalog.get(id).unwrap());
    }

    #[test]
    fn test_load_skips_invalid_modes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("focus-modes.yaml");
        std::fs::write(
            &path,
            r#"version: "1.0"
modes:
  - id: 6f1c2a4e-8d8b-4a7e-9a55-2b7f0f3d1c11
    name: Zero width
    rule:
      type: schedule
      start: "09:00"
      end: "09:00"
      days: [monday]
  - id: 6f1c2a4e-8d8b-4a7e-9a55-2b7f0f3d1c12
    name: Evenings
    rule:
      type: schedule
      start: "18:00"
      end: "22:00"
      days: [monday]
"#,
        )
        .unwrap();

        let catalog = FocusModeCatalog::load(Arc::new(YamlCatalogStore::new(&path))).unwrap();
        assert_eq!(catalog.list().len(), 1);
        assert_eq!(catalog.list()[0].name, "Evenings");
    }

    #[test]
    fn test_content_hash_format() {
        let hash = compute_content_hash("modes: []");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), 71);
        assert_eq!(hash, compute_content_hash("modes: []"));
        assert_ne!(hash, compute_content_hash("modes: [ ]"));
    }
}
