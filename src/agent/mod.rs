// Agent module for the focus restriction loop
//
// The agent runs in the foreground, re-evaluates focus modes at schedule
// boundaries and on a regular tick, and picks up catalog edits made by the
// CLI by watching the catalog file's content hash.

mod config;
mod daemon;
mod scheduler;
mod state;

pub use config::{
    get_agent_config_path, AgentConfig, AgentSettings, AuthorizationConfig, EnforcementBackend, EnforcementConfig,
    LoggingConfig,
};
pub use daemon::{local_now, run_agent_daemon, short_hash};
pub use scheduler::WakeScheduler;
pub use state::{AgentState, SessionSummary};
