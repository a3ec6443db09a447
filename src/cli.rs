use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Free Focus - focus modes and app restrictions
///
/// Blocks distracting apps on a schedule, after daily usage limits, after too
/// many pickups, or during timed flow sessions.
#[derive(Parser, Debug)]
#[command(name = "free-focus")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to agent configuration file (default: platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the example focus mode catalog and a default agent config
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Manage focus modes
    Modes {
        #[command(subcommand)]
        command: ModeCommands,
    },
    /// Grant the agent permission to restrict apps
    Authorize,
    /// Withdraw the permission to restrict apps
    Revoke,
    /// Evaluate focus modes now and print the decision without enforcing it
    Check,
    /// Run the agent in the foreground
    Run {
        /// Start a flow session for this mode (name or id) first
        #[arg(long)]
        flow: Option<String>,
    },
    /// Show agent status
    Status,
}

/// Options shared by every `modes add-*` command
#[derive(ClapArgs, Debug)]
pub struct NewModeArgs {
    /// Mode name
    pub name: String,

    /// Apps to block, comma separated
    #[arg(long, value_delimiter = ',')]
    pub block: Vec<String>,

    /// Icon name
    #[arg(long)]
    pub icon: Option<String>,

    /// Create the mode disabled
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Subcommand, Debug)]
pub enum ModeCommands {
    /// List focus modes
    List,
    /// Show a focus mode in detail
    Show {
        /// Mode name or id
        mode: String,
    },
    /// Add a mode that is active during a weekly time window
    AddSchedule {
        #[command(flatten)]
        mode: NewModeArgs,

        /// Window start (HH:MM)
        #[arg(long)]
        start: String,

        /// Window end (HH:MM); earlier than start crosses midnight
        #[arg(long)]
        end: String,

        /// Days, comma separated ("mon,wed"), or weekdays / weekends / daily
        #[arg(long, default_value = "weekdays")]
        days: String,
    },
    /// Add a mode that blocks apps once their daily usage limit is reached
    AddAppLimit {
        /// Mode name
        name: String,

        /// Per-app limit as app=minutes, repeatable
        #[arg(long = "limit", required = true)]
        limits: Vec<String>,

        /// Icon name
        #[arg(long)]
        icon: Option<String>,
    },
    /// Add a mode that is active once the daily unlock count is reached
    AddPickup {
        #[command(flatten)]
        mode: NewModeArgs,

        /// Unlocks per day before the mode activates
        #[arg(long)]
        max_unlocks: u32,
    },
    /// Add a mode that is active during a timed flow session
    AddFlow {
        #[command(flatten)]
        mode: NewModeArgs,

        /// Session length in minutes
        #[arg(long, default_value = "25")]
        minutes: u32,

        /// Longest pause before the session resumes on its own, in minutes
        #[arg(long, default_value = "0")]
        break_minutes: u32,

        /// Sessions cannot be paused or cancelled early
        #[arg(long)]
        strict: bool,
    },
    /// Remove a focus mode
    Remove {
        /// Mode name or id
        mode: String,
    },
    /// Enable a focus mode
    Enable {
        /// Mode name or id
        mode: String,
    },
    /// Disable a focus mode
    Disable {
        /// Mode name or id
        mode: String,
    },
}
