use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::agent::{self, local_now, short_hash, AgentConfig, AgentState};
use crate::focus::engine::decide;
use crate::focus::{
    format_scope, AuthorizationBoundary, AuthorizationStatus, FocusModeCatalog, GrantFileAuthorizer, JsonUsageFile,
    RestrictionCommand, UsageSnapshot, UsageSource, YamlCatalogStore,
};

use super::utils::format_duration;

/// Example catalog written by `free-focus init`
pub const EXAMPLE_CATALOG: &str = include_str!("../../example-focus-modes.yaml");

/// Write the example catalog and a default agent config
pub fn init(config_path: &Path, config: &AgentConfig, force: bool) -> Result<()> {
    let catalog_path = config.catalog_path()?;

    // Check if file exists
    if catalog_path.exists() && !force {
        anyhow::bail!(
            "Catalog file already exists: {}\nUse --force to overwrite",
            catalog_path.display()
        );
    }

    crate::platform::common::atomic_write(&catalog_path, EXAMPLE_CATALOG.as_bytes())
        .with_context(|| format!("Failed to write catalog file: {}", catalog_path.display()))?;
    println!("✓ Created focus mode catalog: {}", catalog_path.display());

    if !config_path.exists() || force {
        config.save(config_path)?;
        println!("✓ Created agent configuration: {}", config_path.display());
    }

    println!();
    println!("Next steps:");
    println!("  1. Review the modes:     free-focus modes list");
    println!("  2. Allow restrictions:   free-focus authorize");
    println!("  3. Start the agent:      free-focus run");

    Ok(())
}

/// Record the user's consent to restrict apps
pub fn authorize(config: &AgentConfig) -> Result<()> {
    let authorizer = GrantFileAuthorizer::new(config.grant_path()?);
    let grant = authorizer.grant()?;

    println!("✓ Restrictions authorized by {}", grant.granted_by);
    println!("  Grant saved to: {}", authorizer.path().display());
    Ok(())
}

/// Withdraw consent; a running agent clears restrictions on its next check
pub fn revoke(config: &AgentConfig) -> Result<()> {
    let authorizer = GrantFileAuthorizer::new(config.grant_path()?);

    if authorizer.revoke()? {
        println!("✓ Authorization revoked. Restrictions will be cleared.");
    } else {
        println!("No authorization was granted.");
    }
    Ok(())
}

/// Evaluate every mode at the current time without touching the boundary
pub fn check(config: &AgentConfig) -> Result<()> {
    let now = local_now();
    let catalog = FocusModeCatalog::load(Arc::new(YamlCatalogStore::new(config.catalog_path()?)))?;

    let usage = JsonUsageFile::new(config.usage_path()?)
        .snapshot(now.date())
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to read usage, treating counters as zero: {:#}", e);
            UsageSnapshot::empty(now.date())
        });

    let authorization = GrantFileAuthorizer::new(config.grant_path()?)
        .request_authorization()
        .unwrap_or_else(|e| {
            tracing::warn!("Authorization check failed: {}", e);
            AuthorizationStatus::NotDetermined
        });

    let decision = decide(&catalog, now, &usage);

    println!("Focus check at {}", now.format("%Y-%m-%d %H:%M"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Authorization: {:?}", authorization);
    println!("Unlocks today: {}", usage.unlocks);
    println!();

    if decision.active_modes.is_empty() {
        println!("Active modes:  none");
    } else {
        println!("Active modes:");
        for id in &decision.active_modes {
            if let Some(mode) = catalog.get(*id) {
                println!("  - {} ({})", mode.name, super::modes::describe_rule(mode));
            }
        }
    }

    let command = if authorization.is_approved() {
        RestrictionCommand::for_scope(decision.target.clone())
    } else {
        RestrictionCommand::Clear
    };

    println!();
    match &command {
        RestrictionCommand::Apply(scope) => println!("Decision:      restrict {}", format_scope(scope)),
        RestrictionCommand::Clear if !decision.target.is_empty() => {
            println!("Decision:      clear (not authorized; would restrict {})", format_scope(&decision.target))
        }
        RestrictionCommand::Clear => println!("Decision:      clear"),
    }

    if let Some(next) = decision.next_transition {
        println!(
            "Next change:   {} (in {})",
            next.format("%a %H:%M"),
            format_duration(next - now)
        );
    }

    Ok(())
}

/// Run the agent in the foreground
pub fn run(config: AgentConfig, flow: Option<String>) -> Result<()> {
    println!("Starting focus agent in foreground mode...");
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async { agent::run_agent_daemon(config, flow).await });

    // A pending console read would otherwise keep the process alive
    runtime.shutdown_timeout(std::time::Duration::from_millis(250));
    result
}

/// Show agent status
pub fn status(config: &AgentConfig) -> Result<()> {
    println!("Free Focus Agent Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Catalog:       {}", config.catalog_path()?.display());
    println!("Tick interval: {} seconds", config.agent.tick_interval);

    let state = match AgentState::load(&config.state_path()?)? {
        Some(state) => state,
        None => {
            println!();
            println!("Status: Not yet run (no state file)");
            return Ok(());
        }
    };

    println!();
    println!("Started:       {}", state.started_at.format("%Y-%m-%d %H:%M:%S %Z"));
    if let Some(last) = state.last_evaluated {
        let ago = local_now() - last;
        println!(
            "Last check:    {} ({} ago)",
            last.format("%Y-%m-%d %H:%M:%S"),
            format_duration(ago)
        );
    }
    println!("Authorization: {:?}", state.authorization);

    if let Some(hash) = &state.catalog_hash {
        println!("Catalog hash:  {}...", short_hash(hash));
    }

    let catalog = FocusModeCatalog::load(Arc::new(YamlCatalogStore::new(config.catalog_path()?)))?;
    let name_of = |id: &uuid::Uuid| {
        catalog
            .get(*id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    println!();
    if state.active_modes.is_empty() {
        println!("Active modes:  none");
    } else {
        println!("Active modes:");
        for id in &state.active_modes {
            println!("  - {}", name_of(id));
        }
    }
    println!("Restricted:    {}", format_scope(&state.applied_scope));

    for session in &state.sessions {
        println!(
            "Flow session:  {} {:?}{}, {} left",
            name_of(&session.mode_id),
            session.state,
            if session.strict { " (strict)" } else { "" },
            format_duration(chrono::Duration::seconds(session.remaining_secs))
        );
    }

    if let Some(next) = state.next_wake {
        println!("Next change:   {}", next.format("%a %H:%M"));
    }

    if let Some(error) = &state.last_error {
        println!();
        println!("Last error:    {}", error);
    }

    Ok(())
}
