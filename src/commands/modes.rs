use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::agent::{local_now, AgentConfig};
use crate::cli::{ModeCommands, NewModeArgs};
use crate::focus::mode::parse_clock_time;
use crate::focus::{
    format_scope, ActivationRule, AppLimit, AppSelector, DayOfWeek, FlowSession, FocusMode, FocusModeCatalog,
    PickupLimit, Schedule, YamlCatalogStore,
};

/// Run `modes` subcommands against the catalog file
pub fn run_mode_command(command: ModeCommands, config: &AgentConfig) -> Result<()> {
    let mut catalog = open_catalog(config)?;

    match command {
        ModeCommands::List => list(&catalog),
        ModeCommands::Show { mode } => show(&catalog, &mode),
        ModeCommands::AddSchedule { mode, start, end, days } => {
            let schedule = Schedule::new(parse_clock_time(&start)?, parse_clock_time(&end)?, parse_days(&days)?);
            add(&mut catalog, build_mode(mode, ActivationRule::Schedule(schedule)))
        }
        ModeCommands::AddAppLimit { name, limits, icon } => {
            let limits = limits
                .iter()
                .map(|raw| parse_app_limit(raw))
                .collect::<Result<Vec<_>>>()?;

            let mut mode = FocusMode::new(name, Some(ActivationRule::AppLimits { limits }));
            if let Some(icon) = icon {
                mode.icon = icon;
            }
            add(&mut catalog, mode)
        }
        ModeCommands::AddPickup { mode, max_unlocks } => {
            let rule = ActivationRule::PickupLimit(PickupLimit { max_unlocks });
            add(&mut catalog, build_mode(mode, rule))
        }
        ModeCommands::AddFlow {
            mode,
            minutes,
            break_minutes,
            strict,
        } => {
            let rule = ActivationRule::FlowSession(FlowSession {
                duration_minutes: minutes,
                break_minutes,
            });
            add(&mut catalog, build_mode(mode, rule).strict(strict))
        }
        ModeCommands::Remove { mode } => {
            let id = resolve(&catalog, &mode)?;
            let removed = catalog.remove(id, local_now())?;
            println!("✓ Removed focus mode: {}", removed.name);
            Ok(())
        }
        ModeCommands::Enable { mode } => set_enabled(&mut catalog, &mode, true),
        ModeCommands::Disable { mode } => set_enabled(&mut catalog, &mode, false),
    }
}

fn open_catalog(config: &AgentConfig) -> Result<FocusModeCatalog> {
    let store = Arc::new(YamlCatalogStore::new(config.catalog_path()?));
    FocusModeCatalog::load(store)
}

fn resolve(catalog: &FocusModeCatalog, query: &str) -> Result<Uuid> {
    catalog
        .find(query)
        .map(|m| m.id)
        .with_context(|| format!("No focus mode matches '{}'", query))
}

fn build_mode(args: NewModeArgs, rule: ActivationRule) -> FocusMode {
    let mut mode = FocusMode::new(args.name, Some(rule)).with_blocked_apps(args.block);
    if let Some(icon) = args.icon {
        mode.icon = icon;
    }
    mode.enabled = !args.disabled;
    mode
}

fn add(catalog: &mut FocusModeCatalog, mode: FocusMode) -> Result<()> {
    // Names are labels only; a shared name just makes lookups by name ambiguous
    let shares_name = catalog.find(&mode.name).is_some();

    let summary = describe_rule(&mode);
    let name = mode.name.clone();
    let id = catalog.add(mode).context("Failed to add focus mode")?;

    println!("✓ Added focus mode: {} ({})", name, &id.simple().to_string()[..8]);
    println!("  {}", summary);
    if shares_name {
        println!("  Note: another mode is also named '{}'; refer to this one by its id", name);
    }
    Ok(())
}

fn set_enabled(catalog: &mut FocusModeCatalog, query: &str, enabled: bool) -> Result<()> {
    let id = resolve(catalog, query)?;
    catalog.set_enabled(id, enabled, local_now())?;

    let name = catalog.get(id).map(|m| m.name.as_str()).unwrap_or(query);
    println!("✓ {} focus mode: {}", if enabled { "Enabled" } else { "Disabled" }, name);
    Ok(())
}

fn list(catalog: &FocusModeCatalog) -> Result<()> {
    if catalog.list().is_empty() {
        println!("No focus modes configured.");
        println!("Create the example catalog with: free-focus init");
        return Ok(());
    }

    println!("{:<10} {:<20} {:<9} {}", "ID", "NAME", "STATUS", "RULE");
    for mode in catalog.list() {
        println!(
            "{:<10} {:<20} {:<9} {}",
            mode.short_id(),
            mode.name,
            if mode.enabled { "enabled" } else { "disabled" },
            describe_rule(mode)
        );
    }
    Ok(())
}

fn show(catalog: &FocusModeCatalog, query: &str) -> Result<()> {
    let id = resolve(catalog, query)?;
    let mode = catalog.get(id).with_context(|| format!("No focus mode matches '{}'", query))?;

    println!("{}", mode.name);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("ID:       {}", mode.id);
    println!("Icon:     {}", mode.icon);
    println!("Enabled:  {}", if mode.enabled { "yes" } else { "no" });
    println!("Strict:   {}", if mode.strict { "yes" } else { "no" });
    println!("Type:     {}", mode.rule.as_ref().map(|r| r.kind()).unwrap_or("none"));
    println!("Rule:     {}", describe_rule(mode));

    match &mode.rule {
        Some(ActivationRule::AppLimits { limits }) => {
            println!("Limits:");
            for limit in limits {
                println!("  - {}: {} min/day", limit.app, limit.limit_minutes);
            }
        }
        _ => println!("Blocks:   {}", format_scope(&mode.blocked_apps)),
    }

    Ok(())
}

/// One-line summary of a mode's activation rule
pub fn describe_rule(mode: &FocusMode) -> String {
    match &mode.rule {
        None => "none (inert)".to_string(),
        Some(ActivationRule::Schedule(schedule)) => format!(
            "schedule {}-{} {}",
            schedule.start.format("%H:%M"),
            schedule.end.format("%H:%M"),
            describe_days(&schedule.days)
        ),
        Some(ActivationRule::AppLimits { limits }) => {
            let apps: Vec<String> = limits
                .iter()
                .map(|l| format!("{} {}m", l.app, l.limit_minutes))
                .collect();
            format!("app limits ({})", apps.join(", "))
        }
        Some(ActivationRule::PickupLimit(limit)) => {
            format!("pickup limit after {} unlocks", limit.max_unlocks)
        }
        Some(ActivationRule::FlowSession(flow)) => {
            if flow.break_minutes > 0 {
                format!(
                    "flow session {}m, breaks up to {}m",
                    flow.duration_minutes, flow.break_minutes
                )
            } else {
                format!("flow session {}m", flow.duration_minutes)
            }
        }
    }
}

fn describe_days(days: &BTreeSet<DayOfWeek>) -> String {
    let weekdays: BTreeSet<DayOfWeek> = DayOfWeek::WEEKDAYS.into_iter().collect();

    if days.len() == DayOfWeek::ALL.len() {
        "daily".to_string()
    } else if *days == weekdays {
        "weekdays".to_string()
    } else {
        days.iter()
            .map(|d| &d.name()[..3])
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse "mon,wed,fri", "weekdays", "weekends" or "daily"
pub fn parse_days(raw: &str) -> Result<BTreeSet<DayOfWeek>> {
    match raw.trim().to_lowercase().as_str() {
        "weekdays" => return Ok(DayOfWeek::WEEKDAYS.into_iter().collect()),
        "weekends" => return Ok([DayOfWeek::Saturday, DayOfWeek::Sunday].into_iter().collect()),
        "daily" | "all" => return Ok(DayOfWeek::ALL.into_iter().collect()),
        _ => {}
    }

    let days = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| DayOfWeek::parse(part).with_context(|| format!("Unknown day '{}'", part.trim())))
        .collect::<Result<BTreeSet<_>>>()?;

    if days.is_empty() {
        anyhow::bail!("At least one day is required");
    }
    Ok(days)
}

/// Parse "app=minutes"
pub fn parse_app_limit(raw: &str) -> Result<AppLimit> {
    let (app, minutes) = raw
        .split_once('=')
        .with_context(|| format!("Invalid limit '{}' (expected app=minutes)", raw))?;

    let app = app.trim();
    if app.is_empty() {
        anyhow::bail!("Invalid limit '{}': app is empty", raw);
    }

    let limit_minutes = minutes
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid limit '{}': minutes must be a whole number", raw))?;

    Ok(AppLimit {
        app: AppSelector::new(app),
        limit_minutes,
    })
}
