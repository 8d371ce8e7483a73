//! # DevMemory CLI
//!
//! Daily developer activity reports from git history, delivered to Discord.
//!
//! Usage:
//!   devmemory run-daily              # cron entry point (06:00 Mon–Fri)
//!   devmemory run-on-startup         # login hook, recovers a missed cron run
//!   devmemory generate --send        # build the current report by hand
//!   devmemory monthly --month 2026-01
//!   devmemory range --start 2026-01-05 --end 2026-01-30 --send
//!   devmemory install-cron | install-startup
//!   devmemory status

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use devmemory_channels::{DiscordClient, DiscordPayload, StandupNotifier};
use devmemory_core::config::expand_path;
use devmemory_core::{DevMemoryConfig, DevMemoryError, Notifier, ReportProducer, YearMonth};
use devmemory_report::range::{self, BLOCK_LIMIT};
use devmemory_report::{GitReportProducer, MonthlyReporter, NarrativeClient, ReportWriter};
use devmemory_scheduler::install::{self, InstallOutcome};
use devmemory_scheduler::{Orchestrator, RunOutcome, StateStore, compute_window_with_cutover};

#[derive(Parser)]
#[command(name = "devmemory", version, about = "📊 DevMemory: daily git activity reports")]
struct Cli {
    /// Config file (default: ~/.devmemory/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce, record, and deliver yesterday's report (cron entry point)
    RunDaily,
    /// Recover a missed daily run after login
    RunOnStartup,
    /// Generate the report for the current window, ignoring recorded state
    Generate {
        /// Report date to generate instead of the current one (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Also deliver the report to Discord
        #[arg(long)]
        send: bool,
    },
    /// Aggregate a month of daily reports (default: previous month)
    Monthly {
        /// Month to aggregate (YYYY-MM)
        #[arg(long)]
        month: Option<YearMonth>,
    },
    /// Summarize the daily reports between two dates (inclusive)
    Range {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Print the aggregated summary as JSON instead of Markdown
        #[arg(long)]
        json: bool,
        /// Also post the summary to Discord
        #[arg(long)]
        send: bool,
    },
    /// Add the weekday 06:00 entry to the user crontab
    InstallCron,
    /// Remove the crontab entry
    RemoveCron,
    /// Install the desktop autostart hook
    InstallStartup,
    /// Remove the desktop autostart hook
    RemoveStartup,
    /// Show the current window, recorded state, and pending decision
    Status,
}

fn load_config(path: Option<&str>) -> Result<DevMemoryConfig> {
    let config = match path {
        Some(p) => {
            let mut config = DevMemoryConfig::load_from(&expand_path(p))?;
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        None => DevMemoryConfig::load()?,
    };
    Ok(config)
}

fn notifier(config: &DevMemoryConfig) -> Option<Box<dyn Notifier>> {
    if !config.discord.enabled {
        tracing::info!("🔕 Discord delivery disabled");
        return None;
    }
    Some(Box::new(StandupNotifier::from_config(&config.discord)))
}

fn monthly_reporter(config: &DevMemoryConfig) -> MonthlyReporter {
    MonthlyReporter::new(
        ReportWriter::new(config.data_path()),
        NarrativeClient::from_config(&config.ai),
    )
}

fn orchestrator(config: &DevMemoryConfig) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(
        StateStore::new(config.state_path()),
        config.data_path(),
        Box::new(GitReportProducer::from_config(config)),
    )
    .with_schedule(config.schedule.clone())
    .with_aggregator(Box::new(monthly_reporter(config)));
    if let Some(notifier) = notifier(config) {
        orchestrator = orchestrator.with_notifier(notifier);
    }
    orchestrator
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn current_exe() -> Result<PathBuf> {
    std::env::current_exe().context("cannot resolve the devmemory executable path")
}

/// Whether a scheduled run counts as successful: only a failed production
/// does not.
fn run_succeeded(result: devmemory_core::Result<RunOutcome>) -> Result<bool> {
    match result {
        Ok(outcome) => {
            tracing::info!("🏁 Run finished for {}: {}", outcome.report_date(), describe(&outcome));
            Ok(true)
        }
        Err(e @ DevMemoryError::Production(_)) => {
            tracing::error!("❌ {e}");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn describe(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Skipped { reason, .. } => format!("skipped ({reason:?})"),
        RunOutcome::Produced {
            delivery, monthly, ..
        } => {
            let delivery = match delivery {
                Some(a) if a.is_delivered() => "delivered",
                Some(_) => "delivery failed",
                None => "not delivered",
            };
            match monthly {
                Some((month, true)) => format!("produced, {delivery}, monthly {month} written"),
                Some((month, false)) => format!("produced, {delivery}, monthly {month} failed"),
                None => format!("produced, {delivery}"),
            }
        }
    }
}

fn print_install(what: &str, outcome: InstallOutcome) {
    let text = match outcome {
        InstallOutcome::Installed => "installed",
        InstallOutcome::AlreadyInstalled => "already installed",
        InstallOutcome::Removed => "removed",
        InstallOutcome::NotFound => "not installed, nothing to remove",
    };
    println!("{what}: {text}");
}

async fn generate(config: &DevMemoryConfig, date: Option<NaiveDate>, send: bool) -> Result<ExitCode> {
    // A report for date D is produced by an invocation on D+1 after cutover.
    let at = match date {
        Some(d) => d
            .succ_opt()
            .context("date out of range")?
            .and_time(NaiveTime::from_hms_opt(config.schedule.cutover_hour, 0, 0).unwrap_or_default()),
        None => now(),
    };
    let window = compute_window_with_cutover(at, config.schedule.cutover_hour);
    let producer = GitReportProducer::from_config(config);
    let artifact = match producer.generate(&window).await {
        Ok(artifact) => artifact,
        Err(e) => {
            tracing::error!("❌ Report generation failed: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("📝 {}", artifact.markdown_path.display());

    if send {
        match notifier(config) {
            Some(n) => {
                let attempt = n.deliver(&artifact).await;
                if attempt.is_delivered() {
                    println!("📨 Delivered");
                } else {
                    println!("⚠️ Delivery failed, see delivery.log");
                }
            }
            None => println!("🔕 Discord delivery disabled"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn range_summary(
    config: &DevMemoryConfig,
    start: NaiveDate,
    end: NaiveDate,
    json: bool,
    send: bool,
) -> Result<ExitCode> {
    if let Err(e) = range::validate_range(start, end, now().date()) {
        tracing::error!("❌ {e}");
        return Ok(ExitCode::FAILURE);
    }
    let reports = range::reports_in_range(&config.data_path(), start, end);
    let summary = range::aggregate_reports(&reports);
    tracing::info!(
        "📚 Range {start}..{end}: {} reports, {} active days, {} commits",
        reports.len(),
        summary.total_days,
        summary.total_commits
    );

    let standup = range::render_standup(&summary);
    let blocks = range::repo_messages(&summary, BLOCK_LIMIT);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("# Achievements {start} → {end}\n\n{standup}");
        for block in &blocks {
            println!("\n{block}");
        }
    }

    if send {
        if !config.discord.enabled {
            println!("🔕 Discord delivery disabled");
            return Ok(ExitCode::SUCCESS);
        }
        let client = DiscordClient::new(&config.discord);
        let mut messages = vec![format!("**Achievements {start} → {end}**\n{standup}")];
        messages.extend(blocks);
        for message in messages {
            let attempt = client.send(&DiscordPayload::text(message), None).await;
            if !attempt.is_delivered() {
                println!("⚠️ Delivery failed, see delivery.log");
                return Ok(ExitCode::FAILURE);
            }
        }
        println!("📨 Delivered");
    }
    Ok(ExitCode::SUCCESS)
}

fn status(config: &DevMemoryConfig) {
    let (window, state, exists, decision) = orchestrator(config).preview(now());
    println!("📊 DevMemory status");
    println!("  Report date:     {}", window.report_date);
    println!("  Window:          {} → {}", window.since_arg(), window.until_arg());
    println!(
        "  Last execution:  {}",
        state
            .last_daily_execution
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".into())
    );
    println!("  Artifact exists: {exists}");
    println!("  Decision:        {decision:?}");
    println!("  Repositories:    {}", config.repos.len());
    println!("  Data dir:        {}", config.data_path().display());
}

async fn run(cli: Cli, config: DevMemoryConfig) -> Result<ExitCode> {
    match cli.command {
        Command::RunDaily => run_succeeded(orchestrator(&config).run_daily(now()).await).map(exit_code),
        Command::RunOnStartup => {
            run_succeeded(orchestrator(&config).run_on_startup(now()).await).map(exit_code)
        }
        Command::Generate { date, send } => generate(&config, date, send).await,
        Command::Monthly { month } => {
            let month = month.unwrap_or_else(|| YearMonth::of(now().date()).previous());
            match monthly_reporter(&config).generate(month).await {
                Ok(path) => {
                    println!("📈 {}", path.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::error!("❌ Monthly report for {month} failed: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Range {
            start,
            end,
            json,
            send,
        } => range_summary(&config, start, end, json, send).await,
        Command::InstallCron => {
            print_install("cron job", install::install_cron_job(&current_exe()?).await?);
            Ok(ExitCode::SUCCESS)
        }
        Command::RemoveCron => {
            print_install("cron job", install::remove_cron_job().await?);
            Ok(ExitCode::SUCCESS)
        }
        Command::InstallStartup => {
            let entry = install::startup_entry_path();
            print_install("startup hook", install::install_startup_hook(&entry, &current_exe()?)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::RemoveStartup => {
            print_install("startup hook", install::remove_startup_hook(&install::startup_entry_path())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            status(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let _guards = logging::init(&config.logs_path(), cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    runtime.block_on(run(cli, config))
}
