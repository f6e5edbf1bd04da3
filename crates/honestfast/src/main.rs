//! honestfast - intermittent fasting timer
//!
//! This is the main entry point for the honestfast command line.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Fasting engine
//! - Shared state blob and peer link
//! - Tick loop for `watch`

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use honestfast_api::{FastRecord, FastState, FastingPlan, Preferences, is_valid_target};
use honestfast_config::{AppConfig, load_config_or_default};
use honestfast_core::{
    CalendarBucket, CoreEvent, DenyReason, EndDecision, FastingEngine, StartDecision, SyncRelay,
    month_heatmap, write_history,
};
use honestfast_host_api::{
    DisconnectedPeer, HostResult, NotificationScheduler, PeerEvent, SharedStore,
};
use honestfast_store::{FileSharedStore, SqliteStore};
use honestfast_util::{
    FastError, PlanId, database_path, default_config_path, format_countdown,
    format_datetime_full, format_duration, now,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// honestfast - Intermittent fasting timer
#[derive(Parser, Debug)]
#[command(name = "honestfast")]
#[command(about = "Intermittent fasting timer with cross-device sync", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/honestfast/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set HONESTFAST_DATA_DIR env var)
    #[arg(short, long, env = "HONESTFAST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a fast
    Start {
        /// Plan id (default: the preferred plan)
        #[arg(short, long)]
        plan: Option<String>,

        /// Custom target in hours
        #[arg(long, conflicts_with = "plan")]
        hours: Option<f64>,
    },
    /// End the running fast now
    End,
    /// Close the running fast as completed once its target is reached
    Complete,
    /// Show the running fast
    Status,
    /// List past fasts, newest first
    History {
        /// Show at most this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show streak and totals
    Stats,
    /// Show the fasting heat-map of a month
    Calendar {
        /// Month as YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Export the history as CSV
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a shared state blob as a snapshot from the other device
    Sync {
        /// Blob to read (default: this device's shared state path)
        file: Option<PathBuf>,
    },
    /// Run the timer until interrupted
    Watch,
    /// Show or change preferences
    Prefs {
        #[arg(long)]
        notifications: Option<bool>,

        #[arg(long)]
        milestones: Option<bool>,

        #[arg(long)]
        default_plan: Option<String>,
    },
    /// Delete every record and the preferences
    Wipe {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Notification scheduler that reports through the log
struct LogNotifier;

impl NotificationScheduler for LogNotifier {
    fn schedule_at(
        &self,
        id: &str,
        fire_time: DateTime<Local>,
        title: &str,
        body: &str,
    ) -> HostResult<()> {
        info!(id, fire_time = %fire_time, title, body, "Notification scheduled");
        Ok(())
    }

    fn cancel(&self, ids: &[&str]) -> HostResult<()> {
        debug!(count = ids.len(), "Notifications cancelled");
        Ok(())
    }
}

/// Loaded configuration and a ready engine
struct App {
    config: AppConfig,
    engine: FastingEngine,
}

impl App {
    fn open(args: &Args) -> Result<Self> {
        let mut config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        if let Some(dir) = &args.data_dir {
            config.app.data_dir = dir.clone();
        }

        info!(
            config_path = %args.config.display(),
            device = %config.app.device,
            plan_count = config.plans.len(),
            "Configuration loaded"
        );

        let data_dir = &config.app.data_dir;
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = database_path(data_dir);
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );
        info!(db_path = %db_path.display(), "Store initialized");

        let shared_path = config.app.shared_state_path();
        let relay = SyncRelay::new(
            config.app.device,
            Arc::new(FileSharedStore::new(&shared_path)),
            Arc::new(DisconnectedPeer::new()),
        );
        debug!(shared_state = %shared_path.display(), "Sync relay ready");

        let mut engine = FastingEngine::new(store, Arc::new(LogNotifier), relay)
            .with_milestone_hours(config.milestone_hours.clone());
        engine.load(now());

        Ok(Self { config, engine })
    }

    fn run(mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Start { plan, hours } => self.start(plan.as_deref(), hours),
            Commands::End => self.end(),
            Commands::Complete => self.complete(),
            Commands::Status => {
                self.status();
                Ok(())
            }
            Commands::History { limit } => {
                self.history(limit);
                Ok(())
            }
            Commands::Stats => {
                self.stats();
                Ok(())
            }
            Commands::Calendar { month } => self.calendar(month.as_deref()),
            Commands::Export { output } => self.export(output),
            Commands::Sync { file } => self.sync(file),
            Commands::Prefs {
                notifications,
                milestones,
                default_plan,
            } => self.prefs(notifications, milestones, default_plan),
            Commands::Wipe { yes } => self.wipe(yes),
            // Handled by main, needs the runtime
            Commands::Watch => Ok(()),
        }
    }

    fn resolve_plan(&self, plan: Option<&str>, hours: Option<f64>) -> Result<FastingPlan> {
        if let Some(h) = hours {
            return custom_plan(h);
        }

        let id = plan.unwrap_or(self.engine.preferences().default_plan.as_str());
        self.config
            .get_plan(id)
            .cloned()
            .ok_or_else(|| FastError::UnknownPlan(PlanId::new(id)).into())
    }

    fn start(&mut self, plan: Option<&str>, hours: Option<f64>) -> Result<()> {
        let plan = self.resolve_plan(plan, hours)?;

        match self.engine.start_plan(&plan, now()) {
            StartDecision::Started(record) => {
                println!(
                    "Started {} fast at {}, target {}",
                    record.plan_label(),
                    format_datetime_full(&record.start_time()),
                    format_target_end(&record)
                );
                Ok(())
            }
            StartDecision::Denied { reason } => match reason {
                DenyReason::AlreadyFasting => Err(FastError::FastAlreadyActive.into()),
                DenyReason::InvalidTarget(h) => Err(FastError::InvalidTarget(h).into()),
            },
        }
    }

    fn end(&mut self) -> Result<()> {
        match self.engine.end_fast(now()) {
            EndDecision::Ended(result) => {
                println!(
                    "Ended {} fast after {}{}",
                    result.plan_label,
                    format_duration(result.duration),
                    if result.completed { ", target reached" } else { "" }
                );
                Ok(())
            }
            EndDecision::NoActiveFast => Err(FastError::NoActiveFast.into()),
            EndDecision::NotReached { .. } => Ok(()),
        }
    }

    fn complete(&mut self) -> Result<()> {
        match self.engine.complete_fast(now()) {
            EndDecision::Ended(result) => {
                println!(
                    "Completed {} fast: {}",
                    result.plan_label,
                    format_duration(result.duration)
                );
                Ok(())
            }
            EndDecision::NoActiveFast => Err(FastError::NoActiveFast.into()),
            EndDecision::NotReached { remaining } => {
                bail!("Target not reached yet, {} to go", format_countdown(remaining))
            }
        }
    }

    fn status(&self) {
        let now = now();
        let view = self.engine.snapshot(now);

        let (Some(fast), Some(reading)) = (&view.fast, &view.reading) else {
            println!("Not fasting");
            return;
        };

        println!("State:     {}", view.state);
        println!("Plan:      {}", fast.plan_label());
        println!("Started:   {}", format_datetime_full(&fast.start_time()));
        println!("Target:    {}", format_target_end(fast));
        println!("Elapsed:   {}", format_countdown(reading.elapsed));
        println!("Remaining: {}", format_countdown(reading.remaining));
        println!("Progress:  {:.0}%", reading.progress * 100.0);
        println!("Stage:     {}", reading.stage);
    }

    fn history(&self, limit: Option<usize>) {
        let now = now();
        let records = self.engine.history();
        if records.is_empty() {
            println!("No fasts yet");
            return;
        }

        for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
            print_record(record, now);
        }
    }

    fn stats(&self) {
        let stats = self.engine.stats(now());
        println!("Current streak:  {} days", stats.current_streak);
        println!("This week:       {}", stats.this_week);
        println!("Average:         {:.1}h", stats.average_hours);
        println!("Completed:       {}", stats.total_completed);
        println!("Longest:         {:.1}h", stats.longest_hours);
    }

    fn calendar(&self, month: Option<&str>) -> Result<()> {
        let now = now();
        let (year, month) = match month {
            Some(m) => {
                let first = NaiveDate::parse_from_str(&format!("{m}-01"), "%Y-%m-%d")
                    .with_context(|| format!("Invalid month {m:?}, expected YYYY-MM"))?;
                (first.year(), first.month())
            }
            None => (now.year(), now.month()),
        };

        let history = self.engine.history();
        for day in month_heatmap(year, month, &history, now) {
            println!(
                "{}  {} {:>5.1}h",
                day.date,
                bucket_glyph(day.bucket),
                day.hours
            );
        }
        Ok(())
    }

    fn export(&self, output: Option<PathBuf>) -> Result<()> {
        let history = self.engine.history();
        match output {
            Some(path) => {
                let mut file = std::fs::File::create(&path)
                    .with_context(|| format!("Failed to create {:?}", path))?;
                write_history(&mut file, &history, now())
                    .with_context(|| format!("Failed to write {:?}", path))?;
                info!(path = %path.display(), records = history.len(), "History exported");
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                write_history(&mut stdout, &history, now())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    fn sync(&mut self, file: Option<PathBuf>) -> Result<()> {
        let path = file.unwrap_or_else(|| self.config.app.shared_state_path());
        let snapshot = FileSharedStore::new(&path)
            .read()
            .with_context(|| format!("Failed to read shared state {:?}", path))?;

        let events = self.engine.apply_remote(&snapshot.to_payload(), now());
        if events.is_empty() {
            println!("Already up to date");
        }
        for event in &events {
            print_event(event);
        }
        Ok(())
    }

    fn prefs(
        &mut self,
        notifications: Option<bool>,
        milestones: Option<bool>,
        default_plan: Option<String>,
    ) -> Result<()> {
        let mut prefs = self.engine.preferences().clone();
        let changed = notifications.is_some() || milestones.is_some() || default_plan.is_some();

        if let Some(enabled) = notifications {
            prefs.notifications_enabled = enabled;
        }
        if let Some(enabled) = milestones {
            prefs.milestone_notifications = enabled;
        }
        if let Some(id) = default_plan {
            if self.config.get_plan(&id).is_none() {
                return Err(FastError::UnknownPlan(PlanId::new(id)).into());
            }
            prefs.default_plan = id;
        }

        if changed {
            self.engine.set_preferences(prefs.clone());
        }
        print_preferences(&prefs);
        Ok(())
    }

    fn wipe(&mut self, yes: bool) -> Result<()> {
        if !yes {
            bail!("Refusing to delete all data without --yes");
        }
        if let CoreEvent::DataWiped { records_deleted } = self.engine.wipe_all_data(now()) {
            println!("Deleted {records_deleted} fasts and the preferences");
        }
        Ok(())
    }

    /// Tick loop: advance the timer, reconcile peer snapshots, print events
    async fn watch(mut self) -> Result<()> {
        self.engine.restore(now());

        let mut events = self.engine.subscribe();
        let mut peer_events = self.engine.relay().subscribe();

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        let mut tick_timer = tokio::time::interval(self.config.app.tick_interval);

        if self.engine.state() == FastState::Idle {
            println!("Not fasting; waiting for a fast to start");
        } else {
            self.status();
        }
        info!(tick_ms = self.config.app.tick_interval.as_millis() as u64, "Watching");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    break;
                }

                _ = tick_timer.tick() => {
                    self.engine.tick(now());
                }

                Some(event) = next_peer_event(&mut peer_events) => {
                    debug!(?event, "Peer event received");
                    self.engine.apply_remote(event.payload(), now());
                }

                Some(event) = events.recv() => {
                    print_event(&event);
                }
            }
        }

        Ok(())
    }
}

/// Next peer event; pending forever once the channel is gone
async fn next_peer_event(rx: &mut Option<mpsc::Receiver<PeerEvent>>) -> Option<PeerEvent> {
    let Some(inner) = rx else {
        return std::future::pending().await;
    };
    match inner.recv().await {
        Some(event) => Some(event),
        None => {
            *rx = None;
            std::future::pending().await
        }
    }
}

fn print_record(record: &FastRecord, now: DateTime<Local>) {
    let end = record
        .end_time()
        .map(|e| format_datetime_full(&e))
        .unwrap_or_else(|| "running".to_string());
    let mark = if record.completed() { "done" } else { "-" };

    println!(
        "{}  {:<16} {:>6.1}h  {:<4}  until {}",
        format_datetime_full(&record.start_time()),
        record.plan_label(),
        record.duration_hours(now),
        mark,
        end
    );
}

/// Plan for `start --hours`, bounded like every other target
fn custom_plan(hours: f64) -> Result<FastingPlan> {
    if !is_valid_target(hours) {
        return Err(FastError::InvalidTarget(hours).into());
    }
    Ok(FastingPlan::custom(hours, (24.0 - hours).max(0.0)))
}

fn format_target_end(record: &FastRecord) -> String {
    record
        .target_end()
        .map(|t| format_datetime_full(&t))
        .unwrap_or_else(|| "-".to_string())
}

fn print_event(event: &CoreEvent) {
    match event {
        CoreEvent::FastStarted {
            plan_label,
            target_end,
            ..
        } => match target_end {
            Some(t) => println!("Started {plan_label}, target {}", format_datetime_full(t)),
            None => println!("Started {plan_label}"),
        },
        CoreEvent::StageChanged { stage, elapsed, .. } => {
            println!("{}: {stage}", format_countdown(*elapsed))
        }
        CoreEvent::FastCompleted { duration, .. } => {
            println!("Fast complete after {}", format_duration(*duration))
        }
        CoreEvent::FastEnded {
            duration,
            completed,
            ..
        } => println!(
            "Fast ended after {} ({})",
            format_duration(*duration),
            if *completed { "completed" } else { "not completed" }
        ),
        CoreEvent::Dismissed { .. } => println!("Completed fast dismissed"),
        CoreEvent::RemoteStarted {
            origin, start_time, ..
        } => println!(
            "Fast started on {origin} at {}",
            format_datetime_full(start_time)
        ),
        CoreEvent::RemoteEnded {
            origin, duration, ..
        } => println!(
            "Fast ended on {origin} after {}",
            format_duration(*duration)
        ),
        CoreEvent::DataWiped { records_deleted } => {
            println!("Deleted {records_deleted} fasts")
        }
    }
}

fn print_preferences(prefs: &Preferences) {
    println!("Default plan:     {}", prefs.default_plan);
    println!("Notifications:    {}", on_off(prefs.notifications_enabled));
    println!("Milestones:       {}", on_off(prefs.milestone_notifications));
    println!("Theme:            {:?}", prefs.theme);
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn bucket_glyph(bucket: CalendarBucket) -> &'static str {
    match bucket {
        CalendarBucket::None => "  ",
        CalendarBucket::Light => "░░",
        CalendarBucket::Moderate => "▒▒",
        CalendarBucket::Full => "██",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "honestfast starting");

    let app = App::open(&args)?;
    match args.command {
        Commands::Watch => app.watch().await,
        command => app.run(command),
    }
}
