use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use buddy_core::{
    Command, DispatchConfig, DispatchObserver, Dispatcher, RigConfig, RobotIo, Side, SimRig,
    SnapshotExchange, StepOutcome,
};
use buddy_io::console::{ConsoleError, TermKeys, TickPacer};
use buddy_io::journal::Journal;
use std::path::PathBuf;
use std::sync::{atomic::AtomicBool, Arc};
use thiserror::Error;
use tracing::info;

/// Startup failures. Once the loop is running the only exits are the
/// quit key and the end-of-run signal, and neither is an error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid --keys entry {entry:?}: expected <key>@<tick>")]
    KeySpec { entry: String },
    #[error("failed to open journal {path}: {source}", path = .path.display())]
    Journal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to attach terminal: {0}")]
    Console(#[from] ConsoleError),
}

/// The composed robot: a simulated rig, optionally fronted by the
/// interactive terminal.
enum BuddyRig {
    /// Keys come from the terminal; ticks are paced to wall time.
    Console {
        rig: SimRig,
        keys: TermKeys,
        pacer: TickPacer,
    },
    /// Keys come only from the scheduled feed; runs unpaced.
    Headless(SimRig),
}

impl BuddyRig {
    fn rig(&self) -> &SimRig {
        match self {
            Self::Console { rig, .. } => rig,
            Self::Headless(rig) => rig,
        }
    }

    fn rig_mut(&mut self) -> &mut SimRig {
        match self {
            Self::Console { rig, .. } => rig,
            Self::Headless(rig) => rig,
        }
    }
}

impl RobotIo for BuddyRig {
    fn step(&mut self) -> StepOutcome {
        match self {
            Self::Console { rig, pacer, .. } => {
                pacer.pace();
                rig.step()
            }
            Self::Headless(rig) => rig.step(),
        }
    }

    fn poll_key(&mut self) -> Option<char> {
        match self {
            Self::Console { keys, .. } => keys.poll(),
            Self::Headless(rig) => rig.poll_key(),
        }
    }

    fn set_wheel_velocity(&mut self, side: Side, rad_s: f64) {
        self.rig_mut().set_wheel_velocity(side, rad_s);
    }

    fn set_head_target(&mut self, angle_rad: f64) {
        self.rig_mut().set_head_target(angle_rad);
    }

    fn set_eye(&mut self, side: Side, lit: bool) {
        self.rig_mut().set_eye(side, lit);
    }

    fn wheel_velocity(&self, side: Side) -> f64 {
        self.rig().wheel_velocity(side)
    }

    fn head_angle(&self) -> f64 {
        self.rig().head_angle()
    }

    fn eye(&self, side: Side) -> bool {
        self.rig().eye(side)
    }
}

/// Relays dispatch milestones into the journal, when one is attached.
struct JournalSink {
    journal: Option<Arc<Journal>>,
}

impl DispatchObserver for JournalSink {
    fn command(&mut self, tick: u64, command: Command) {
        if let Some(journal) = &self.journal {
            let _ = journal.command(tick, command.label());
        }
    }

    fn script_finished(&mut self, tick: u64, script: &'static str) {
        if let Some(journal) = &self.journal {
            let _ = journal.script_finished(tick, script);
        }
    }
}

pub fn run_from_args() -> Result<(), AppError> {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return Ok(());
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> Result<(), AppError> {
    // Initialize tracing
    init_tracing(config.json_logs, config.console_enabled);

    // Initialize metrics
    telemetry::init();

    // Start metrics server if enabled
    let metrics_enabled = config.metrics_addr.is_some();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let dispatch_config = DispatchConfig::default();

    let replay_keys = match &config.key_spec {
        Some(spec) => parse_key_spec(spec)?,
        None => Vec::new(),
    };

    // Initialize the journal if enabled
    let journal = init_journal(config.journal_path.as_ref())?;
    if let Some(journal) = &journal {
        let _ = journal.run_start(
            env!("CARGO_PKG_VERSION"),
            dispatch_config.tick_ms,
            SimRig::device_inventory(),
        );
    }

    let mut sim = SimRig::new(RigConfig {
        tick_seconds: dispatch_config.tick_seconds(),
        max_wheel_speed: dispatch_config.max_wheel_speed,
        run_ticks: config.run_ticks,
        ..RigConfig::default()
    });
    for (tick, key) in replay_keys {
        sim.queue_key(tick, key);
    }

    let mut rig = if config.console_enabled {
        info!("controls: F forward, R backward, L turn left, G turn right, space stop, W wave, B blink, P patrol, D dance, S reset, Q quit");
        BuddyRig::Console {
            rig: sim,
            keys: TermKeys::new()?,
            pacer: TickPacer::new(dispatch_config.tick_ms),
        }
    } else {
        BuddyRig::Headless(sim)
    };

    let exchange = Arc::new(SnapshotExchange::new());
    let stop = Arc::new(AtomicBool::new(false));
    let updater_handle = metrics_enabled
        .then(|| telemetry::start_metrics_updater(Arc::clone(&exchange), Arc::clone(&stop)));

    info!(
        tick_ms = dispatch_config.tick_ms,
        max_wheel_speed = dispatch_config.max_wheel_speed,
        run_ticks = ?config.run_ticks,
        console = config.console_enabled,
        "Starting dispatch loop"
    );

    let mut dispatcher = Dispatcher::new(dispatch_config, Some(Arc::clone(&exchange)));
    let mut sink = JournalSink {
        journal: journal.clone(),
    };
    dispatcher.run(&mut rig, &mut sink);

    // Drop restores the terminal before the final summary prints.
    drop(rig);

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    if let Some(handle) = updater_handle {
        let _ = handle.join();
    }

    let stats = dispatcher.stats();
    info!(
        ticks = stats.ticks,
        commands = stats.commands_dispatched,
        scripts_completed = stats.scripts_completed,
        keys_ignored = stats.keys_ignored,
        keys_dropped = stats.keys_dropped,
        "Run complete"
    );

    if let Some(journal) = &journal {
        let _ = journal.run_end(stats.ticks, stats);
    }

    Ok(())
}

/// Parse a `--keys` replay spec: comma-separated `key@tick` entries,
/// with the space bar spelled out (`space@40`).
fn parse_key_spec(spec: &str) -> Result<Vec<(u64, char)>, AppError> {
    let mut keys = Vec::new();
    for entry in spec.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let invalid = || AppError::KeySpec {
            entry: entry.to_string(),
        };
        let (key_part, tick_part) = entry.split_once('@').ok_or_else(invalid)?;
        let key = match key_part {
            "space" => ' ',
            _ => {
                let mut chars = key_part.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => ch,
                    _ => return Err(invalid()),
                }
            }
        };
        let tick: u64 = tick_part.parse().map_err(|_| invalid())?;
        keys.push((tick, key));
    }
    Ok(keys)
}

fn init_journal(journal_path: Option<&PathBuf>) -> Result<Option<Arc<Journal>>, AppError> {
    journal_path
        .map(|path| match Journal::new(path) {
            Ok(journal) => {
                info!(path = %path.display(), "Journal enabled");
                Ok(Arc::new(journal))
            }
            Err(source) => Err(AppError::Journal {
                path: path.clone(),
                source,
            }),
        })
        .transpose()
}
