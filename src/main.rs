//! `smtoven-sim`: run a reflow profile against the simulated oven.
//!
//! The real [`ControlLoop`] drives a [`SimulatedOven`] tick by tick.  Run
//! events go to stderr through the `log` facade; with `--trace` every tick
//! is also written to stdout as one JSON object per line.
//!
//! ```text
//! smtoven-sim --preset sac305 --trace > run.jsonl
//! smtoven-sim --scenario probe-drift --fault-at 90
//! smtoven-sim --profile my_paste.json --config oven.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, Log, Metadata, Record, info, warn};
use serde::Serialize;

use smtoven::adapters::log_sink::LogEventSink;
use smtoven::app::TickSnapshot;
use smtoven::error::AbortReason;
use smtoven::profile::presets;
use smtoven::sim::{InjectedFault, OvenParams, SimulatedOven};
use smtoven::{ControlLoop, OvenConfig, ProfileDefinition, RequestQueue, RunStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Healthy oven, healthy probes.
    Normal,
    /// Every probe goes open circuit.
    ProbeOpen,
    /// One probe slowly detaches from the board and reads low.
    ProbeDrift,
    /// Heater relay welded on.
    RelayWelded,
    /// Heater too weak to reach the soak temperature.
    Underpowered,
    /// Operator presses abort.
    UserAbort,
    /// Enclosure vent blocked; the electronics heat up.
    CaseOverheat,
}

#[derive(Parser, Debug)]
#[command(
    name = "smtoven-sim",
    version,
    about = "Reflow oven controller running against a simulated oven"
)]
struct Args {
    /// Built-in profile: Sn63/Pb37, SAC305 or Sn42/Bi58 (any case).
    #[arg(long, default_value = "sac305")]
    preset: String,

    /// Profile JSON file; overrides --preset.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Oven configuration JSON file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(value_enum, long, default_value = "normal")]
    scenario: Scenario,

    /// When the scenario's fault is injected (seconds).
    #[arg(long, default_value_t = 60.0)]
    fault_at: f32,

    /// Longest simulated time (seconds).
    #[arg(long, default_value_t = 900.0)]
    seconds: f32,

    /// Seed for the probe noise.
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Write a JSONL trace of every tick to stdout.
    #[arg(long)]
    trace: bool,

    #[arg(value_enum, long, default_value = "info")]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

#[derive(Serialize)]
struct TraceRow {
    t_s: f32,
    true_c: f32,
    measured_c: Option<f32>,
    setpoint_c: Option<f32>,
    heater: u8,
    fan: u8,
    aux: u8,
    case_fan: u8,
    enclosure_c: f32,
    status: RunStatus,
}

impl TraceRow {
    fn new(snapshot: &TickSnapshot, oven: &SimulatedOven, elapsed_ms: u64) -> Self {
        Self {
            t_s: elapsed_ms as f32 / 1000.0,
            true_c: oven.temperature_c(),
            measured_c: snapshot.measured_c,
            setpoint_c: snapshot.setpoint_c,
            heater: snapshot.outputs.heater,
            fan: snapshot.outputs.fan,
            aux: snapshot.outputs.aux,
            case_fan: snapshot.outputs.case_fan,
            enclosure_c: oven.enclosure_c(),
            status: snapshot.status,
        }
    }
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn load_profile(args: &Args) -> Result<ProfileDefinition> {
    match &args.profile {
        Some(path) => read_json(path),
        None => presets::by_name(&args.preset)
            .ok_or_else(|| anyhow!("unknown preset '{}'", args.preset)),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn plant_params(scenario: Scenario) -> OvenParams {
    let params = OvenParams::default();
    match scenario {
        Scenario::Underpowered => OvenParams {
            heat_rate_c_per_sec: 0.9,
            ..params
        },
        _ => params,
    }
}

fn inject(scenario: Scenario, oven: &mut SimulatedOven, requests: &RequestQueue, channels: usize) {
    match scenario {
        Scenario::Normal | Scenario::Underpowered => {}
        Scenario::ProbeOpen => {
            for ch in 0..channels {
                oven.set_fault(ch, InjectedFault::Open);
            }
        }
        Scenario::ProbeDrift => {
            if !oven.set_fault(channels.saturating_sub(1), InjectedFault::Drift { c_per_sec: -2.0 }) {
                warn!("probe-drift: no channel to drift");
            }
        }
        Scenario::RelayWelded => oven.set_heater_stuck_on(true),
        Scenario::UserAbort => requests.request_abort(AbortReason::UserRequest),
        Scenario::CaseOverheat => oven.set_enclosure_heating(2.0),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    log::set_logger(&LOGGER).map_err(|e| anyhow!("logger: {e}"))?;
    log::set_max_level(args.log_level.into());

    let config: OvenConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => OvenConfig::default(),
    };
    let profile = load_profile(&args)?;
    let channels = config.channels.len();
    let tick_ms = config.tick_period_ms;

    let requests = RequestQueue::new();
    let oven = SimulatedOven::new(plant_params(args.scenario), channels, args.seed);
    let mut control = ControlLoop::new(config, oven, LogEventSink::new(), &requests)
        .map_err(|e| anyhow!("config: {e}"))?;

    info!(
        "sim: '{}' scenario {:?}, fault at {:.0}s",
        profile.name, args.scenario, args.fault_at
    );
    requests.request_start(profile);

    let fault_at_ms = (args.fault_at.max(0.0) * 1000.0) as u64;
    let max_ticks = (args.seconds.max(0.0) * 1000.0 / tick_ms as f32).ceil() as u64;
    let mut injected = false;
    let mut stdout = std::io::stdout().lock();

    for _ in 0..max_ticks {
        let now_ms = control.hardware().elapsed_ms();
        if !injected && now_ms >= fault_at_ms {
            inject(args.scenario, control.hardware_mut(), &requests, channels);
            injected = true;
        }

        let snapshot = control.tick();
        if args.trace {
            let row = TraceRow::new(&snapshot, control.hardware(), now_ms);
            serde_json::to_writer(&mut stdout, &row)?;
            writeln!(stdout)?;
        }
        control.hardware_mut().advance(tick_ms);

        // Finished and cooled: nothing left to watch.
        if !snapshot.status.is_running() && snapshot.outputs.fan == 0 && snapshot.tick > 1 {
            break;
        }
    }

    let status = control.status();
    let oven = control.hardware();
    info!(
        "sim: {:?} after {:.1}s, oven at {:.1}°C, enclosure {:.1}°C, alarm {:?}",
        status,
        oven.elapsed_ms() as f32 / 1000.0,
        oven.temperature_c(),
        oven.enclosure_c(),
        oven.last_alarm()
    );
    let (_oven, _events) = control.into_parts();

    match (args.scenario, status) {
        (Scenario::Normal, RunStatus::Completed) => Ok(()),
        (Scenario::Normal, other) => bail!("run did not complete: {other:?}"),
        (_, RunStatus::Running { .. }) => bail!("simulation time ran out mid-run"),
        _ => Ok(()),
    }
}
