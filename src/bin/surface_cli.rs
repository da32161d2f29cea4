use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use surface_detector::analysis::{MaterialLabel, ShapeLabel, SurfaceClassifier};
use surface_detector::calibration::derivation::{
    derive_material_threshold, derive_shape_thresholds,
};
use surface_detector::calibration::{
    CalibrationKind, CalibrationOperator, CalibrationProgress, CalibrationWarning,
    ReferenceClass, SessionPhase, ThresholdSet,
};
use surface_detector::config::AppConfig;
use surface_detector::error::{CalibrationError, ErrorCode, MeasurementError};
use surface_detector::feedback::{FeedbackDispatcher, LogFeedbackSink};
use surface_detector::measurement::StableReading;
use surface_detector::sensor::{SimulatedEnvironment, SimulatedSurface, SurfaceProfile, ThreadPacer};
use surface_detector::{init_logging, DetectorContext};

#[derive(Parser, Debug)]
#[command(
    name = "surface_cli",
    about = "Ultrasonic surface shape and material detector"
)]
struct Cli {
    /// JSON config file (defaults to $SURFACE_DETECTOR_CONFIG or config/detector.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(flatten)]
    sim: SimulatorArgs,
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Parameters of the simulated sensor used in place of hardware
#[derive(Args, Debug)]
struct SimulatorArgs {
    /// Seed for the simulated sensor (random when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Simulated distance to the surface in cm
    #[arg(long, global = true, default_value_t = 25.0)]
    distance: f64,
    /// Simulated per-draw noise in cm
    #[arg(long, global = true, default_value_t = 0.4)]
    jitter: f64,
    /// Simulated probability of a failed draw
    #[arg(long, global = true, default_value_t = 0.02)]
    dropout: f64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a macro-sigma scan and classify the surface
    Scan {
        /// Stable readings to take (defaults to the configured count)
        #[arg(long)]
        repetitions: Option<usize>,
    },
    /// Take one stable reading
    Check {
        #[arg(long, default_value_t = 10)]
        samples: usize,
    },
    /// Sound the buzzer
    Buzz,
    /// Classify a known sigma with the configured thresholds
    Classify {
        #[arg(long)]
        sigma: f64,
    },
    /// Derive thresholds from known per-class sigmas
    Derive {
        #[command(subcommand)]
        target: DeriveTarget,
    },
    /// Run a guided calibration session
    Calibrate {
        #[arg(value_enum)]
        kind: KindArg,
        /// Stable readings per reference class
        #[arg(long)]
        readings: Option<usize>,
        /// Do not wait for Enter before each reference
        #[arg(long)]
        yes: bool,
        /// Write the updated thresholds into this config file
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum DeriveTarget {
    Shape {
        #[arg(long)]
        flat: f64,
        #[arg(long)]
        slight: f64,
        #[arg(long)]
        irregular: f64,
    },
    Material {
        #[arg(long)]
        reflective: f64,
        #[arg(long)]
        absorbent: f64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Shape,
    Material,
}

impl From<KindArg> for CalibrationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Shape => CalibrationKind::Shape,
            KindArg::Material => CalibrationKind::Material,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli.config.as_ref() {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Scan { repetitions } => {
            let repetitions = repetitions.unwrap_or(config.measurement.default_repetitions);
            let ctx = build_context(&cli.sim, config);
            let code = run_scan(&ctx, repetitions);
            ctx.shutdown();
            code
        }
        Commands::Check { samples } => {
            let ctx = build_context(&cli.sim, config);
            let report = ctx.single_check(samples).context("checking distance")?;
            print_json(&report)?;
            ctx.shutdown();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Buzz => {
            let ctx = build_context(&cli.sim, config);
            let status = if ctx.buzz() { "ok" } else { "dropped" };
            print_json(&serde_json::json!({ "status": status }))?;
            ctx.shutdown();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Classify { sigma } => run_classify(&config.thresholds, sigma),
        Commands::Derive { target } => run_derive(target),
        Commands::Calibrate {
            kind,
            readings,
            yes,
            write,
        } => {
            let mut config = config;
            if let Some(readings) = readings {
                config.calibration.readings_per_class = readings;
            }
            let ctx = build_context(&cli.sim, config.clone());
            let code = run_calibrate(&ctx, kind.into(), yes, write, config);
            ctx.shutdown();
            code
        }
    }
}

fn build_context(sim: &SimulatorArgs, config: AppConfig) -> DetectorContext {
    let seed = sim.seed.unwrap_or_else(rand::random);
    let surface = SimulatedSurface::new(
        SurfaceProfile {
            distance_cm: sim.distance,
            jitter_cm: sim.jitter,
            dropout: sim.dropout,
        },
        seed,
    );
    let environment = SimulatedEnvironment::new(22.5, 24.0, "N/A", seed);
    let feedback = config.feedback.clone();

    let ctx = DetectorContext::new(
        config,
        Box::new(surface),
        Box::new(environment),
        Arc::new(ThreadPacer::default()),
    );
    if feedback.enabled {
        ctx.with_feedback(FeedbackDispatcher::spawn(
            LogFeedbackSink,
            feedback.queue_capacity,
        ))
    } else {
        ctx
    }
}

fn run_scan(ctx: &DetectorContext, repetitions: usize) -> Result<ExitCode> {
    match ctx.scan(repetitions) {
        Ok(report) => {
            print_json(&report)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ MeasurementError::InsufficientReadings { .. }) => {
            emit_error(&err)?;
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err).context("running scan"),
    }
}

fn run_classify(thresholds: &ThresholdSet, sigma: f64) -> Result<ExitCode> {
    let classification = SurfaceClassifier::new(thresholds).classify(sigma);
    print_json(&ClassifyPayload {
        sigma,
        shape: classification.shape,
        material: classification.material,
        thresholds_version: thresholds.version,
    })?;
    Ok(ExitCode::SUCCESS)
}

fn run_derive(target: DeriveTarget) -> Result<ExitCode> {
    let result = match target {
        DeriveTarget::Shape {
            flat,
            slight,
            irregular,
        } => derive_shape_thresholds(flat, slight, irregular).map(|derivation| {
            (
                serde_json::json!({ "t1": derivation.thresholds.t1, "t2": derivation.thresholds.t2 }),
                derivation.warnings,
            )
        }),
        DeriveTarget::Material {
            reflective,
            absorbent,
        } => derive_material_threshold(reflective, absorbent).map(|derivation| {
            (
                serde_json::json!({ "tm": derivation.thresholds.tm }),
                derivation.warnings,
            )
        }),
    };

    match result {
        Ok((thresholds, warnings)) => {
            print_json(&DerivePayload {
                thresholds,
                warnings: warning_messages(&warnings),
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => calibration_failure(err),
    }
}

fn run_calibrate(
    ctx: &DetectorContext,
    kind: CalibrationKind,
    auto_confirm: bool,
    write: Option<PathBuf>,
    mut config: AppConfig,
) -> Result<ExitCode> {
    let mut operator = TerminalOperator { auto_confirm };
    let outcome = match ctx.calibrate(kind, &mut operator) {
        Ok(outcome) => outcome,
        Err(err) => return calibration_failure(err),
    };
    let thresholds = ctx.thresholds().context("reading updated thresholds")?;

    if let Some(path) = write {
        config.thresholds = thresholds;
        config
            .save_to_file(&path)
            .with_context(|| format!("saving thresholds to {}", path.display()))?;
    }

    print_json(&CalibratePayload {
        warnings: warning_messages(&outcome.warnings),
        outcome,
        thresholds,
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Degenerate or under-sampled reference data exits with 2, anything else fails
fn calibration_failure(err: CalibrationError) -> Result<ExitCode> {
    match err {
        CalibrationError::DegenerateCalibrationData { .. }
        | CalibrationError::InsufficientReadings { .. }
        | CalibrationError::Measurement {
            source: MeasurementError::InsufficientReadings { .. },
        } => {
            emit_error(&err)?;
            Ok(ExitCode::from(2))
        }
        other => Err(other).context("running calibration"),
    }
}

fn warning_messages(warnings: &[CalibrationWarning]) -> Vec<String> {
    warnings.iter().map(ToString::to_string).collect()
}

/// Prompts on stderr and waits for Enter between references
struct TerminalOperator {
    auto_confirm: bool,
}

impl CalibrationOperator for TerminalOperator {
    fn await_ready(&mut self, class: ReferenceClass) {
        eprintln!("--- {} ---", class.display_name());
        eprintln!("{}", class.instructions());
        if self.auto_confirm {
            return;
        }
        eprint!("Press Enter when ready...");
        let _ = io::stderr().flush();
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }

    fn on_reading(&mut self, progress: &CalibrationProgress, _reading: &StableReading) {
        if let SessionPhase::Collecting {
            collected, needed, ..
        } = progress.phase
        {
            if collected % 10 == 0 {
                eprintln!("  {}/{} readings", collected, needed);
            }
        }
    }

    fn on_class_complete(&mut self, class: ReferenceClass, sigma: f64) {
        eprintln!("  {} overall sigma: {:.3}", class.display_name(), sigma);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn emit_error<E: ErrorCode>(err: &E) -> Result<()> {
    print_json(&ErrorPayload {
        error: err.message(),
        code: err.code(),
    })
}

#[derive(Serialize)]
struct ClassifyPayload {
    sigma: f64,
    shape: ShapeLabel,
    material: MaterialLabel,
    thresholds_version: u32,
}

#[derive(Serialize)]
struct DerivePayload {
    thresholds: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct CalibratePayload {
    outcome: surface_detector::calibration::CalibrationOutcome,
    thresholds: ThresholdSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ErrorPayload {
    error: String,
    code: i32,
}
