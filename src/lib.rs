// Smart Surface Detector Core
// Ultrasonic macro-sigma measurement, surface classification and calibration

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod context;
pub mod error;
pub mod feedback;
pub mod measurement;
pub mod report;
pub mod sensor;
pub mod telemetry;

// Re-exports for convenience
pub use context::DetectorContext;

use tracing_subscriber::filter::LevelFilter;

/// Install the fmt subscriber on stderr
///
/// `log` records are bridged into the subscriber. Calling this more than once
/// is harmless; only the first call installs anything.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
