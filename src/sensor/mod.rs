//! Capability abstractions for the sensor rig.
//!
//! The measurement core never touches a bus directly. It is handed a
//! [`SampleSource`] for the ultrasonic ranger and a [`Pacer`] for the
//! settling delays, so the whole pipeline runs against scripted or simulated
//! hardware in tests and on machines without the rig attached.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ultrasonic distance capability.
///
/// Bus or driver faults are recovered inside the implementation and surface
/// as `None`; they must never panic into the estimator.
pub trait SampleSource: Send {
    /// Draw one raw distance in centimeters, or `None` if the draw failed.
    fn draw_sample(&mut self) -> Option<f64>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn draw_sample(&mut self) -> Option<f64> {
        (**self).draw_sample()
    }
}

/// Ambient and object temperature pair in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    pub ambient: f64,
    pub object: f64,
}

/// Environmental sensors consumed by the report assembler only.
pub trait EnvironmentSource: Send {
    fn read_temperatures(&mut self) -> Temperatures;

    /// Color label of the surface in front of the color sensor
    fn read_color(&mut self) -> String;
}

/// Trait representing the blocking waits between sensor draws.
pub trait Pacer: Send + Sync {
    fn pause(&self, duration: Duration);
}

/// Default pacer backed by `std::thread::sleep`.
#[derive(Default)]
pub struct ThreadPacer {
    _unit: (),
}

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

mod simulated;
mod stub;

pub use simulated::{SimulatedEnvironment, SimulatedSurface, SurfaceProfile};
pub use stub::{FixedEnvironment, RecordingPacer, ScriptedSampleSource};
