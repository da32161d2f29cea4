// Simulated ultrasonic rig
//
// Produces plausible HC-SR04 style readings so the CLI and demos run on
// machines without the sensor attached. Noise is Gaussian (Box-Muller over
// `rand`), and a configurable fraction of draws fails outright.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{EnvironmentSource, SampleSource, Temperatures};

/// Parameters of a simulated surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceProfile {
    /// True distance to the surface in cm
    pub distance_cm: f64,
    /// Standard deviation of per-draw noise in cm
    pub jitter_cm: f64,
    /// Probability that a draw fails (0.0-1.0)
    pub dropout: f64,
}

impl Default for SurfaceProfile {
    fn default() -> Self {
        Self {
            distance_cm: 25.0,
            jitter_cm: 0.4,
            dropout: 0.02,
        }
    }
}

/// Seeded random sample source
pub struct SimulatedSurface {
    profile: SurfaceProfile,
    rng: StdRng,
}

impl SimulatedSurface {
    pub fn new(profile: SurfaceProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn gaussian(&mut self) -> f64 {
        // Box-Muller; u1 kept away from 0 so ln() stays finite
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

impl SampleSource for SimulatedSurface {
    fn draw_sample(&mut self) -> Option<f64> {
        // NaN would panic in gen_bool
        let dropout = if self.profile.dropout.is_finite() {
            self.profile.dropout.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if self.rng.gen_bool(dropout) {
            return None;
        }
        let noise = self.gaussian() * self.profile.jitter_cm;
        Some((self.profile.distance_cm + noise).max(0.0))
    }
}

/// Environment source with slowly wandering temperatures
pub struct SimulatedEnvironment {
    ambient: f64,
    object: f64,
    color: String,
    rng: StdRng,
}

impl SimulatedEnvironment {
    pub fn new(ambient: f64, object: f64, color: impl Into<String>, seed: u64) -> Self {
        Self {
            ambient,
            object,
            color: color.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EnvironmentSource for SimulatedEnvironment {
    fn read_temperatures(&mut self) -> Temperatures {
        let drift: f64 = self.rng.gen_range(-0.2..0.2);
        Temperatures {
            ambient: self.ambient + drift,
            object: self.object + drift,
        }
    }

    fn read_color(&mut self) -> String {
        self.color.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_readings() {
        let profile = SurfaceProfile::default();
        let mut a = SimulatedSurface::new(profile, 7);
        let mut b = SimulatedSurface::new(profile, 7);
        for _ in 0..20 {
            assert_eq!(a.draw_sample(), b.draw_sample());
        }
    }

    #[test]
    fn readings_cluster_around_distance() {
        let profile = SurfaceProfile {
            distance_cm: 30.0,
            jitter_cm: 0.5,
            dropout: 0.0,
        };
        let mut source = SimulatedSurface::new(profile, 42);
        let readings: Vec<f64> = (0..500).filter_map(|_| source.draw_sample()).collect();
        assert_eq!(readings.len(), 500);
        let mean = readings.iter().sum::<f64>() / readings.len() as f64;
        assert!((mean - 30.0).abs() < 0.2, "mean drifted to {}", mean);
    }

    #[test]
    fn full_dropout_never_reads() {
        let profile = SurfaceProfile {
            dropout: 1.0,
            ..SurfaceProfile::default()
        };
        let mut source = SimulatedSurface::new(profile, 1);
        assert!((0..50).all(|_| source.draw_sample().is_none()));
    }

    #[test]
    fn non_finite_dropout_is_ignored() {
        for dropout in [f64::NAN, f64::INFINITY] {
            let profile = SurfaceProfile {
                dropout,
                ..SurfaceProfile::default()
            };
            let mut source = SimulatedSurface::new(profile, 5);
            assert!((0..50).all(|_| source.draw_sample().is_some()));
        }
    }
}
