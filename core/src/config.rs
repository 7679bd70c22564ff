//! Tunable simulation constants.
//!
//! Physical quantities are stored in meters and seconds and converted to
//! arena units (pixels) through `pixels_per_meter`. The defaults reproduce
//! the reference arena: 800x600 units at 10 units per meter.

use crate::error::{SimError, SimResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    // ── Arena ──────────────────────────────────────
    pub width: f64,
    pub height: f64,
    pub pixels_per_meter: f64,

    // ── Population churn ───────────────────────────
    pub initial_population: usize,
    pub max_population: usize,
    /// Per-tick chance of an edge-entry spawn while below the cap.
    pub spawn_chance: f64,
    /// Only applied when immunity is enabled for the run.
    pub immune_spawn_chance: f64,
    /// Applied to non-immune spawns.
    pub infected_spawn_chance: f64,

    // ── Kinematics ─────────────────────────────────
    pub min_speed_mps: f64,
    pub max_speed_mps: f64,
    pub steering_rate_per_second: f64,
    /// Turns are drawn uniformly from [-max_turn_angle, max_turn_angle].
    pub max_turn_angle: f64,
    /// Relative speed change per steering event, e.g. 0.02 = ±2%.
    pub speed_jitter: f64,
    /// Chance that a boundary breach bounces instead of exiting.
    pub bounce_chance: f64,

    // ── Disease ────────────────────────────────────
    pub infection_distance_m: f64,
    pub contact_time_required: f64,
    pub asymptomatic_transmission: f64,
    pub symptomatic_transmission: f64,
    /// Share of new infections that are symptomatic.
    pub symptomatic_share: f64,
    pub infection_duration_min: f64,
    pub infection_duration_max: f64,

    // ── Driver ─────────────────────────────────────
    /// Fixed timestep the driver feeds into `update` (25 Hz).
    pub fixed_dt: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            pixels_per_meter: 10.0,

            initial_population: 50,
            max_population: 100,
            spawn_chance: 0.05,
            immune_spawn_chance: 0.30,
            infected_spawn_chance: 0.10,

            min_speed_mps: 0.05,
            max_speed_mps: 2.5,
            steering_rate_per_second: 0.10,
            max_turn_angle: 0.15,
            speed_jitter: 0.02,
            bounce_chance: 0.5,

            infection_distance_m: 2.0,
            contact_time_required: 3.0,
            asymptomatic_transmission: 0.50,
            symptomatic_transmission: 1.00,
            symptomatic_share: 0.5,
            infection_duration_min: 20.0,
            infection_duration_max: 30.0,

            fixed_dt: 1.0 / 25.0,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&content)
            .with_context(|| format!("Cannot parse {}", path.display()))?;
        Ok(config)
    }

    /// Infection radius in arena units.
    pub fn infection_distance(&self) -> f64 {
        self.infection_distance_m * self.pixels_per_meter
    }

    /// Minimum speed in arena units per second.
    pub fn min_speed(&self) -> f64 {
        self.min_speed_mps * self.pixels_per_meter
    }

    /// Maximum speed in arena units per second.
    pub fn max_speed(&self) -> f64 {
        self.max_speed_mps * self.pixels_per_meter
    }

    pub fn validate(&self) -> SimResult<()> {
        fn reject(reason: String) -> SimResult<()> {
            Err(SimError::InvalidConfig { reason })
        }

        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("pixels_per_meter", self.pixels_per_meter),
            ("min_speed_mps", self.min_speed_mps),
            ("contact_time_required", self.contact_time_required),
            ("fixed_dt", self.fixed_dt),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return reject(format!("{name} must be positive, got {value}"));
            }
        }

        for (name, p) in [
            ("spawn_chance", self.spawn_chance),
            ("immune_spawn_chance", self.immune_spawn_chance),
            ("infected_spawn_chance", self.infected_spawn_chance),
            ("bounce_chance", self.bounce_chance),
            ("asymptomatic_transmission", self.asymptomatic_transmission),
            ("symptomatic_transmission", self.symptomatic_transmission),
            ("symptomatic_share", self.symptomatic_share),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return reject(format!("{name} must be within [0, 1], got {p}"));
            }
        }

        if !(self.max_speed_mps >= self.min_speed_mps) {
            return reject(format!(
                "max_speed_mps ({}) is below min_speed_mps ({})",
                self.max_speed_mps, self.min_speed_mps
            ));
        }
        if !(self.infection_duration_min >= 0.0
            && self.infection_duration_max >= self.infection_duration_min)
        {
            return reject(format!(
                "infection duration range [{}, {}] is invalid",
                self.infection_duration_min, self.infection_duration_max
            ));
        }
        if self.infection_distance_m < 0.0
            || self.steering_rate_per_second < 0.0
            || self.max_turn_angle < 0.0
            || self.speed_jitter < 0.0
        {
            return reject("distances, rates and angles must not be negative".into());
        }
        if self.initial_population > self.max_population {
            return reject(format!(
                "initial_population ({}) exceeds max_population ({})",
                self.initial_population, self.max_population
            ));
        }
        Ok(())
    }
}
