//! A single simulated person: kinematics plus delegation to the
//! infection state machine.
//!
//! EXECUTION ORDER within `update` (fixed):
//!   1. Speed floor/ceiling for velocities set from outside (restore).
//!   2. Random steering.
//!   3. Translation.
//!   4. Per-axis boundary resolution: bounce or exit.
//!   5. Infection state update.

use crate::{
    config::SimConfig,
    rng::SimRng,
    snapshot::IndividualMemento,
    state::InfectionState,
    types::{AgentId, Seconds},
    vector::Vector2D,
};
use std::collections::HashMap;

/// Below this magnitude a velocity has no usable heading.
const DEGENERATE_SPEED: f64 = 1e-9;

/// Relative slack on the speed bounds so float rounding after a rescale
/// never counts as a violation.
const SPEED_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub id:                 AgentId,
    pub position:           Vector2D,
    /// Arena units per second.
    pub velocity:           Vector2D,
    pub state:              InfectionState,
    /// Accumulated in-range seconds per contagious neighbor.
    /// Only holds neighbors seen in range on the latest evaluation.
    pub contact_time:       HashMap<AgentId, Seconds>,
    pub infection_time:     Seconds,
    pub infection_duration: Seconds,
    /// Cleared when the agent leaves the arena. Dead agents are removed
    /// by the next compaction and never updated again.
    pub alive:              bool,
}

/// Read-only view of a neighbor, captured once per tick before the
/// parallel phase. Every proximity and infection decision in a tick is
/// made against these views, never against live neighbor state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborView {
    pub id:       AgentId,
    pub position: Vector2D,
    pub state:    InfectionState,
    pub alive:    bool,
}

impl From<&Individual> for NeighborView {
    fn from(ind: &Individual) -> Self {
        Self {
            id:       ind.id,
            position: ind.position,
            state:    ind.state,
            alive:    ind.alive,
        }
    }
}

impl Individual {
    /// A fresh agent with a random heading, a speed drawn uniformly from
    /// the configured range, and a random infection duration.
    pub fn new(
        id: AgentId,
        position: Vector2D,
        state: InfectionState,
        config: &SimConfig,
        rng: &mut SimRng,
    ) -> Self {
        let heading = rng.angle();
        let speed = rng.range(config.min_speed(), config.max_speed());
        Self {
            id,
            position,
            velocity: Vector2D::from_polar(heading, speed),
            state,
            contact_time: HashMap::new(),
            infection_time: 0.0,
            infection_duration: rng.range(config.infection_duration_min, config.infection_duration_max),
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// Advance this agent by `dt` seconds. Returns whether the agent is
    /// still alive afterwards.
    pub fn update(
        &mut self,
        dt: Seconds,
        config: &SimConfig,
        neighbors: &[NeighborView],
        rng: &mut SimRng,
    ) -> bool {
        if !self.alive {
            return false;
        }

        self.enforce_speed_bounds(config, rng);
        self.steer(dt, config, rng);
        self.position = self.position + self.velocity * dt;
        self.resolve_boundaries(config, rng);
        self.update_state(dt, neighbors, config, rng);

        self.alive
    }

    /// Run only the infection state machine for this tick.
    pub fn update_state(
        &mut self,
        dt: Seconds,
        neighbors: &[NeighborView],
        config: &SimConfig,
        rng: &mut SimRng,
    ) {
        let state = self.state;
        state.update(self, dt, neighbors, config, rng);
    }

    fn steer(&mut self, dt: Seconds, config: &SimConfig, rng: &mut SimRng) {
        if !rng.chance(config.steering_rate_per_second * dt) {
            return;
        }
        let turn = rng.range(-config.max_turn_angle, config.max_turn_angle);
        let jitter = 1.0 + rng.range(-config.speed_jitter, config.speed_jitter);
        self.velocity = self.velocity.rotate(turn) * jitter;
        self.clamp_speed(config, rng);
    }

    /// Top-of-tick guard for velocities that did not come from steering.
    /// Anything under the minimum gets a fresh random heading at minimum
    /// speed rather than leaving the agent parked.
    fn enforce_speed_bounds(&mut self, config: &SimConfig, rng: &mut SimRng) {
        let speed = self.velocity.magnitude();
        if !speed.is_finite() || speed < config.min_speed() * (1.0 - SPEED_TOLERANCE) {
            self.velocity = Vector2D::from_polar(rng.angle(), config.min_speed());
        } else if speed > config.max_speed() * (1.0 + SPEED_TOLERANCE) {
            self.velocity = self.velocity * (config.max_speed() / speed);
        }
    }

    /// Rescale onto [min_speed, max_speed] keeping the heading. Only a
    /// degenerate velocity loses its heading.
    fn clamp_speed(&mut self, config: &SimConfig, rng: &mut SimRng) {
        let speed = self.velocity.magnitude();
        if !speed.is_finite() || speed < DEGENERATE_SPEED {
            self.velocity = Vector2D::from_polar(rng.angle(), config.min_speed());
            return;
        }
        let target = speed.clamp(config.min_speed(), config.max_speed());
        if target != speed {
            self.velocity = self.velocity * (target / speed);
        }
    }

    fn resolve_boundaries(&mut self, config: &SimConfig, rng: &mut SimRng) {
        let (w, h) = (config.width, config.height);

        if self.position.x < 0.0 || self.position.x > w {
            if rng.chance(config.bounce_chance) {
                self.velocity.x = -self.velocity.x;
            } else {
                self.alive = false;
            }
        }
        if self.position.y < 0.0 || self.position.y > h {
            if rng.chance(config.bounce_chance) {
                self.velocity.y = -self.velocity.y;
            } else {
                self.alive = false;
            }
        }

        self.position = Vector2D::new(self.position.x.clamp(0.0, w), self.position.y.clamp(0.0, h));
    }

    pub fn save_state(&self) -> IndividualMemento {
        IndividualMemento {
            id:                 self.id,
            position_x:         self.position.x,
            position_y:         self.position.y,
            velocity_x:         self.velocity.x,
            velocity_y:         self.velocity.y,
            state_name:         self.state.tag().to_string(),
            infection_time:     self.infection_time,
            infection_duration: self.infection_duration,
        }
    }

    /// Rebuild an agent from its memento. Contact windows are not part of
    /// the memento, so the restored agent starts with none.
    /// An unrecognized state tag restores as Healthy.
    pub fn restore_state(m: &IndividualMemento) -> Self {
        let state = InfectionState::from_tag(&m.state_name).unwrap_or_else(|| {
            log::warn!(
                "agent {}: unknown state tag {:?}, restoring as healthy",
                m.id,
                m.state_name
            );
            InfectionState::Healthy
        });
        Self {
            id:                 m.id,
            position:           Vector2D::new(m.position_x, m.position_y),
            velocity:           Vector2D::new(m.velocity_x, m.velocity_y),
            state,
            contact_time:       HashMap::new(),
            infection_time:     m.infection_time,
            infection_duration: m.infection_duration,
            alive:              true,
        }
    }
}
