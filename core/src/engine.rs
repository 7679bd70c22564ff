//! The simulation engine: owns the population and advances it.
//!
//! EXECUTION ORDER per `update(dt)` (fixed, documented, never reordered):
//!   1. Capture a NeighborView of every agent.
//!   2. Parallel phase: each agent runs kinematics + state update against
//!      the captured views, with its own derived RNG stream.
//!   3. Barrier. Everything below runs on the calling thread.
//!   4. Compaction: drop every agent no longer alive.
//!   5. Spawn roll: one edge-entry spawn with `spawn_chance`, unless the
//!      population is at `max_population`.
//!   6. Advance simulation time.
//!
//! RULES:
//!   - Agents never observe each other's in-progress writes. Within a
//!     tick, every neighbor is seen at its pre-tick position and state.
//!   - All randomness flows through the RngBank.
//!   - Ids are handed out sequentially and never reused within a run.

use crate::{
    config::SimConfig,
    error::SimResult,
    individual::{Individual, NeighborView},
    rng::{RngBank, SimRng, StreamSlot},
    snapshot::SimSnapshot,
    state::{InfectionState, StateColor},
    types::{AgentId, Seconds, Tick},
    vector::Vector2D,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub struct SimEngine {
    config:          SimConfig,
    rng_bank:        RngBank,
    /// Engine-level stream: seeding and spawning.
    rng:             SimRng,
    individuals:     Vec<Individual>,
    simulation_time: Seconds,
    next_id:         AgentId,
    has_immunity:    bool,
    tick:            Tick,
    /// Bumped on every initialize/restore so each one draws fresh streams.
    epoch:           u64,
}

/// Point-in-time tally of the population.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimStats {
    pub time:                  Seconds,
    pub population:            usize,
    pub healthy:               usize,
    pub infected:              usize,
    pub infected_asymptomatic: usize,
    pub infected_symptomatic:  usize,
    pub immune:                usize,
}

/// What a renderer needs to draw one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id:       AgentId,
    pub position: Vector2D,
    pub state:    InfectionState,
    pub color:    StateColor,
}

/// Population churn observed during one `update`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    pub tick:     Tick,
    pub departed: usize,
    pub spawned:  Option<AgentId>,
}

impl SimEngine {
    /// Build an engine with an empty population.
    /// Call `initialize` or `restore_snapshot` before ticking.
    pub fn new(seed: u64, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let rng_bank = RngBank::new(seed);
        Ok(Self {
            rng: rng_bank.for_stream(StreamSlot::Engine, 0),
            rng_bank,
            config,
            individuals: Vec::new(),
            simulation_time: 0.0,
            next_id: 0,
            has_immunity: false,
            tick: 0,
            epoch: 0,
        })
    }

    /// Reset the run and seed the initial population.
    pub fn initialize(&mut self, immunity_enabled: bool) {
        self.begin_epoch();
        self.individuals.clear();
        self.simulation_time = 0.0;
        self.next_id = 0;
        self.has_immunity = immunity_enabled;

        for _ in 0..self.config.initial_population {
            self.spawn(true);
        }

        let stats = self.get_stats();
        log::info!(
            "Initialized: seed={} epoch={} immunity={} population={} infected={} immune={}",
            self.rng_bank.master_seed(),
            self.epoch,
            immunity_enabled,
            stats.population,
            stats.infected,
            stats.immune
        );
    }

    /// Advance the simulation by `dt` seconds. This is the core step.
    pub fn update(&mut self, dt: Seconds) -> TickReport {
        if !(dt.is_finite() && dt >= 0.0) {
            log::warn!("update() ignored invalid dt={dt}");
            return TickReport { tick: self.tick, ..TickReport::default() };
        }

        self.tick += 1;
        let tick = self.tick;

        let neighbors: Vec<NeighborView> = self.individuals.iter().map(NeighborView::from).collect();
        let config = &self.config;
        let bank = self.rng_bank;
        let epoch = self.epoch;

        self.individuals.par_iter_mut().for_each(|individual| {
            let mut rng = bank.for_agent(epoch, tick, individual.id);
            individual.update(dt, config, &neighbors, &mut rng);
        });

        let before = self.individuals.len();
        self.individuals.retain(Individual::is_alive);
        let departed = before - self.individuals.len();

        let spawned = if self.rng.chance(self.config.spawn_chance)
            && self.individuals.len() < self.config.max_population
        {
            Some(self.spawn(false))
        } else {
            None
        };

        self.simulation_time += dt;

        log::debug!(
            "tick={tick} t={:.2}s population={} departed={departed} spawned={spawned:?}",
            self.simulation_time,
            self.individuals.len()
        );

        TickReport { tick, departed, spawned }
    }

    /// Run n ticks of `dt` each. Used for testing and fast-forward.
    pub fn run_ticks(&mut self, n: u64, dt: Seconds) {
        for _ in 0..n {
            self.update(dt);
        }
    }

    /// Add one agent and return its id.
    ///
    /// `initial` agents are placed uniformly inside the arena; others
    /// enter on a uniformly chosen edge.
    pub fn spawn(&mut self, initial: bool) -> AgentId {
        let (w, h) = (self.config.width, self.config.height);
        let rng = &mut self.rng;

        let position = if initial {
            Vector2D::new(rng.range(0.0, w), rng.range(0.0, h))
        } else {
            match rng.next_u64_below(4) {
                0 => Vector2D::new(0.0, rng.range(0.0, h)),
                1 => Vector2D::new(w, rng.range(0.0, h)),
                2 => Vector2D::new(rng.range(0.0, w), 0.0),
                _ => Vector2D::new(rng.range(0.0, w), h),
            }
        };

        let immune = self.has_immunity && rng.chance(self.config.immune_spawn_chance);
        let state = if immune {
            InfectionState::Immune
        } else if rng.chance(self.config.infected_spawn_chance) {
            if rng.chance(self.config.symptomatic_share) {
                InfectionState::InfectedSymptomatic
            } else {
                InfectionState::InfectedAsymptomatic
            }
        } else {
            InfectionState::Healthy
        };

        let id = self.next_id;
        self.next_id += 1;
        self.individuals.push(Individual::new(id, position, state, &self.config, &mut self.rng));

        if !initial {
            log::debug!("spawned agent {id} at ({:.1}, {:.1}) as {}", position.x, position.y, state.tag());
        }
        id
    }

    pub fn get_stats(&self) -> SimStats {
        let mut stats = SimStats {
            time: self.simulation_time,
            population: self.individuals.len(),
            ..SimStats::default()
        };
        for individual in &self.individuals {
            match individual.state {
                InfectionState::Healthy => stats.healthy += 1,
                InfectionState::InfectedAsymptomatic => stats.infected_asymptomatic += 1,
                InfectionState::InfectedSymptomatic => stats.infected_symptomatic += 1,
                InfectionState::Immune => stats.immune += 1,
            }
        }
        stats.infected = stats.infected_asymptomatic + stats.infected_symptomatic;
        stats
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn agent_views(&self) -> impl Iterator<Item = AgentView> + '_ {
        self.individuals.iter().map(|ind| AgentView {
            id:       ind.id,
            position: ind.position,
            state:    ind.state,
            color:    ind.state.color(),
        })
    }

    pub fn create_snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            individuals:     self.individuals.iter().map(Individual::save_state).collect(),
            simulation_time: self.simulation_time,
            has_immunity:    self.has_immunity,
            next_id:         self.next_id,
        }
    }

    /// Replace the whole population with the snapshot's. Prior agents are
    /// discarded, not merged. On a validation error the engine is left
    /// untouched.
    pub fn restore_snapshot(&mut self, snapshot: &SimSnapshot) -> SimResult<()> {
        snapshot.validate()?;

        self.begin_epoch();
        self.individuals = snapshot.individuals.iter().map(Individual::restore_state).collect();
        self.simulation_time = snapshot.simulation_time;
        self.has_immunity = snapshot.has_immunity;
        self.next_id = snapshot.next_id;

        log::info!(
            "Restored: epoch={} population={} t={:.2}s next_id={} immunity={}",
            self.epoch,
            self.individuals.len(),
            self.simulation_time,
            self.next_id,
            self.has_immunity
        );
        Ok(())
    }

    pub fn config(&self) -> &SimConfig          { &self.config }
    pub fn population(&self) -> usize           { self.individuals.len() }
    pub fn simulation_time(&self) -> Seconds    { self.simulation_time }
    pub fn has_immunity(&self) -> bool          { self.has_immunity }
    pub fn next_id(&self) -> AgentId            { self.next_id }
    pub fn seed(&self) -> u64                   { self.rng_bank.master_seed() }

    /// Ticks since the last initialize/restore.
    pub fn tick(&self) -> Tick                  { self.tick }

    fn begin_epoch(&mut self) {
        self.epoch += 1;
        self.tick = 0;
        self.rng = self.rng_bank.for_stream(StreamSlot::Engine, self.epoch);
    }
}
