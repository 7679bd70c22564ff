//! Infection state machine.
//!
//! The variant set is closed: Healthy → Infected* → Immune.
//!   - Healthy is the only state that can newly become infected.
//!     Transmission is evaluated from the susceptible side.
//!   - Both infected variants recover to Immune once `infection_time`
//!     reaches the agent's `infection_duration`.
//!   - Immune is terminal.
//!
//! Seeding and restore may create agents directly in any variant.

use crate::{
    config::SimConfig,
    individual::{Individual, NeighborView},
    rng::SimRng,
    types::Seconds,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectionState {
    #[default]
    Healthy,
    InfectedAsymptomatic,
    InfectedSymptomatic,
    Immune,
}

impl InfectionState {
    pub const ALL: [InfectionState; 4] = [
        Self::Healthy,
        Self::InfectedAsymptomatic,
        Self::InfectedSymptomatic,
        Self::Immune,
    ];

    /// Stable tag used by the snapshot format.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Healthy              => "healthy",
            Self::InfectedAsymptomatic => "infected_asymptomatic",
            Self::InfectedSymptomatic  => "infected_symptomatic",
            Self::Immune               => "immune",
        }
    }

    /// Parse a snapshot tag. Returns None for anything unrecognized;
    /// callers decide the fallback.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.tag() == tag)
    }

    pub fn color(&self) -> StateColor {
        match self {
            Self::Healthy              => StateColor::Green,
            Self::InfectedAsymptomatic => StateColor::Yellow,
            Self::InfectedSymptomatic  => StateColor::Red,
            Self::Immune               => StateColor::Blue,
        }
    }

    pub fn is_contagious(&self) -> bool {
        matches!(self, Self::InfectedAsymptomatic | Self::InfectedSymptomatic)
    }

    /// Chance that a completed contact window with a source in this state
    /// infects a healthy agent. Zero for non-contagious states.
    pub fn transmission_probability(&self, config: &SimConfig) -> f64 {
        match self {
            Self::InfectedAsymptomatic => config.asymptomatic_transmission,
            Self::InfectedSymptomatic  => config.symptomatic_transmission,
            Self::Healthy | Self::Immune => 0.0,
        }
    }

    /// Run this state's update rule on `me`.
    pub fn update(
        self,
        me: &mut Individual,
        dt: Seconds,
        neighbors: &[NeighborView],
        config: &SimConfig,
        rng: &mut SimRng,
    ) {
        match self {
            Self::Healthy => update_healthy(me, dt, neighbors, config, rng),
            Self::InfectedAsymptomatic | Self::InfectedSymptomatic => update_infected(me, dt),
            Self::Immune => {}
        }
    }
}

/// Presentation hint for the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateColor {
    Green,
    Yellow,
    Red,
    Blue,
}

impl StateColor {
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Green  => (34, 197, 94),
            Self::Yellow => (255, 255, 0),
            Self::Red    => (255, 0, 0),
            Self::Blue   => (59, 130, 246),
        }
    }
}

fn update_healthy(
    me: &mut Individual,
    dt: Seconds,
    neighbors: &[NeighborView],
    config: &SimConfig,
    rng: &mut SimRng,
) {
    let radius = config.infection_distance();
    let mut in_range: HashSet<_> = HashSet::new();

    for other in neighbors {
        if other.id == me.id || !other.alive || !other.state.is_contagious() {
            continue;
        }
        if me.position.distance(other.position) > radius {
            continue;
        }
        in_range.insert(other.id);

        let elapsed = me.contact_time.entry(other.id).or_insert(0.0);
        *elapsed += dt;
        if *elapsed < config.contact_time_required {
            continue;
        }

        if rng.chance(other.state.transmission_probability(config)) {
            me.state = if rng.chance(config.symptomatic_share) {
                InfectionState::InfectedSymptomatic
            } else {
                InfectionState::InfectedAsymptomatic
            };
            me.infection_time = 0.0;
            me.contact_time.clear();
            log::trace!(
                "agent {} infected by {} ({} -> {})",
                me.id,
                other.id,
                other.state.tag(),
                me.state.tag()
            );
            // At most one infection event per tick.
            return;
        }
        // Failed roll: a fresh window must elapse before retrying this source.
        *elapsed = 0.0;
    }

    me.contact_time.retain(|id, _| in_range.contains(id));
}

fn update_infected(me: &mut Individual, dt: Seconds) {
    me.infection_time += dt;
    if me.infection_time >= me.infection_duration {
        log::trace!(
            "agent {} recovered after {:.2}s ({})",
            me.id,
            me.infection_time,
            me.state.tag()
        );
        me.state = InfectionState::Immune;
    }
}
