//! Agent-based outbreak simulator core.
//!
//! Individuals wander a bounded arena and move through
//! Healthy → Infected (asymptomatic | symptomatic) → Immune based on how
//! long they stay close to contagious neighbors. A driver owns the clock
//! and calls `SimEngine::update` at a fixed rate; everything else
//! (rendering, input, file dialogs) lives outside this crate.

pub mod config;
pub mod engine;
pub mod error;
pub mod individual;
pub mod rng;
pub mod snapshot;
pub mod state;
pub mod types;
pub mod vector;

pub use config::SimConfig;
pub use engine::{AgentView, SimEngine, SimStats, TickReport};
pub use error::{SimError, SimResult};
pub use individual::{Individual, NeighborView};
pub use snapshot::{IndividualMemento, SimSnapshot};
pub use state::{InfectionState, StateColor};
pub use vector::Vector2D;
