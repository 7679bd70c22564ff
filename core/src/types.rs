//! Shared primitive types used across the entire simulation.

/// One fixed-timestep invocation of `SimEngine::update`.
pub type Tick = u64;

/// A stable, unique identifier for an individual within a run.
/// Assigned sequentially and never reused while the run is live.
pub type AgentId = u64;

/// Simulated seconds.
pub type Seconds = f64;
