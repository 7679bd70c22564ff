//! Snapshot serialization: full simulation state to/from JSON.
//!
//! The format is flat and versionless. It deliberately omits each
//! agent's contact windows: a restored run starts with every contact
//! window empty, so partially accumulated exposure is lost on reload.

use crate::{
    error::{SimError, SimResult},
    types::{AgentId, Seconds},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualMemento {
    pub id:                 AgentId,
    pub position_x:         f64,
    pub position_y:         f64,
    pub velocity_x:         f64,
    pub velocity_y:         f64,
    /// One of the `InfectionState` tags. Unknown tags restore as healthy.
    pub state_name:         String,
    pub infection_time:     Seconds,
    pub infection_duration: Seconds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub individuals:     Vec<IndividualMemento>,
    pub simulation_time: Seconds,
    pub has_immunity:    bool,
    pub next_id:         AgentId,
}

impl SimSnapshot {
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate. Unparsable input is `InvalidSnapshot`;
    /// parsable input that breaks engine invariants is
    /// `SnapshotValidation`.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let snapshot: SimSnapshot = serde_json::from_str(json).map_err(SimError::InvalidSnapshot)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!(
            "Snapshot saved to {} ({} individuals, t={:.2}s)",
            path.display(),
            self.individuals.len(),
            self.simulation_time
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json)?;
        log::info!(
            "Snapshot loaded from {} ({} individuals, t={:.2}s)",
            path.display(),
            snapshot.individuals.len(),
            snapshot.simulation_time
        );
        Ok(snapshot)
    }

    pub fn validate(&self) -> SimResult<()> {
        fn reject(reason: String) -> SimResult<()> {
            Err(SimError::SnapshotValidation { reason })
        }

        if !(self.simulation_time.is_finite() && self.simulation_time >= 0.0) {
            return reject(format!("simulation_time must be non-negative, got {}", self.simulation_time));
        }

        let mut seen = HashSet::with_capacity(self.individuals.len());
        for m in &self.individuals {
            if !seen.insert(m.id) {
                return reject(format!("duplicate individual id {}", m.id));
            }
            if m.id >= self.next_id {
                return reject(format!("individual id {} is not below next_id {}", m.id, self.next_id));
            }
            let coords = [m.position_x, m.position_y, m.velocity_x, m.velocity_y];
            if coords.iter().any(|v| !v.is_finite()) {
                return reject(format!("individual {} has a non-finite position or velocity", m.id));
            }
            if !(m.infection_time.is_finite() && m.infection_time >= 0.0) {
                return reject(format!("individual {} has infection_time {}", m.id, m.infection_time));
            }
            if !(m.infection_duration.is_finite() && m.infection_duration >= 0.0) {
                return reject(format!("individual {} has infection_duration {}", m.id, m.infection_duration));
            }
        }
        Ok(())
    }
}

/// Default file name for a save taken now, e.g.
/// `simulation_20240131_154502.json`.
pub fn generate_file_name() -> String {
    format!("simulation_{}.json", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}
