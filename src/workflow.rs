//! Workflow stage model
//!
//! One authoritative stage per vehicle. Entering `Scheduling` is the only
//! transition gated by readiness; the readiness boolean is its sole input.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Kickoff,
    Homologation,
    Planning,
    Logistics,
    Scheduling,
    Installation,
}

impl Stage {
    /// Every stage in workflow order
    pub const ALL: [Stage; 6] = [
        Stage::Kickoff,
        Stage::Homologation,
        Stage::Planning,
        Stage::Logistics,
        Stage::Scheduling,
        Stage::Installation,
    ];

    pub fn next(&self) -> Option<Stage> {
        let index = Stage::ALL.iter().position(|stage| stage == self)?;
        Stage::ALL.get(index + 1).copied()
    }

    pub fn is_final(&self) -> bool {
        self.next().is_none()
    }
}

/// The "proceed to scheduling" gate
pub struct SchedulingGate;

impl SchedulingGate {
    /// Whether a move into `to` is allowed given the readiness boolean
    pub fn allows(to: Stage, ready: bool) -> bool {
        to != Stage::Scheduling || ready
    }
}

/// Stage tracking for one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleWorkflow {
    pub plate: String,
    pub stage: Stage,
}

impl VehicleWorkflow {
    pub fn new(plate: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            stage: Stage::Kickoff,
        }
    }

    pub fn at(plate: impl Into<String>, stage: Stage) -> Self {
        Self {
            plate: plate.into(),
            stage,
        }
    }

    /// Move to the next stage
    pub fn advance(&mut self, ready: bool) -> Result<Stage, WorkflowError> {
        let next = self.stage.next().ok_or(WorkflowError::AlreadyFinal(self.stage))?;
        self.move_to(next, ready)
    }

    /// Move forward by exactly one stage, or back to any earlier stage.
    /// Moving back is never gated.
    pub fn move_to(&mut self, to: Stage, ready: bool) -> Result<Stage, WorkflowError> {
        let forward = self.stage.next() == Some(to);
        if !forward && to >= self.stage {
            return Err(WorkflowError::InvalidTransition { from: self.stage, to });
        }
        if forward && !SchedulingGate::allows(to, ready) {
            return Err(WorkflowError::NotReady {
                plate: self.plate.clone(),
            });
        }
        info!("Vehicle {} moved {:?} -> {:?}", self.plate, self.stage, to);
        self.stage = to;
        Ok(to)
    }
}
