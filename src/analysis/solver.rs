//! Step dispatch

use log::{error, info};

use super::{dynamic, static_solver, StepType};
use crate::error::{FEAError, FEAResult};
use crate::model::Structure;
use crate::results::StepReport;

/// Runs the analysis steps of a structure.
///
/// Steps are executed in ascending id order; every step starts from the
/// node state left behind by the previous one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Solver;

impl Solver {
    pub fn new() -> Self {
        Self
    }

    /// Run every step of `structure`, stopping at the first fatal error
    pub fn run_all(&self, structure: &mut Structure) -> FEAResult<Vec<StepReport>> {
        let ids: Vec<usize> = structure.steps.keys().copied().collect();
        if ids.is_empty() {
            info!("structure has no analysis steps");
        }
        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            reports.push(self.run_step(structure, id)?);
        }
        Ok(reports)
    }

    /// Run one step. Its previous results are discarded; the new report,
    /// stiffness blocks and frames are stored on the step.
    pub fn run_step(&self, structure: &mut Structure, id: usize) -> FEAResult<StepReport> {
        let mut step = structure.steps.remove(&id).ok_or(FEAError::StepNotFound(id))?;
        step.clear_results();
        info!("running {:?} step {id}", step.step_type);

        let result = match step.step_type {
            StepType::Static => static_solver::solve(structure, id, &mut step),
            StepType::Dynamic => dynamic::solve(structure, id, &mut step),
        };
        if let Ok(report) = &result {
            step.report = Some(report.clone());
        }
        structure.steps.insert(id, step);

        result.map_err(|e| {
            error!("step {id} failed: {e}");
            e
        })
    }
}
