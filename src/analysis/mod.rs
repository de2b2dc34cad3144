//! Analysis steps and the solvers that run them

pub mod assembly;
pub mod dof;
pub mod dynamic;
pub mod solver;
pub mod static_solver;

use nalgebra_sparse::CscMatrix;
use serde::{Deserialize, Serialize};

use crate::dynamics::NewmarkParameters;
use crate::results::{Outputter, StepReport};

pub use dof::DofPartition;
pub use solver::Solver;

/// Type of analysis performed by a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    /// Incremental Newton-Raphson equilibrium
    #[default]
    Static,
    /// Newmark time integration
    Dynamic,
}

/// Ramp-up of loads introduced in the step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amplitude {
    /// Linear from 0 to full magnitude over the step
    #[default]
    Ramp,
    /// Full magnitude from the start of the step
    Step,
}

impl Amplitude {
    /// Load factor at `fraction` (0..1) of the step
    pub fn factor(self, fraction: f64) -> f64 {
        match self {
            Amplitude::Ramp => fraction.clamp(0.0, 1.0),
            Amplitude::Step => 1.0,
        }
    }
}

/// One analysis step together with the results it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub step_type: StepType,
    /// Total (pseudo-)time of the step
    pub time: f64,
    /// Load increment size for static steps, initial time step for dynamic ones
    pub step_size: f64,
    /// Residual norm tolerance
    pub tolerance: f64,
    /// Newton-Raphson iteration cap per increment
    pub max_iterations: usize,
    #[serde(default)]
    pub amplitude: Amplitude,
    /// Rayleigh damping: C = alpha * M + beta * K
    #[serde(default)]
    pub rayleigh_alpha: f64,
    #[serde(default)]
    pub rayleigh_beta: f64,
    #[serde(default)]
    pub newmark: NewmarkParameters,

    #[serde(skip)]
    pub(crate) k11: Option<CscMatrix<f64>>,
    #[serde(skip)]
    pub(crate) k21: Option<CscMatrix<f64>>,
    #[serde(skip)]
    pub(crate) k22: Option<CscMatrix<f64>>,
    #[serde(skip)]
    pub(crate) outputter: Outputter,
    #[serde(skip)]
    pub(crate) report: Option<StepReport>,
}

impl Default for AnalysisStep {
    fn default() -> Self {
        Self {
            step_type: StepType::Static,
            time: 1.0,
            step_size: 1.0,
            tolerance: 1e-5,
            max_iterations: 32,
            amplitude: Amplitude::Ramp,
            rayleigh_alpha: 0.0,
            rayleigh_beta: 0.0,
            newmark: NewmarkParameters::default(),
            k11: None,
            k21: None,
            k22: None,
            outputter: Outputter::new(),
            report: None,
        }
    }
}

impl AnalysisStep {
    /// Static step of total pseudo-time `time` split into increments of `step_size`
    pub fn static_step(time: f64, step_size: f64) -> Self {
        Self {
            time,
            step_size,
            ..Self::default()
        }
    }

    /// Dynamic step of duration `time` starting with time step `dt`
    pub fn dynamic_step(time: f64, dt: f64) -> Self {
        Self {
            step_type: StepType::Dynamic,
            time,
            step_size: dt,
            tolerance: 1e-8,
            ..Self::default()
        }
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_amplitude(mut self, amplitude: Amplitude) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Rayleigh damping coefficients
    pub fn with_rayleigh(mut self, alpha: f64, beta: f64) -> Self {
        self.rayleigh_alpha = alpha;
        self.rayleigh_beta = beta;
        self
    }

    pub fn with_newmark(mut self, params: NewmarkParameters) -> Self {
        self.newmark = params;
        self
    }

    /// Number of static load increments, at least one
    pub fn num_increments(&self) -> usize {
        if self.step_size <= 0.0 || self.time <= 0.0 {
            return 1;
        }
        // guard against 1.0000000000000002 style round-off
        let n = (self.time / self.step_size - 1e-9).ceil();
        (n as usize).max(1)
    }

    /// Load factor for increment `k` (1-based) of `count`
    pub fn increment_factor(&self, k: usize, count: usize) -> f64 {
        self.amplitude.factor(k as f64 / count.max(1) as f64)
    }

    /// Fixed x fixed stiffness block of the last assembly
    pub fn k11(&self) -> Option<&CscMatrix<f64>> {
        self.k11.as_ref()
    }

    /// Free x fixed stiffness block of the last assembly
    pub fn k21(&self) -> Option<&CscMatrix<f64>> {
        self.k21.as_ref()
    }

    /// Free x free stiffness block of the last assembly
    pub fn k22(&self) -> Option<&CscMatrix<f64>> {
        self.k22.as_ref()
    }

    /// Result frames recorded by this step
    pub fn outputter(&self) -> &Outputter {
        &self.outputter
    }

    /// Report of the last run of this step
    pub fn report(&self) -> Option<&StepReport> {
        self.report.as_ref()
    }

    /// Drop results of a previous run
    pub(crate) fn clear_results(&mut self) {
        self.k11 = None;
        self.k21 = None;
        self.k22 = None;
        self.outputter.clear();
        self.report = None;
    }
}
