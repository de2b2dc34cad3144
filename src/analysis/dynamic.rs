//! Dynamic steps: the structure seen as a [`DynamicModel`] and integrated
//! with Newmark

use log::{info, warn};

use super::assembly::{self, Quantity};
use super::dof::{self, DofPartition};
use super::{Amplitude, AnalysisStep};
use crate::dynamics::{DynamicModel, GeneralModel, LinearModel, Newmark, State};
use crate::error::FEAResult;
use crate::math::{linear_combination, spmv, Vector};
use crate::model::Structure;
use crate::results::StepReport;

/// Free-DOF external force as a function of step time.
///
/// Loads of earlier steps stay at full value; loads of this step follow
/// the amplitude over the step duration.
struct LoadHistory {
    base: Vector,
    ramped: Vector,
    amplitude: Amplitude,
    duration: f64,
}

impl LoadHistory {
    fn new(
        structure: &Structure,
        partition: &DofPartition,
        step_id: usize,
        step: &AnalysisStep,
    ) -> FEAResult<Self> {
        let free = |f: Vector| f.rows(partition.num_fixed, partition.num_free).into_owned();
        let base = free(assembly::assemble_loads(structure, partition, step_id, 0.0)?);
        let full = free(assembly::assemble_loads(structure, partition, step_id, 1.0)?);
        Ok(Self {
            ramped: full - &base,
            base,
            amplitude: step.amplitude,
            duration: step.time,
        })
    }

    fn at(&self, t: f64) -> Vector {
        let factor = self.amplitude.factor(t / self.duration);
        &self.base + &self.ramped * factor
    }
}

/// Run a dynamic step.
///
/// Prescribed displacements are held at their full value for the whole
/// step. Linear structures are integrated with constant matrices; any
/// nonlinear element switches to a model that re-evaluates internal forces
/// and the tangent stiffness at every iteration.
pub fn solve(structure: &mut Structure, step_id: usize, step: &mut AnalysisStep) -> FEAResult<StepReport> {
    structure.validate_elements()?;
    let partition = dof::number_dofs(structure)?;
    let nf = partition.num_fixed;
    let n = partition.num_free;
    info!(
        "dynamic step {step_id}: {} fixed / {} free DOFs over t = {}",
        nf, n, step.time
    );

    let x1 = assembly::constraint_displacements(structure, &partition);
    let mut u = assembly::gather(structure, &partition, Quantity::Displacement);
    u.rows_mut(0, nf).copy_from(&x1);
    let v = assembly::gather(structure, &partition, Quantity::Velocity);

    let mut report = StepReport {
        step: step_id,
        num_fixed: nf,
        num_free: n,
        ..StepReport::default()
    };

    let initial = assembly::evaluate(structure, &partition, &u)?;
    if n == 0 {
        assembly::scatter(structure, &u, Quantity::Displacement);
        initial.store(structure)?;
        step.outputter.record(step.time, &structure.nodes);
        report.final_time = step.time;
        return Ok(report);
    }

    let m22 = assembly::assemble_mass(structure, &partition)?;
    let c22 = linear_combination(step.rayleigh_alpha, &m22, step.rayleigh_beta, &initial.k22)?;
    let loads = LoadHistory::new(structure, &partition, step_id, step)?;

    let mut params = step.newmark.clone();
    if step.step_size > 0.0 {
        params.dt = step.step_size;
    }
    params.tol = step.tolerance;
    let mut newmark = Newmark::new(params)?;

    let mut state = State::new(
        0.0,
        u.rows(nf, n).into_owned(),
        v.rows(nf, n).into_owned(),
    );
    let mut states = Vec::new();
    let record = |s: &State| states.push(s.clone());

    let stats = {
        let shared: &Structure = structure;
        if shared.is_linear() {
            let k21x1 = spmv(&initial.k21, &x1)?;
            let model = LinearModel::new(&m22, &c22, &initial.k22)?
                .with_force(|t| Ok(loads.at(t) - &k21x1));
            newmark.integrate(&model, &mut state, step.time, record)?
        } else {
            let model = structure_model(shared, &partition, &x1, &m22, &c22, &loads);
            newmark.integrate(&model, &mut state, step.time, record)?
        }
    };

    if stats.forced > 0 {
        warn!("dynamic step {step_id}: {} steps accepted above the error tolerance", stats.forced);
    }
    if stats.unconverged > 0 {
        warn!("dynamic step {step_id}: {} steps hit the iteration cap", stats.unconverged);
    }

    let zeros = Vector::zeros(nf);
    for s in &states {
        let u = assembly::join(&x1, &s.x);
        assembly::scatter(structure, &u, Quantity::Displacement);
        assembly::scatter(structure, &assembly::join(&zeros, &s.v), Quantity::Velocity);
        assembly::scatter(structure, &assembly::join(&zeros, &s.a), Quantity::Acceleration);
        assembly::evaluate(structure, &partition, &u)?.store(structure)?;
        step.outputter.record(s.t, &structure.nodes);
    }

    step.k11 = Some(initial.k11);
    step.k21 = Some(initial.k21);
    step.k22 = Some(initial.k22);
    report.time_steps = stats.accepted;
    report.final_time = state.t;

    info!(
        "dynamic step {step_id} finished: {} steps accepted, {} rejected, final dt {:.3e}",
        stats.accepted, stats.rejected, stats.final_dt
    );
    Ok(report)
}

/// Residual `M a + C v + f_int(x) - F(t)` over the free DOFs with the
/// tangent stiffness re-evaluated at the current displacement
fn structure_model<'a>(
    structure: &'a Structure,
    partition: &'a DofPartition,
    x1: &'a Vector,
    m22: &'a nalgebra_sparse::CscMatrix<f64>,
    c22: &'a nalgebra_sparse::CscMatrix<f64>,
    loads: &'a LoadHistory,
) -> impl DynamicModel + 'a {
    GeneralModel::new(partition.num_free, move |s: &State| {
        let u = assembly::join(x1, &s.x);
        let system = assembly::evaluate(structure, partition, &u)?;
        let mut r = spmv(m22, &s.a)?;
        r += spmv(c22, &s.v)?;
        r += system.f_int_free(partition);
        r -= loads.at(s.t);
        Ok(r)
    })
    .with_mass(move |_| Ok(m22.clone()))
    .with_damping(move |_| Ok(c22.clone()))
    .with_stiffness(move |s| {
        let u = assembly::join(x1, &s.x);
        Ok(assembly::evaluate(structure, partition, &u)?.k22)
    })
}
