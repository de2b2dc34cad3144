//! Incremental Newton-Raphson equilibrium

use log::{debug, info, warn};

use super::assembly::{self, GlobalSystem, Quantity};
use super::dof::{self, DofPartition};
use super::AnalysisStep;
use crate::error::{FEAError, FEAResult};
use crate::math::{shift_diagonal, Factorization, Vector};
use crate::model::Structure;
use crate::results::{IncrementReport, StepReport};

/// Added to the free-free diagonal before factorization
pub const REGULARIZATION: f64 = 1e-10;

/// Run a static step.
///
/// Loads introduced in `step_id` and prescribed displacements are ramped
/// over the increments; every increment iterates until the out-of-balance
/// force drops below the step tolerance or the iteration cap is hit.
pub fn solve(structure: &mut Structure, step_id: usize, step: &mut AnalysisStep) -> FEAResult<StepReport> {
    structure.validate_elements()?;
    let partition = dof::number_dofs(structure)?;
    let nf = partition.num_fixed;
    info!(
        "static step {step_id}: {} fixed / {} free DOFs",
        partition.num_fixed, partition.num_free
    );

    let x1 = assembly::constraint_displacements(structure, &partition);
    let mut u = assembly::gather(structure, &partition, Quantity::Displacement);
    let u1_start = u.rows(0, nf).into_owned();

    let count = step.num_increments();
    let mut report = StepReport {
        step: step_id,
        num_fixed: partition.num_fixed,
        num_free: partition.num_free,
        final_time: step.time,
        ..StepReport::default()
    };
    let mut last_system = None;

    for k in 1..=count {
        let factor = step.increment_factor(k, count);

        // move supports toward their prescribed values
        let u1 = &u1_start + (&x1 - &u1_start) * factor;
        u.rows_mut(0, nf).copy_from(&u1);

        let f = assembly::assemble_loads(structure, &partition, step_id, factor)?;
        let f2 = f.rows(nf, partition.num_free).into_owned();

        let (increment, system) = iterate(structure, &partition, step, &f2, &mut u, factor)?;
        if !increment.converged {
            warn!(
                "static step {step_id}: increment {k}/{count} (factor {factor:.4}) not converged after {} iterations, residual {:.3e}",
                increment.iterations, increment.residual
            );
        }

        // iterations evaluate from `u`; nodes take the state once per increment
        assembly::scatter(structure, &u, Quantity::Displacement);
        system.store(structure)?;
        report.increments.push(increment);
        last_system = Some(system);
    }

    if let Some(system) = last_system {
        step.k11 = Some(system.k11);
        step.k21 = Some(system.k21);
        step.k22 = Some(system.k22);
    }
    step.outputter.record(step_id as f64, &structure.nodes);

    info!(
        "static step {step_id} finished: {} increments, {} iterations, converged = {}",
        report.increments.len(),
        report.total_iterations(),
        report.converged()
    );
    Ok(report)
}

/// Newton-Raphson loop of one increment. Returns the increment report and
/// the system evaluated at the final displacement.
fn iterate(
    structure: &Structure,
    partition: &DofPartition,
    step: &AnalysisStep,
    f2: &Vector,
    u: &mut Vector,
    factor: f64,
) -> FEAResult<(IncrementReport, GlobalSystem)> {
    let nf = partition.num_fixed;
    let mut iterations = 0;

    loop {
        let system = assembly::evaluate(structure, partition, u)?;
        let residual = f2 - system.f_int_free(partition);
        let norm = residual.norm();
        debug!("factor {factor:.4} iteration {iterations}: residual {norm:.6e}");

        // the first pass only evaluates the new increment
        let converged = partition.num_free == 0 || (iterations > 0 && norm < step.tolerance);
        if converged || iterations >= step.max_iterations {
            let report = IncrementReport {
                factor,
                iterations,
                residual: norm,
                converged,
            };
            return Ok((report, system));
        }

        let k22 = shift_diagonal(&system.k22, REGULARIZATION);
        let solver = Factorization::cholesky(&k22).map_err(|e| {
            debug!("{e}");
            FEAError::SingularMatrix
        })?;
        let dx = solver.solve(&residual)?;

        let mut u2 = u.rows_mut(nf, partition.num_free);
        u2 += &dx;
        iterations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Constraint, Direction, Element, Material, Node, Section, StrainMeasure};
    use crate::loads::Load;
    use approx::assert_relative_eq;

    /// Bar along X, node 1 pinned, node 2 free only along X
    fn bar(strain: StrainMeasure, load: f64, step: AnalysisStep) -> Structure {
        let mut s = Structure::new();
        s.add_node(1, Node::new(0.0, 0.0, 0.0)).unwrap();
        s.add_node(2, Node::new(2.0, 0.0, 0.0)).unwrap();
        s.add_material(1, Material::new(1000.0, 0.3, 1.0)).unwrap();
        s.add_section(1, Section::area(0.5)).unwrap();
        let p = s.property(1, 1).unwrap();
        s.add_element(1, Element::truss(1, 2, p).with_strain(strain)).unwrap();
        s.constrain(Constraint::pinned(1)).unwrap();
        s.constrain([
            Constraint::fixed(2, Direction::Y),
            Constraint::fixed(2, Direction::Z),
        ])
        .unwrap();
        s.add_load(1, Load::node_force(2, Direction::X, load, 1)).unwrap();
        s.add_step(1, step).unwrap();
        s
    }

    #[test]
    fn test_linear_bar_one_iteration() {
        let mut s = bar(StrainMeasure::Engineering, 10.0, AnalysisStep::default());
        let mut step = s.steps.remove(&1).unwrap();
        let report = solve(&mut s, 1, &mut step).unwrap();

        assert_eq!(report.increments.len(), 1);
        assert_eq!(report.increments[0].iterations, 1);
        assert!(report.converged());
        assert_relative_eq!(
            s.node(2).unwrap().displacement(Direction::X),
            10.0 * 2.0 / (1000.0 * 0.5),
            epsilon = 1e-12
        );
        // reaction balances the load
        assert_relative_eq!(s.node(1).unwrap().force(Direction::X), -10.0, epsilon = 1e-9);
        assert_relative_eq!(s.element(1).unwrap().stress(), 20.0, epsilon = 1e-9);
        assert!(step.k22().is_some());
        assert_eq!(step.outputter().len(), 1);
    }

    #[test]
    fn test_max_iterations_zero_reports_failure() {
        let step = AnalysisStep::static_step(1.0, 0.5).with_max_iter(0);
        let mut s = bar(StrainMeasure::Logarithmic, 10.0, step);
        let mut step = s.steps.remove(&1).unwrap();
        let report = solve(&mut s, 1, &mut step).unwrap();

        assert_eq!(report.increments.len(), 2);
        assert!(!report.converged());
        assert!(report.increments.iter().all(|i| i.iterations == 0));
        assert_eq!(s.node(2).unwrap().displacement(Direction::X), 0.0);
    }

    #[test]
    fn test_prescribed_displacement() {
        let mut s = bar(StrainMeasure::Linear, 0.0, AnalysisStep::static_step(1.0, 0.5));
        // pull node 2 along X by a prescribed amount instead of a load
        s.constrain([Constraint::new(2, Direction::X, 0.02)]).unwrap();
        let mut step = s.steps.remove(&1).unwrap();
        let report = solve(&mut s, 1, &mut step).unwrap();

        assert_eq!(report.num_free, 0);
        assert_relative_eq!(s.node(2).unwrap().displacement(Direction::X), 0.02);
        // reaction = EA/L * delta
        assert_relative_eq!(s.node(2).unwrap().force(Direction::X), 250.0 * 0.02, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_system_is_fatal() {
        let mut s = Structure::new();
        s.add_node(1, Node::new(0.0, 0.0, 0.0)).unwrap();
        s.add_node(2, Node::new(1.0, 0.0, 0.0)).unwrap();
        s.add_material(1, Material::new(-1000.0, 0.3, 1.0)).unwrap();
        s.add_section(1, Section::area(1.0)).unwrap();
        let p = s.property(1, 1).unwrap();
        s.add_element(1, Element::truss(1, 2, p).with_strain(StrainMeasure::Linear))
            .unwrap();
        s.constrain(Constraint::pinned(1)).unwrap();
        s.add_load(1, Load::node_force(2, Direction::X, 1.0, 1)).unwrap();

        let mut step = AnalysisStep::default();
        // negative modulus makes K22 indefinite
        assert!(matches!(
            solve(&mut s, 1, &mut step),
            Err(FEAError::SingularMatrix)
        ));
    }
}
