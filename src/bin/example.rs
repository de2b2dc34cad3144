//! FEA Engine Example - portal frame and a suddenly loaded cable

use anyhow::{Context, Result};
use fea_engine::prelude::*;
use log::info;

/// Portal frame of 3D beams, clamped at the base
///
///     N3 -------- N4
///     |          |
///     |          |
///     N1        N2
fn portal_frame() -> Result<Structure> {
    let mut model = Structure::new();
    model.add_material(1, Material::steel())?;
    // W12x26 (approximate properties in m)
    model.add_section(1, Section::new(0.00494, 8.49e-5, 7.2e-6, 1.25e-7))?;
    let property = model.property(1, 1)?;

    let height = 4.0;
    let span = 6.0;
    model.add_node(1, Node::new(0.0, 0.0, 0.0))?;
    model.add_node(2, Node::new(span, 0.0, 0.0))?;
    model.add_node(3, Node::new(0.0, height, 0.0))?;
    model.add_node(4, Node::new(span, height, 0.0))?;

    model.add_element(1, Element::beam(1, 3, property))?;
    model.add_element(2, Element::beam(2, 4, property))?;
    model.add_element(3, Element::beam(3, 4, property))?;

    model.constrain(Constraint::clamped(1))?;
    model.constrain(Constraint::clamped(2))?;

    // dead load lumped on the beam ends, wind at roof level
    model.add_load(1, Load::node_force(3, Direction::Y, -span * 20000.0 / 2.0, 1))?;
    model.add_load(2, Load::node_force(4, Direction::Y, -span * 20000.0 / 2.0, 1))?;
    model.add_load(3, Load::node_force(3, Direction::X, 10000.0, 1))?;
    model.add_step(1, AnalysisStep::static_step(1.0, 1.0))?;
    Ok(model)
}

/// Steel cable hanging a point load, released from the unstretched shape
fn cable_drop() -> Result<Structure> {
    let mut model = Structure::new();
    model.add_material(1, Material::steel())?;
    model.add_section(1, Section::circular(0.01))?;
    let property = model.property(1, 1)?;

    model.add_node(1, Node::new(0.0, 0.0, 0.0))?;
    model.add_node(2, Node::new(0.0, -2.0, 0.0))?;
    model.add_element(1, Element::cable(1, 2, property))?;

    model.constrain(Constraint::pinned(1))?;
    model.constrain([
        Constraint::fixed(2, Direction::X),
        Constraint::fixed(2, Direction::Z),
    ])?;
    model.add_load(1, Load::node_force(2, Direction::Y, -5000.0, 1))?;
    model.add_step(
        1,
        AnalysisStep::dynamic_step(0.01, 1e-4).with_amplitude(Amplitude::Step),
    )?;
    Ok(model)
}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== FEA Engine Example: Portal Frame ===\n");
    let mut frame = portal_frame()?;
    let reports = frame.solve().context("portal frame analysis failed")?;
    info!("static step used {} iterations", reports[0].total_iterations());

    println!("Node Displacements:");
    for id in [3, 4] {
        let disp = frame.node_displacement(id)?;
        println!(
            "  N{}: DX={:.4}mm, DY={:.4}mm, RZ={:.6}rad",
            id,
            disp.dx * 1000.0,
            disp.dy * 1000.0,
            disp.rz
        );
    }

    println!("\nSupport Reactions:");
    for id in [1, 2] {
        let rxn = frame.node_reactions(id)?;
        println!(
            "  N{}: FX={:.2}kN, FY={:.2}kN, MZ={:.2}kN·m",
            id,
            rxn.fx / 1000.0,
            rxn.fy / 1000.0,
            rxn.mz / 1000.0
        );
    }

    let summary = frame.summary();
    println!("\nSummary:");
    if let Some(node) = summary.max_disp_node {
        println!("  Max displacement: {:.4}mm at N{}", summary.max_displacement * 1000.0, node);
    }
    if let Some(element) = summary.max_stress_element {
        println!("  Max axial stress: {:.2}MPa in E{}", summary.max_stress / 1e6, element);
    }

    println!("\n=== Cable Drop (Newmark) ===\n");
    let mut registry = ModelRegistry::new();
    registry.create(cable_drop()?);
    let reports = registry.solve_active().context("cable analysis failed")?;
    println!("Accepted time steps: {}", reports[0].time_steps);

    let cable = registry.active().context("no active model")?;
    let step = cable.step(1)?;
    let history = step.outputter().history(2, Field::U2);
    let peak = history.iter().map(|(_, u)| *u).fold(0.0_f64, f64::min);
    println!("Peak drop: {:.4}mm over {} frames", peak * 1000.0, history.len());
    if let Some((t, u)) = history.last() {
        println!("Final DY at t={t:.4}s: {:.4}mm", u * 1000.0);
    }

    println!("\n=== Analysis Complete ===");
    Ok(())
}
