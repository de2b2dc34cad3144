//! Global system assembly over the partitioned DOF space

use log::warn;
use nalgebra_sparse::CscMatrix;

use super::DofPartition;
use crate::elements::{Element, ElementResponse};
use crate::error::{FEAError, FEAResult};
use crate::loads::Load;
use crate::math::{SparseMatrixBuilder, Vector};
use crate::model::Structure;

/// Nodal quantity addressed by global DOF index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Displacement,
    Velocity,
    Acceleration,
}

/// Partitioned tangent stiffness and internal force at one state
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    /// Fixed x fixed block
    pub k11: CscMatrix<f64>,
    /// Free x fixed block
    pub k21: CscMatrix<f64>,
    /// Free x free block
    pub k22: CscMatrix<f64>,
    /// Internal force over all DOFs
    pub f_int: Vector,
    responses: Vec<(usize, ElementResponse)>,
}

impl GlobalSystem {
    /// Free-DOF part of the internal force
    pub fn f_int_free(&self, partition: &DofPartition) -> Vector {
        self.f_int
            .rows(partition.num_fixed, partition.num_free)
            .into_owned()
    }

    /// Store element stresses/forces and scatter internal forces to nodes
    pub fn store(&self, structure: &mut Structure) -> FEAResult<()> {
        for node in structure.nodes.values_mut() {
            node.force.iter_mut().for_each(|f| *f = 0.0);
        }
        for (id, response) in &self.responses {
            let element = structure
                .elements
                .get_mut(id)
                .ok_or(FEAError::ElementNotFound(*id))?;
            element.store_response(response);

            let per_node = element.dofs_per_node();
            for (end, node_id) in element.nodes.iter().enumerate() {
                let node = structure
                    .nodes
                    .get_mut(node_id)
                    .ok_or(FEAError::NodeNotFound(*node_id))?;
                for slot in 0..per_node {
                    node.force[slot] += response.f_int[end * per_node + slot];
                }
            }
        }
        Ok(())
    }
}

/// Global DOF indices of an element in its local order
pub fn element_dofs(structure: &Structure, element: &Element) -> FEAResult<Vec<usize>> {
    let per_node = element.dofs_per_node();
    let mut dofs = Vec::with_capacity(element.num_dofs());
    for node_id in element.nodes {
        let node = structure.node(node_id)?;
        for slot in 0..per_node {
            let dof = node.dofs().get(slot).copied().flatten().ok_or_else(|| {
                FEAError::InvalidInput(format!("node {node_id} DOF {slot} is not numbered"))
            })?;
            dofs.push(dof);
        }
    }
    Ok(dofs)
}

/// Collect a nodal quantity into a vector over all DOFs
pub fn gather(structure: &Structure, partition: &DofPartition, quantity: Quantity) -> Vector {
    let mut out = Vector::zeros(partition.total());
    for node in structure.nodes.values() {
        let values = match quantity {
            Quantity::Displacement => &node.displacement,
            Quantity::Velocity => &node.velocity,
            Quantity::Acceleration => &node.acceleration,
        };
        for (dof, value) in node.dofs().iter().zip(values) {
            if let Some(idx) = dof {
                out[*idx] = *value;
            }
        }
    }
    out
}

/// Write a vector over all DOFs back into the nodes
pub fn scatter(structure: &mut Structure, values: &Vector, quantity: Quantity) {
    for node in structure.nodes.values_mut() {
        for slot in 0..node.dofs.len() {
            let Some(idx) = node.dofs[slot] else { continue };
            let target = match quantity {
                Quantity::Displacement => &mut node.displacement,
                Quantity::Velocity => &mut node.velocity,
                Quantity::Acceleration => &mut node.acceleration,
            };
            target[slot] = values[idx];
        }
    }
}

/// Concatenate fixed and free parts into a vector over all DOFs
pub fn join(fixed: &Vector, free: &Vector) -> Vector {
    let mut out = Vector::zeros(fixed.len() + free.len());
    out.rows_mut(0, fixed.len()).copy_from(fixed);
    out.rows_mut(fixed.len(), free.len()).copy_from(free);
    out
}

/// Tangent stiffness blocks and internal force for the displacement `u`
/// (all DOFs, global order)
pub fn evaluate(structure: &Structure, partition: &DofPartition, u: &Vector) -> FEAResult<GlobalSystem> {
    let nf = partition.num_fixed;
    let mut k11 = SparseMatrixBuilder::square(nf);
    let mut k21 = SparseMatrixBuilder::new(partition.num_free, nf);
    let mut k22 = SparseMatrixBuilder::square(partition.num_free);
    let mut f_int = Vector::zeros(partition.total());
    let mut responses = Vec::with_capacity(structure.elements.len());

    for (id, element) in &structure.elements {
        let dofs = element_dofs(structure, element)?;
        let ends = structure.element_ends(element)?;
        let (material, section) = structure.property_data(element.property)?;
        let u_e: Vec<f64> = dofs.iter().map(|&d| u[d]).collect();

        let response = element.response(&ends, &u_e, material, section)?;

        for (i, &gi) in dofs.iter().enumerate() {
            f_int[gi] += response.f_int[i];
            for (j, &gj) in dofs.iter().enumerate() {
                let v = response.k[(i, j)];
                match (gi < nf, gj < nf) {
                    (true, true) => k11.add(gi, gj, v),
                    (false, true) => k21.add(gi - nf, gj, v),
                    (false, false) => k22.add(gi - nf, gj - nf, v),
                    // fixed x free is the transpose of K21
                    (true, false) => {}
                }
            }
        }
        responses.push((*id, response));
    }

    Ok(GlobalSystem {
        k11: k11.to_csc(),
        k21: k21.to_csc(),
        k22: k22.to_csc(),
        f_int,
        responses,
    })
}

/// Lumped mass matrix of the free block
pub fn assemble_mass(structure: &Structure, partition: &DofPartition) -> FEAResult<CscMatrix<f64>> {
    let nf = partition.num_fixed;
    let mut m22 = SparseMatrixBuilder::square(partition.num_free);

    for element in structure.elements.values() {
        let dofs = element_dofs(structure, element)?;
        let ends = structure.element_ends(element)?;
        let (material, section) = structure.property_data(element.property)?;
        let m = element.lumped_mass(&ends, material, section)?;

        for (i, &gi) in dofs.iter().enumerate() {
            for (j, &gj) in dofs.iter().enumerate() {
                if gi >= nf && gj >= nf {
                    m22.add(gi - nf, gj - nf, m[(i, j)]);
                }
            }
        }
    }
    Ok(m22.to_csc())
}

/// External force over all DOFs for analysis step `step`, with loads
/// introduced in that step scaled by `factor`
pub fn assemble_loads(
    structure: &Structure,
    partition: &DofPartition,
    step: usize,
    factor: f64,
) -> FEAResult<Vector> {
    let mut f = Vector::zeros(partition.total());

    for (id, load) in &structure.loads {
        let scale = load.factor(step, factor);
        if scale == 0.0 {
            continue;
        }
        let direction = load.direction();
        match load {
            Load::NodeForce { node, value, .. } => {
                let Some(node) = structure.nodes.get(node) else {
                    warn!("load {id} references missing node {node}, skipped");
                    continue;
                };
                match node.dof(direction) {
                    Some(idx) => f[idx] += value * scale,
                    None => warn!("load {id}: node has no {direction:?} DOF, skipped"),
                }
            }
            Load::ElementForce { element, value, .. } => {
                let Some(element) = structure.elements.get(element) else {
                    warn!("load {id} references missing element {element}, skipped");
                    continue;
                };
                let ends = structure.element_ends(element)?;
                let l0 = (ends[1] - ends[0]).norm();
                add_to_ends(structure, element, direction, 0.5 * value * l0 * scale, id, &mut f)?;
            }
            Load::Gravity { value, .. } => {
                if direction.is_rotation() {
                    warn!("load {id}: gravity along {direction:?} ignored");
                    continue;
                }
                for element in structure.elements.values() {
                    let ends = structure.element_ends(element)?;
                    let l0 = (ends[1] - ends[0]).norm();
                    let (material, section) = structure.property_data(element.property)?;
                    let mass = element.nodal_mass(l0, material, section);
                    add_to_ends(structure, element, direction, value * mass * scale, id, &mut f)?;
                }
            }
        }
    }
    Ok(f)
}

fn add_to_ends(
    structure: &Structure,
    element: &Element,
    direction: crate::elements::Direction,
    value: f64,
    load_id: &usize,
    f: &mut Vector,
) -> FEAResult<()> {
    for node_id in element.nodes {
        match structure.node(node_id)?.dof(direction) {
            Some(idx) => f[idx] += value,
            None => warn!("load {load_id}: node {node_id} has no {direction:?} DOF, skipped"),
        }
    }
    Ok(())
}

/// Prescribed displacements of the fixed block
pub fn constraint_displacements(structure: &Structure, partition: &DofPartition) -> Vector {
    let mut x1 = Vector::zeros(partition.num_fixed);
    for (id, constraint) in &structure.constraints {
        let Some(node) = structure.nodes.get(&constraint.node) else {
            warn!("constraint {id} references missing node {}, skipped", constraint.node);
            continue;
        };
        if let Some(idx) = node.dof(constraint.direction) {
            if partition.is_fixed(idx) {
                x1[idx] = constraint.value;
            }
        }
    }
    x1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::dof::number_dofs;
    use crate::elements::{Constraint, Direction, Material, Node, Section, StrainMeasure};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    /// Two-bar linear truss in the XY plane, pinned at nodes 1 and 3
    fn two_bar() -> Structure {
        let mut s = Structure::new();
        s.add_node(1, Node::new(0.0, 0.0, 0.0)).unwrap();
        s.add_node(2, Node::new(1.0, 1.0, 0.0)).unwrap();
        s.add_node(3, Node::new(2.0, 0.0, 0.0)).unwrap();
        s.add_material(1, Material::new(1000.0, 0.3, 2.0)).unwrap();
        s.add_section(1, Section::area(0.1)).unwrap();
        let p = s.property(1, 1).unwrap();
        let linear = |e: Element| e.with_strain(StrainMeasure::Linear);
        s.add_element(1, linear(Element::truss(1, 2, p))).unwrap();
        s.add_element(2, linear(Element::truss(2, 3, p))).unwrap();
        s.constrain(Constraint::pinned(1)).unwrap();
        s.constrain(Constraint::pinned(3)).unwrap();
        s
    }

    #[test]
    fn test_blocks_are_symmetric() {
        let mut s = two_bar();
        let p = number_dofs(&mut s).unwrap();
        let u = Vector::zeros(p.total());
        let sys = evaluate(&s, &p, &u).unwrap();

        let k22 = DMatrix::from(&sys.k22);
        assert_eq!(k22.nrows(), p.num_free);
        assert_relative_eq!(k22.clone(), k22.transpose(), epsilon = 1e-12);
        let k11 = DMatrix::from(&sys.k11);
        assert_relative_eq!(k11.clone(), k11.transpose(), epsilon = 1e-12);
        assert_eq!(sys.k21.nrows(), p.num_free);
        assert_eq!(sys.k21.ncols(), p.num_fixed);

        // positive semi-definite
        let eig = k22.symmetric_eigenvalues();
        assert!(eig.iter().all(|&l| l > -1e-9));
    }

    #[test]
    fn test_k21_matches_full_matrix() {
        let mut s = two_bar();
        let p = number_dofs(&mut s).unwrap();
        let sys = evaluate(&s, &p, &Vector::zeros(p.total())).unwrap();

        // Full matrix built directly from the element stiffnesses
        let mut full = DMatrix::zeros(p.total(), p.total());
        for element in s.elements.values() {
            let dofs = element_dofs(&s, element).unwrap();
            let ends = s.element_ends(element).unwrap();
            let (m, sec) = s.property_data(element.property).unwrap();
            let r = element.response(&ends, &[0.0; 6], m, sec).unwrap();
            for (i, &gi) in dofs.iter().enumerate() {
                for (j, &gj) in dofs.iter().enumerate() {
                    full[(gi, gj)] += r.k[(i, j)];
                }
            }
        }
        let nf = p.num_fixed;
        let k21 = DMatrix::from(&sys.k21);
        let k12 = full.view((0, nf), (nf, p.num_free)).into_owned();
        assert_relative_eq!(k21, k12.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_internal_force_matches_stiffness_for_linear_truss() {
        let mut s = two_bar();
        let p = number_dofs(&mut s).unwrap();
        let mut u = Vector::zeros(p.total());
        u[p.num_fixed] = 0.003;
        u[p.num_fixed + 1] = -0.002;

        let sys = evaluate(&s, &p, &u).unwrap();
        let k22 = DMatrix::from(&sys.k22);
        let expected = k22 * u.rows(p.num_fixed, p.num_free);
        assert_relative_eq!(sys.f_int_free(&p), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_loads_follow_activity() {
        let mut s = two_bar();
        s.add_load(1, Load::node_force(2, Direction::Y, -10.0, 1)).unwrap();
        s.add_load(2, Load::node_force(2, Direction::X, 4.0, 2)).unwrap();
        s.add_load(3, Load::node_force(99, Direction::X, 4.0, 1)).unwrap();
        let p = number_dofs(&mut s).unwrap();
        let node = s.node(2).unwrap();
        let (ix, iy) = (node.dof(Direction::X).unwrap(), node.dof(Direction::Y).unwrap());

        let f = assemble_loads(&s, &p, 1, 0.5).unwrap();
        assert_eq!(f[iy], -5.0);
        assert_eq!(f[ix], 0.0);

        let f = assemble_loads(&s, &p, 2, 0.5).unwrap();
        assert_eq!(f[iy], -10.0);
        assert_eq!(f[ix], 2.0);
    }

    #[test]
    fn test_gravity_and_element_force() {
        let mut s = two_bar();
        s.add_load(1, Load::gravity(1)).unwrap();
        s.add_load(2, Load::element_force(1, Direction::X, 3.0, 1)).unwrap();
        let p = number_dofs(&mut s).unwrap();
        let f = assemble_loads(&s, &p, 1, 1.0).unwrap();

        let l0 = 2.0_f64.sqrt();
        let node = s.node(2).unwrap();
        // node 2 carries half of each bar
        let weight = 2.0 * 0.5 * 2.0 * 0.1 * l0 * crate::loads::STANDARD_GRAVITY;
        assert_relative_eq!(f[node.dof(Direction::Y).unwrap()], weight, epsilon = 1e-12);
        assert_relative_eq!(f[node.dof(Direction::X).unwrap()], 1.5 * l0, epsilon = 1e-12);
    }

    #[test]
    fn test_mass_is_lumped() {
        let mut s = two_bar();
        let p = number_dofs(&mut s).unwrap();
        let m = DMatrix::from(&assemble_mass(&s, &p).unwrap());
        let expected = 2.0 * 0.5 * 2.0 * 0.1 * 2.0_f64.sqrt();
        assert_relative_eq!(m, DMatrix::from_diagonal_element(3, 3, expected), epsilon = 1e-12);
    }

    #[test]
    fn test_gather_scatter() {
        let mut s = two_bar();
        let p = number_dofs(&mut s).unwrap();
        let values = Vector::from_fn(p.total(), |i, _| i as f64);
        scatter(&mut s, &values, Quantity::Velocity);
        assert_eq!(gather(&s, &p, Quantity::Velocity), values);
        assert_eq!(gather(&s, &p, Quantity::Displacement), Vector::zeros(p.total()));

        let joined = join(&values.rows(0, 2).into_owned(), &values.rows(2, p.total() - 2).into_owned());
        assert_eq!(joined, values);
    }

    #[test]
    fn test_prescribed_displacement_vector() {
        let mut s = two_bar();
        s.add_constraint(50, Constraint::new(3, Direction::X, 0.01)).unwrap();
        let p = number_dofs(&mut s).unwrap();
        let x1 = constraint_displacements(&s, &p);
        let idx = s.node(3).unwrap().dof(Direction::X).unwrap();
        assert_eq!(x1.len(), p.num_fixed);
        assert_eq!(x1[idx], 0.01);
    }
}
