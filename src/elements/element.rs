//! Two-node line elements: truss, cable and beam

use serde::{Deserialize, Serialize};

use super::{Material, Section};
use crate::error::{FEAError, FEAResult};
use crate::math::{self, truss, Mat, Mat12, Vec12, Vec3, Vec6, Vector};

/// Strain definition used by axial elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrainMeasure {
    /// Small-displacement theory, initial geometry only
    Linear,
    /// (L - L0) / L0 with constant area
    Engineering,
    /// ln(L / L0) with volume-preserving area
    #[default]
    Logarithmic,
}

/// Element variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Axial bar carrying tension and compression
    Truss,
    /// Tension-only axial member
    Cable,
    /// 3D Euler-Bernoulli frame element
    Beam {
        /// Rotation about the longitudinal axis (radians)
        rotation: f64,
    },
}

/// Stiffness and internal force of an element in its global DOF order
#[derive(Debug, Clone)]
pub struct ElementResponse {
    pub k: Mat,
    pub f_int: Vector,
    pub stress: f64,
    pub length: f64,
}

/// A two-node line element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    /// Start and end node ids
    pub nodes: [usize; 2],
    /// Property id (material + section)
    pub property: usize,
    /// Strain measure (ignored by beams)
    #[serde(default)]
    pub strain: StrainMeasure,

    #[serde(skip)]
    pub(crate) stress: f64,
    #[serde(skip)]
    pub(crate) internal_force: Vec<f64>,
}

impl Element {
    fn with_kind(kind: ElementKind, i_node: usize, j_node: usize, property: usize) -> Self {
        Self {
            kind,
            nodes: [i_node, j_node],
            property,
            strain: StrainMeasure::default(),
            stress: 0.0,
            internal_force: Vec::new(),
        }
    }

    pub fn truss(i_node: usize, j_node: usize, property: usize) -> Self {
        Self::with_kind(ElementKind::Truss, i_node, j_node, property)
    }

    pub fn cable(i_node: usize, j_node: usize, property: usize) -> Self {
        Self::with_kind(ElementKind::Cable, i_node, j_node, property)
    }

    pub fn beam(i_node: usize, j_node: usize, property: usize) -> Self {
        Self::with_kind(ElementKind::Beam { rotation: 0.0 }, i_node, j_node, property)
    }

    /// Set the strain measure
    pub fn with_strain(mut self, strain: StrainMeasure) -> Self {
        self.strain = strain;
        self
    }

    /// Set the beam roll angle; no effect on axial elements
    pub fn with_rotation(mut self, angle: f64) -> Self {
        if let ElementKind::Beam { rotation } = &mut self.kind {
            *rotation = angle;
        }
        self
    }

    /// DOFs each end node must own
    pub fn dofs_per_node(&self) -> usize {
        match self.kind {
            ElementKind::Truss | ElementKind::Cable => 3,
            ElementKind::Beam { .. } => 6,
        }
    }

    /// Total DOFs of the element
    pub fn num_dofs(&self) -> usize {
        2 * self.dofs_per_node()
    }

    /// Whether stiffness and internal force are independent of the state
    pub fn is_linear(&self) -> bool {
        match self.kind {
            ElementKind::Truss => self.strain == StrainMeasure::Linear,
            // slack switching makes cables nonlinear under any measure
            ElementKind::Cable => false,
            ElementKind::Beam { .. } => true,
        }
    }

    /// Axial stress from the last solve
    pub fn stress(&self) -> f64 {
        self.stress
    }

    /// Internal force vector from the last solve (global DOF order)
    pub fn internal_force(&self) -> &[f64] {
        &self.internal_force
    }

    /// Reference length between the initial node positions
    pub fn reference_length(&self, x0: &[Vec3; 2]) -> FEAResult<f64> {
        Ok(math::direction_and_length(&x0[0], &x0[1])?.1)
    }

    /// Store the stress and internal force of a response
    pub(crate) fn store_response(&mut self, response: &ElementResponse) {
        self.stress = response.stress;
        self.internal_force.clear();
        self.internal_force.extend_from_slice(response.f_int.as_slice());
    }

    pub(crate) fn reset_state(&mut self) {
        self.stress = 0.0;
        self.internal_force.clear();
    }

    /// Tangent stiffness and internal force for the displacement `u`
    /// (global DOF order, `num_dofs` entries).
    pub fn response(
        &self,
        x0: &[Vec3; 2],
        u: &[f64],
        material: &Material,
        section: &Section,
    ) -> FEAResult<ElementResponse> {
        if u.len() != self.num_dofs() {
            return Err(FEAError::DimensionMismatch {
                expected: self.num_dofs(),
                found: u.len(),
            });
        }

        match self.kind {
            ElementKind::Truss | ElementKind::Cable => {
                let u = Vec6::from_column_slice(u);
                let r = if self.kind == ElementKind::Cable {
                    truss::cable_response(x0, &u, material.e, section.a, self.strain)?
                } else {
                    truss::nonlinear_response(x0, &u, material.e, section.a, self.strain)?
                };
                Ok(ElementResponse {
                    k: Mat::from_column_slice(6, 6, r.k.as_slice()),
                    f_int: Vector::from_column_slice(r.f_int.as_slice()),
                    stress: r.stress,
                    length: r.length,
                })
            }
            ElementKind::Beam { rotation } => {
                let (_, l0) = math::direction_and_length(&x0[0], &x0[1])?;
                let t = math::beam_transformation_matrix(&x0[0], &x0[1], rotation)?;
                let k_local = math::beam_local_stiffness(
                    material.e,
                    material.g(),
                    section.a,
                    section.iy,
                    section.iz,
                    section.j,
                    l0,
                );
                let k: Mat12 = t.transpose() * k_local * t;
                let u = Vec12::from_column_slice(u);
                let f = k * u;

                let u_local = t * u;
                let axial = material.e * section.a / l0 * (u_local[6] - u_local[0]);
                let stress = if section.a > 0.0 { axial / section.a } else { 0.0 };

                Ok(ElementResponse {
                    k: Mat::from_column_slice(12, 12, k.as_slice()),
                    f_int: Vector::from_column_slice(f.as_slice()),
                    stress,
                    length: l0,
                })
            }
        }
    }

    /// Lumped mass matrix in global DOF order
    pub fn lumped_mass(
        &self,
        x0: &[Vec3; 2],
        material: &Material,
        section: &Section,
    ) -> FEAResult<Mat> {
        let (_, l0) = math::direction_and_length(&x0[0], &x0[1])?;
        match self.kind {
            ElementKind::Truss | ElementKind::Cable => {
                let m = truss::lumped_mass(material.rho, section.a, l0);
                Ok(Mat::from_diagonal_element(6, 6, m))
            }
            ElementKind::Beam { rotation } => {
                let t = math::beam_transformation_matrix(&x0[0], &x0[1], rotation)?;
                let m_local =
                    math::beam_local_lumped_mass(material.rho, section.a, section.ip(), l0);
                let m: Mat12 = t.transpose() * m_local * t;
                Ok(Mat::from_column_slice(12, 12, m.as_slice()))
            }
        }
    }

    /// Translational mass carried by each end node (used for gravity)
    pub fn nodal_mass(&self, l0: f64, material: &Material, section: &Section) -> f64 {
        truss::lumped_mass(material.rho, section.a, l0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ends(dx: f64, dy: f64, dz: f64) -> [Vec3; 2] {
        [Vec3::zeros(), Vec3::new(dx, dy, dz)]
    }

    #[test]
    fn test_dof_layout() {
        assert_eq!(Element::truss(1, 2, 1).num_dofs(), 6);
        assert_eq!(Element::cable(1, 2, 1).dofs_per_node(), 3);
        assert_eq!(Element::beam(1, 2, 1).num_dofs(), 12);
        assert!(!Element::truss(1, 2, 1).is_linear());
        assert!(Element::truss(1, 2, 1).with_strain(StrainMeasure::Linear).is_linear());
        assert!(Element::beam(1, 2, 1).is_linear());
    }

    #[test]
    fn test_reference_length_follows_geometry() {
        let e = Element::truss(1, 2, 1);
        assert_relative_eq!(e.reference_length(&ends(3.0, 4.0, 0.0)).unwrap(), 5.0);
        assert_relative_eq!(e.reference_length(&ends(1.0, 0.0, 0.0)).unwrap(), 1.0);
        assert!(matches!(
            e.reference_length(&ends(0.0, 0.0, 0.0)),
            Err(FEAError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_beam_cantilever_tip_stiffness() {
        // Tip transverse stiffness of a cantilever is 3EI/L^3; with the root
        // clamped the 6x6 tip block of K inverts to the flexibility matrix.
        let material = Material::new(200e9, 0.3, 7850.0);
        let section = Section::new(0.01, 1e-4, 2e-4, 1e-5);
        let beam = Element::beam(1, 2, 1);
        let r = beam
            .response(&ends(2.0, 0.0, 0.0), &[0.0; 12], &material, &section)
            .unwrap();

        let k_tip = r.k.view((6, 6), (6, 6)).into_owned();
        let flex = k_tip.try_inverse().unwrap();
        let expected = 2.0_f64.powi(3) / (3.0 * 200e9 * 2e-4);
        assert_relative_eq!(flex[(1, 1)], expected, max_relative = 1e-9);
    }

    #[test]
    fn test_beam_axial_stress() {
        let material = Material::new(100.0, 0.3, 1.0);
        let section = Section::new(2.0, 1.0, 1.0, 1.0);
        let mut u = [0.0; 12];
        u[7] = 0.1; // axial stretch of a vertical member
        let r = Element::beam(1, 2, 1)
            .response(&ends(0.0, 1.0, 0.0), &u, &material, &section)
            .unwrap();
        assert_relative_eq!(r.stress, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lumped_mass_totals() {
        let material = Material::new(1.0, 0.3, 2.0);
        let section = Section::area(0.5);
        let m = Element::truss(1, 2, 1)
            .lumped_mass(&ends(4.0, 0.0, 0.0), &material, &section)
            .unwrap();
        assert_relative_eq!(m[(0, 0)], 2.0);
        assert_relative_eq!(m.trace(), 12.0);
    }

    #[test]
    fn test_wrong_displacement_length() {
        let r = Element::truss(1, 2, 1).response(
            &ends(1.0, 0.0, 0.0),
            &[0.0; 12],
            &Material::default(),
            &Section::area(1.0),
        );
        assert!(matches!(r, Err(FEAError::DimensionMismatch { .. })));
    }
}
