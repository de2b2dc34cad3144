//! Mathematical utilities for FEA calculations

pub mod sparse;
pub mod truss;

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, SVector, Vector3};

use crate::error::{FEAError, FEAResult};

// Re-export sparse utilities
pub use sparse::{linear_combination, shift_diagonal, spmv, Factorization, SparseMatrixBuilder};

pub type Mat = DMatrix<f64>;
pub type Vector = DVector<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;

/// 6x6 matrix for truss stiffness
pub type Mat6 = SMatrix<f64, 6, 6>;
/// 6-element vector for truss forces/displacements
pub type Vec6 = SVector<f64, 6>;
/// 12x12 matrix for beam stiffness
pub type Mat12 = SMatrix<f64, 12, 12>;
/// 12-element vector for beam forces/displacements
pub type Vec12 = SVector<f64, 12>;

/// Below this length two nodes are considered coincident
pub const MIN_LENGTH: f64 = 1e-10;

/// Unit direction and length of the segment p0 -> p1
pub fn direction_and_length(p0: &Vec3, p1: &Vec3) -> FEAResult<(Vec3, f64)> {
    let delta = p1 - p0;
    let length = delta.norm();
    if length < MIN_LENGTH {
        return Err(FEAError::InvalidGeometry(format!(
            "element has zero length between ({}, {}, {}) and ({}, {}, {})",
            p0.x, p0.y, p0.z, p1.x, p1.y, p1.z
        )));
    }
    Ok((delta / length, length))
}

/// Compute the transformation matrix for a 3D beam element
///
/// # Arguments
/// * `i_node` - Start node coordinates
/// * `j_node` - End node coordinates
/// * `rotation` - Rotation about the longitudinal axis (radians)
///
/// # Returns
/// 12x12 transformation matrix from global to local coordinates
pub fn beam_transformation_matrix(i_node: &Vec3, j_node: &Vec3, rotation: f64) -> FEAResult<Mat12> {
    let (x, _) = direction_and_length(i_node, j_node)?;
    let delta = j_node - i_node;

    // Local axes follow the PyNite convention:
    // - vertical: y in the XY plane, z = global Z
    // - horizontal: y = global Y, z = x cross y
    // - inclined: z horizontal and perpendicular to x, y = z cross x
    let (y, z) = if x.x.abs() < 1e-10 && x.z.abs() < 1e-10 {
        let y = if x.y > 0.0 {
            Vec3::new(-1.0, 0.0, 0.0)
        } else {
            Vec3::new(1.0, 0.0, 0.0)
        };
        (y, Vec3::z())
    } else if delta.y.abs() < 1e-10 {
        let y = Vec3::y();
        (y, x.cross(&y).normalize())
    } else {
        let proj = Vec3::new(delta.x, 0.0, delta.z);
        let z = if x.y > 0.0 {
            proj.cross(&x).normalize()
        } else {
            x.cross(&proj).normalize()
        };
        (z.cross(&x).normalize(), z)
    };

    let (y, z) = if rotation.abs() > 1e-10 {
        let (sin_r, cos_r) = rotation.sin_cos();
        (y * cos_r + z * sin_r, -y * sin_r + z * cos_r)
    } else {
        (y, z)
    };

    let r = Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]);

    let mut t = Mat12::zeros();
    for block in 0..4 {
        let offset = block * 3;
        t.fixed_view_mut::<3, 3>(offset, offset).copy_from(&r);
    }
    Ok(t)
}

/// Extract the 3x3 rotation matrix from a 12x12 transformation matrix
pub fn extract_rotation_matrix(t: &Mat12) -> Mat3 {
    t.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Compute the local stiffness matrix for a 3D Euler-Bernoulli beam
///
/// # Arguments
/// * `e` - Modulus of elasticity
/// * `g` - Shear modulus
/// * `a` - Cross-sectional area
/// * `iy` - Moment of inertia about local y-axis
/// * `iz` - Moment of inertia about local z-axis
/// * `j` - Torsional constant
/// * `length` - Element length
pub fn beam_local_stiffness(
    e: f64,
    g: f64,
    a: f64,
    iy: f64,
    iz: f64,
    j: f64,
    length: f64,
) -> Mat12 {
    let l = length;
    let l2 = l * l;
    let l3 = l2 * l;

    let ea_l = e * a / l;
    let gj_l = g * j / l;

    let eiy_l3 = e * iy / l3;
    let eiy_l2 = e * iy / l2;
    let eiy_l = e * iy / l;

    let eiz_l3 = e * iz / l3;
    let eiz_l2 = e * iz / l2;
    let eiz_l = e * iz / l;

    #[rustfmt::skip]
    let data = [
        ea_l,      0.0,          0.0,           0.0,    0.0,           0.0,          -ea_l,     0.0,          0.0,           0.0,    0.0,           0.0,
        0.0,       12.0*eiz_l3,  0.0,           0.0,    0.0,           6.0*eiz_l2,   0.0,       -12.0*eiz_l3, 0.0,           0.0,    0.0,           6.0*eiz_l2,
        0.0,       0.0,          12.0*eiy_l3,   0.0,    -6.0*eiy_l2,   0.0,          0.0,       0.0,          -12.0*eiy_l3,  0.0,    -6.0*eiy_l2,   0.0,
        0.0,       0.0,          0.0,           gj_l,   0.0,           0.0,          0.0,       0.0,          0.0,           -gj_l,  0.0,           0.0,
        0.0,       0.0,          -6.0*eiy_l2,   0.0,    4.0*eiy_l,     0.0,          0.0,       0.0,          6.0*eiy_l2,    0.0,    2.0*eiy_l,     0.0,
        0.0,       6.0*eiz_l2,   0.0,           0.0,    0.0,           4.0*eiz_l,    0.0,       -6.0*eiz_l2,  0.0,           0.0,    0.0,           2.0*eiz_l,
        -ea_l,     0.0,          0.0,           0.0,    0.0,           0.0,          ea_l,      0.0,          0.0,           0.0,    0.0,           0.0,
        0.0,       -12.0*eiz_l3, 0.0,           0.0,    0.0,           -6.0*eiz_l2,  0.0,       12.0*eiz_l3,  0.0,           0.0,    0.0,           -6.0*eiz_l2,
        0.0,       0.0,          -12.0*eiy_l3,  0.0,    6.0*eiy_l2,    0.0,          0.0,       0.0,          12.0*eiy_l3,   0.0,    6.0*eiy_l2,    0.0,
        0.0,       0.0,          0.0,           -gj_l,  0.0,           0.0,          0.0,       0.0,          0.0,           gj_l,   0.0,           0.0,
        0.0,       0.0,          -6.0*eiy_l2,   0.0,    2.0*eiy_l,     0.0,          0.0,       0.0,          6.0*eiy_l2,    0.0,    4.0*eiy_l,     0.0,
        0.0,       6.0*eiz_l2,   0.0,           0.0,    0.0,           2.0*eiz_l,    0.0,       -6.0*eiz_l2,  0.0,           0.0,    0.0,           4.0*eiz_l,
    ];

    Mat12::from_row_slice(&data)
}

/// Lumped mass matrix of a beam in local coordinates.
///
/// Half the element mass goes to each node's translations; rotations get
/// torsional inertia rho*Ip*L/2 and bending inertia m*L^2/24.
pub fn beam_local_lumped_mass(rho: f64, a: f64, ip: f64, length: f64) -> Mat12 {
    let m = rho * a * length;
    let half = 0.5 * m;
    let torsion = 0.5 * rho * ip * length;
    let bending = m * length * length / 24.0;

    let node_diag = [half, half, half, torsion, bending, bending];
    let mut diag = Vec12::zeros();
    for (i, value) in node_diag.iter().enumerate() {
        diag[i] = *value;
        diag[i + 6] = *value;
    }
    Mat12::from_diagonal(&diag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transformation_matrix_horizontal() {
        let t = beam_transformation_matrix(&Vec3::zeros(), &Vec3::new(10.0, 0.0, 0.0), 0.0)
            .unwrap();

        assert_relative_eq!(t[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(1, 1)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(2, 2)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_transformation_matrix_vertical() {
        let t = beam_transformation_matrix(&Vec3::zeros(), &Vec3::new(0.0, 10.0, 0.0), 0.0)
            .unwrap();

        assert_relative_eq!(t[(0, 1)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(1, 0)], -1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(2, 2)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_transformation_is_orthogonal_for_inclined_member() {
        let t = beam_transformation_matrix(
            &Vec3::new(1.0, 2.0, 3.0),
            &Vec3::new(4.0, 6.0, -1.0),
            0.3,
        )
        .unwrap();
        let r = extract_rotation_matrix(&t);
        let identity = r * r.transpose();
        assert_relative_eq!(identity, Mat3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        let p = Vec3::new(1.0, 1.0, 1.0);
        assert!(matches!(
            beam_transformation_matrix(&p, &p, 0.0),
            Err(FEAError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_local_stiffness_symmetry() {
        let k = beam_local_stiffness(200e9, 77e9, 0.01, 1e-4, 2e-4, 1e-5, 10.0);
        assert_relative_eq!(k, k.transpose(), epsilon = 1e-6);
    }

    #[test]
    fn test_lumped_mass_total() {
        let m = beam_local_lumped_mass(7850.0, 0.01, 2e-4, 4.0);
        let translational: f64 = [0, 1, 2].iter().map(|&i| m[(i, i)] + m[(i + 6, i + 6)]).sum();
        assert_relative_eq!(translational, 3.0 * 7850.0 * 0.01 * 4.0, epsilon = 1e-9);
    }
}
