//! Axial (truss and cable) element kernels
//!
//! All kernels work on the 6-DOF layout `[u1x, u1y, u1z, u2x, u2y, u2z]`.

use super::{direction_and_length, Mat3, Mat6, Vec3, Vec6};
use crate::elements::StrainMeasure;
use crate::error::FEAResult;

/// Stiffness, internal force and stress of a two-node axial element
#[derive(Debug, Clone)]
pub struct AxialResponse {
    /// Tangent stiffness
    pub k: Mat6,
    /// Internal force vector
    pub f_int: Vec6,
    /// Axial stress
    pub stress: f64,
    /// Axial force (stress times the area used)
    pub axial_force: f64,
    /// Current length
    pub length: f64,
}

impl AxialResponse {
    /// Response of an element carrying nothing
    pub fn slack(length: f64) -> Self {
        Self {
            k: Mat6::zeros(),
            f_int: Vec6::zeros(),
            stress: 0.0,
            axial_force: 0.0,
            length,
        }
    }
}

/// Strain-displacement row `[-l, -m, -n, l, m, n]`
pub fn strain_displacement(d: &Vec3) -> Vec6 {
    Vec6::new(-d.x, -d.y, -d.z, d.x, d.y, d.z)
}

/// Positions of both ends after applying the displacement vector
fn displaced(x0: &[Vec3; 2], u: &Vec6) -> [Vec3; 2] {
    [
        x0[0] + Vec3::new(u[0], u[1], u[2]),
        x0[1] + Vec3::new(u[3], u[4], u[5]),
    ]
}

/// Small-displacement truss: stiffness from the initial geometry
pub fn linear_response(x0: &[Vec3; 2], u: &Vec6, e: f64, a: f64) -> FEAResult<AxialResponse> {
    let (d, l0) = direction_and_length(&x0[0], &x0[1])?;
    let b = strain_displacement(&d);
    let k = b * b.transpose() * (e * a / l0);

    let strain = b.dot(u) / l0;
    let stress = e * strain;
    let axial_force = stress * a;

    Ok(AxialResponse {
        k,
        f_int: b * axial_force,
        stress,
        axial_force,
        length: l0,
    })
}

/// Large-displacement truss evaluated in the current configuration.
///
/// Engineering strain keeps the area constant; logarithmic strain uses the
/// volume-preserving area `A * L0 / L`.
pub fn nonlinear_response(
    x0: &[Vec3; 2],
    u: &Vec6,
    e: f64,
    a: f64,
    measure: StrainMeasure,
) -> FEAResult<AxialResponse> {
    let (strain, l0, l, d, area) = match measure {
        StrainMeasure::Linear => return linear_response(x0, u, e, a),
        StrainMeasure::Engineering => {
            let (_, l0) = direction_and_length(&x0[0], &x0[1])?;
            let x = displaced(x0, u);
            let (d, l) = direction_and_length(&x[0], &x[1])?;
            ((l - l0) / l0, l0, l, d, a)
        }
        StrainMeasure::Logarithmic => {
            let (_, l0) = direction_and_length(&x0[0], &x0[1])?;
            let x = displaced(x0, u);
            let (d, l) = direction_and_length(&x[0], &x[1])?;
            ((l / l0).ln(), l0, l, d, a * l0 / l)
        }
    };

    let b = strain_displacement(&d);
    let mut k = b * b.transpose() * (e * area / l0);

    let stress = e * strain;
    let axial_force = stress * area;

    if stress != 0.0 {
        let kg = (Mat3::identity() - d * d.transpose()) * (area * stress / l);
        add_blocks(&mut k, &kg);
    }

    Ok(AxialResponse {
        k,
        f_int: b * axial_force,
        stress,
        axial_force,
        length: l,
    })
}

/// Tension-only member: a cable under compression goes slack.
pub fn cable_response(
    x0: &[Vec3; 2],
    u: &Vec6,
    e: f64,
    a: f64,
    measure: StrainMeasure,
) -> FEAResult<AxialResponse> {
    let (d0, l0) = direction_and_length(&x0[0], &x0[1])?;

    let stretched = match measure {
        StrainMeasure::Linear => strain_displacement(&d0).dot(u) >= 0.0,
        StrainMeasure::Engineering | StrainMeasure::Logarithmic => {
            let x = displaced(x0, u);
            let (_, l) = direction_and_length(&x[0], &x[1])?;
            l >= l0
        }
    };

    if !stretched {
        let x = displaced(x0, u);
        return Ok(AxialResponse::slack((x[1] - x[0]).norm()));
    }
    nonlinear_response(x0, u, e, a, measure)
}

/// Lumped mass per translational DOF: half of rho * A * L0
pub fn lumped_mass(rho: f64, a: f64, l0: f64) -> f64 {
    0.5 * rho * a * l0
}

/// Scatter a 3x3 block into the (+, -, -, +) pattern of a 6x6 matrix
fn add_blocks(k: &mut Mat6, block: &Mat3) {
    for i in 0..3 {
        for j in 0..3 {
            let v = block[(i, j)];
            k[(i, j)] += v;
            k[(i, j + 3)] -= v;
            k[(i + 3, j)] -= v;
            k[(i + 3, j + 3)] += v;
        }
    }
}
