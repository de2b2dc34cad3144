//! Time-integration models
//!
//! A dynamical system is described by its residual
//! `R(x, v, a, t) = M a + C v + f_int(x) - F(t)`; integrators only talk to
//! the [`DynamicModel`] trait and never to the structure behind it.

pub mod newmark;

use std::borrow::Cow;

use log::warn;
use nalgebra_sparse::CscMatrix;

use crate::error::{FEAError, FEAResult};
use crate::math::{spmv, Factorization, SparseMatrixBuilder, Vector};

pub use newmark::{IntegrationStats, LinearSolverCache, Newmark, NewmarkParameters};

/// Iteration cap of the default acceleration solve
pub const ACCELERATION_MAX_ITER: usize = 10;
/// Relative residual tolerance of the default acceleration solve
pub const ACCELERATION_TOL: f64 = 1e-10;

/// Kinematic state at one time
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub t: f64,
    pub x: Vector,
    pub v: Vector,
    pub a: Vector,
}

impl State {
    /// State at rest at the origin
    pub fn zeros(n: usize) -> Self {
        Self {
            t: 0.0,
            x: Vector::zeros(n),
            v: Vector::zeros(n),
            a: Vector::zeros(n),
        }
    }

    /// State with given displacement and velocity; acceleration is zero
    /// until solved by a model
    pub fn new(t: f64, x: Vector, v: Vector) -> Self {
        let a = Vector::zeros(x.len());
        Self { t, x, v, a }
    }

    pub fn dofs(&self) -> usize {
        self.x.len()
    }
}

fn zero_matrix(n: usize) -> CscMatrix<f64> {
    SparseMatrixBuilder::square(n).to_csc()
}

/// A dynamical system seen by a time integrator
pub trait DynamicModel {
    fn dofs(&self) -> usize;

    /// Linear systems are integrated with a single solve per step
    fn is_linear(&self) -> bool {
        false
    }

    /// Out-of-balance force at `state`
    fn residual(&self, state: &State) -> FEAResult<Vector>;

    /// dR/da
    fn mass(&self, _state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        Ok(Cow::Owned(zero_matrix(self.dofs())))
    }

    /// dR/dv
    fn damping(&self, _state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        Ok(Cow::Owned(zero_matrix(self.dofs())))
    }

    /// dR/dx
    fn stiffness(&self, _state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        Ok(Cow::Owned(zero_matrix(self.dofs())))
    }

    /// `k * K + c * C + m * M`; C is skipped when it stores no entries
    fn compute_keff(&self, state: &State, k: f64, c: f64, m: f64) -> FEAResult<CscMatrix<f64>> {
        let n = self.dofs();
        let mut builder = SparseMatrixBuilder::square(n);
        let mut add = |matrix: &CscMatrix<f64>, coeff: f64| -> FEAResult<()> {
            if matrix.nrows() != n || matrix.ncols() != n {
                return Err(FEAError::DimensionMismatch {
                    expected: n,
                    found: matrix.nrows(),
                });
            }
            for (row, col, val) in matrix.triplet_iter() {
                builder.add(row, col, coeff * val);
            }
            Ok(())
        };

        let stiffness = self.stiffness(state)?;
        add(&*stiffness, k)?;
        let damping = self.damping(state)?;
        if damping.nnz() > 0 {
            add(&*damping, c)?;
        }
        let mass = self.mass(state)?;
        add(&*mass, m)?;
        Ok(builder.to_csc())
    }

    /// Solve for the acceleration consistent with `state.x`, `state.v` and
    /// `state.t`, overwriting `state.a`.
    ///
    /// Newton-Raphson on the acceleration alone with the mass matrix as
    /// Jacobian.
    fn solve_acceleration(&self, state: &mut State) -> FEAResult<()> {
        default_acceleration_solve(self, state)
    }
}

type ForceFn<'a> = Box<dyn Fn(f64) -> FEAResult<Vector> + 'a>;

/// `M a + C v + K x = F(t)` with constant matrices owned elsewhere
pub struct LinearModel<'a> {
    mass: &'a CscMatrix<f64>,
    damping: &'a CscMatrix<f64>,
    stiffness: &'a CscMatrix<f64>,
    force: Option<ForceFn<'a>>,
    mass_solver: Option<Factorization>,
}

impl<'a> LinearModel<'a> {
    /// Build the model and factorize the mass matrix.
    ///
    /// A singular mass matrix is not an error here; only the acceleration
    /// solve fails later.
    pub fn new(
        mass: &'a CscMatrix<f64>,
        damping: &'a CscMatrix<f64>,
        stiffness: &'a CscMatrix<f64>,
    ) -> FEAResult<Self> {
        let n = mass.nrows();
        for m in [mass, damping, stiffness] {
            if m.nrows() != n || m.ncols() != n {
                return Err(FEAError::DimensionMismatch {
                    expected: n,
                    found: m.nrows(),
                });
            }
        }

        let mass_solver = match Factorization::symmetric_or_general(mass) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("mass matrix could not be factorized ({e}); accelerations cannot be solved");
                None
            }
        };

        Ok(Self {
            mass,
            damping,
            stiffness,
            force: None,
            mass_solver,
        })
    }

    /// External force as a function of time
    pub fn with_force(mut self, force: impl Fn(f64) -> FEAResult<Vector> + 'a) -> Self {
        self.force = Some(Box::new(force));
        self
    }

    fn external_force(&self, t: f64) -> FEAResult<Vector> {
        match &self.force {
            Some(f) => {
                let f = f(t)?;
                if f.len() != self.dofs() {
                    return Err(FEAError::DimensionMismatch {
                        expected: self.dofs(),
                        found: f.len(),
                    });
                }
                Ok(f)
            }
            None => Ok(Vector::zeros(self.dofs())),
        }
    }
}

impl DynamicModel for LinearModel<'_> {
    fn dofs(&self) -> usize {
        self.mass.nrows()
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn residual(&self, state: &State) -> FEAResult<Vector> {
        let mut r = spmv(self.mass, &state.a)?;
        r += spmv(self.damping, &state.v)?;
        r += spmv(self.stiffness, &state.x)?;
        r -= self.external_force(state.t)?;
        Ok(r)
    }

    fn mass(&self, _state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        Ok(Cow::Borrowed(self.mass))
    }

    fn damping(&self, _state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        Ok(Cow::Borrowed(self.damping))
    }

    fn stiffness(&self, _state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        Ok(Cow::Borrowed(self.stiffness))
    }

    /// Single solve of `M a = F(t) - C v - K x`
    fn solve_acceleration(&self, state: &mut State) -> FEAResult<()> {
        let solver = self.mass_solver.as_ref().ok_or(FEAError::SingularMatrix)?;
        let mut rhs = self.external_force(state.t)?;
        rhs -= spmv(self.damping, &state.v)?;
        rhs -= spmv(self.stiffness, &state.x)?;
        state.a = solver.solve(&rhs)?;
        Ok(())
    }
}

type ResidualFn<'a> = Box<dyn Fn(&State) -> FEAResult<Vector> + 'a>;
type MatrixFn<'a> = Box<dyn Fn(&State) -> FEAResult<CscMatrix<f64>> + 'a>;
type AccelerationFn<'a> = Box<dyn Fn(&mut State) -> FEAResult<()> + 'a>;

/// Model defined by callbacks. Only the residual is required; unbound
/// matrices are zero and the acceleration solve falls back to the default.
pub struct GeneralModel<'a> {
    dofs: usize,
    residual: ResidualFn<'a>,
    mass: Option<MatrixFn<'a>>,
    damping: Option<MatrixFn<'a>>,
    stiffness: Option<MatrixFn<'a>>,
    acceleration: Option<AccelerationFn<'a>>,
}

impl<'a> GeneralModel<'a> {
    pub fn new(dofs: usize, residual: impl Fn(&State) -> FEAResult<Vector> + 'a) -> Self {
        Self {
            dofs,
            residual: Box::new(residual),
            mass: None,
            damping: None,
            stiffness: None,
            acceleration: None,
        }
    }

    pub fn with_mass(mut self, f: impl Fn(&State) -> FEAResult<CscMatrix<f64>> + 'a) -> Self {
        self.mass = Some(Box::new(f));
        self
    }

    pub fn with_damping(mut self, f: impl Fn(&State) -> FEAResult<CscMatrix<f64>> + 'a) -> Self {
        self.damping = Some(Box::new(f));
        self
    }

    pub fn with_stiffness(mut self, f: impl Fn(&State) -> FEAResult<CscMatrix<f64>> + 'a) -> Self {
        self.stiffness = Some(Box::new(f));
        self
    }

    /// Replace the default Newton-Raphson acceleration solve
    pub fn with_acceleration_solver(mut self, f: impl Fn(&mut State) -> FEAResult<()> + 'a) -> Self {
        self.acceleration = Some(Box::new(f));
        self
    }

    fn matrix(&self, f: &Option<MatrixFn<'a>>, state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        match f {
            Some(f) => Ok(Cow::Owned(f(state)?)),
            None => Ok(Cow::Owned(zero_matrix(self.dofs))),
        }
    }
}

impl DynamicModel for GeneralModel<'_> {
    fn dofs(&self) -> usize {
        self.dofs
    }

    fn residual(&self, state: &State) -> FEAResult<Vector> {
        (self.residual)(state)
    }

    fn mass(&self, state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        self.matrix(&self.mass, state)
    }

    fn damping(&self, state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        self.matrix(&self.damping, state)
    }

    fn stiffness(&self, state: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
        self.matrix(&self.stiffness, state)
    }

    fn solve_acceleration(&self, state: &mut State) -> FEAResult<()> {
        match &self.acceleration {
            Some(f) => f(state),
            None => default_acceleration_solve(self, state),
        }
    }
}

/// Newton-Raphson acceleration solve shared by models without a closed form
pub fn default_acceleration_solve<M: DynamicModel + ?Sized>(model: &M, state: &mut State) -> FEAResult<()> {
    let mass = model.mass(state)?;
    let solver = Factorization::symmetric_or_general(&mass)?;

    let mut tol = ACCELERATION_TOL;
    for iter in 0..=ACCELERATION_MAX_ITER {
        let r = model.residual(state)?;
        let norm = r.norm();
        if iter == 0 {
            tol = ACCELERATION_TOL * norm.max(1.0);
        }
        if norm < tol {
            return Ok(());
        }
        if iter == ACCELERATION_MAX_ITER {
            break;
        }
        state.a -= solver.solve(&r)?;
    }
    Err(FEAError::AccelerationNotConverged(ACCELERATION_MAX_ITER))
}
