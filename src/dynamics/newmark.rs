//! Newmark-beta time integration with optional step-doubling control

use log::{debug, warn};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CscMatrix;
use serde::{Deserialize, Serialize};

use super::{DynamicModel, State};
use crate::error::{FEAError, FEAResult};
use crate::math::{Factorization, Vector};

/// Retries of one adaptive step before the fine result is force-accepted
pub const MAX_ATTEMPTS: usize = 10;
/// Guard in the relative step-doubling error
const ERROR_EPS: f64 = 1e-10;
/// Two step sizes closer than this share a cached factorization
const DT_MATCH: f64 = 1e-12;

/// Integrator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewmarkParameters {
    pub beta: f64,
    pub gamma: f64,
    /// Step-doubling error control instead of fixed steps
    pub adaptive: bool,
    /// Initial (or fixed) step size
    pub dt: f64,
    pub min_dt: f64,
    pub max_dt: f64,
    /// Relative error accepted by step doubling
    pub tol_adaptive: f64,
    /// Newton-Raphson cap per step for nonlinear models
    pub max_iter: usize,
    /// Residual norm accepted per step for nonlinear models
    pub tol: f64,
    /// Skip the Cholesky attempt and factorize with LU directly
    pub force_lu: bool,
}

impl Default for NewmarkParameters {
    fn default() -> Self {
        Self {
            beta: 0.25,
            gamma: 0.5,
            adaptive: true,
            dt: 0.01,
            min_dt: 1e-6,
            max_dt: 1.0,
            tol_adaptive: 1e-4,
            max_iter: 10,
            tol: 1e-8,
            force_lu: false,
        }
    }
}

impl NewmarkParameters {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn with_bounds(mut self, min_dt: f64, max_dt: f64) -> Self {
        self.min_dt = min_dt;
        self.max_dt = max_dt;
        self
    }

    pub fn with_tol_adaptive(mut self, tol: f64) -> Self {
        self.tol_adaptive = tol;
        self
    }

    pub fn with_iterations(mut self, max_iter: usize, tol: f64) -> Self {
        self.max_iter = max_iter;
        self.tol = tol;
        self
    }

    pub fn with_force_lu(mut self, force_lu: bool) -> Self {
        self.force_lu = force_lu;
        self
    }

    /// Check that the settings describe a usable integrator
    pub fn validate(&self) -> FEAResult<()> {
        let invalid = |what: &str| Err(FEAError::InvalidInput(format!("newmark: {what}")));
        if !(self.beta > 0.0) {
            return invalid("beta must be positive");
        }
        if !(self.gamma >= 0.0) {
            return invalid("gamma must not be negative");
        }
        if !(self.dt > 0.0) {
            return invalid("dt must be positive");
        }
        if self.adaptive {
            if !(self.min_dt > 0.0) || !(self.max_dt >= self.min_dt) {
                return invalid("require 0 < min_dt <= max_dt");
            }
            if !(self.tol_adaptive > 0.0) {
                return invalid("tol_adaptive must be positive");
            }
        }
        Ok(())
    }
}

/// Newmark update constants for one step size
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    a0: f64,
    a1: f64,
    a2: f64,
    a3: f64,
    a6: f64,
    a7: f64,
}

impl Coefficients {
    fn new(p: &NewmarkParameters, dt: f64) -> Self {
        Self {
            a0: 1.0 / (p.beta * dt * dt),
            a1: p.gamma / (p.beta * dt),
            a2: 1.0 / (p.beta * dt),
            a3: 1.0 / (2.0 * p.beta) - 1.0,
            a6: dt * (1.0 - p.gamma),
            a7: p.gamma * dt,
        }
    }

    /// Acceleration and velocity of `next` implied by its displacement
    fn update(&self, next: &mut State, prev: &State) {
        next.a = (&next.x - &prev.x) * self.a0 - &prev.v * self.a2 - &prev.a * self.a3;
        next.v = &prev.v + &prev.a * self.a6 + &next.a * self.a7;
    }
}

/// Factorization of the effective matrix kept between steps.
///
/// The symbolic pattern is remembered so a matrix with the same structure
/// only needs a numeric re-factorization. Linear models skip assembly
/// altogether while the step size matches `dt`.
#[derive(Debug, Default)]
pub struct LinearSolverCache {
    factorization: Option<Factorization>,
    pattern: Option<SparsityPattern>,
    dt: Option<f64>,
}

impl LinearSolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_analyzed(&self) -> bool {
        self.pattern.is_some() && self.factorization.is_some()
    }

    /// Whether the general LU path is in use
    pub fn uses_lu(&self) -> bool {
        matches!(self.factorization, Some(Factorization::Lu(_)))
    }

    /// Whether the stored factorization was built for `dt`
    pub fn matches(&self, dt: f64) -> bool {
        self.factorization.is_some() && self.dt.is_some_and(|cached| (dt - cached).abs() < DT_MATCH)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Factorize `keff`, reusing the symbolic analysis when the pattern is
    /// unchanged and re-analyzing otherwise
    pub fn factorize(&mut self, keff: &CscMatrix<f64>, dt: f64, force_lu: bool) -> FEAResult<()> {
        let same_pattern = self.pattern.as_ref() == Some(keff.pattern());
        if let (true, Some(f)) = (same_pattern, self.factorization.as_mut()) {
            match f.refactor(keff) {
                Ok(()) => {
                    self.dt = Some(dt);
                    return Ok(());
                }
                Err(e) => debug!("re-factorization failed ({e}), analyzing again"),
            }
        }

        self.reset();
        let f = if force_lu {
            Factorization::lu(keff)?
        } else {
            Factorization::symmetric_or_general(keff)?
        };
        self.factorization = Some(f);
        self.pattern = Some(keff.pattern().clone());
        self.dt = Some(dt);
        Ok(())
    }

    pub fn solve(&self, rhs: &Vector) -> FEAResult<Vector> {
        self.factorization
            .as_ref()
            .ok_or_else(|| FEAError::FactorizationFailed("solver cache is empty".into()))?
            .solve(rhs)
    }
}

/// Counters of one integration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IntegrationStats {
    /// Steps taken and reported to the observer
    pub accepted: usize,
    /// Adaptive attempts thrown away
    pub rejected: usize,
    /// Steps accepted above the error tolerance
    pub forced: usize,
    /// Nonlinear steps that hit the iteration cap
    pub unconverged: usize,
    /// Step size proposed for the next step
    pub final_dt: f64,
}

/// Result of one integration kernel call
struct Advance {
    state: State,
    converged: bool,
}

/// Implicit Newmark-beta integrator.
///
/// Adaptive mode takes every step three ways (one full step and two half
/// steps) and keeps each in its own cache slot. After a rejection the next
/// full step has the size of the rejected half step, so the coarse and
/// first fine slots trade places to reuse that factorization.
#[derive(Debug)]
pub struct Newmark {
    params: NewmarkParameters,
    caches: [LinearSolverCache; 3],
    /// Cache index used by the coarse, fine-1 and fine-2 step
    slots: [usize; 3],
}

impl Newmark {
    pub fn new(params: NewmarkParameters) -> FEAResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            caches: Default::default(),
            slots: [0, 1, 2],
        })
    }

    pub fn params(&self) -> &NewmarkParameters {
        &self.params
    }

    pub fn cache(&self, slot: usize) -> Option<&LinearSolverCache> {
        self.caches.get(slot)
    }

    fn reset_caches(&mut self) {
        for cache in &mut self.caches {
            cache.reset();
        }
        self.slots = [0, 1, 2];
    }

    /// Advance `state` by a single step of size `dt`
    pub fn step<M: DynamicModel + ?Sized>(&mut self, model: &M, state: &State, dt: f64) -> FEAResult<State> {
        Ok(self.advance(model, state, dt, 0)?.state)
    }

    /// Integration kernel: predict, then iterate on the displacement with
    /// the effective matrix held in cache `slot`
    fn advance<M: DynamicModel + ?Sized>(
        &mut self,
        model: &M,
        current: &State,
        dt: f64,
        slot: usize,
    ) -> FEAResult<Advance> {
        let c = Coefficients::new(&self.params, dt);
        let mut next = State {
            t: current.t + dt,
            x: &current.x + &current.v * dt + &current.a * (0.5 * dt * dt),
            v: current.v.clone(),
            a: current.a.clone(),
        };
        c.update(&mut next, current);

        let linear = model.is_linear();
        let max_iter = if linear { 1 } else { self.params.max_iter };
        let cache = &mut self.caches[slot];
        let mut needs_update = !(linear && cache.matches(dt));

        for iter in 0..max_iter {
            let r = model.residual(&next)?;
            if !linear {
                let norm = r.norm();
                debug!("t = {:.6}, iteration {iter}: residual {norm:.3e}", next.t);
                if norm < self.params.tol {
                    return Ok(Advance {
                        state: next,
                        converged: true,
                    });
                }
            }

            if needs_update {
                let keff = model.compute_keff(&next, 1.0, c.a1, c.a0)?;
                if let Err(e) = cache.factorize(&keff, dt, self.params.force_lu) {
                    cache.reset();
                    return Err(e);
                }
                needs_update = !linear;
            }

            let dx = cache.solve(&(-r))?;
            next.x += dx;
            c.update(&mut next, current);
        }

        let converged = linear || model.residual(&next)?.norm() < self.params.tol;
        if !converged {
            warn!(
                "newmark step to t = {:.6} not converged in {} iterations",
                next.t, self.params.max_iter
            );
        }
        Ok(Advance {
            state: next,
            converged,
        })
    }

    /// Integrate `state` over `duration`, calling `observer` with the
    /// initial state and with every accepted step.
    ///
    /// The initial acceleration is solved from the model first; `state`
    /// holds the final state on return.
    pub fn integrate<M, F>(
        &mut self,
        model: &M,
        state: &mut State,
        duration: f64,
        mut observer: F,
    ) -> FEAResult<IntegrationStats>
    where
        M: DynamicModel + ?Sized,
        F: FnMut(&State),
    {
        if !(duration > 0.0) {
            return Err(FEAError::InvalidInput(format!(
                "integration duration must be positive, got {duration}"
            )));
        }
        if state.dofs() != model.dofs() {
            return Err(FEAError::DimensionMismatch {
                expected: model.dofs(),
                found: state.dofs(),
            });
        }

        self.reset_caches();
        model.solve_acceleration(state)?;
        observer(state);

        if self.params.adaptive {
            self.integrate_adaptive(model, state, duration, &mut observer)
        } else {
            self.integrate_fixed(model, state, duration, &mut observer)
        }
    }

    fn integrate_fixed<M, F>(
        &mut self,
        model: &M,
        state: &mut State,
        duration: f64,
        observer: &mut F,
    ) -> FEAResult<IntegrationStats>
    where
        M: DynamicModel + ?Sized,
        F: FnMut(&State),
    {
        let dt = self.params.dt;
        let end = state.t + duration;
        let count = ((duration / dt) - 1e-9).ceil().max(1.0) as usize;
        let mut stats = IntegrationStats {
            final_dt: dt,
            ..IntegrationStats::default()
        };

        for k in 0..count {
            let h = if k + 1 == count { end - state.t } else { dt };
            let step = self.advance(model, state, h, 0)?;
            if !step.converged {
                stats.unconverged += 1;
            }
            *state = step.state;
            stats.accepted += 1;
            observer(state);
        }
        Ok(stats)
    }

    fn integrate_adaptive<M, F>(
        &mut self,
        model: &M,
        state: &mut State,
        duration: f64,
        observer: &mut F,
    ) -> FEAResult<IntegrationStats>
    where
        M: DynamicModel + ?Sized,
        F: FnMut(&State),
    {
        let end = state.t + duration;
        let time_eps = 1e-12 * duration.max(1.0);
        let tol = self.params.tol_adaptive;
        let mut dt = self.params.dt.min(self.params.max_dt);
        let mut stats = IntegrationStats::default();

        while end - state.t > time_eps {
            if state.t + dt > end {
                dt = end - state.t;
            }

            let mut attempts = 0;
            loop {
                attempts += 1;
                let (fine, error, converged) = match self.doubled_step(model, state, dt) {
                    Ok(result) => result,
                    Err(e) => {
                        dt *= 0.5;
                        if dt < self.params.min_dt {
                            return Err(FEAError::IntegrationDiverged { time: state.t, dt });
                        }
                        debug!("step at t = {:.6} failed ({e}), retrying with dt = {dt:.3e}", state.t);
                        stats.rejected += 1;
                        continue;
                    }
                };

                let accept = if error < tol {
                    true
                } else if dt * 0.5 < self.params.min_dt || attempts >= MAX_ATTEMPTS {
                    warn!(
                        "accepting step at t = {:.6} with dt = {dt:.3e}: error {error:.3e} above tolerance {tol:.3e}",
                        state.t
                    );
                    stats.forced += 1;
                    true
                } else {
                    false
                };

                if accept {
                    if !converged {
                        stats.unconverged += 1;
                    }
                    *state = fine;
                    stats.accepted += 1;
                    observer(state);
                    if error < 0.1 * tol && dt < self.params.max_dt {
                        dt = (dt * 1.5).min(self.params.max_dt);
                    }
                    break;
                }

                debug!("rejecting dt = {dt:.3e} at t = {:.6}: error {error:.3e}", state.t);
                stats.rejected += 1;
                dt *= 0.5;
                // the next coarse step repeats the rejected first half step
                self.slots.swap(0, 1);
            }
        }

        stats.final_dt = dt;
        Ok(stats)
    }

    /// One full step and two half steps from `state`. Returns the fine
    /// result, the relative difference between the two paths and whether
    /// every sub-step converged.
    fn doubled_step<M: DynamicModel + ?Sized>(
        &mut self,
        model: &M,
        state: &State,
        dt: f64,
    ) -> FEAResult<(State, f64, bool)> {
        let [coarse_slot, fine1_slot, fine2_slot] = self.slots;
        let coarse = self.advance(model, state, dt, coarse_slot)?;
        let mid = self.advance(model, state, 0.5 * dt, fine1_slot)?;
        let fine = self.advance(model, &mid.state, 0.5 * dt, fine2_slot)?;

        let error = (&fine.state.x - &coarse.state.x).norm() / (fine.state.x.norm() + ERROR_EPS);
        let converged = coarse.converged && mid.converged && fine.converged;
        Ok((fine.state, error, converged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{GeneralModel, LinearModel};
    use crate::math::SparseMatrixBuilder;
    use approx::assert_relative_eq;
    use std::borrow::Cow;
    use std::cell::{Cell, RefCell};

    fn scalar(v: f64) -> CscMatrix<f64> {
        let mut b = SparseMatrixBuilder::square(1);
        b.add(0, 0, v);
        b.to_csc()
    }

    fn at_rest_displaced() -> State {
        State::new(0.0, Vector::from_vec(vec![1.0]), Vector::zeros(1))
    }

    fn energy(s: &State) -> f64 {
        0.5 * s.v[0] * s.v[0] + 0.5 * s.x[0] * s.x[0]
    }

    #[test]
    fn test_fixed_step_oscillator() {
        let (m, c, k) = (scalar(1.0), scalar(0.0), scalar(1.0));
        let model = LinearModel::new(&m, &c, &k).unwrap();
        let params = NewmarkParameters::default().with_adaptive(false).with_dt(0.01);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = at_rest_displaced();
        let mut times = Vec::new();
        let stats = newmark
            .integrate(&model, &mut state, 1.0, |s| times.push(s.t))
            .unwrap();

        assert_eq!(stats.accepted, 100);
        assert_eq!(times.len(), 101);
        assert_relative_eq!(state.t, 1.0, epsilon = 1e-12);
        assert_relative_eq!(state.x[0], 1.0_f64.cos(), epsilon = 1e-4);
        assert_relative_eq!(state.v[0], -1.0_f64.sin(), epsilon = 1e-4);
        // average acceleration conserves energy of a linear oscillator
        assert_relative_eq!(energy(&state), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_last_fixed_step_is_shortened() {
        let (m, c, k) = (scalar(1.0), scalar(0.0), scalar(1.0));
        let model = LinearModel::new(&m, &c, &k).unwrap();
        let params = NewmarkParameters::default().with_adaptive(false).with_dt(0.3);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = at_rest_displaced();
        let stats = newmark.integrate(&model, &mut state, 1.0, |_| {}).unwrap();
        assert_eq!(stats.accepted, 4);
        assert_relative_eq!(state.t, 1.0, epsilon = 1e-12);
    }

    /// Unit oscillator counting how often its stiffness is requested
    struct Counting {
        m: CscMatrix<f64>,
        k: CscMatrix<f64>,
        calls: Cell<usize>,
    }

    impl DynamicModel for Counting {
        fn dofs(&self) -> usize {
            1
        }

        fn is_linear(&self) -> bool {
            true
        }

        fn residual(&self, s: &State) -> FEAResult<Vector> {
            Ok(&s.a + &s.x)
        }

        fn mass(&self, _: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
            Ok(Cow::Borrowed(&self.m))
        }

        fn stiffness(&self, _: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
            self.calls.set(self.calls.get() + 1);
            Ok(Cow::Borrowed(&self.k))
        }
    }

    #[test]
    fn test_linear_cache_reused_for_equal_steps() {
        let model = Counting {
            m: scalar(1.0),
            k: scalar(1.0),
            calls: Cell::new(0),
        };
        let params = NewmarkParameters::default().with_adaptive(false).with_dt(0.25);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = at_rest_displaced();
        newmark.integrate(&model, &mut state, 1.0, |_| {}).unwrap();
        assert_eq!(model.calls.get(), 1);

        let cache = newmark.cache(0).unwrap();
        assert!(cache.is_analyzed());
        assert!(!cache.uses_lu());
        assert!(cache.matches(0.25));
    }

    /// Unit oscillator logging the step size of every effective matrix
    #[derive(Default)]
    struct StepLog {
        sizes: RefCell<Vec<f64>>,
    }

    impl DynamicModel for StepLog {
        fn dofs(&self) -> usize {
            1
        }

        fn is_linear(&self) -> bool {
            true
        }

        fn residual(&self, s: &State) -> FEAResult<Vector> {
            Ok(&s.a + &s.x)
        }

        fn mass(&self, _: &State) -> FEAResult<Cow<'_, CscMatrix<f64>>> {
            Ok(Cow::Owned(scalar(1.0)))
        }

        fn compute_keff(&self, _: &State, k: f64, _: f64, m: f64) -> FEAResult<CscMatrix<f64>> {
            // m = 1 / (beta dt^2) with beta = 1/4
            self.sizes.borrow_mut().push(2.0 / m.sqrt());
            Ok(scalar(k + m))
        }
    }

    // From x = 1 at rest one step of size h gives x = (1 - h^2/4) / (1 + h^2/4).
    // The doubling error of the first step is about 0.077 for h = 1 and
    // 0.004 for h = 0.5.

    #[test]
    fn test_rejection_reuses_fine_factorization() {
        let model = StepLog::default();
        let params = NewmarkParameters::default().with_dt(1.0).with_tol_adaptive(1e-2);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = at_rest_displaced();
        let mut times = Vec::new();
        newmark
            .integrate(&model, &mut state, 1.0, |s| times.push(s.t))
            .unwrap();
        assert_relative_eq!(times[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(state.t, 1.0, epsilon = 1e-12);

        // the retried coarse step at 0.5 runs on the first half-step cache,
        // so only the new quarter steps are factorized
        let sizes = model.sizes.borrow();
        assert!(sizes.len() >= 5, "{sizes:?}");
        for (size, expected) in sizes.iter().zip([1.0, 0.5, 0.5, 0.25, 0.25]) {
            assert_relative_eq!(*size, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_minimum_step_forces_acceptance() {
        let model = StepLog::default();
        let params = NewmarkParameters::default()
            .with_dt(1.0)
            .with_bounds(0.4, 1.0)
            .with_tol_adaptive(1e-6);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = at_rest_displaced();
        let mut accepted = Vec::new();
        let stats = newmark
            .integrate(&model, &mut state, 1.0, |s| accepted.push(s.clone()))
            .unwrap();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.forced, 2);
        assert_eq!(stats.accepted, 2);
        assert_relative_eq!(state.t, 1.0, epsilon = 1e-12);

        // first step keeps the fine result of two quarter steps
        let c: f64 = 63.0 / 65.0;
        assert_relative_eq!(accepted[1].t, 0.5, epsilon = 1e-12);
        assert_relative_eq!(accepted[1].x[0], 2.0 * c * c - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_force_lu() {
        let (m, c, k) = (scalar(1.0), scalar(0.0), scalar(1.0));
        let model = LinearModel::new(&m, &c, &k).unwrap();
        let params = NewmarkParameters::default()
            .with_adaptive(false)
            .with_dt(0.01)
            .with_force_lu(true);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = at_rest_displaced();
        newmark.integrate(&model, &mut state, 0.5, |_| {}).unwrap();
        assert!(newmark.cache(0).unwrap().uses_lu());
        assert_relative_eq!(state.x[0], 0.5_f64.cos(), epsilon = 1e-4);
    }

    #[test]
    fn test_adaptive_oscillator() {
        let (m, c, k) = (scalar(1.0), scalar(0.0), scalar(1.0));
        let model = LinearModel::new(&m, &c, &k).unwrap();
        let params = NewmarkParameters::default().with_dt(0.1).with_tol_adaptive(1e-5);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = at_rest_displaced();
        let stats = newmark.integrate(&model, &mut state, 2.0, |_| {}).unwrap();

        assert!(stats.accepted > 0);
        assert_relative_eq!(state.t, 2.0, epsilon = 1e-9);
        assert_relative_eq!(state.x[0], 2.0_f64.cos(), epsilon = 1e-3);
        assert_relative_eq!(energy(&state), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_nonlinear_spring() {
        // a + x + x^3 = 0
        let model = GeneralModel::new(1, |s: &State| Ok(&s.a + s.x.map(|x| x + x.powi(3))))
            .with_mass(|_| Ok(scalar(1.0)))
            .with_stiffness(|s| Ok(scalar(1.0 + 3.0 * s.x[0] * s.x[0])));
        let params = NewmarkParameters::default().with_adaptive(false).with_dt(0.01);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = State::new(0.0, Vector::from_vec(vec![0.5]), Vector::zeros(1));
        let e0 = 0.5 * 0.25 + 0.25 * 0.0625;
        let stats = newmark.integrate(&model, &mut state, 1.0, |_| {}).unwrap();

        assert_eq!(stats.unconverged, 0);
        let x = state.x[0];
        let e = 0.5 * state.v[0] * state.v[0] + 0.5 * x * x + 0.25 * x.powi(4);
        assert_relative_eq!(e, e0, epsilon = 1e-4);
    }

    #[test]
    fn test_failing_model_diverges() {
        let model = GeneralModel::new(1, |s: &State| {
            if s.t > 0.0 {
                Err(FEAError::SingularMatrix)
            } else {
                Ok(s.a.clone())
            }
        })
        .with_acceleration_solver(|_| Ok(()));
        let params = NewmarkParameters::default().with_dt(0.1).with_bounds(1e-3, 1.0);
        let mut newmark = Newmark::new(params).unwrap();

        let mut state = State::zeros(1);
        assert!(matches!(
            newmark.integrate(&model, &mut state, 1.0, |_| {}),
            Err(FEAError::IntegrationDiverged { .. })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Newmark::new(NewmarkParameters::default().with_dt(0.0)).is_err());
        assert!(Newmark::new(NewmarkParameters::default().with_bounds(1.0, 0.1)).is_err());

        let (m, c, k) = (scalar(1.0), scalar(0.0), scalar(1.0));
        let model = LinearModel::new(&m, &c, &k).unwrap();
        let mut newmark = Newmark::new(NewmarkParameters::default()).unwrap();
        let mut state = State::zeros(1);
        assert!(newmark.integrate(&model, &mut state, 0.0, |_| {}).is_err());
        let mut wrong = State::zeros(2);
        assert!(matches!(
            newmark.integrate(&model, &mut wrong, 1.0, |_| {}),
            Err(FEAError::DimensionMismatch { .. })
        ));
    }
}
