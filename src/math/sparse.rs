//! Sparse matrix utilities for the global system
//!
//! Stiffness, mass and damping blocks are accumulated as triplets and
//! converted to compressed-column storage. Duplicate (row, col) entries sum.

use nalgebra::{DMatrix, DVector, Dyn, LU};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::{FEAError, FEAResult};

/// Sparse matrix builder using COO format
/// More efficient for incremental assembly
#[derive(Debug, Clone)]
pub struct SparseMatrixBuilder {
    nrows: usize,
    ncols: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrixBuilder {
    /// Create a builder for an `nrows x ncols` matrix
    pub fn new(nrows: usize, ncols: usize) -> Self {
        // Two-node elements with up to 6 DOFs per node touch 12 columns per row
        let estimated_nnz = nrows.min(ncols) * 12;
        Self {
            nrows,
            ncols,
            entries: Vec::with_capacity(estimated_nnz),
        }
    }

    /// Create a builder for a square matrix
    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Add a value to the matrix (accumulates if already exists)
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.nrows && col < self.ncols);
        if value != 0.0 {
            self.entries.push((row, col, value));
        }
    }

    /// Add `value` to every diagonal entry
    pub fn add_diagonal(&mut self, value: f64) {
        for i in 0..self.nrows.min(self.ncols) {
            self.entries.push((i, i, value));
        }
    }

    /// Convert to CSC format for factorization
    pub fn to_csc(&self) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(self.nrows, self.ncols);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        CscMatrix::from(&coo)
    }

    /// Convert to dense matrix (for comparison/debugging)
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.nrows, self.ncols);
        for &(row, col, val) in &self.entries {
            mat[(row, col)] += val;
        }
        mat
    }

    /// Number of accumulated triplets
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }
}

/// Sparse matrix-vector multiplication
pub fn spmv(a: &CscMatrix<f64>, x: &DVector<f64>) -> FEAResult<DVector<f64>> {
    if a.ncols() != x.len() {
        return Err(FEAError::DimensionMismatch {
            expected: a.ncols(),
            found: x.len(),
        });
    }
    let mut y = DVector::zeros(a.nrows());
    for (row, col, val) in a.triplet_iter() {
        y[row] += val * x[col];
    }
    Ok(y)
}

/// `alpha * a + beta * b` for matrices of equal shape
pub fn linear_combination(
    alpha: f64,
    a: &CscMatrix<f64>,
    beta: f64,
    b: &CscMatrix<f64>,
) -> FEAResult<CscMatrix<f64>> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(FEAError::DimensionMismatch {
            expected: a.nrows(),
            found: b.nrows(),
        });
    }
    let mut builder = SparseMatrixBuilder::new(a.nrows(), a.ncols());
    for (row, col, val) in a.triplet_iter() {
        builder.add(row, col, alpha * val);
    }
    for (row, col, val) in b.triplet_iter() {
        builder.add(row, col, beta * val);
    }
    Ok(builder.to_csc())
}

/// Copy of a square matrix with `shift` added to every diagonal entry
pub fn shift_diagonal(a: &CscMatrix<f64>, shift: f64) -> CscMatrix<f64> {
    let mut builder = SparseMatrixBuilder::new(a.nrows(), a.ncols());
    for (row, col, val) in a.triplet_iter() {
        builder.add(row, col, *val);
    }
    builder.add_diagonal(shift);
    builder.to_csc()
}

/// A factorized square matrix ready for repeated solves
pub enum Factorization {
    /// Sparse LDLT-style path for symmetric positive definite matrices
    Cholesky(CscCholesky<f64>),
    /// General path for anything else
    Lu(LU<f64, Dyn, Dyn>),
}

impl std::fmt::Debug for Factorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Factorization::Cholesky(_) => write!(f, "Factorization::Cholesky"),
            Factorization::Lu(_) => write!(f, "Factorization::Lu"),
        }
    }
}

impl Factorization {
    /// Symbolic and numeric Cholesky factorization
    pub fn cholesky(a: &CscMatrix<f64>) -> FEAResult<Self> {
        CscCholesky::factor(a)
            .map(Factorization::Cholesky)
            .map_err(|e| FEAError::FactorizationFailed(format!("cholesky: {e:?}")))
    }

    /// General LU factorization
    pub fn lu(a: &CscMatrix<f64>) -> FEAResult<Self> {
        if a.nrows() != a.ncols() {
            return Err(FEAError::DimensionMismatch {
                expected: a.nrows(),
                found: a.ncols(),
            });
        }
        let lu = DMatrix::from(a).lu();
        if !lu.is_invertible() {
            return Err(FEAError::FactorizationFailed("lu: matrix is singular".into()));
        }
        Ok(Factorization::Lu(lu))
    }

    /// Cholesky first, LU when the matrix is not positive definite
    pub fn symmetric_or_general(a: &CscMatrix<f64>) -> FEAResult<Self> {
        match Self::cholesky(a) {
            Ok(f) => Ok(f),
            Err(e) => {
                log::debug!("{e}, falling back to LU");
                Self::lu(a)
            }
        }
    }

    /// Numeric re-factorization for a matrix with the pattern this
    /// factorization was built from
    pub fn refactor(&mut self, a: &CscMatrix<f64>) -> FEAResult<()> {
        match self {
            Factorization::Cholesky(chol) => chol
                .refactor(a.values())
                .map_err(|e| FEAError::FactorizationFailed(format!("cholesky: {e:?}"))),
            Factorization::Lu(_) => {
                *self = Self::lu(a)?;
                Ok(())
            }
        }
    }

    pub fn is_cholesky(&self) -> bool {
        matches!(self, Factorization::Cholesky(_))
    }

    /// Solve `A x = b`
    pub fn solve(&self, b: &DVector<f64>) -> FEAResult<DVector<f64>> {
        let x = match self {
            Factorization::Cholesky(chol) => {
                let rhs = DMatrix::from_column_slice(b.len(), 1, b.as_slice());
                let x = chol.solve(&rhs);
                DVector::from_column_slice(x.as_slice())
            }
            Factorization::Lu(lu) => lu.solve(b).ok_or(FEAError::SingularMatrix)?,
        };
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FEAError::SingularMatrix);
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spd() -> SparseMatrixBuilder {
        let mut builder = SparseMatrixBuilder::square(3);
        builder.add(0, 0, 4.0);
        builder.add(0, 1, -1.0);
        builder.add(1, 0, -1.0);
        builder.add(1, 1, 4.0);
        builder.add(1, 2, -1.0);
        builder.add(2, 1, -1.0);
        builder.add(2, 2, 4.0);
        builder
    }

    #[test]
    fn test_sparse_builder_sums_duplicates() {
        let mut builder = SparseMatrixBuilder::new(2, 3);
        builder.add(0, 0, 4.0);
        builder.add(0, 0, 1.0);
        builder.add(1, 2, 3.0);
        builder.add(1, 1, 0.0);

        let csc = builder.to_csc();
        assert_eq!(csc.nnz(), 2);
        let dense = DMatrix::from(&csc);
        assert_relative_eq!(dense[(0, 0)], 5.0);
        assert_relative_eq!(dense[(1, 2)], 3.0);
        assert_eq!(dense, builder.to_dense());
    }

    #[test]
    fn test_cholesky_solve() {
        let csc = spd().to_csc();
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        let f = Factorization::cholesky(&csc).unwrap();
        assert!(f.is_cholesky());
        let x = f.solve(&b).unwrap();
        let ax = spmv(&csc, &x).unwrap();
        assert_relative_eq!(ax, b, epsilon = 1e-10);
    }

    #[test]
    fn test_indefinite_falls_back_to_lu() {
        let mut builder = SparseMatrixBuilder::square(2);
        builder.add(0, 0, 1.0);
        builder.add(0, 1, 2.0);
        builder.add(1, 0, 2.0);
        builder.add(1, 1, 1.0);
        let csc = builder.to_csc();

        let f = Factorization::symmetric_or_general(&csc).unwrap();
        assert!(!f.is_cholesky());
        let b = DVector::from_vec(vec![3.0, 3.0]);
        let x = f.solve(&b).unwrap();
        assert_relative_eq!(x, DVector::from_vec(vec![1.0, 1.0]), epsilon = 1e-12);
    }

    #[test]
    fn test_singular_rejected() {
        let mut builder = SparseMatrixBuilder::square(2);
        builder.add(0, 0, 1.0);
        let csc = builder.to_csc();
        assert!(Factorization::symmetric_or_general(&csc).is_err());
    }

    #[test]
    fn test_refactor_same_pattern() {
        let csc = spd().to_csc();
        let mut f = Factorization::cholesky(&csc).unwrap();

        let mut scaled = spd();
        scaled.add_diagonal(1.0);
        let scaled = scaled.to_csc();
        assert_eq!(scaled.pattern(), csc.pattern());
        f.refactor(&scaled).unwrap();

        let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        let x = f.solve(&b).unwrap();
        assert_relative_eq!(spmv(&scaled, &x).unwrap(), b, epsilon = 1e-10);
    }

    #[test]
    fn test_linear_combination() {
        let a = spd().to_csc();
        let c = linear_combination(2.0, &a, -1.0, &a).unwrap();
        assert_eq!(DMatrix::from(&c), DMatrix::from(&a));
    }
}
