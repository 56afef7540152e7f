//! Compressed sparse row storage for least-squares Jacobians.

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;

/// Row-major sparse matrix (`values`, `col_indices`, `row_ptr`).
///
/// Rows are only ever appended; `row_ptr` always holds `nrows + 1` offsets
/// starting at zero. Column indices are strictly increasing within a row.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    ncols: usize,
    values: Vec<f64>,
    col_indices: Vec<usize>,
    row_ptr: Vec<usize>,
}

impl CsrMatrix {
    /// Empty matrix with `ncols` columns and no rows.
    pub fn new(ncols: usize) -> Self {
        Self {
            ncols,
            values: Vec::new(),
            col_indices: Vec::new(),
            row_ptr: vec![0],
        }
    }

    /// Assemble from raw CSR arrays, validating their shape.
    pub fn from_parts(
        ncols: usize,
        values: Vec<f64>,
        col_indices: Vec<usize>,
        row_ptr: Vec<usize>,
    ) -> Result<Self, String> {
        if values.len() != col_indices.len() {
            return Err(format!(
                "CSR values ({}) and column indices ({}) differ in length",
                values.len(),
                col_indices.len()
            ));
        }
        if row_ptr.first() != Some(&0) || row_ptr.last() != Some(&values.len()) {
            return Err("CSR row pointer must start at 0 and end at nnz".to_string());
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err("CSR row pointer must be non-decreasing".to_string());
        }
        if let Some(&c) = col_indices.iter().find(|&&c| c >= ncols) {
            return Err(format!("CSR column index {c} out of range (ncols = {ncols})"));
        }
        for (r, w) in row_ptr.windows(2).enumerate() {
            if col_indices[w[0]..w[1]].windows(2).any(|c| c[0] >= c[1]) {
                return Err(format!(
                    "CSR row {r} has unsorted or duplicate column indices"
                ));
            }
        }
        Ok(Self {
            ncols,
            values,
            col_indices,
            row_ptr,
        })
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column indices and values of row `r`.
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[r]..self.row_ptr[r + 1];
        (&self.col_indices[range.clone()], &self.values[range])
    }

    /// Append one row given as `(column, value)` pairs in increasing column
    /// order.
    pub fn push_row<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let row_start = self.values.len();
        for (col, value) in entries {
            assert!(col < self.ncols, "column {col} out of range ({})", self.ncols);
            if self.col_indices.len() > row_start {
                let prev = self.col_indices[self.col_indices.len() - 1];
                assert!(prev < col, "column {col} pushed after column {prev}");
            }
            self.col_indices.push(col);
            self.values.push(value);
        }
        self.row_ptr.push(self.values.len());
    }

    /// Append all rows of `other` below the rows of `self`.
    pub fn append(&mut self, other: &CsrMatrix) {
        assert_eq!(self.ncols, other.ncols, "column count mismatch");
        let base = self.values.len();
        self.values.extend_from_slice(&other.values);
        self.col_indices.extend_from_slice(&other.col_indices);
        self.row_ptr
            .extend(other.row_ptr.iter().skip(1).map(|&p| base + p));
    }

    /// `J v`.
    pub fn mul_vec(&self, v: &[f64]) -> DVector<f64> {
        assert_eq!(v.len(), self.ncols, "vector length mismatch");
        DVector::from_iterator(
            self.nrows(),
            (0..self.nrows()).map(|r| {
                let (cols, vals) = self.row(r);
                cols.iter().zip(vals).map(|(&c, &x)| x * v[c]).sum::<f64>()
            }),
        )
    }

    /// `Jᵗ v`.
    pub fn transpose_mul_vec(&self, v: &[f64]) -> DVector<f64> {
        assert_eq!(v.len(), self.nrows(), "vector length mismatch");
        let mut out = DVector::zeros(self.ncols);
        for (r, &vr) in v.iter().enumerate() {
            let (cols, vals) = self.row(r);
            for (&c, &x) in cols.iter().zip(vals) {
                out[c] += x * vr;
            }
        }
        out
    }

    /// Transposed copy, `ncols × nrows`.
    pub fn transpose(&self) -> CsrMatrix {
        let mut counts = vec![0usize; self.ncols + 1];
        for &c in &self.col_indices {
            counts[c + 1] += 1;
        }
        for c in 0..self.ncols {
            counts[c + 1] += counts[c];
        }
        let row_ptr = counts.clone();
        let mut next = counts;
        let mut values = vec![0.0; self.nnz()];
        let mut col_indices = vec![0; self.nnz()];
        // Rows are visited in order, so every transposed row comes out sorted.
        for r in 0..self.nrows() {
            let (cols, vals) = self.row(r);
            for (&c, &x) in cols.iter().zip(vals) {
                let slot = next[c];
                values[slot] = x;
                col_indices[slot] = r;
                next[c] += 1;
            }
        }
        CsrMatrix {
            ncols: self.nrows(),
            values,
            col_indices,
            row_ptr,
        }
    }

    /// Sparse normal matrix `Jᵗ J` (`ncols × ncols`).
    ///
    /// Only model pairs that share a Jacobian row get an entry. The diagonal
    /// is always stored, even where it is zero, so damping can be added in
    /// place.
    pub fn normal_matrix(&self) -> CsrMatrix {
        let n = self.ncols;
        let jt = self.transpose();
        let mut acc = vec![0.0; n];
        let mut marker = vec![usize::MAX; n];
        let mut pattern: Vec<usize> = Vec::new();
        let mut out = CsrMatrix::new(n);
        for a in 0..n {
            pattern.clear();
            marker[a] = a;
            acc[a] = 0.0;
            pattern.push(a);
            let (rows, vals) = jt.row(a);
            for (&r, &va) in rows.iter().zip(vals) {
                let (cols, jv) = self.row(r);
                for (&b, &vb) in cols.iter().zip(jv) {
                    if marker[b] != a {
                        marker[b] = a;
                        acc[b] = 0.0;
                        pattern.push(b);
                    }
                    acc[b] += va * vb;
                }
            }
            pattern.sort_unstable();
            out.push_row(pattern.iter().map(|&b| (b, acc[b])));
        }
        out
    }

    /// Position of entry `(r, r)` in [`values`](Self::values), if stored.
    pub fn diagonal_offset(&self, r: usize) -> Option<usize> {
        let (cols, _) = self.row(r);
        cols.binary_search(&r).ok().map(|k| self.row_ptr[r] + k)
    }

    /// Copy of a square matrix with `lambda` added to every diagonal entry,
    /// converted to column-compressed storage. Fails when the matrix is not
    /// square or a diagonal entry is not stored.
    ///
    /// The CSR arrays are reused as CSC arrays, which describes the same
    /// matrix only when it is symmetric, as `Jᵗ J` is.
    pub fn damped_symmetric_csc(&self, lambda: f64) -> Result<CscMatrix<f64>, String> {
        let n = self.nrows();
        if n != self.ncols {
            return Err(format!("matrix is {n}x{} and not square", self.ncols));
        }
        let mut values = self.values.clone();
        for r in 0..n {
            let k = self
                .diagonal_offset(r)
                .ok_or_else(|| format!("diagonal entry ({r}, {r}) is not stored"))?;
            values[k] += lambda;
        }
        CscMatrix::try_from_csc_data(
            n,
            n,
            self.row_ptr.clone(),
            self.col_indices.clone(),
            values,
        )
        .map_err(|e| format!("invalid CSC layout: {e}"))
    }

    #[cfg(test)]
    pub(crate) fn to_dense(&self) -> nalgebra::DMatrix<f64> {
        let mut out = nalgebra::DMatrix::zeros(self.nrows(), self.ncols);
        for r in 0..self.nrows() {
            let (cols, vals) = self.row(r);
            for (&c, &x) in cols.iter().zip(vals) {
                out[(r, c)] += x;
            }
        }
        out
    }
}

/// Least-squares system: a sparse Jacobian with one residual per row.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseJacobian {
    pub matrix: CsrMatrix,
    pub residuals: Vec<f64>,
}

impl SparseJacobian {
    pub fn new(ncols: usize) -> Self {
        Self {
            matrix: CsrMatrix::new(ncols),
            residuals: Vec::new(),
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.residuals.len()
    }

    pub fn push_row<I>(&mut self, entries: I, residual: f64)
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        self.matrix.push_row(entries);
        self.residuals.push(residual);
    }

    pub fn append(&mut self, other: &SparseJacobian) {
        self.matrix.append(&other.matrix);
        self.residuals.extend_from_slice(&other.residuals);
    }

    /// Sum of squared residuals.
    pub fn energy(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }

    /// Gradient half `Jᵗ E`.
    pub fn gradient(&self) -> DVector<f64> {
        self.matrix.transpose_mul_vec(&self.residuals)
    }
}
