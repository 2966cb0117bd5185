//! CPU implementation of saturating int8 GEMV.
//!
//! Weights are row-major `[rows × cols]` i8. Products are accumulated in
//! i64 and only saturated into `[-128, 127]` once per output element.
//!
//! Two orientations exist because a matrix accepts a vector matching either
//! dimension:
//! 1. `matvec_rows`: `x.len() == cols`, output `[rows]`, entry `r = row_r · x`
//! 2. `matvec_cols`: `x.len() == rows`, output `[cols]`, entry `c = x · col_c`
//!
//! The `mass_*` variants apply one matrix to many inputs while walking the
//! weight storage exactly once.

use rayon::prelude::*;

use crate::config::PARALLEL_MIN_WEIGHTS;

// ──────────────────────────────────────────────────────────────
// 1. Scalar helpers
// ──────────────────────────────────────────────────────────────

/// Clamp a wide accumulator into the int8 range.
#[inline]
pub fn saturate(acc: i64) -> i8 {
    acc.clamp(i8::MIN as i64, i8::MAX as i64) as i8
}

/// Floor nonlinearity: non-positive activations become zero.
#[inline]
pub fn floor_activation(v: i8) -> i8 {
    v.max(0)
}

/// Saturating dot product of two equal-length int8 slices.
#[inline]
pub fn dot_saturating(a: &[i8], b: &[i8]) -> i8 {
    assert_eq!(a.len(), b.len());
    saturate(dot_wide(a, b))
}

#[inline]
fn dot_wide(a: &[i8], b: &[i8]) -> i64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as i64 * y as i64)
        .sum()
}

// ──────────────────────────────────────────────────────────────
// 2. Single-vector kernels
// ──────────────────────────────────────────────────────────────

/// `y[r] = sat(Σ_c w[r, c] · x[c])`.
pub fn matvec_rows(w: &[i8], rows: usize, cols: usize, x: &[i8]) -> Vec<i8> {
    assert_eq!(w.len(), rows * cols);
    assert_eq!(x.len(), cols);

    if rows * cols >= PARALLEL_MIN_WEIGHTS {
        return matvec_rows_parallel(w, rows, cols, x);
    }

    w.chunks_exact(cols.max(1))
        .take(rows)
        .map(|row| saturate(dot_wide(row, x)))
        .collect()
}

/// Row-parallel variant of [`matvec_rows`] for large matrices.
pub fn matvec_rows_parallel(w: &[i8], rows: usize, cols: usize, x: &[i8]) -> Vec<i8> {
    assert_eq!(w.len(), rows * cols);
    assert_eq!(x.len(), cols);

    (0..rows)
        .into_par_iter()
        .map(|r| saturate(dot_wide(&w[r * cols..(r + 1) * cols], x)))
        .collect()
}

/// `y[c] = sat(Σ_r x[r] · w[r, c])`, walking storage row by row.
pub fn matvec_cols(w: &[i8], rows: usize, cols: usize, x: &[i8]) -> Vec<i8> {
    assert_eq!(w.len(), rows * cols);
    assert_eq!(x.len(), rows);

    let mut acc = vec![0i64; cols];
    for (r, &xr) in x.iter().enumerate() {
        if xr == 0 {
            continue;
        }
        let xr = xr as i64;
        let row = &w[r * cols..(r + 1) * cols];
        for (a, &wv) in acc.iter_mut().zip(row) {
            *a += xr * wv as i64;
        }
    }
    acc.into_iter().map(saturate).collect()
}

// ──────────────────────────────────────────────────────────────
// 3. Mass kernels (one pass over the weights for many inputs)
// ──────────────────────────────────────────────────────────────

/// Apply [`matvec_rows`] to every input with a single pass over `w`.
pub fn mass_matvec_rows(w: &[i8], rows: usize, cols: usize, xs: &[&[i8]]) -> Vec<Vec<i8>> {
    assert_eq!(w.len(), rows * cols);
    assert!(xs.iter().all(|x| x.len() == cols));

    let n = xs.len();
    // acc[k * rows + r]
    let mut acc = vec![0i64; n * rows];
    for r in 0..rows {
        let row = &w[r * cols..(r + 1) * cols];
        for (c, &wv) in row.iter().enumerate() {
            if wv == 0 {
                continue;
            }
            let wv = wv as i64;
            for (k, x) in xs.iter().enumerate() {
                acc[k * rows + r] += wv * x[c] as i64;
            }
        }
    }
    split_saturated(acc, n, rows)
}

/// Apply [`matvec_cols`] to every input with a single pass over `w`.
pub fn mass_matvec_cols(w: &[i8], rows: usize, cols: usize, xs: &[&[i8]]) -> Vec<Vec<i8>> {
    assert_eq!(w.len(), rows * cols);
    assert!(xs.iter().all(|x| x.len() == rows));

    let n = xs.len();
    // acc[k * cols + c]
    let mut acc = vec![0i64; n * cols];
    for r in 0..rows {
        let row = &w[r * cols..(r + 1) * cols];
        for (c, &wv) in row.iter().enumerate() {
            if wv == 0 {
                continue;
            }
            let wv = wv as i64;
            for (k, x) in xs.iter().enumerate() {
                acc[k * cols + c] += wv * x[r] as i64;
            }
        }
    }
    split_saturated(acc, n, cols)
}

fn split_saturated(acc: Vec<i64>, n: usize, width: usize) -> Vec<Vec<i8>> {
    if width == 0 {
        return vec![Vec::new(); n];
    }
    acc.chunks_exact(width)
        .map(|chunk| chunk.iter().map(|&a| saturate(a)).collect())
        .collect()
}

// ──────────────────────────────────────────────────────────────
// 4. Real-input kernels (first layer only, no quantization)
// ──────────────────────────────────────────────────────────────

/// `y[r] = Σ_c w[r, c] · x[c]` over real inputs.
pub fn real_matvec_rows(w: &[i8], rows: usize, cols: usize, x: &[f64]) -> Vec<f64> {
    assert_eq!(w.len(), rows * cols);
    assert_eq!(x.len(), cols);

    w.chunks_exact(cols.max(1))
        .take(rows)
        .map(|row| row.iter().zip(x).map(|(&wv, &xv)| wv as f64 * xv).sum())
        .collect()
}

/// `y[c] = Σ_r x[r] · w[r, c]` over real inputs.
pub fn real_matvec_cols(w: &[i8], rows: usize, cols: usize, x: &[f64]) -> Vec<f64> {
    assert_eq!(w.len(), rows * cols);
    assert_eq!(x.len(), rows);

    let mut acc = vec![0.0f64; cols];
    for (r, &xr) in x.iter().enumerate() {
        let row = &w[r * cols..(r + 1) * cols];
        for (a, &wv) in acc.iter_mut().zip(row) {
            *a += xr * wv as f64;
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_saturate_bounds() {
        assert_eq!(saturate(1_000_000), 127);
        assert_eq!(saturate(-1_000_000), -128);
        assert_eq!(saturate(127), 127);
        assert_eq!(saturate(-128), -128);
        assert_eq!(saturate(-3), -3);
    }

    #[test]
    fn test_rows_identity() {
        let w: Vec<i8> = vec![1, 0, 0, 0, 1, 0, 0, 0, 1];
        let x = vec![2, 3, 5];
        assert_eq!(matvec_rows(&w, 3, 3, &x), vec![2, 3, 5]);
    }

    #[test]
    fn test_cols_uses_columns() {
        // 2×3 matrix, input matches rows (2) → output has 3 entries.
        let w: Vec<i8> = vec![
            1, 2, 3, //
            4, 5, 6,
        ];
        let x = vec![1, -1];
        assert_eq!(matvec_cols(&w, 2, 3, &x), vec![-3, -3, -3]);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let rows = 17;
        let cols = 23;
        let w: Vec<i8> = (0..rows * cols).map(|i| ((i * 37) % 255) as i8).collect();
        let x: Vec<i8> = (0..cols).map(|i| (i as i8).wrapping_mul(7)).collect();
        let serial: Vec<i8> = w
            .chunks_exact(cols)
            .map(|row| saturate(dot_wide(row, &x)))
            .collect();
        assert_eq!(matvec_rows_parallel(&w, rows, cols, &x), serial);
    }

    #[test]
    fn test_mass_rows_matches_single() {
        let w: Vec<i8> = vec![3, -2, 7, 1, 0, -9];
        let inputs: Vec<Vec<i8>> = vec![vec![1, 2, 3], vec![-4, 5, 0], vec![100, 100, 100]];
        let refs: Vec<&[i8]> = inputs.iter().map(|v| v.as_slice()).collect();
        let mass = mass_matvec_rows(&w, 2, 3, &refs);
        for (x, y) in inputs.iter().zip(&mass) {
            assert_eq!(&matvec_rows(&w, 2, 3, x), y);
        }
    }

    #[test]
    fn test_mass_cols_matches_single() {
        let w: Vec<i8> = vec![3, -2, 7, 1, 0, -9];
        let inputs: Vec<Vec<i8>> = vec![vec![1, 2], vec![-128, 127]];
        let refs: Vec<&[i8]> = inputs.iter().map(|v| v.as_slice()).collect();
        let mass = mass_matvec_cols(&w, 2, 3, &refs);
        for (x, y) in inputs.iter().zip(&mass) {
            assert_eq!(&matvec_cols(&w, 2, 3, x), y);
        }
    }

    #[test]
    fn test_mass_empty_inputs() {
        let w: Vec<i8> = vec![1, 2, 3, 4];
        assert!(mass_matvec_rows(&w, 2, 2, &[]).is_empty());
    }

    #[test]
    fn test_real_orientations() {
        let w: Vec<i8> = vec![1, 2, 3, 4, 5, 6];
        let rows = real_matvec_rows(&w, 2, 3, &[1.0, 0.5, 0.0]);
        assert_eq!(rows, vec![2.0, 6.5]);
        let cols = real_matvec_cols(&w, 2, 3, &[1.0, -1.0]);
        assert_eq!(cols, vec![-3.0, -3.0, -3.0]);
    }

    proptest! {
        #[test]
        fn prop_dot_stays_in_range(
            a in proptest::collection::vec(any::<i8>(), 1..64),
            seed in any::<i8>(),
        ) {
            let b: Vec<i8> = a.iter().map(|v| v.wrapping_add(seed)).collect();
            let d = dot_saturating(&a, &b) as i64;
            prop_assert!((-128..=127).contains(&d));
            prop_assert_eq!(d, dot_wide(&a, &b).clamp(-128, 127));
        }

        #[test]
        fn prop_adversarial_hits_both_clamps(len in 2usize..64, mag in 100i8..=127) {
            let pos = vec![mag; len];
            let neg = vec![-mag; len];
            prop_assert_eq!(dot_saturating(&pos, &pos), 127);
            prop_assert_eq!(dot_saturating(&pos, &neg), -128);
        }
    }
}
