//! Small dense solver for the penalised least-squares fit.

const PIVOT_EPS: f64 = 1e-12;

/// Builds `XᵀX + diag(penalty)` and `Xᵀy` from row-major design rows.
pub(crate) fn normal_equations(rows: &[Vec<f64>], y: &[f64], penalty: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let p = penalty.len();
    let mut xtx = vec![0.0; p * p];
    let mut xty = vec![0.0; p];

    for (row, &target) in rows.iter().zip(y) {
        debug_assert_eq!(row.len(), p);
        for i in 0..p {
            let xi = row[i];
            if xi == 0.0 {
                continue;
            }
            xty[i] += xi * target;
            for j in i..p {
                xtx[i * p + j] += xi * row[j];
            }
        }
    }

    for i in 0..p {
        for j in 0..i {
            xtx[i * p + j] = xtx[j * p + i];
        }
        xtx[i * p + i] += penalty[i];
    }

    (xtx, xty)
}

/// Solves `a · x = b` for square `a` (row-major, `n × n`) by Gauss-Jordan
/// elimination with partial pivoting. `None` when the system is singular.
pub(crate) fn solve(mut a: Vec<f64>, mut b: Vec<f64>, n: usize) -> Option<Vec<f64>> {
    debug_assert_eq!(a.len(), n * n);
    debug_assert_eq!(b.len(), n);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            a[r1 * n + col]
                .abs()
                .total_cmp(&a[r2 * n + col].abs())
        })?;
        if a[pivot_row * n + col].abs() < PIVOT_EPS {
            return None;
        }

        if pivot_row != col {
            for j in 0..n {
                a.swap(col * n + j, pivot_row * n + j);
            }
            b.swap(col, pivot_row);
        }

        let pivot = a[col * n + col];
        for j in 0..n {
            a[col * n + j] /= pivot;
        }
        b[col] /= pivot;

        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = a[r * n + col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[r * n + j] -= factor * a[col * n + j];
            }
            b[r] -= factor * b[col];
        }
    }

    b.iter().all(|v| v.is_finite()).then_some(b)
}
