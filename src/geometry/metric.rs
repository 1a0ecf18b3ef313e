//! Small dense linear algebra and anisotropic metric tensors.
//!
//! # Storage
//! Per-vertex metrics are symmetric positive-definite matrices stored compactly,
//! `dim * (dim + 1) / 2` reals per vertex:
//!
//! - 2D: `[xx, yy, xy]`
//! - 3D: `[xx, yy, zz, xy, yz, xz]`
//!
//! A metric `M` measures a vector `v` as `sqrt(vᵀ M v)`; an edge of unit metric
//! length is "ideal". Larger determinants mean smaller desired elements.

/// Fixed-size vector in `D` dimensions.
pub type Vector<const D: usize> = [f64; D];
/// Fixed-size row-major `D × D` matrix.
pub type Matrix<const D: usize> = [[f64; D]; D];

/// Number of stored components of a symmetric `dim × dim` tensor.
#[inline]
pub const fn symm_ncomps(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

#[inline]
pub fn sub<const D: usize>(a: Vector<D>, b: Vector<D>) -> Vector<D> {
    std::array::from_fn(|i| a[i] - b[i])
}

#[inline]
pub fn add<const D: usize>(a: Vector<D>, b: Vector<D>) -> Vector<D> {
    std::array::from_fn(|i| a[i] + b[i])
}

#[inline]
pub fn scale<const D: usize>(a: Vector<D>, s: f64) -> Vector<D> {
    std::array::from_fn(|i| a[i] * s)
}

#[inline]
pub fn dot<const D: usize>(a: Vector<D>, b: Vector<D>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm_squared<const D: usize>(a: Vector<D>) -> f64 {
    dot(a, a)
}

#[inline]
pub fn mat_vec<const D: usize>(m: &Matrix<D>, v: Vector<D>) -> Vector<D> {
    std::array::from_fn(|i| dot(m[i], v))
}

#[inline]
pub fn identity<const D: usize>() -> Matrix<D> {
    std::array::from_fn(|i| std::array::from_fn(|j| if i == j { 1.0 } else { 0.0 }))
}

/// Determinant by Gaussian elimination with partial pivoting.
pub fn determinant<const D: usize>(m: &Matrix<D>) -> f64 {
    match D {
        0 => 1.0,
        1 => m[0][0],
        2 => m[0][0] * m[1][1] - m[0][1] * m[1][0],
        _ => {
            let mut a = *m;
            let mut det = 1.0;
            for col in 0..D {
                let pivot = (col..D)
                    .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
                    .unwrap_or(col);
                if a[pivot][col] == 0.0 {
                    return 0.0;
                }
                if pivot != col {
                    a.swap(pivot, col);
                    det = -det;
                }
                det *= a[col][col];
                for row in col + 1..D {
                    let f = a[row][col] / a[col][col];
                    for k in col..D {
                        a[row][k] -= f * a[col][k];
                    }
                }
            }
            det
        }
    }
}

/// Read the symmetric tensor of entity `i` from compact storage.
pub fn get_symm<const D: usize>(data: &[f64], i: usize) -> Matrix<D> {
    let n = symm_ncomps(D);
    let s = &data[i * n..(i + 1) * n];
    let mut m = [[0.0; D]; D];
    for k in 0..D {
        m[k][k] = s[k];
    }
    match D {
        2 => {
            m[0][1] = s[2];
            m[1][0] = s[2];
        }
        3 => {
            m[0][1] = s[3];
            m[1][0] = s[3];
            m[1][2] = s[4];
            m[2][1] = s[4];
            m[0][2] = s[5];
            m[2][0] = s[5];
        }
        _ => {}
    }
    m
}

/// Write the symmetric tensor of entity `i` into compact storage.
pub fn put_symm<const D: usize>(data: &mut [f64], i: usize, m: &Matrix<D>) {
    let n = symm_ncomps(D);
    let s = &mut data[i * n..(i + 1) * n];
    for k in 0..D {
        s[k] = m[k][k];
    }
    match D {
        2 => s[2] = m[0][1],
        3 => {
            s[3] = m[0][1];
            s[4] = m[1][2];
            s[5] = m[0][2];
        }
        _ => {}
    }
}

/// Isotropic metric asking for edges of length `h`.
pub fn isotropic_metric<const D: usize>(h: f64) -> Matrix<D> {
    let mut m = identity::<D>();
    for (k, row) in m.iter_mut().enumerate() {
        row[k] = 1.0 / (h * h);
    }
    m
}

/// Length of `v` measured in metric `m`.
#[inline]
pub fn metric_length<const D: usize>(m: &Matrix<D>, v: Vector<D>) -> f64 {
    dot(v, mat_vec(m, v)).max(0.0).sqrt()
}

/// Componentwise linear interpolation `(1 - t) a + t b`.
pub fn interpolate_metrics<const D: usize>(a: &Matrix<D>, b: &Matrix<D>, t: f64) -> Matrix<D> {
    std::array::from_fn(|i| std::array::from_fn(|j| (1.0 - t) * a[i][j] + t * b[i][j]))
}

/// Fuse several metrics into the most restrictive one: the tensor of largest
/// determinant, i.e. the smallest unit ellipsoid. The first maximal entry wins
/// ties. `None` only for an empty input.
pub fn fuse_metrics<const D: usize>(metrics: &[Matrix<D>]) -> Option<Matrix<D>> {
    let mut best: Option<(f64, &Matrix<D>)> = None;
    for m in metrics {
        let det = determinant(m);
        match best {
            Some((best_det, _)) if det <= best_det => {}
            _ => best = Some((det, m)),
        }
    }
    best.map(|(_, m)| *m)
}

/// Lower-triangular `L` with `M = L Lᵀ`; `None` if `M` is not positive definite.
pub fn cholesky<const D: usize>(m: &Matrix<D>) -> Option<Matrix<D>> {
    let mut l = [[0.0; D]; D];
    for i in 0..D {
        for j in 0..=i {
            let s: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = m[i][i] - s;
                if d <= 0.0 {
                    return None;
                }
                l[i][j] = d.sqrt();
            } else {
                l[i][j] = (m[i][j] - s) / l[j][j];
            }
        }
    }
    Some(l)
}

/// Map a point into the space where `m` becomes the identity (`x ↦ Lᵀ x`).
pub fn to_metric_space<const D: usize>(l: &Matrix<D>, x: Vector<D>) -> Vector<D> {
    std::array::from_fn(|i| (i..D).map(|k| l[k][i] * x[k]).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn determinant_matches_closed_forms() {
        let m3: Matrix<3> = [[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]];
        assert!(close(determinant(&m3), 18.0));
        let m2: Matrix<2> = [[4.0, 1.0], [1.0, 2.0]];
        assert!(close(determinant(&m2), 7.0));
        let pivoted: Matrix<3> = [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(close(determinant(&pivoted), -1.0));
    }

    #[test]
    fn compact_storage_round_trips_off_diagonals() {
        let m: Matrix<3> = [[1.0, 0.1, 0.3], [0.1, 2.0, 0.2], [0.3, 0.2, 3.0]];
        let mut data = vec![0.0; 2 * symm_ncomps(3)];
        put_symm(&mut data, 1, &m);
        assert_eq!(&data[6..], &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3]);
        assert_eq!(get_symm::<3>(&data, 1), m);
    }

    #[test]
    fn fusion_picks_largest_determinant() {
        let a = isotropic_metric::<2>(1.0);
        let b = isotropic_metric::<2>(0.5);
        let c = isotropic_metric::<2>(2.0);
        assert_eq!(fuse_metrics(&[a, b, c]), Some(b));
        assert_eq!(fuse_metrics(&[c, b, a]), Some(b));
        assert_eq!(fuse_metrics(&[a]), Some(a));
        assert_eq!(fuse_metrics::<2>(&[]), None);
    }

    #[test]
    fn cholesky_reproduces_metric_lengths() {
        let m: Matrix<3> = [[4.0, 1.0, 0.0], [1.0, 3.0, 0.5], [0.0, 0.5, 2.0]];
        let l = cholesky(&m).unwrap();
        let v = [0.3, -1.2, 0.7];
        let mapped = to_metric_space(&l, v);
        assert!(close(norm_squared(mapped).sqrt(), metric_length(&m, v)));
        assert!(cholesky(&[[1.0, 2.0], [2.0, 1.0]]).is_none());
    }
}
