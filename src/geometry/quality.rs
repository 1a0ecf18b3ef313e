//! Simplex shape quality, isotropic and under an anisotropic metric.
//!
//! # Measure
//! The mean-ratio measure
//!
//! ```text
//! q = (size / size_equilateral) ^ (2 / dim) / mean(squared edge lengths)
//! ```
//!
//! is 1 for a regular simplex of any scale, tends to 0 as the simplex
//! degenerates, and is negative for an inverted simplex. Vertex order follows
//! the usual right-handed convention: `[v0, v1, v2]` counter-clockwise in 2D,
//! `[v0, v1, v2, v3]` with `v3` above the `v0 v1 v2` plane in 3D.
//!
//! # Examples
//! ```rust
//! use mesh_adapt::geometry::quality::isotropic_quality;
//!
//! let h = 3f64.sqrt() / 2.0;
//! let q = isotropic_quality::<2>(&[[0.0, 0.0], [1.0, 0.0], [0.5, h]]);
//! assert!((q - 1.0).abs() < 1e-12);
//! ```

use crate::geometry::metric::{
    determinant, fuse_metrics, get_symm, metric_length, norm_squared, sub, Matrix, Vector,
};
use crate::topology::templates::MAX_SIMPLEX_VERTS;

#[inline]
fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Size of the regular simplex with unit edges (`√3/4` in 2D, `1/(6√2)` in 3D).
#[inline]
pub fn equilateral_size(dim: usize) -> f64 {
    ((dim + 1) as f64).sqrt() / (factorial(dim) * 2f64.powi(dim as i32).sqrt())
}

/// Signed area (2D) or volume (3D) of the simplex `p[0..=D]`.
pub fn simplex_size<const D: usize>(p: &[Vector<D>]) -> f64 {
    debug_assert_eq!(p.len(), D + 1);
    let basis: Matrix<D> = std::array::from_fn(|i| sub(p[i + 1], p[0]));
    determinant(&basis) / factorial(D)
}

#[inline]
fn mean_ratio(dim: usize, size: f64, mean_squared_length: f64) -> f64 {
    if mean_squared_length <= 0.0 {
        return 0.0;
    }
    let ratio = (size.abs() / equilateral_size(dim)).powf(2.0 / dim as f64);
    ratio.copysign(size) / mean_squared_length
}

fn mean_squared_length<const D: usize>(p: &[Vector<D>], measure: impl Fn(Vector<D>) -> f64) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for i in 0..p.len() {
        for j in i + 1..p.len() {
            sum += measure(sub(p[j], p[i]));
            n += 1;
        }
    }
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Mean-ratio quality of a simplex from its vertex positions.
pub fn isotropic_quality<const D: usize>(p: &[Vector<D>]) -> f64 {
    let msl = mean_squared_length(p, norm_squared);
    mean_ratio(D, simplex_size(p), msl)
}

/// Mean-ratio quality of a simplex measured in metric `m`.
///
/// Equivalent to factoring `m` with [`cholesky`], mapping every vertex through
/// [`to_metric_space`] and calling [`isotropic_quality`]: metric lengths are
/// `sqrt(eᵀ M e)` and the size scales by `sqrt(det M)`.
///
/// [`cholesky`]: crate::geometry::metric::cholesky
/// [`to_metric_space`]: crate::geometry::metric::to_metric_space
pub fn metric_quality<const D: usize>(p: &[Vector<D>], m: &Matrix<D>) -> f64 {
    let msl = mean_squared_length(p, |e| {
        let l = metric_length(m, e);
        l * l
    });
    let size = simplex_size(p) * determinant(m).max(0.0).sqrt();
    mean_ratio(D, size, msl)
}

#[inline]
pub(crate) fn get_vector<const D: usize>(coords: &[f64], v: usize) -> Vector<D> {
    std::array::from_fn(|k| coords[v * D + k])
}

fn element_quality_tmpl<const D: usize>(
    coords: &[f64],
    metrics: Option<&[f64]>,
    verts: &[usize],
) -> f64 {
    let mut p = [[0.0; D]; MAX_SIMPLEX_VERTS];
    for (slot, &v) in p.iter_mut().zip(verts) {
        *slot = get_vector::<D>(coords, v);
    }
    let p = &p[..=D];
    match metrics {
        None => isotropic_quality(p),
        Some(data) => {
            let mut ms = [[[0.0; D]; D]; MAX_SIMPLEX_VERTS];
            for (slot, &v) in ms.iter_mut().zip(verts) {
                *slot = get_symm::<D>(data, v);
            }
            match fuse_metrics(&ms[..=D]) {
                Some(m) => metric_quality(p, &m),
                None => isotropic_quality(p),
            }
        }
    }
}

/// Quality of the simplex with vertex indices `verts`, in the max-determinant
/// fusion of its vertices' metrics when `metrics` is present.
pub fn element_quality(
    dim: usize,
    coords: &[f64],
    metrics: Option<&[f64]>,
    verts: &[usize],
) -> f64 {
    match dim {
        2 => element_quality_tmpl::<2>(coords, metrics, verts),
        3 => element_quality_tmpl::<3>(coords, metrics, verts),
        _ => f64::NAN,
    }
}

/// Signed size of the simplex with vertex indices `verts`.
pub fn element_size(dim: usize, coords: &[f64], verts: &[usize]) -> f64 {
    fn tmpl<const D: usize>(coords: &[f64], verts: &[usize]) -> f64 {
        let mut p = [[0.0; D]; MAX_SIMPLEX_VERTS];
        for (slot, &v) in p.iter_mut().zip(verts) {
            *slot = get_vector::<D>(coords, v);
        }
        simplex_size(&p[..=D])
    }
    match dim {
        2 => tmpl::<2>(coords, verts),
        3 => tmpl::<3>(coords, verts),
        _ => f64::NAN,
    }
}

fn edge_length_tmpl<const D: usize>(
    coords: &[f64],
    metrics: Option<&[f64]>,
    a: usize,
    b: usize,
) -> f64 {
    let e = sub(get_vector::<D>(coords, b), get_vector::<D>(coords, a));
    match metrics {
        None => norm_squared(e).sqrt(),
        Some(data) => {
            let la = metric_length(&get_symm::<D>(data, a), e);
            let lb = metric_length(&get_symm::<D>(data, b), e);
            0.5 * (la + lb)
        }
    }
}

/// Length of edge `(a, b)`: Euclidean, or the mean of the lengths measured in
/// each endpoint's metric.
pub fn edge_length(dim: usize, coords: &[f64], metrics: Option<&[f64]>, a: usize, b: usize) -> f64 {
    match dim {
        2 => edge_length_tmpl::<2>(coords, metrics, a, b),
        3 => edge_length_tmpl::<3>(coords, metrics, a, b),
        _ => f64::NAN,
    }
}
