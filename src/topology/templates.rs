//! Cavity topology templates for triangles and tetrahedra.
//!
//! These tables encode the combinatorics of simplices only:
//!
//! - [`down_template`]: which cell-local vertex is the `which_vert`-th vertex of
//!   the `which_down`-th sub-simplex (edge or face) of a cell;
//! - [`opposite_template`]: which cell-local side (edge in 2D, face in 3D) lies
//!   opposite a cell-local vertex.
//!
//! Splitting an edge replaces each incident cell by two: for each endpoint, the
//! side opposite that endpoint joined to the edge midpoint. With the side
//! listed as in [`down_template`] and the midpoint appended, the new simplex is
//! positively oriented once [`flip_new_simplex`] is applied.
//!
//! # Vertex ordering
//! - Triangle edges: `{0,1}, {1,2}, {2,0}`.
//! - Tetrahedron edges: `{0,1}, {1,2}, {2,0}, {0,3}, {1,3}, {2,3}`.
//! - Tetrahedron faces (outward normals): `{0,2,1}, {0,1,3}, {1,2,3}, {2,0,3}`.

use static_assertions::const_assert_eq;

pub const VERT: usize = 0;
pub const EDGE: usize = 1;
pub const TRI: usize = 2;
pub const TET: usize = 3;

/// Largest number of vertices of a supported simplex.
pub const MAX_SIMPLEX_VERTS: usize = 4;

const TRI_EDGES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
const TET_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];
const TET_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

const TRI_OPPOSITE_EDGE: [usize; 3] = [1, 2, 0];
const TET_OPPOSITE_FACE: [usize; 4] = [2, 3, 1, 0];

const_assert_eq!(TRI_EDGES.len(), ndown_of_simplex(TRI, EDGE));
const_assert_eq!(TET_EDGES.len(), ndown_of_simplex(TET, EDGE));
const_assert_eq!(TET_FACES.len(), ndown_of_simplex(TET, TRI));

/// Number of vertices of a `dim`-simplex.
#[inline]
pub const fn nverts_of_simplex(dim: usize) -> usize {
    dim + 1
}

/// Number of `sub_dim`-dimensional faces of a `dim`-simplex.
pub const fn ndown_of_simplex(dim: usize, sub_dim: usize) -> usize {
    match (dim, sub_dim) {
        (d, 0) => d + 1,
        (2, 1) => 3,
        (3, 1) => 6,
        (3, 2) => 4,
        (d, s) if d == s => 1,
        _ => 0,
    }
}

/// Cell-local vertex that is vertex `which_vert` of sub-simplex `which_down`.
///
/// Panics on an out-of-range index or an unsupported `(cell_dim, sub_dim)`;
/// all callers pass indices derived from these same tables.
#[inline]
pub fn down_template(cell_dim: usize, sub_dim: usize, which_down: usize, which_vert: usize) -> usize {
    match (cell_dim, sub_dim) {
        (TRI, EDGE) => TRI_EDGES[which_down][which_vert],
        (TET, EDGE) => TET_EDGES[which_down][which_vert],
        (TET, TRI) => TET_FACES[which_down][which_vert],
        _ => panic!("no down template for ({cell_dim}, {sub_dim})"),
    }
}

/// Cell-local side (sub-simplex of dimension `cell_dim - 1`) opposite vertex `vert`.
#[inline]
pub fn opposite_template(cell_dim: usize, vert: usize) -> usize {
    match cell_dim {
        TRI => TRI_OPPOSITE_EDGE[vert],
        TET => TET_OPPOSITE_FACE[vert],
        _ => panic!("no opposite template for dimension {cell_dim}"),
    }
}

/// Reorder the vertices of a simplex built as `side ++ [apex]` so it is
/// positively oriented. Identity in 2D; swaps entries 1 and 2 in 3D.
#[inline]
pub fn flip_new_simplex<T>(dim: usize, verts: &mut [T]) {
    if dim == TET {
        verts.swap(1, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quality::simplex_size;

    fn side_verts(dim: usize, side: usize) -> Vec<usize> {
        (0..dim).map(|k| down_template(dim, dim - 1, side, k)).collect()
    }

    #[test]
    fn opposite_side_excludes_exactly_its_vertex() {
        for dim in [TRI, TET] {
            for v in 0..nverts_of_simplex(dim) {
                let side = side_verts(dim, opposite_template(dim, v));
                assert!(!side.contains(&v), "dim {dim} vertex {v}");
                let mut all: Vec<usize> = side.clone();
                all.push(v);
                all.sort_unstable();
                assert_eq!(all, (0..nverts_of_simplex(dim)).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn opposite_sides_are_distinct() {
        for dim in [TRI, TET] {
            let mut sides: Vec<usize> = (0..=dim).map(|v| opposite_template(dim, v)).collect();
            sides.sort_unstable();
            assert_eq!(sides, (0..ndown_of_simplex(dim, dim - 1)).collect::<Vec<_>>());
        }
    }

    #[test]
    fn edges_are_distinct_vertex_pairs() {
        for dim in [TRI, TET] {
            let mut pairs: Vec<[usize; 2]> = (0..ndown_of_simplex(dim, EDGE))
                .map(|e| {
                    let mut p = [down_template(dim, EDGE, e, 0), down_template(dim, EDGE, e, 1)];
                    p.sort_unstable();
                    p
                })
                .collect();
            pairs.sort_unstable();
            pairs.dedup();
            assert_eq!(pairs.len(), ndown_of_simplex(dim, EDGE));
            assert!(pairs.iter().all(|p| p[0] != p[1] && p[1] <= dim));
        }
    }

    #[test]
    fn opposite_of_one_endpoint_contains_the_other() {
        for dim in [TRI, TET] {
            for e in 0..ndown_of_simplex(dim, EDGE) {
                for end in 0..2 {
                    let v = down_template(dim, EDGE, e, end);
                    let other = down_template(dim, EDGE, e, 1 - end);
                    let side = side_verts(dim, opposite_template(dim, v));
                    assert!(side.contains(&other));
                }
            }
        }
    }

    #[test]
    fn tet_faces_point_outward() {
        let p = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for v in 0..4 {
            let face = side_verts(TET, opposite_template(TET, v));
            // outward face + opposite vertex is negatively oriented
            let simplex = [p[face[0]], p[face[1]], p[face[2]], p[v]];
            assert!(simplex_size::<3>(&simplex) < 0.0);
        }
    }

    #[test]
    fn flipped_new_simplices_are_positive() {
        let tri = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let tet = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for e in 0..3 {
            let (a, b) = (down_template(TRI, EDGE, e, 0), down_template(TRI, EDGE, e, 1));
            let mid = [(tri[a][0] + tri[b][0]) / 2.0, (tri[a][1] + tri[b][1]) / 2.0];
            for end in [a, b] {
                let side = side_verts(TRI, opposite_template(TRI, end));
                let mut ncp = [tri[side[0]], tri[side[1]], mid];
                flip_new_simplex(TRI, &mut ncp);
                assert!(simplex_size::<2>(&ncp) > 0.0);
            }
        }
        for e in 0..6 {
            let (a, b) = (down_template(TET, EDGE, e, 0), down_template(TET, EDGE, e, 1));
            let mid: [f64; 3] = std::array::from_fn(|k| (tet[a][k] + tet[b][k]) / 2.0);
            for end in [a, b] {
                let side = side_verts(TET, opposite_template(TET, end));
                let mut ncp = [tet[side[0]], tet[side[1]], tet[side[2]], mid];
                flip_new_simplex(TET, &mut ncp);
                assert!(simplex_size::<3>(&ncp) > 0.0);
            }
        }
    }
}
