//! In-memory simplex mesh, serial or one piece of a distributed mesh.
//!
//! # Expected invariants
//! - `cells` holds `dim + 1` vertex indices per cell, positively oriented.
//! - Vertex global ids are unique across the whole distributed mesh, and a
//!   vertex (or edge) present on several ranks carries the same global id(s)
//!   everywhere.
//! - Cells are never shared: every rank owns all of its cells.
//!
//! Derived data (edges, edge → cell adjacency with orientation codes, boundary
//! flags, ownership) is rebuilt on construction and after every topology
//! change. Rebuilding is *collective* because ownership of shared vertices and
//! edges is resolved across ranks: an entity is owned by the lowest rank that
//! holds it, and is *shared* when more than one rank holds it.
//!
//! # Examples
//! ```rust
//! use mesh_adapt::mesh::AdaptMesh;
//! use mesh_adapt::topology::simplex_mesh::SimplexMesh;
//!
//! // two triangles forming the unit square
//! let mesh = SimplexMesh::new(
//!     2,
//!     vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
//!     vec![0, 1, 2, 0, 2, 3],
//! )?;
//! assert_eq!(mesh.nents(1), 5);
//! assert_eq!(mesh.ask_edge_cells().degree(mesh.find_edge(0, 2).unwrap()), 2);
//! # Ok::<(), mesh_adapt::mesh_error::MeshAdaptError>(())
//! ```

use hashbrown::HashMap;

use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::reduction::{resolve_ownership, EntityKey};
use crate::geometry::metric::{isotropic_metric, put_symm, symm_ncomps};
use crate::mesh::{AdaptMesh, UpAdjacency};
use crate::mesh_error::MeshAdaptError;
use crate::topology::orientation::{make_code, Code};
use crate::topology::templates::{
    down_template, ndown_of_simplex, nverts_of_simplex, opposite_template, EDGE, VERT,
};

/// Vertex → cell adjacency in compressed form.
#[derive(Clone, Debug, Default)]
pub struct VertexCells {
    pub offsets: Vec<usize>,
    pub cells: Vec<usize>,
}

impl VertexCells {
    /// Cells around vertex `v`.
    #[inline]
    pub fn of(&self, v: usize) -> &[usize] {
        &self.cells[self.offsets[v]..self.offsets[v + 1]]
    }
}

/// Triangle or tetrahedron mesh with flat connectivity arrays.
#[derive(Clone, Debug)]
pub struct SimplexMesh<C: Communicator = NoComm> {
    dim: usize,
    coords: Vec<f64>,
    cell_verts: Vec<usize>,
    metrics: Option<Vec<f64>>,
    vertex_globals: Vec<u64>,
    comm: C,
    edge_verts: Vec<usize>,
    edge_cell_offsets: Vec<usize>,
    edge_cell_cells: Vec<usize>,
    edge_cell_codes: Vec<Code>,
    vert_owned: Vec<bool>,
    edge_owned: Vec<bool>,
    cell_owned: Vec<bool>,
    vert_shared: Vec<bool>,
    edge_shared: Vec<bool>,
    boundary_verts: Vec<bool>,
}

impl SimplexMesh<NoComm> {
    /// Serial mesh; vertex global ids are the local indices.
    pub fn new(dim: usize, coords: Vec<f64>, cells: Vec<usize>) -> Result<Self, MeshAdaptError> {
        if dim == 0 {
            return Err(MeshAdaptError::UnsupportedDimension(dim));
        }
        let nverts = coords.len() / dim;
        Self::with_comm(NoComm, dim, coords, cells, (0..nverts as u64).collect())
    }
}

impl<C: Communicator> SimplexMesh<C> {
    /// One rank's piece of a distributed mesh. Collective over `comm`.
    pub fn with_comm(
        comm: C,
        dim: usize,
        coords: Vec<f64>,
        cells: Vec<usize>,
        vertex_globals: Vec<u64>,
    ) -> Result<Self, MeshAdaptError> {
        check_connectivity(dim, &coords, &cells, &vertex_globals)?;
        let mut mesh = Self {
            dim,
            coords,
            cell_verts: cells,
            metrics: None,
            vertex_globals,
            comm,
            edge_verts: Vec::new(),
            edge_cell_offsets: vec![0],
            edge_cell_cells: Vec::new(),
            edge_cell_codes: Vec::new(),
            vert_owned: Vec::new(),
            edge_owned: Vec::new(),
            cell_owned: Vec::new(),
            vert_shared: Vec::new(),
            edge_shared: Vec::new(),
            boundary_verts: Vec::new(),
        };
        mesh.rebuild()?;
        Ok(mesh)
    }

    pub fn nverts(&self) -> usize {
        self.coords.len() / self.dim
    }

    pub fn nedges(&self) -> usize {
        self.edge_verts.len() / 2
    }

    pub fn ncells(&self) -> usize {
        self.cell_verts.len() / nverts_of_simplex(self.dim)
    }

    /// Vertices of cell `c`.
    #[inline]
    pub fn cell(&self, c: usize) -> &[usize] {
        let nv = nverts_of_simplex(self.dim);
        &self.cell_verts[c * nv..(c + 1) * nv]
    }

    /// Endpoints of edge `e`, ordered by global id.
    #[inline]
    pub fn edge(&self, e: usize) -> [usize; 2] {
        [self.edge_verts[2 * e], self.edge_verts[2 * e + 1]]
    }

    /// Index of the edge joining `a` and `b`, if it exists.
    pub fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        (0..self.nedges()).find(|&e| {
            let [x, y] = self.edge(e);
            (x == a && y == b) || (x == b && y == a)
        })
    }

    /// Attach per-vertex metric tensors (compact symmetric storage).
    pub fn set_metrics(&mut self, metrics: Vec<f64>) -> Result<(), MeshAdaptError> {
        let expected = self.nverts() * symm_ncomps(self.dim);
        if metrics.len() != expected {
            return Err(MeshAdaptError::FieldLength {
                name: "metric",
                expected,
                found: metrics.len(),
            });
        }
        self.metrics = Some(metrics);
        Ok(())
    }

    /// Attach isotropic metrics asking for edges of length `sizes[v]` near `v`.
    pub fn set_isotropic_size(&mut self, sizes: &[f64]) -> Result<(), MeshAdaptError> {
        if sizes.len() != self.nverts() {
            return Err(MeshAdaptError::FieldLength {
                name: "size",
                expected: self.nverts(),
                found: sizes.len(),
            });
        }
        let mut data = vec![0.0; sizes.len() * symm_ncomps(self.dim)];
        for (v, &h) in sizes.iter().enumerate() {
            match self.dim {
                2 => put_symm(&mut data, v, &isotropic_metric::<2>(h)),
                _ => put_symm(&mut data, v, &isotropic_metric::<3>(h)),
            }
        }
        self.set_metrics(data)
    }

    /// Drop the metric field; quality and length fall back to Euclidean.
    pub fn clear_metrics(&mut self) {
        self.metrics = None;
    }

    /// Whether vertex `v` lies on the boundary of this rank's piece.
    pub fn is_boundary_vertex(&self, v: usize) -> bool {
        self.boundary_verts[v]
    }

    /// Whether vertex `v` is also held by another rank.
    pub fn is_shared_vertex(&self, v: usize) -> bool {
        self.vert_shared[v]
    }

    /// Whether edge `e` is also held by another rank.
    pub fn is_shared_edge(&self, e: usize) -> bool {
        self.edge_shared[e]
    }

    /// Vertex → cell adjacency, computed on demand.
    pub fn ask_vertex_cells(&self) -> VertexCells {
        let nv = nverts_of_simplex(self.dim);
        let mut offsets = vec![0usize; self.nverts() + 1];
        for &v in &self.cell_verts {
            offsets[v + 1] += 1;
        }
        for i in 0..self.nverts() {
            offsets[i + 1] += offsets[i];
        }
        let mut fill = offsets.clone();
        let mut cells = vec![0usize; self.cell_verts.len()];
        for (i, &v) in self.cell_verts.iter().enumerate() {
            cells[fill[v]] = i / nv;
            fill[v] += 1;
        }
        VertexCells { offsets, cells }
    }

    /// Replace the whole local topology and fields. Collective.
    pub fn replace(
        &mut self,
        coords: Vec<f64>,
        cells: Vec<usize>,
        metrics: Option<Vec<f64>>,
        vertex_globals: Vec<u64>,
    ) -> Result<(), MeshAdaptError> {
        check_connectivity(self.dim, &coords, &cells, &vertex_globals)?;
        if let Some(m) = &metrics {
            let expected = (coords.len() / self.dim) * symm_ncomps(self.dim);
            if m.len() != expected {
                return Err(MeshAdaptError::FieldLength {
                    name: "metric",
                    expected,
                    found: m.len(),
                });
            }
        }
        self.coords = coords;
        self.cell_verts = cells;
        self.metrics = metrics;
        self.vertex_globals = vertex_globals;
        self.rebuild()
    }

    /// Owned copies of the raw arrays, for operators that rewrite topology.
    pub(crate) fn raw_parts(&self) -> (Vec<f64>, Vec<usize>, Option<Vec<f64>>, Vec<u64>) {
        (
            self.coords.clone(),
            self.cell_verts.clone(),
            self.metrics.clone(),
            self.vertex_globals.clone(),
        )
    }

    fn rebuild(&mut self) -> Result<(), MeshAdaptError> {
        let dim = self.dim;
        let nv = nverts_of_simplex(dim);
        let ncells = self.ncells();
        let nverts = self.nverts();
        let globals = &self.vertex_globals;
        let ce_per_cell = ndown_of_simplex(dim, EDGE);

        let mut edge_ids: HashMap<(usize, usize), usize> = HashMap::with_capacity(ncells * ce_per_cell);
        let mut edge_verts: Vec<usize> = Vec::new();
        let mut uses: Vec<(usize, usize, Code)> = Vec::with_capacity(ncells * ce_per_cell);
        for c in 0..ncells {
            let cv = &self.cell_verts[c * nv..(c + 1) * nv];
            for ce in 0..ce_per_cell {
                let a = cv[down_template(dim, EDGE, ce, 0)];
                let b = cv[down_template(dim, EDGE, ce, 1)];
                let (lo, hi) = if (globals[a], a) <= (globals[b], b) { (a, b) } else { (b, a) };
                let e = *edge_ids.entry((lo, hi)).or_insert_with(|| {
                    edge_verts.extend([lo, hi]);
                    edge_verts.len() / 2 - 1
                });
                let rotation = u8::from(a != lo);
                uses.push((e, c, make_code(false, rotation, ce as u8)));
            }
        }
        let nedges = edge_verts.len() / 2;

        let mut offsets = vec![0usize; nedges + 1];
        for &(e, _, _) in &uses {
            offsets[e + 1] += 1;
        }
        for e in 0..nedges {
            offsets[e + 1] += offsets[e];
        }
        let mut fill = offsets.clone();
        let mut up_cells = vec![0usize; uses.len()];
        let mut up_codes = vec![0 as Code; uses.len()];
        for (e, c, code) in uses {
            up_cells[fill[e]] = c;
            up_codes[fill[e]] = code;
            fill[e] += 1;
        }

        // sides with a single cell bound this piece
        let mut side_count: HashMap<[usize; 3], u32> = HashMap::with_capacity(ncells * nv);
        for c in 0..ncells {
            let cv = &self.cell_verts[c * nv..(c + 1) * nv];
            for v in 0..nv {
                let side = opposite_template(dim, v);
                let mut key = [usize::MAX; 3];
                for (k, slot) in key.iter_mut().take(dim).enumerate() {
                    *slot = cv[down_template(dim, dim - 1, side, k)];
                }
                key[..dim].sort_unstable();
                *side_count.entry(key).or_insert(0) += 1;
            }
        }
        let mut boundary_verts = vec![false; nverts];
        for (key, count) in &side_count {
            if *count == 1 {
                for &v in &key[..dim] {
                    boundary_verts[v] = true;
                }
            }
        }

        let vert_keys: Vec<EntityKey> = globals.iter().map(|&g| [g, g]).collect();
        let edge_keys: Vec<EntityKey> = (0..nedges)
            .map(|e| [globals[edge_verts[2 * e]], globals[edge_verts[2 * e + 1]]])
            .collect();
        let me = self.comm.rank();
        let vert_own = resolve_ownership(&self.comm, &vert_keys)?;
        let edge_own = resolve_ownership(&self.comm, &edge_keys)?;

        self.vert_owned = vert_own.iter().map(|&(o, _)| o == me).collect();
        self.vert_shared = vert_own.iter().map(|&(_, s)| s).collect();
        self.edge_owned = edge_own.iter().map(|&(o, _)| o == me).collect();
        self.edge_shared = edge_own.iter().map(|&(_, s)| s).collect();
        self.cell_owned = vec![true; ncells];
        self.edge_verts = edge_verts;
        self.edge_cell_offsets = offsets;
        self.edge_cell_cells = up_cells;
        self.edge_cell_codes = up_codes;
        self.boundary_verts = boundary_verts;
        log::trace!(
            "rebuilt mesh piece on rank {me}: {nverts} vertices, {nedges} edges, {ncells} cells"
        );
        Ok(())
    }
}

fn check_connectivity(
    dim: usize,
    coords: &[f64],
    cells: &[usize],
    vertex_globals: &[u64],
) -> Result<(), MeshAdaptError> {
    if dim != 2 && dim != 3 {
        return Err(MeshAdaptError::UnsupportedDimension(dim));
    }
    if coords.len() % dim != 0 {
        return Err(MeshAdaptError::ConnectivityLength {
            len: coords.len(),
            per_entity: dim,
        });
    }
    let nv = nverts_of_simplex(dim);
    if cells.len() % nv != 0 {
        return Err(MeshAdaptError::ConnectivityLength {
            len: cells.len(),
            per_entity: nv,
        });
    }
    let nverts = coords.len() / dim;
    if vertex_globals.len() != nverts {
        return Err(MeshAdaptError::FieldLength {
            name: "vertex global ids",
            expected: nverts,
            found: vertex_globals.len(),
        });
    }
    if let Some(i) = cells.iter().position(|&v| v >= nverts) {
        return Err(MeshAdaptError::VertexOutOfRange {
            cell: i / nv,
            vertex: cells[i],
            nverts,
        });
    }
    Ok(())
}

impl<C: Communicator> AdaptMesh for SimplexMesh<C> {
    type Comm = C;

    fn dim(&self) -> usize {
        self.dim
    }

    fn nents(&self, ent_dim: usize) -> usize {
        match ent_dim {
            VERT => self.nverts(),
            EDGE => self.nedges(),
            d if d == self.dim => self.ncells(),
            _ => 0,
        }
    }

    fn coords(&self) -> &[f64] {
        &self.coords
    }

    fn vertex_metrics(&self) -> Option<&[f64]> {
        self.metrics.as_deref()
    }

    fn ask_edge_verts(&self) -> &[usize] {
        &self.edge_verts
    }

    fn ask_cell_verts(&self) -> &[usize] {
        &self.cell_verts
    }

    fn ask_edge_cells(&self) -> UpAdjacency<'_> {
        UpAdjacency {
            offsets: &self.edge_cell_offsets,
            cells: &self.edge_cell_cells,
            codes: &self.edge_cell_codes,
        }
    }

    fn owned(&self, ent_dim: usize) -> &[bool] {
        match ent_dim {
            VERT => &self.vert_owned,
            EDGE => &self.edge_owned,
            d if d == self.dim => &self.cell_owned,
            _ => &[],
        }
    }

    fn vertex_globals(&self) -> &[u64] {
        &self.vertex_globals
    }

    fn comm(&self) -> &C {
        &self.comm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::orientation::{code_rotation, code_which_down};

    fn square() -> SimplexMesh {
        SimplexMesh::new(
            2,
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn derives_edges_and_up_adjacency() {
        let mesh = square();
        assert_eq!(mesh.nedges(), 5);
        let up = mesh.ask_edge_cells();
        let diagonal = mesh.find_edge(0, 2).unwrap();
        assert_eq!(up.degree(diagonal), 2);
        let total: usize = (0..mesh.nedges()).map(|e| up.degree(e)).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn codes_locate_edge_endpoints_in_each_cell() {
        let mesh = square();
        let up = mesh.ask_edge_cells();
        for e in 0..mesh.nedges() {
            let ev = mesh.edge(e);
            for i in up.range(e) {
                let cell = mesh.cell(up.cells[i]);
                let ce = code_which_down(up.codes[i]);
                let rot = code_rotation(up.codes[i]);
                for eev in 0..2 {
                    let ccv = down_template(2, EDGE, ce, eev ^ rot);
                    assert_eq!(cell[ccv], ev[eev]);
                }
            }
        }
    }

    #[test]
    fn every_square_vertex_is_on_the_boundary() {
        let mesh = square();
        assert!((0..4).all(|v| mesh.is_boundary_vertex(v)));
        assert!((0..4).all(|v| !mesh.is_shared_vertex(v)));
        assert_eq!(mesh.nglobal_ents(EDGE), 5);
    }

    #[test]
    fn rejects_bad_connectivity() {
        let err = SimplexMesh::new(2, vec![0.0, 0.0, 1.0, 0.0], vec![0, 1, 2]).unwrap_err();
        assert!(matches!(err, MeshAdaptError::VertexOutOfRange { vertex: 2, .. }));
        let err = SimplexMesh::new(4, vec![0.0; 4], vec![]).unwrap_err();
        assert_eq!(err, MeshAdaptError::UnsupportedDimension(4));
        let mut mesh = square();
        assert!(mesh.set_metrics(vec![1.0; 5]).is_err());
    }

    #[test]
    fn clearing_metrics_restores_euclidean_measures() {
        let mut mesh = square();
        let lengths = mesh.ask_lengths();
        let qualities = mesh.ask_qualities();
        mesh.set_isotropic_size(&[0.5; 4]).unwrap();
        assert!(mesh.has_metric());
        assert!((mesh.ask_lengths()[0] - 2.0 * lengths[0]).abs() < 1e-12);
        mesh.clear_metrics();
        assert!(!mesh.has_metric());
        assert_eq!(mesh.ask_lengths(), lengths);
        assert_eq!(mesh.ask_qualities(), qualities);
    }

    #[test]
    fn vertex_cells_cover_every_incidence() {
        let mesh = square();
        let v2c = mesh.ask_vertex_cells();
        assert_eq!(v2c.of(0), &[0, 1]);
        assert_eq!(v2c.of(1), &[0]);
        assert_eq!(v2c.of(3), &[1]);
    }
}
