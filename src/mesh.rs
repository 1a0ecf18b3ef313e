//! The mesh collaborator the adaptation core is written against.
//!
//! [`AdaptMesh`] is deliberately narrow: connectivity as flat arrays, one
//! upward adjacency (edge → cell) with orientation codes, coordinates, an
//! optional per-vertex metric, ownership flags and a communicator. Everything
//! the controller and the quality evaluator need beyond that (qualities,
//! lengths, global statistics, duplicate reconciliation) is provided on top.
//!
//! Methods documented as *collective* must be called by every rank of
//! [`AdaptMesh::comm`] in the same order.

use std::ops::Range;

use crate::algs::communicator::Communicator;
use crate::algs::parallel::map_chunks;
use crate::algs::reduction::{self, EntityKey};
use crate::geometry::quality::{edge_length, element_quality};
use crate::mesh_error::MeshAdaptError;
use crate::topology::orientation::Code;
use crate::topology::templates::{EDGE, VERT};

/// Compressed upward adjacency: the cells around entity `i` are
/// `cells[offsets[i]..offsets[i + 1]]`, with one orientation code per incidence.
#[derive(Clone, Copy, Debug)]
pub struct UpAdjacency<'a> {
    pub offsets: &'a [usize],
    pub cells: &'a [usize],
    pub codes: &'a [Code],
}

impl UpAdjacency<'_> {
    /// Incidence range of entity `i`.
    #[inline]
    pub fn range(&self, i: usize) -> Range<usize> {
        self.offsets[i]..self.offsets[i + 1]
    }

    /// Number of cells around entity `i`.
    #[inline]
    pub fn degree(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }
}

/// Read access to a (possibly distributed) simplicial mesh.
pub trait AdaptMesh {
    type Comm: Communicator;

    /// Cell dimension: 2 (triangles) or 3 (tetrahedra).
    fn dim(&self) -> usize;
    /// Number of local entities of dimension `ent_dim`.
    fn nents(&self, ent_dim: usize) -> usize;
    /// Vertex coordinates, `dim` reals per vertex.
    fn coords(&self) -> &[f64];
    /// Per-vertex metric tensors in compact symmetric storage, if present.
    fn vertex_metrics(&self) -> Option<&[f64]>;
    /// Edge → vertex connectivity, two per edge.
    fn ask_edge_verts(&self) -> &[usize];
    /// Cell → vertex connectivity, `dim + 1` per cell, positively oriented.
    fn ask_cell_verts(&self) -> &[usize];
    /// Edge → cell adjacency with per-incidence orientation codes.
    fn ask_edge_cells(&self) -> UpAdjacency<'_>;
    /// Whether this rank owns each entity of dimension `ent_dim`.
    fn owned(&self, ent_dim: usize) -> &[bool];
    /// Global id of each local vertex.
    fn vertex_globals(&self) -> &[u64];
    /// Communicator spanning every rank holding a piece of the mesh.
    fn comm(&self) -> &Self::Comm;

    fn has_metric(&self) -> bool {
        self.vertex_metrics().is_some()
    }

    /// Shape quality of every local cell.
    fn ask_qualities(&self) -> Vec<f64> {
        let dim = self.dim();
        let coords = self.coords();
        let metrics = self.vertex_metrics();
        map_chunks(self.ask_cell_verts(), dim + 1, |verts| {
            element_quality(dim, coords, metrics, verts)
        })
    }

    /// Length of every local edge (in the metric when one is present).
    fn ask_lengths(&self) -> Vec<f64> {
        let dim = self.dim();
        let coords = self.coords();
        let metrics = self.vertex_metrics();
        map_chunks(self.ask_edge_verts(), 2, |ev| {
            edge_length(dim, coords, metrics, ev[0], ev[1])
        })
    }

    /// Rank-independent identity of edge `e`.
    fn edge_key(&self, e: usize) -> EntityKey {
        let ev2v = self.ask_edge_verts();
        let globals = self.vertex_globals();
        let (a, b) = (globals[ev2v[2 * e]], globals[ev2v[2 * e + 1]]);
        [a.min(b), a.max(b)]
    }

    /// Worst cell quality over the whole distributed mesh. Collective.
    fn min_quality(&self) -> f64 {
        reduction::global_min(self.comm(), &self.ask_qualities())
    }

    /// Global minimum of a per-entity field. Collective.
    fn global_min(&self, values: &[f64]) -> f64 {
        reduction::global_min(self.comm(), values)
    }

    /// Global maximum of a per-entity field. Collective.
    fn global_max(&self, values: &[f64]) -> f64 {
        reduction::global_max(self.comm(), values)
    }

    /// Number of distinct entities of dimension `ent_dim` across all ranks. Collective.
    fn nglobal_ents(&self, ent_dim: usize) -> u64 {
        let owned = self.owned(ent_dim);
        let all = vec![true; owned.len()];
        reduction::count_owned_marks(self.comm(), owned, &all)
    }

    /// Number of distinct marked entities across all ranks. Collective.
    fn count_owned_marks(&self, ent_dim: usize, marks: &[bool]) -> u64 {
        reduction::count_owned_marks(self.comm(), self.owned(ent_dim), marks)
    }

    /// Reconcile per-candidate values computed on the subset `subset` of the
    /// entities of dimension `ent_dim`: each value becomes the maximum over
    /// every rank holding the same entity; `default` stands for "no data".
    /// Collective.
    fn sync_subset_max(
        &self,
        ent_dim: usize,
        values: &[f64],
        subset: &[usize],
        default: f64,
    ) -> Result<Vec<f64>, MeshAdaptError> {
        if values.len() != subset.len() {
            return Err(MeshAdaptError::FieldLength {
                name: "subset values",
                expected: subset.len(),
                found: values.len(),
            });
        }
        let keys: Vec<EntityKey> = match ent_dim {
            VERT => {
                let globals = self.vertex_globals();
                subset.iter().map(|&v| [globals[v], globals[v]]).collect()
            }
            EDGE => subset.iter().map(|&e| self.edge_key(e)).collect(),
            d => return Err(MeshAdaptError::InvalidEntityDimension(d)),
        };
        reduction::sync_keyed_max(self.comm(), &keys, values, default)
    }
}
