//! Bookkeeping shared by the bundled operators: staged topology rewrites,
//! edge-collapse evaluation and cavity independence.

use hashbrown::HashSet;

use crate::algs::communicator::Communicator;
use crate::geometry::metric::symm_ncomps;
use crate::geometry::quality::{edge_length, element_quality, element_size};
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::simplex_mesh::{SimplexMesh, VertexCells};
use crate::topology::templates::nverts_of_simplex;

/// Staged edits against a snapshot of a [`SimplexMesh`], applied at once.
pub(crate) struct Rewrite {
    dim: usize,
    coords: Vec<f64>,
    cells: Vec<usize>,
    metrics: Option<Vec<f64>>,
    globals: Vec<u64>,
    removed: Vec<bool>,
    added: Vec<usize>,
}

impl Rewrite {
    pub(crate) fn new<C: Communicator>(mesh: &SimplexMesh<C>) -> Self {
        let (coords, cells, metrics, globals) = mesh.raw_parts();
        Self {
            dim: mesh.dim(),
            coords,
            cells,
            metrics,
            globals,
            removed: vec![false; mesh.ncells()],
            added: Vec::new(),
        }
    }

    /// Append the midpoint of `(a, b)` with global id `gid`; its metric is the
    /// average of the endpoint metrics.
    pub(crate) fn add_midpoint(&mut self, a: usize, b: usize, gid: u64) -> usize {
        let dim = self.dim;
        let id = self.coords.len() / dim;
        for k in 0..dim {
            let x = 0.5 * (self.coords[a * dim + k] + self.coords[b * dim + k]);
            self.coords.push(x);
        }
        if let Some(metrics) = &mut self.metrics {
            let n = symm_ncomps(dim);
            for k in 0..n {
                let m = 0.5 * (metrics[a * n + k] + metrics[b * n + k]);
                metrics.push(m);
            }
        }
        self.globals.push(gid);
        id
    }

    pub(crate) fn remove_cell(&mut self, c: usize) {
        self.removed[c] = true;
    }

    pub(crate) fn add_cell(&mut self, verts: impl IntoIterator<Item = usize>) {
        self.added.extend(verts);
    }

    /// Substitute `to` for `from` in cell `c`.
    pub(crate) fn replace_vertex(&mut self, c: usize, from: usize, to: usize) {
        let nv = nverts_of_simplex(self.dim);
        for v in &mut self.cells[c * nv..(c + 1) * nv] {
            if *v == from {
                *v = to;
            }
        }
    }

    /// Drop removed cells and orphaned vertices, then rebuild `mesh`.
    /// Collective: every rank calls it once a change happened anywhere.
    pub(crate) fn apply<C: Communicator>(self, mesh: &mut SimplexMesh<C>) -> Result<(), MeshAdaptError> {
        let dim = self.dim;
        let nv = nverts_of_simplex(dim);
        let mut cells: Vec<usize> = self
            .cells
            .chunks(nv)
            .zip(&self.removed)
            .filter(|&(_, &gone)| !gone)
            .flat_map(|(c, _)| c.iter().copied())
            .collect();
        cells.extend_from_slice(&self.added);

        let nverts = self.coords.len() / dim;
        let mut new_id = vec![usize::MAX; nverts];
        for &v in &cells {
            new_id[v] = 0;
        }
        let mut next = 0;
        for id in new_id.iter_mut().filter(|id| **id == 0) {
            *id = next;
            next += 1;
        }
        for v in &mut cells {
            *v = new_id[*v];
        }
        let kept = |v: &usize| new_id[*v] != usize::MAX;
        let coords: Vec<f64> = (0..nverts)
            .filter(kept)
            .flat_map(|v| self.coords[v * dim..(v + 1) * dim].iter().copied())
            .collect();
        let metrics = self.metrics.map(|m| {
            let n = symm_ncomps(dim);
            (0..nverts)
                .filter(kept)
                .flat_map(|v| m[v * n..(v + 1) * n].to_vec())
                .collect()
        });
        let globals = (0..nverts).filter(kept).map(|v| self.globals[v]).collect();
        mesh.replace(coords, cells, metrics, globals)
    }
}

/// Outcome of collapsing vertex `remove` onto vertex `keep`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Collapse {
    pub remove: usize,
    pub keep: usize,
    /// Worst quality among the cells that survive, moved.
    pub quality: f64,
    /// Worst quality among the cells around `remove` before the collapse.
    pub cavity_quality: f64,
    /// Longest edge ending at `keep` after the collapse.
    pub max_length: f64,
}

fn sorted_key(verts: &[usize]) -> [usize; 4] {
    let mut key = [usize::MAX; 4];
    key[..verts.len()].copy_from_slice(verts);
    key[..verts.len()].sort_unstable();
    key
}

/// Evaluate collapsing `remove` onto its neighbour `keep`.
///
/// `None` when `remove` is on the boundary or shared with another rank, when
/// the two are not adjacent, or when a moved cell would be inverted,
/// degenerate, or a duplicate of an existing cell.
pub(crate) fn evaluate_collapse<C: Communicator>(
    mesh: &SimplexMesh<C>,
    v2c: &VertexCells,
    qualities: &[f64],
    remove: usize,
    keep: usize,
) -> Option<Collapse> {
    if mesh.is_boundary_vertex(remove) || mesh.is_shared_vertex(remove) {
        return None;
    }
    let dim = mesh.dim();
    let coords = mesh.coords();
    let metrics = mesh.vertex_metrics();

    let mut existing: HashSet<[usize; 4]> = v2c
        .of(keep)
        .iter()
        .map(|&c| mesh.cell(c))
        .filter(|verts| !verts.contains(&remove))
        .map(sorted_key)
        .collect();

    let mut collapsed_any = false;
    let mut quality = f64::INFINITY;
    let mut cavity_quality = f64::INFINITY;
    let mut max_length: f64 = 0.0;
    let mut moved = [0usize; 4];
    for &c in v2c.of(remove) {
        cavity_quality = cavity_quality.min(qualities[c]);
        let verts = mesh.cell(c);
        if verts.contains(&keep) {
            collapsed_any = true;
            continue;
        }
        let moved = &mut moved[..verts.len()];
        for (slot, &v) in moved.iter_mut().zip(verts) {
            *slot = if v == remove { keep } else { v };
        }
        if element_size(dim, coords, moved) <= 0.0 {
            return None;
        }
        if !existing.insert(sorted_key(moved)) {
            return None;
        }
        quality = quality.min(element_quality(dim, coords, metrics, moved));
        for &v in moved.iter().filter(|&&v| v != keep) {
            max_length = max_length.max(edge_length(dim, coords, metrics, keep, v));
        }
    }
    if !collapsed_any {
        return None;
    }
    Some(Collapse {
        remove,
        keep,
        quality,
        cavity_quality,
        max_length,
    })
}

/// The better of the two collapse directions of edge `(a, b)` passing `accept`.
pub(crate) fn best_collapse<C: Communicator>(
    mesh: &SimplexMesh<C>,
    v2c: &VertexCells,
    qualities: &[f64],
    [a, b]: [usize; 2],
    accept: impl Fn(&Collapse) -> bool,
) -> Option<Collapse> {
    [(a, b), (b, a)]
        .into_iter()
        .filter_map(|(remove, keep)| evaluate_collapse(mesh, v2c, qualities, remove, keep))
        .filter(|c| accept(c))
        .max_by(|x, y| x.quality.total_cmp(&y.quality))
}

/// Stage an accepted collapse: cells holding both ends vanish, the others
/// have `remove` replaced by `keep`.
pub(crate) fn stage_collapse<C: Communicator>(
    mesh: &SimplexMesh<C>,
    v2c: &VertexCells,
    rewrite: &mut Rewrite,
    collapse: &Collapse,
) {
    for &c in v2c.of(collapse.remove) {
        if mesh.cell(c).contains(&collapse.keep) {
            rewrite.remove_cell(c);
        } else {
            rewrite.replace_vertex(c, collapse.remove, collapse.keep);
        }
    }
}

/// Vertex locks keeping the cavities of accepted collapses apart.
pub(crate) struct VertexLocks {
    locked: Vec<bool>,
}

impl VertexLocks {
    pub(crate) fn new(nverts: usize) -> Self {
        Self {
            locked: vec![false; nverts],
        }
    }

    /// Lock every vertex of the cells around `v` unless one is already locked.
    pub(crate) fn try_lock<C: Communicator>(
        &mut self,
        mesh: &SimplexMesh<C>,
        v2c: &VertexCells,
        v: usize,
    ) -> bool {
        let cells = v2c.of(v);
        if cells.iter().any(|&c| mesh.cell(c).iter().any(|&u| self.locked[u])) {
            return false;
        }
        for &c in cells {
            for &u in mesh.cell(c) {
                self.locked[u] = true;
            }
        }
        true
    }
}
