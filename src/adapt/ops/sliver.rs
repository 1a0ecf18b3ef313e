//! Remove slivers by collapsing edges in their neighbourhood.

use crate::adapt::options::AdaptOpts;
use crate::adapt::ops::cavity::{best_collapse, stage_collapse, Rewrite, VertexLocks};
use crate::algs::communicator::Communicator;
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::simplex_mesh::{SimplexMesh, VertexCells};

/// Cells below `floor`, grown by `layers` rings of vertex neighbours.
fn mark_sliver_layers<C: Communicator>(
    mesh: &SimplexMesh<C>,
    v2c: &VertexCells,
    qualities: &[f64],
    floor: f64,
    layers: u32,
) -> Vec<bool> {
    let mut marked: Vec<bool> = qualities.iter().map(|&q| q < floor).collect();
    for _ in 0..layers {
        let mut grown = marked.clone();
        for c in (0..mesh.ncells()).filter(|&c| marked[c]) {
            for &v in mesh.cell(c) {
                for &n in v2c.of(v) {
                    grown[n] = true;
                }
            }
        }
        marked = grown;
    }
    marked
}

/// Collapse edges near cells below `min_quality_desired` when the collapse
/// strictly raises the worst quality around the removed vertex and creates no
/// edge longer than `max_length_allowed`. Collective.
pub fn coarsen_slivers<C: Communicator>(
    mesh: &mut SimplexMesh<C>,
    opts: &AdaptOpts,
) -> Result<bool, MeshAdaptError> {
    let qualities = mesh.ask_qualities();
    let v2c = mesh.ask_vertex_cells();
    let marked = mark_sliver_layers(
        mesh,
        &v2c,
        &qualities,
        opts.min_quality_desired,
        opts.nsliver_layers,
    );

    let e2c = mesh.ask_edge_cells();
    let mut candidates: Vec<(f64, usize)> = (0..mesh.nedges())
        .filter(|&e| !mesh.is_shared_edge(e))
        .filter_map(|e| {
            let cells = &e2c.cells[e2c.range(e)];
            if !cells.iter().any(|&c| marked[c]) {
                return None;
            }
            let worst = cells.iter().map(|&c| qualities[c]).fold(f64::INFINITY, f64::min);
            Some((worst, e))
        })
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut locks = VertexLocks::new(mesh.nverts());
    let mut accepted = Vec::new();
    for &(_, e) in &candidates {
        let collapse = best_collapse(mesh, &v2c, &qualities, mesh.edge(e), |c| {
            c.quality > c.cavity_quality && c.max_length <= opts.max_length_allowed
        });
        if let Some(collapse) = collapse {
            if locks.try_lock(mesh, &v2c, collapse.remove) {
                accepted.push(collapse);
            }
        }
    }
    log::debug!(
        "sliver coarsen: {} candidate edges, {} collapses on rank {}",
        candidates.len(),
        accepted.len(),
        mesh.comm().rank()
    );

    if !mesh.comm().any(!accepted.is_empty()) {
        return Ok(false);
    }
    let mut rewrite = Rewrite::new(mesh);
    for collapse in &accepted {
        stage_collapse(mesh, &v2c, &mut rewrite, collapse);
    }
    rewrite.apply(mesh)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    // centre vertex close to the bottom side flattens the first triangle
    fn flattened_fan() -> SimplexMesh {
        SimplexMesh::new(
            2,
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.5, 0.05],
            vec![0, 1, 4, 1, 2, 4, 2, 3, 4, 3, 0, 4],
        )
        .unwrap()
    }

    #[test]
    fn layers_grow_around_slivers() {
        let mesh = flattened_fan();
        let v2c = mesh.ask_vertex_cells();
        let q = mesh.ask_qualities();
        let none = mark_sliver_layers(&mesh, &v2c, &q, 0.0, 4);
        assert!(none.iter().all(|&m| !m));
        let seeds = mark_sliver_layers(&mesh, &v2c, &q, 0.4, 0);
        assert_eq!(seeds, vec![true, false, false, false]);
        let grown = mark_sliver_layers(&mesh, &v2c, &q, 0.4, 1);
        assert!(grown.iter().all(|&m| m));
    }

    #[test]
    fn collapse_removes_the_flat_cells() {
        let mut mesh = flattened_fan();
        let before = mesh.min_quality();
        let opts = AdaptOpts::new(2).unwrap();
        assert!(before < opts.min_quality_desired);
        assert!(coarsen_slivers(&mut mesh, &opts).unwrap());
        assert_eq!(mesh.nverts(), 4);
        assert!(mesh.min_quality() > before);
    }
}
