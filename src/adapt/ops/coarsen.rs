//! Collapse edges that are too short.

use crate::adapt::options::AdaptOpts;
use crate::adapt::ops::cavity::{best_collapse, stage_collapse, Rewrite, VertexLocks};
use crate::algs::communicator::Communicator;
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::simplex_mesh::SimplexMesh;

/// Collapse edges shorter than `min_length_desired`, shortest first.
///
/// A collapse removes one interior, unshared endpoint; it is accepted when
/// every moved cell stays at or above `min_quality_allowed` and no edge longer
/// than `max_length_desired` appears. Collective.
pub fn coarsen_by_size<C: Communicator>(
    mesh: &mut SimplexMesh<C>,
    opts: &AdaptOpts,
) -> Result<bool, MeshAdaptError> {
    let lengths = mesh.ask_lengths();
    let qualities = mesh.ask_qualities();
    let mut candidates: Vec<usize> = (0..mesh.nedges())
        .filter(|&e| lengths[e] < opts.min_length_desired && !mesh.is_shared_edge(e))
        .collect();
    candidates.sort_by(|&a, &b| lengths[a].total_cmp(&lengths[b]).then(a.cmp(&b)));

    let v2c = mesh.ask_vertex_cells();
    let mut locks = VertexLocks::new(mesh.nverts());
    let mut accepted = Vec::new();
    for &e in &candidates {
        let collapse = best_collapse(mesh, &v2c, &qualities, mesh.edge(e), |c| {
            c.quality >= opts.min_quality_allowed && c.max_length <= opts.max_length_desired
        });
        if let Some(collapse) = collapse {
            if locks.try_lock(mesh, &v2c, collapse.remove) {
                accepted.push(collapse);
            }
        }
    }
    log::debug!(
        "coarsen: {} short edges, {} collapses on rank {}",
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
