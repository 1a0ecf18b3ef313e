//! Split edges that are too long at their midpoints.

use itertools::Itertools;

use crate::adapt::options::AdaptOpts;
use crate::adapt::ops::cavity::Rewrite;
use crate::adapt::refine_qualities::predict_split_qualities;
use crate::algs::communicator::Communicator;
use crate::algs::reduction::allocate_global_ids;
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::simplex_mesh::SimplexMesh;

/// Bisect every edge longer than `max_length_desired` whose split keeps the
/// new cells at or above `min_quality_allowed`. Longest edges go first; no
/// two accepted edges share a cell. Collective.
pub fn refine_by_size<C: Communicator>(
    mesh: &mut SimplexMesh<C>,
    opts: &AdaptOpts,
) -> Result<bool, MeshAdaptError> {
    let lengths = mesh.ask_lengths();
    let candidates: Vec<usize> = (0..mesh.nedges())
        .filter(|&e| lengths[e] > opts.max_length_desired && !mesh.is_shared_edge(e))
        .collect();
    let quals = predict_split_qualities(&*mesh, &candidates)?;

    let order = (0..candidates.len())
        .filter(|&i| quals[i] >= opts.min_quality_allowed)
        .sorted_by(|&i, &j| {
            lengths[candidates[j]]
                .total_cmp(&lengths[candidates[i]])
                .then(i.cmp(&j))
        });

    let e2c = mesh.ask_edge_cells();
    let mut cell_taken = vec![false; mesh.ncells()];
    let mut accepted = Vec::new();
    for i in order {
        let e = candidates[i];
        let cells = &e2c.cells[e2c.range(e)];
        if cells.iter().any(|&c| cell_taken[c]) {
            continue;
        }
        for &c in cells {
            cell_taken[c] = true;
        }
        accepted.push(e);
    }
    log::debug!(
        "refine: {} long edges, {} splits on rank {}",
        candidates.len(),
        accepted.len(),
        mesh.comm().rank()
    );

    if !mesh.comm().any(!accepted.is_empty()) {
        return Ok(false);
    }
    let max_gid = mesh.vertex_globals().iter().max().copied();
    let gids = allocate_global_ids(mesh.comm(), max_gid, accepted.len() as u64)?;

    let mut rewrite = Rewrite::new(mesh);
    for (&e, gid) in accepted.iter().zip(gids) {
        let [a, b] = mesh.edge(e);
        let m = rewrite.add_midpoint(a, b, gid);
        for &c in &e2c.cells[e2c.range(e)] {
            let verts = mesh.cell(c);
            rewrite.remove_cell(c);
            rewrite.add_cell(verts.iter().map(|&v| if v == a { m } else { v }));
            rewrite.add_cell(verts.iter().map(|&v| if v == b { m } else { v }));
        }
    }
    rewrite.apply(mesh)?;
    Ok(true)
}
