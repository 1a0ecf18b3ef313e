//! Edge swaps around poorly shaped cells.
//!
//! In 2D an interior edge shared by two triangles is replaced by the other
//! diagonal of their quadrilateral. In 3D an interior edge surrounded by a
//! ring of exactly three tetrahedra is removed, replacing them by the two
//! tetrahedra on either side of the ring's triangle (3 → 2).

use crate::adapt::options::AdaptOpts;
use crate::adapt::ops::cavity::Rewrite;
use crate::algs::communicator::Communicator;
use crate::geometry::quality::{element_quality, element_size};
use crate::mesh::{AdaptMesh, UpAdjacency};
use crate::mesh_error::MeshAdaptError;
use crate::topology::simplex_mesh::{SimplexMesh, VertexCells};
use crate::topology::templates::TRI;

struct SwapPlan {
    old_cells: Vec<usize>,
    new_cells: Vec<[usize; 4]>,
}

fn new_quality<C: Communicator>(mesh: &SimplexMesh<C>, verts: &[usize]) -> Option<f64> {
    let (dim, coords) = (mesh.dim(), mesh.coords());
    if element_size(dim, coords, verts) <= 0.0 {
        return None;
    }
    Some(element_quality(dim, coords, mesh.vertex_metrics(), verts))
}

fn adjacent(mesh: &SimplexMesh<impl Communicator>, v2c: &VertexCells, a: usize, b: usize) -> bool {
    v2c.of(a).iter().any(|&c| mesh.cell(c).contains(&b))
}

fn plan_2d<C: Communicator>(
    mesh: &SimplexMesh<C>,
    e2c: &UpAdjacency<'_>,
    v2c: &VertexCells,
    e: usize,
) -> Option<SwapPlan> {
    if e2c.degree(e) != 2 {
        return None;
    }
    let [ea, eb] = mesh.edge(e);
    let r = e2c.range(e);
    let (c1, c2) = (e2c.cells[r.start], e2c.cells[r.start + 1]);
    let t1 = mesh.cell(c1);
    let ip = t1.iter().position(|&v| v != ea && v != eb)?;
    // counter-clockwise: p, a, b
    let (p, a, b) = (t1[ip], t1[(ip + 1) % 3], t1[(ip + 2) % 3]);
    let q = *mesh.cell(c2).iter().find(|&&v| v != a && v != b)?;
    if adjacent(mesh, v2c, p, q) {
        return None;
    }
    Some(SwapPlan {
        old_cells: vec![c1, c2],
        new_cells: vec![[a, q, p, usize::MAX], [q, b, p, usize::MAX]],
    })
}

fn plan_3d<C: Communicator>(
    mesh: &SimplexMesh<C>,
    e2c: &UpAdjacency<'_>,
    v2c: &VertexCells,
    e: usize,
) -> Option<SwapPlan> {
    if e2c.degree(e) != 3 {
        return None;
    }
    let [a, b] = mesh.edge(e);
    let ring: Vec<usize> = e2c.cells[e2c.range(e)].to_vec();
    let mut others: Vec<usize> = ring
        .iter()
        .flat_map(|&c| mesh.cell(c).iter().copied())
        .filter(|&v| v != a && v != b)
        .collect();
    others.sort_unstable();
    // a closed ring names each of its three vertices twice
    if others.len() != 6 || others.chunks(2).any(|pair| pair[0] != pair[1]) {
        return None;
    }
    let (x, y, z) = (others[0], others[2], others[4]);
    if x == y || y == z {
        return None;
    }
    // the triangle must not already bound another cell
    let face_taken = v2c
        .of(x)
        .iter()
        .filter(|&&c| !ring.contains(&c))
        .any(|&c| {
            let verts = mesh.cell(c);
            verts.contains(&y) && verts.contains(&z)
        });
    if face_taken {
        return None;
    }
    let mut top = [x, y, z, b];
    if element_size(mesh.dim(), mesh.coords(), &top) < 0.0 {
        top.swap(0, 1);
    }
    let bottom = [top[1], top[0], top[2], a];
    Some(SwapPlan {
        old_cells: ring,
        new_cells: vec![top, bottom],
    })
}

/// Swap edges of cells below `min_quality_desired` when the swap strictly
/// raises the worst quality of the affected cells. Worst cells go first; no
/// two swaps share a cell. Collective.
pub fn swap_edges<C: Communicator>(
    mesh: &mut SimplexMesh<C>,
    opts: &AdaptOpts,
) -> Result<bool, MeshAdaptError> {
    let dim = mesh.dim();
    let nv = dim + 1;
    let qualities = mesh.ask_qualities();
    let e2c = mesh.ask_edge_cells();

    let mut worst = vec![f64::INFINITY; mesh.nedges()];
    for e in 0..mesh.nedges() {
        for &c in &e2c.cells[e2c.range(e)] {
            worst[e] = worst[e].min(qualities[c]);
        }
    }
    let mut candidates: Vec<usize> = (0..mesh.nedges())
        .filter(|&e| worst[e] < opts.min_quality_desired && !mesh.is_shared_edge(e))
        .collect();
    candidates.sort_by(|&a, &b| worst[a].total_cmp(&worst[b]).then(a.cmp(&b)));

    let v2c = mesh.ask_vertex_cells();
    let mut cell_taken = vec![false; mesh.ncells()];
    let mut accepted: Vec<SwapPlan> = Vec::new();
    for &e in &candidates {
        let plan = match dim {
            TRI => plan_2d(mesh, &e2c, &v2c, e),
            _ => plan_3d(mesh, &e2c, &v2c, e),
        };
        let Some(plan) = plan else { continue };
        if plan.old_cells.iter().any(|&c| cell_taken[c]) {
            continue;
        }
        let old = plan
            .old_cells
            .iter()
            .map(|&c| qualities[c])
            .fold(f64::INFINITY, f64::min);
        let new = plan
            .new_cells
            .iter()
            .map(|verts| new_quality(mesh, &verts[..nv]))
            .try_fold(f64::INFINITY, |acc, q| q.map(|q| acc.min(q)));
        match new {
            Some(new) if new > old => {
                for &c in &plan.old_cells {
                    cell_taken[c] = true;
                }
                accepted.push(plan);
            }
            _ => {}
        }
    }
    log::debug!(
        "swap: {} candidate edges, {} swaps on rank {}",
        candidates.len(),
        accepted.len(),
        mesh.comm().rank()
    );

    if !mesh.comm().any(!accepted.is_empty()) {
        return Ok(false);
    }
    let mut rewrite = Rewrite::new(mesh);
    for plan in &accepted {
        for &c in &plan.old_cells {
            rewrite.remove_cell(c);
        }
        for verts in &plan.new_cells {
            rewrite.add_cell(verts[..nv].iter().copied());
        }
    }
    rewrite.apply(mesh)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_the_long_diagonal_of_a_kite() {
        // long diagonal 0-2 splits the kite into two obtuse triangles
        let mut mesh = SimplexMesh::new(
            2,
            vec![0.0, 0.0, 2.0, -0.4, 4.0, 0.0, 2.0, 0.4],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        let before = mesh.min_quality();
        let opts = AdaptOpts::new(2).unwrap();
        assert!(swap_edges(&mut mesh, &opts).unwrap());
        assert_eq!(mesh.ncells(), 2);
        assert!(mesh.find_edge(1, 3).is_some());
        assert!(mesh.find_edge(0, 2).is_none());
        assert!(mesh.min_quality() > before);
    }

    #[test]
    fn non_convex_quads_are_not_flipped() {
        // the other diagonal 2-3 passes outside the quad, beyond vertex 1
        let mut mesh = SimplexMesh::new(
            2,
            vec![0.0, 0.0, 1.0, 0.0, 3.0, 0.3, 3.0, -0.3],
            vec![0, 1, 2, 1, 0, 3],
        )
        .unwrap();
        let opts = AdaptOpts::new(2).unwrap();
        assert!(mesh.min_quality() < opts.min_quality_desired);
        let before = mesh.ask_cell_verts().to_vec();
        assert!(!swap_edges(&mut mesh, &opts).unwrap());
        assert_eq!(before, mesh.ask_cell_verts());
    }

    #[test]
    fn three_to_two_removes_the_ring_edge() {
        // long axis a-b through the unit triangle x y z
        let s = 3f64.sqrt() / 2.0;
        let coords = vec![
            0.0, 0.0, -3.0, // a
            0.0, 0.0, 3.0, // b
            1.0, 0.0, 0.0, // x
            -0.5, s, 0.0, // y
            -0.5, -s, 0.0, // z
        ];
        let mut cells = Vec::new();
        for (p, q) in [(2, 3), (3, 4), (4, 2)] {
            let mut t = [0usize, 1, p, q];
            let c: Vec<f64> = t.iter().flat_map(|&v| coords[3 * v..3 * v + 3].to_vec()).collect();
            if crate::geometry::quality::element_size(3, &c, &[0, 1, 2, 3]) < 0.0 {
                t.swap(2, 3);
            }
            cells.extend(t);
        }
        let mut mesh = SimplexMesh::new(3, coords, cells).unwrap();
        let before = mesh.min_quality();
        assert!(before < 0.3);
        let opts = AdaptOpts::new(3).unwrap();
        assert!(swap_edges(&mut mesh, &opts).unwrap());
        assert_eq!(mesh.ncells(), 2);
        assert!(mesh.find_edge(0, 1).is_none());
        assert!(mesh.min_quality() > before);
    }
}
