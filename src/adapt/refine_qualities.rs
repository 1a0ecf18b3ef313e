//! Predicted quality of candidate edge splits.
//!
//! Splitting edge `e` at its midpoint replaces every cell around `e` by two
//! cells: for each endpoint of `e`, the cell's side opposite that endpoint
//! joined to the midpoint. [`predict_split_qualities`] evaluates the worst of
//! those would-be cells for each candidate without creating any of them.
//!
//! The per-candidate loop is monomorphised on the cell dimension and on the
//! quality measure (Euclidean or metric), both chosen once per call.

use crate::algs::parallel::map_indexed;
use crate::geometry::metric::{
    add, fuse_metrics, get_symm, interpolate_metrics, scale, Matrix, Vector,
};
use crate::geometry::quality::{get_vector, isotropic_quality, metric_quality};
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::orientation::{code_rotation, code_which_down};
use crate::topology::templates::{
    down_template, flip_new_simplex, opposite_template, EDGE, MAX_SIMPLEX_VERTS,
};

/// Value reported for a candidate this rank has no cells around.
pub const NO_DATA: f64 = -1.0;

/// Quality of a new simplex `p`, built from the side vertices `side` and the
/// midpoint of candidate `cand`.
trait SplitMeasure<const D: usize>: Sync {
    fn measure(&self, cand: usize, p: &[Vector<D>], side: &[usize]) -> f64;
}

struct RealMeasure;

impl<const D: usize> SplitMeasure<D> for RealMeasure {
    #[inline]
    fn measure(&self, _cand: usize, p: &[Vector<D>], _side: &[usize]) -> f64 {
        isotropic_quality(p)
    }
}

struct MetricMeasure<'a, const D: usize> {
    vert_metrics: &'a [f64],
    midpoint_metrics: Vec<Matrix<D>>,
}

impl<'a, const D: usize> MetricMeasure<'a, D> {
    fn new(vert_metrics: &'a [f64], ev2v: &[usize], candidates: &[usize]) -> Self {
        let midpoint_metrics = map_indexed(candidates.len(), |cand| {
            let e = candidates[cand];
            let a = get_symm::<D>(vert_metrics, ev2v[2 * e]);
            let b = get_symm::<D>(vert_metrics, ev2v[2 * e + 1]);
            interpolate_metrics(&a, &b, 0.5)
        });
        Self {
            vert_metrics,
            midpoint_metrics,
        }
    }
}

impl<const D: usize> SplitMeasure<D> for MetricMeasure<'_, D> {
    fn measure(&self, cand: usize, p: &[Vector<D>], side: &[usize]) -> f64 {
        let mut ms = [[[0.0; D]; D]; MAX_SIMPLEX_VERTS];
        for (slot, &v) in ms.iter_mut().zip(side) {
            *slot = get_symm::<D>(self.vert_metrics, v);
        }
        ms[D] = self.midpoint_metrics[cand];
        match fuse_metrics(&ms[..=D]) {
            Some(m) => metric_quality(p, &m),
            None => isotropic_quality(p),
        }
    }
}

fn predict_tmpl<M, S, const D: usize>(mesh: &M, candidates: &[usize], measure: &S) -> Vec<f64>
where
    M: AdaptMesh + ?Sized,
    S: SplitMeasure<D>,
{
    let ev2v = mesh.ask_edge_verts();
    let cv2v = mesh.ask_cell_verts();
    let e2c = mesh.ask_edge_cells();
    let coords = mesh.coords();
    map_indexed(candidates.len(), |cand| {
        let e = candidates[cand];
        if e2c.degree(e) == 0 {
            return NO_DATA;
        }
        let ea = get_vector::<D>(coords, ev2v[2 * e]);
        let eb = get_vector::<D>(coords, ev2v[2 * e + 1]);
        let midp = scale(add(ea, eb), 0.5);
        let mut minqual: f64 = 1.0;
        for ec in e2c.range(e) {
            let c = e2c.cells[ec];
            let code = e2c.codes[ec];
            let cce = code_which_down(code);
            let rot = code_rotation(code);
            let ccv2v = &cv2v[c * (D + 1)..(c + 1) * (D + 1)];
            for eev in 0..2 {
                // the stored edge may run against the cell's local order
                let cev = eev ^ rot;
                let ccv = down_template(D, EDGE, cce, cev);
                let ccs = opposite_template(D, ccv);
                let mut csv2v = [0usize; MAX_SIMPLEX_VERTS];
                let mut ncp = [[0.0; D]; MAX_SIMPLEX_VERTS];
                for csv in 0..D {
                    let v2 = ccv2v[down_template(D, D - 1, ccs, csv)];
                    csv2v[csv] = v2;
                    ncp[csv] = get_vector::<D>(coords, v2);
                }
                ncp[D] = midp;
                flip_new_simplex(D, &mut csv2v[..D]);
                flip_new_simplex(D, &mut ncp[..=D]);
                minqual = minqual.min(measure.measure(cand, &ncp[..=D], &csv2v[..D]));
            }
        }
        minqual
    })
}

/// Worst quality among the cells that splitting each candidate edge at its
/// midpoint would create.
///
/// Qualities are measured in the max-determinant fusion of the new cell's
/// metrics (its side vertices plus the interpolated midpoint metric) when the
/// mesh carries a metric, and in Euclidean space otherwise. Each rank sees
/// only its own cells around a candidate; the results are reconciled by taking
/// the maximum over the ranks holding the same edge, with [`NO_DATA`] standing
/// for "no cells here".
///
/// Never modifies the mesh. Collective.
///
/// # Errors
/// [`MeshAdaptError::EntityOutOfRange`] for a candidate that is not an edge of
/// `mesh`, [`MeshAdaptError::UnsupportedDimension`] for a mesh that is neither
/// triangles nor tetrahedra.
pub fn predict_split_qualities<M: AdaptMesh + ?Sized>(
    mesh: &M,
    candidates: &[usize],
) -> Result<Vec<f64>, MeshAdaptError> {
    let nedges = mesh.nents(EDGE);
    if let Some(&e) = candidates.iter().find(|&&e| e >= nedges) {
        return Err(MeshAdaptError::EntityOutOfRange {
            ent_dim: EDGE,
            index: e,
            count: nedges,
        });
    }
    let ev2v = mesh.ask_edge_verts();
    let quals = match (mesh.dim(), mesh.vertex_metrics()) {
        (2, None) => predict_tmpl::<_, _, 2>(mesh, candidates, &RealMeasure),
        (3, None) => predict_tmpl::<_, _, 3>(mesh, candidates, &RealMeasure),
        (2, Some(metrics)) => {
            let measure = MetricMeasure::<2>::new(metrics, ev2v, candidates);
            predict_tmpl(mesh, candidates, &measure)
        }
        (3, Some(metrics)) => {
            let measure = MetricMeasure::<3>::new(metrics, ev2v, candidates);
            predict_tmpl(mesh, candidates, &measure)
        }
        (d, _) => return Err(MeshAdaptError::UnsupportedDimension(d)),
    };
    mesh.sync_subset_max(EDGE, &quals, candidates, NO_DATA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::geometry::quality::element_quality;
    use crate::mesh::UpAdjacency;
    use crate::topology::simplex_mesh::SimplexMesh;
    use crate::topology::templates::VERT;

    /// One edge with no cells around it.
    struct DanglingEdge {
        metrics: Option<Vec<f64>>,
    }

    impl AdaptMesh for DanglingEdge {
        type Comm = NoComm;

        fn dim(&self) -> usize {
            2
        }
        fn nents(&self, ent_dim: usize) -> usize {
            match ent_dim {
                VERT => 2,
                EDGE => 1,
                _ => 0,
            }
        }
        fn coords(&self) -> &[f64] {
            &[0.0, 0.0, 1.0, 0.0]
        }
        fn vertex_metrics(&self) -> Option<&[f64]> {
            self.metrics.as_deref()
        }
        fn ask_edge_verts(&self) -> &[usize] {
            &[0, 1]
        }
        fn ask_cell_verts(&self) -> &[usize] {
            &[]
        }
        fn ask_edge_cells(&self) -> UpAdjacency<'_> {
            UpAdjacency {
                offsets: &[0, 0],
                cells: &[],
                codes: &[],
            }
        }
        fn owned(&self, ent_dim: usize) -> &[bool] {
            match ent_dim {
                VERT => &[true, true],
                EDGE => &[true],
                _ => &[],
            }
        }
        fn vertex_globals(&self) -> &[u64] {
            &[0, 1]
        }
        fn comm(&self) -> &NoComm {
            &NoComm
        }
    }

    #[test]
    fn edge_without_cells_reports_no_data() {
        let bare = DanglingEdge { metrics: None };
        assert_eq!(predict_split_qualities(&bare, &[0]).unwrap(), vec![NO_DATA]);
        let with_metric = DanglingEdge {
            metrics: Some(vec![1.0, 1.0, 0.0, 4.0, 4.0, 0.0]),
        };
        assert_eq!(
            predict_split_qualities(&with_metric, &[0]).unwrap(),
            vec![NO_DATA]
        );
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    // equilateral triangle with side 2
    fn triangle() -> SimplexMesh {
        let h = 3f64.sqrt();
        SimplexMesh::new(2, vec![0.0, 0.0, 2.0, 0.0, 1.0, h], vec![0, 1, 2]).unwrap()
    }

    #[test]
    fn bisecting_an_equilateral_triangle() {
        let mesh = triangle();
        let all: Vec<usize> = (0..3).collect();
        let q = predict_split_qualities(&mesh, &all).unwrap();
        // both halves are 30-60-90 triangles
        let expected = element_quality(
            2,
            &[0.0, 0.0, 1.0, 0.0, 1.0, 3f64.sqrt()],
            None,
            &[0, 1, 2],
        );
        assert!(q.iter().all(|&x| close(x, expected)), "{q:?}");
        assert!(close(expected, 0.75));
    }

    #[test]
    fn order_of_candidates_is_preserved() {
        let mesh = SimplexMesh::new(
            2,
            vec![0.0, 0.0, 4.0, 0.0, 0.0, 1.0],
            vec![0, 1, 2],
        )
        .unwrap();
        let long = mesh.find_edge(1, 2).unwrap();
        let short = mesh.find_edge(0, 2).unwrap();
        let both = predict_split_qualities(&mesh, &[long, short]).unwrap();
        let swapped = predict_split_qualities(&mesh, &[short, long]).unwrap();
        assert_eq!(both[0], swapped[1]);
        assert_eq!(both[1], swapped[0]);
        assert!(both[0] > both[1]);
        assert!(predict_split_qualities(&mesh, &[]).unwrap().is_empty());
    }

    #[test]
    fn identity_metric_matches_euclidean() {
        let mut mesh = SimplexMesh::new(
            3,
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0,
            ],
            vec![0, 1, 2, 3, 1, 2, 3, 4],
        )
        .unwrap();
        let cands: Vec<usize> = (0..mesh.nedges()).collect();
        let real = predict_split_qualities(&mesh, &cands).unwrap();
        mesh.set_isotropic_size(&[1.0; 5]).unwrap();
        let metric = predict_split_qualities(&mesh, &cands).unwrap();
        for (a, b) in real.iter().zip(&metric) {
            assert!((a - b).abs() < 1e-10);
        }
        assert!(real.iter().all(|&q| q > 0.0 && q <= 1.0));
    }

    #[test]
    fn uniform_metric_scale_does_not_change_quality() {
        let mut mesh = triangle();
        let cands = [0, 1, 2];
        mesh.set_isotropic_size(&[0.25; 3]).unwrap();
        let q = predict_split_qualities(&mesh, &cands).unwrap();
        assert!(q.iter().all(|&x| close(x, 0.75)));
    }

    #[test]
    fn out_of_range_candidate_is_rejected() {
        let mesh = triangle();
        let err = predict_split_qualities(&mesh, &[7]).unwrap_err();
        assert!(matches!(err, MeshAdaptError::EntityOutOfRange { index: 7, .. }));
    }

    #[test]
    fn mesh_is_left_untouched() {
        let mesh = triangle();
        let before = (mesh.coords().to_vec(), mesh.ask_cell_verts().to_vec());
        predict_split_qualities(&mesh, &[0, 1, 2]).unwrap();
        assert_eq!(before.0, mesh.coords());
        assert_eq!(before.1, mesh.ask_cell_verts());
    }
}
