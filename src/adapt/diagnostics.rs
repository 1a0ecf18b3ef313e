//! Goal statistics and histograms reported by the controller.
//!
//! Everything here is observational. The counting functions are collective
//! (shared entities are counted once, on their owner); only rank 0 logs.

use crate::adapt::options::AdaptOpts;
use crate::algs::communicator::Communicator;
use crate::algs::reduction::global_sum_counts;
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::templates::EDGE;

/// Number of buckets in the quality and length histograms.
pub const HISTOGRAM_BINS: usize = 10;

const PLURAL_NAMES: [&str; 4] = ["vertices", "edges", "triangles", "tets"];

fn plural_name(ent_dim: usize) -> &'static str {
    PLURAL_NAMES.get(ent_dim).copied().unwrap_or("entities")
}

/// How a field compares against a `[floor, ceil]` goal, over distinct entities.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GoalStats {
    pub ntotal: u64,
    pub nbelow: u64,
    pub nwithin: u64,
    pub nabove: u64,
}

impl GoalStats {
    /// One-line summary, e.g. `120 triangles, quality [0.21,0.98], 3 <0.30, 117 in [0.30,0.40]`.
    /// Empty categories are omitted.
    pub fn describe(
        &self,
        ent_dim: usize,
        name: &str,
        floor: f64,
        ceil: f64,
        minval: f64,
        maxval: f64,
    ) -> String {
        let mut line = format!(
            "{} {}, {} [{:.2},{:.2}]",
            self.ntotal,
            plural_name(ent_dim),
            name,
            minval,
            maxval
        );
        if self.nbelow > 0 {
            line.push_str(&format!(", {} <{:.2}", self.nbelow, floor));
        }
        if self.nwithin > 0 {
            line.push_str(&format!(", {} in [{:.2},{:.2}]", self.nwithin, floor, ceil));
        }
        if self.nabove > 0 {
            line.push_str(&format!(", {} >{:.2}", self.nabove, ceil));
        }
        line
    }
}

/// Classify `values` (one per entity of dimension `ent_dim`) against
/// `[floor, ceil]` and log the summary on rank 0. Collective.
#[allow(clippy::too_many_arguments)]
pub fn goal_stats<M: AdaptMesh + ?Sized>(
    mesh: &M,
    name: &str,
    ent_dim: usize,
    values: &[f64],
    floor: f64,
    ceil: f64,
    minval: f64,
    maxval: f64,
) -> GoalStats {
    let below: Vec<bool> = values.iter().map(|&v| v < floor).collect();
    let above: Vec<bool> = values.iter().map(|&v| v > ceil).collect();
    let nbelow = mesh.count_owned_marks(ent_dim, &below);
    let nabove = mesh.count_owned_marks(ent_dim, &above);
    let ntotal = mesh.nglobal_ents(ent_dim);
    let stats = GoalStats {
        ntotal,
        nbelow,
        nwithin: ntotal.saturating_sub(nbelow + nabove),
        nabove,
    };
    if mesh.comm().rank() == 0 {
        log::info!("{}", stats.describe(ent_dim, name, floor, ceil, minval, maxval));
    }
    stats
}

/// Quality and length goal statistics. Collective.
pub fn adapt_summary<M: AdaptMesh + ?Sized>(
    mesh: &M,
    opts: &AdaptOpts,
    minqual: f64,
    maxqual: f64,
    minlen: f64,
    maxlen: f64,
) -> [GoalStats; 2] {
    let quality = goal_stats(
        mesh,
        "quality",
        mesh.dim(),
        &mesh.ask_qualities(),
        opts.min_quality_allowed,
        opts.min_quality_desired,
        minqual,
        maxqual,
    );
    let length = goal_stats(
        mesh,
        "length",
        EDGE,
        &mesh.ask_lengths(),
        opts.min_length_desired,
        opts.max_length_desired,
        minlen,
        maxlen,
    );
    [quality, length]
}

/// Bucket counts of a per-entity field over a fixed range.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Count owned entities per bucket across all ranks; values outside
    /// `[min, max]` land in the first or last bucket. Collective.
    pub fn compute<M: AdaptMesh + ?Sized>(
        mesh: &M,
        ent_dim: usize,
        values: &[f64],
        min: f64,
        max: f64,
        nbins: usize,
    ) -> Result<Self, MeshAdaptError> {
        let owned = mesh.owned(ent_dim);
        let mut local = vec![0u64; nbins];
        if nbins > 0 {
            let width = (max - min) / nbins as f64;
            for (&v, _) in values.iter().zip(owned).filter(|&(_, &o)| o) {
                let b = ((v - min) / width).floor();
                let b = if b.is_nan() || b < 0.0 { 0 } else { (b as usize).min(nbins - 1) };
                local[b] += 1;
            }
        }
        let counts = global_sum_counts(mesh.comm(), &local)?;
        Ok(Self { min, max, counts })
    }

    /// Multi-line rendering, one bucket per line.
    pub fn report(&self, name: &str) -> String {
        let nbins = self.counts.len().max(1);
        let width = (self.max - self.min) / nbins as f64;
        let mut out = format!("{name} histogram:");
        for (i, count) in self.counts.iter().enumerate() {
            let lo = self.min + width * i as f64;
            out.push_str(&format!("\n{:.2}-{:.2}: {}", lo, lo + width, count));
        }
        out
    }
}

/// Quality histogram over `[0, 1]` and length histogram over the configured
/// range, logged on rank 0. Collective.
pub fn log_histograms<M: AdaptMesh + ?Sized>(
    mesh: &M,
    opts: &AdaptOpts,
) -> Result<(), MeshAdaptError> {
    let qh = Histogram::compute(
        mesh,
        mesh.dim(),
        &mesh.ask_qualities(),
        0.0,
        1.0,
        HISTOGRAM_BINS,
    )?;
    let lh = Histogram::compute(
        mesh,
        EDGE,
        &mesh.ask_lengths(),
        opts.length_histogram_min,
        opts.length_histogram_max,
        HISTOGRAM_BINS,
    )?;
    if mesh.comm().rank() == 0 {
        log::info!("{}", qh.report("quality"));
        log::info!("{}", lh.report("length"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::simplex_mesh::SimplexMesh;
    use crate::topology::templates::VERT;

    fn square() -> SimplexMesh {
        SimplexMesh::new(
            2,
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn goal_stats_partition_every_entity() {
        let mesh = square();
        let lengths = mesh.ask_lengths();
        let stats = goal_stats(&mesh, "length", EDGE, &lengths, 1.1, 1.3, 1.0, 2f64.sqrt());
        assert_eq!(
            stats,
            GoalStats {
                ntotal: 5,
                nbelow: 4,
                nwithin: 0,
                nabove: 1
            }
        );
        let line = stats.describe(EDGE, "length", 1.1, 1.3, 1.0, 2f64.sqrt());
        assert_eq!(line, "5 edges, length [1.00,1.41], 4 <1.10, 1 >1.30");
    }

    #[test]
    fn histogram_clamps_out_of_range_values() {
        let mesh = square();
        let values = [-1.0, 0.05, 0.55, 0.99, 7.0];
        let h = Histogram::compute(&mesh, EDGE, &values, 0.0, 1.0, HISTOGRAM_BINS).unwrap();
        assert_eq!(h.counts.iter().sum::<u64>(), 5);
        assert_eq!(h.counts[0], 2);
        assert_eq!(h.counts[5], 1);
        assert_eq!(h.counts[9], 2);
        assert!(h.report("x").starts_with("x histogram:\n0.00-0.10: 2"));
        assert_eq!(plural_name(VERT), "vertices");
    }
}
