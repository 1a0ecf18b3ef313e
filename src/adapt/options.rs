//! Goals and tolerances driving [`adapt`](crate::adapt::adapt).

use serde::{Deserialize, Serialize};

use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;

/// How much the controller reports. Levels are ordered; each includes the
/// output of the ones below it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Silent,
    #[default]
    EachRebuild,
    EachAdapt,
    ExtraStats,
}

/// Adaptation goals.
///
/// Lengths are measured in the metric when the mesh carries one, so the
/// defaults describe a mesh whose edges all have unit metric length up to a
/// factor of √2. Qualities are mean-ratio values in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptOpts {
    /// Edges shorter than this are candidates for collapse.
    #[serde(default = "default_min_length_desired")]
    pub min_length_desired: f64,
    /// Edges longer than this are candidates for splitting.
    #[serde(default = "default_max_length_desired")]
    pub max_length_desired: f64,
    /// Hard cap on edge lengths created by sliver removal.
    #[serde(default = "default_max_length_allowed")]
    pub max_length_allowed: f64,
    /// No operator may create a cell below this quality.
    pub min_quality_allowed: f64,
    /// Target worst quality for the whole mesh.
    pub min_quality_desired: f64,
    /// Rings of neighbours added around each sliver before coarsening.
    #[serde(default = "default_nsliver_layers")]
    pub nsliver_layers: u32,
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default)]
    pub length_histogram_min: f64,
    #[serde(default = "default_length_histogram_max")]
    pub length_histogram_max: f64,
    /// Upper bound on passes of each controller loop.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
}

fn default_min_length_desired() -> f64 {
    std::f64::consts::FRAC_1_SQRT_2
}

fn default_max_length_desired() -> f64 {
    std::f64::consts::SQRT_2
}

fn default_max_length_allowed() -> f64 {
    f64::MAX
}

fn default_nsliver_layers() -> u32 {
    4
}

fn default_length_histogram_max() -> f64 {
    3.0
}

fn default_max_passes() -> u32 {
    100
}

impl AdaptOpts {
    /// Default goals for a mesh of cell dimension `dim`.
    pub fn new(dim: usize) -> Result<Self, MeshAdaptError> {
        let (min_quality_allowed, min_quality_desired) = match dim {
            2 => (0.30, 0.40),
            3 => (0.20, 0.30),
            d => return Err(MeshAdaptError::UnsupportedDimension(d)),
        };
        Ok(Self {
            min_length_desired: default_min_length_desired(),
            max_length_desired: default_max_length_desired(),
            max_length_allowed: default_max_length_allowed(),
            min_quality_allowed,
            min_quality_desired,
            nsliver_layers: default_nsliver_layers(),
            verbosity: Verbosity::default(),
            length_histogram_min: 0.0,
            length_histogram_max: default_length_histogram_max(),
            max_passes: default_max_passes(),
        })
    }

    /// Default goals for `mesh`'s dimension.
    pub fn for_mesh<M: AdaptMesh + ?Sized>(mesh: &M) -> Result<Self, MeshAdaptError> {
        Self::new(mesh.dim())
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Check the ordering and range invariants between the goals.
    pub fn validate(&self) -> Result<(), MeshAdaptError> {
        let q_ok = 0.0 <= self.min_quality_allowed
            && self.min_quality_allowed <= self.min_quality_desired
            && self.min_quality_desired <= 1.0;
        if !q_ok {
            return Err(MeshAdaptError::InvalidOptions(format!(
                "quality goals must satisfy 0 <= allowed ({}) <= desired ({}) <= 1",
                self.min_quality_allowed, self.min_quality_desired
            )));
        }
        if self.nsliver_layers >= 100 {
            return Err(MeshAdaptError::InvalidOptions(format!(
                "nsliver_layers must be below 100, got {}",
                self.nsliver_layers
            )));
        }
        let l_ok = 0.0 <= self.min_length_desired
            && self.min_length_desired <= self.max_length_desired
            && self.max_length_desired <= self.max_length_allowed;
        if !l_ok {
            return Err(MeshAdaptError::InvalidOptions(format!(
                "length goals must satisfy 0 <= min desired ({}) <= max desired ({}) <= max allowed ({})",
                self.min_length_desired, self.max_length_desired, self.max_length_allowed
            )));
        }
        if self.length_histogram_min >= self.length_histogram_max {
            return Err(MeshAdaptError::InvalidOptions(format!(
                "empty length histogram range [{}, {}]",
                self.length_histogram_min, self.length_histogram_max
            )));
        }
        if self.max_passes == 0 {
            return Err(MeshAdaptError::InvalidOptions("max_passes must be positive".into()));
        }
        Ok(())
    }
}
