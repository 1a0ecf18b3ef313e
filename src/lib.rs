#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-adapt
//!
//! mesh-adapt drives unstructured triangle and tetrahedron meshes towards
//! edge-length and shape-quality goals, serially or as one rank of a
//! distributed mesh. Edges are split, collapsed and swapped until every edge
//! has (metric) length within `[min_length_desired, max_length_desired]` and
//! every cell has quality at least `min_quality_desired`, or until no operator
//! can make further progress.
//!
//! ## Features
//! - Mean-ratio quality, isotropic or under per-vertex anisotropic metrics
//! - Prediction of split qualities without mutating the mesh
//! - A controller that sequences refinement, coarsening, swaps and sliver
//!   removal, guaranteed to stop
//! - Pluggable communication backends (serial, threads, MPI) for distributed
//!   statistics and reconciliation
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-adapt = "0.1"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```
//!
//! ```rust
//! use mesh_adapt::prelude::*;
//!
//! let h = 3f64.sqrt();
//! let mut mesh = SimplexMesh::new(2, vec![0.0, 0.0, 2.0, 0.0, 1.0, h], vec![0, 1, 2])?;
//! let opts = AdaptOpts::for_mesh(&mesh)?.with_verbosity(Verbosity::Silent);
//! assert!(adapt_simplex_mesh(&mut mesh, &opts)?);
//! assert!(mesh.ask_lengths().iter().all(|&l| l <= opts.max_length_desired));
//! # Ok::<(), MeshAdaptError>(())
//! ```
//!
//! ## Logging
//! Progress and statistics go through the [`log`] facade on rank 0 only;
//! install any logger to see them.

pub mod adapt;
pub mod algs;
pub mod geometry;
pub mod mesh;
pub mod mesh_error;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::adapt::{
        adapt, adapt_simplex_mesh, predict_split_qualities, AdaptOperators, AdaptOpts,
        SimplexOperators, Verbosity,
    };
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    pub use crate::mesh::AdaptMesh;
    pub use crate::mesh_error::MeshAdaptError;
    pub use crate::topology::simplex_mesh::SimplexMesh;
}
