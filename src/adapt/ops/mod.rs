//! Topology-changing operators driven by the controller.
//!
//! The controller only needs [`AdaptOperators`]; [`SimplexOperators`] is the
//! bundled implementation for [`SimplexMesh`]. Each operator reports whether it
//! changed the mesh on *any* rank and keeps every rank's collectives in step.
//!
//! The bundled operators never touch entities shared with another rank and
//! only ever remove interior vertices, so partition and domain boundaries
//! keep their vertices.

mod cavity;
pub mod coarsen;
pub mod refine;
pub mod sliver;
pub mod swap;

pub use coarsen::coarsen_by_size;
pub use refine::refine_by_size;
pub use sliver::coarsen_slivers;
pub use swap::swap_edges;

use crate::adapt::options::AdaptOpts;
use crate::algs::communicator::Communicator;
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::simplex_mesh::SimplexMesh;

/// The four mesh modifications the controller sequences.
///
/// Each returns `Ok(true)` when the mesh changed. Implementations must be
/// collective: every rank calls the same operator in the same order.
pub trait AdaptOperators<M: AdaptMesh + ?Sized> {
    /// Split edges longer than `max_length_desired`.
    fn refine_by_size(&mut self, mesh: &mut M, opts: &AdaptOpts) -> Result<bool, MeshAdaptError>;
    /// Collapse edges shorter than `min_length_desired`.
    fn coarsen_by_size(&mut self, mesh: &mut M, opts: &AdaptOpts) -> Result<bool, MeshAdaptError>;
    /// Swap edges to improve cells below `min_quality_desired`.
    fn swap_edges(&mut self, mesh: &mut M, opts: &AdaptOpts) -> Result<bool, MeshAdaptError>;
    /// Collapse edges near cells below `min_quality_desired`.
    fn coarsen_slivers(&mut self, mesh: &mut M, opts: &AdaptOpts) -> Result<bool, MeshAdaptError>;
}

/// Operators for [`SimplexMesh`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SimplexOperators;

impl<C: Communicator> AdaptOperators<SimplexMesh<C>> for SimplexOperators {
    fn refine_by_size(
        &mut self,
        mesh: &mut SimplexMesh<C>,
        opts: &AdaptOpts,
    ) -> Result<bool, MeshAdaptError> {
        refine::refine_by_size(mesh, opts)
    }

    fn coarsen_by_size(
        &mut self,
        mesh: &mut SimplexMesh<C>,
        opts: &AdaptOpts,
    ) -> Result<bool, MeshAdaptError> {
        coarsen::coarsen_by_size(mesh, opts)
    }

    fn swap_edges(
        &mut self,
        mesh: &mut SimplexMesh<C>,
        opts: &AdaptOpts,
    ) -> Result<bool, MeshAdaptError> {
        swap::swap_edges(mesh, opts)
    }

    fn coarsen_slivers(
        &mut self,
        mesh: &mut SimplexMesh<C>,
        opts: &AdaptOpts,
    ) -> Result<bool, MeshAdaptError> {
        sliver::coarsen_slivers(mesh, opts)
    }
}
