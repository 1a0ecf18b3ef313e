//! Simplex topology: cavity templates, incidence orientation codes and an
//! in-memory simplex mesh.
//!
//! The template tables are pure combinatorics and never touch a mesh; the
//! [`simplex_mesh::SimplexMesh`] derives its edges and edge → cell codes from
//! them.

pub mod orientation;
pub mod simplex_mesh;
pub mod templates;

pub use orientation::*;
pub use simplex_mesh::SimplexMesh;
