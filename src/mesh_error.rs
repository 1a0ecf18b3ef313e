//! MeshAdaptError: Unified error type for mesh-adapt public APIs
//!
//! This error type is used throughout the library to provide non-panicking
//! error handling for mesh construction, evaluation and adaptation.

use thiserror::Error;

/// Unified error type for mesh-adapt operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshAdaptError {
    /// Adaptation options violate their ordering/range invariants.
    #[error("invalid adaptation options: {0}")]
    InvalidOptions(String),
    /// Only triangle (2) and tetrahedron (3) meshes are supported.
    #[error("unsupported mesh dimension {0} (expected 2 or 3)")]
    UnsupportedDimension(usize),
    /// Entity dimension is not one the query understands.
    #[error("invalid entity dimension {0}")]
    InvalidEntityDimension(usize),
    /// An entity index is past the end of its entity list.
    #[error("entity {index} of dimension {ent_dim} out of range ({count} exist)")]
    EntityOutOfRange {
        ent_dim: usize,
        index: usize,
        count: usize,
    },
    /// A connectivity array is not a whole number of simplices.
    #[error("connectivity length {len} is not a multiple of {per_entity}")]
    ConnectivityLength { len: usize, per_entity: usize },
    /// A cell references a vertex that does not exist.
    #[error("cell {cell} references vertex {vertex}, but only {nverts} vertices exist")]
    VertexOutOfRange {
        cell: usize,
        vertex: usize,
        nverts: usize,
    },
    /// A per-entity field has the wrong number of components.
    #[error("field `{name}` has length {found}, expected {expected}")]
    FieldLength {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    /// A collective exchange delivered a malformed payload.
    #[error("communication error: {0}")]
    Communication(String),
}
