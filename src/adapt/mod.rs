//! Goal-driven mesh adaptation.
//!
//! - [`options`]: the goals ([`AdaptOpts`]) and reporting level.
//! - [`refine_qualities`]: predicted quality of candidate edge splits.
//! - [`controller`]: the driver sequencing the operators ([`adapt`]).
//! - [`ops`]: the operator interface and the bundled simplex operators.
//! - [`diagnostics`]: goal statistics and histograms.

pub mod controller;
pub mod diagnostics;
pub mod ops;
pub mod options;
pub mod refine_qualities;

pub use controller::{adapt, adapt_simplex_mesh};
pub use ops::{AdaptOperators, SimplexOperators};
pub use options::{AdaptOpts, Verbosity};
pub use refine_qualities::{predict_split_qualities, NO_DATA};
