//! Communication and data-parallel building blocks.

pub mod communicator;
pub mod parallel;
pub mod reduction;

pub use communicator::Communicator;
