//! Geometry utilities for mesh-adapt.
//!
//! This module provides the metric tensor algebra and the simplex shape
//! quality measures the adaptation loop is driven by.

pub mod metric;
pub mod quality;
