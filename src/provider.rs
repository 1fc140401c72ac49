//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes the validated endpoint set (`ProviderDescriptor`) for X's authorize,
//! token, and resource API endpoints. `strategy` defines [`ProviderStrategy`], an
//! HTTP-client-agnostic hook that maps token endpoint failures into the crate error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
