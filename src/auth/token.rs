//! Token secrets and the rotating token set.

pub mod secret;
pub mod set;
