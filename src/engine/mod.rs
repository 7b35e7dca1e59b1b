//! Execution engine for rigup
//!
//! The engine orchestrates:
//! 1. Diffing - Compute current vs desired state
//! 2. Privileges - Acquire sudo once if a pending change needs it
//! 3. Reconciling - Check-then-act per resource, in declaration order

pub mod differ;
pub mod executor;

pub use executor::{ExecuteOptions, execute};
