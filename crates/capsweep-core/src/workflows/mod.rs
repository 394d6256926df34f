//! # Workflows Module
//!
//! High-level entry points that compose the `core` and `engine` layers into complete
//! procedures.
//!
//! - **Sweep Workflow** ([`sweep`]) - Plans every sweep point, then for each one
//!   materializes the active run configuration, invokes the engine, and archives the
//!   output, producing a [`SweepReport`](crate::engine::report::SweepReport).

pub mod sweep;
