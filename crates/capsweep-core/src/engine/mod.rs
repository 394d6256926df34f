//! # Engine Module
//!
//! The stateful side of a sweep: everything that touches the filesystem or spawns a
//! process on behalf of a sweep point.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - The immutable `SweepConfig` and its builder
//! - **Run Director** ([`director`]) - Blocking invocation of the external simulator
//! - **Result Archiver** ([`archiver`]) - Output directory creation and tar archiving
//! - **Reporting** ([`report`]) - Per-point outcomes and the end-of-sweep summary
//! - **Progress Monitoring** ([`progress`]) - Callbacks for user-facing progress display
//! - **Error Handling** ([`error`]) - Fatal sweep errors
//!
//! Execution is strictly sequential. The active run configuration is a single shared
//! path, which is only safe because one sweep point runs at a time.

pub mod archiver;
pub mod config;
pub mod director;
pub mod error;
pub mod progress;
pub mod report;
