//! # capsweep Core Library
//!
//! A library for driving an external network simulator across a swept link-capacity
//! value, producing one materialized configuration, one engine invocation, and one
//! archived result set per sweep point.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that each concern can be
//! tested in isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models: the range generator
//!   (`SweepSpec`), named configuration combinations, run identities, and the
//!   configuration template materializer.
//!
//! - **[`engine`]: The Moving Parts.** The sweep configuration and its builder, the run
//!   director that invokes the external simulator, the result archiver, progress
//!   reporting, and the per-point report types.
//!
//! - **[`workflows`]: The Public API.** Ties `core` and `engine` together into a
//!   complete sweep: plan, materialize, invoke, archive, summarize.

pub mod core;
pub mod engine;
pub mod workflows;
