//! # Core Module
//!
//! Stateless building blocks of a capacity sweep.
//!
//! - **Range Generation** ([`range`]) - The finite, drift-free sequence of swept values
//! - **Combinations** ([`combination`]) - Named weight and marking/port profiles
//! - **Run Identities** ([`identity`]) - Deterministic names for output directories and archives
//! - **Templates** ([`template`]) - Loading a configuration template and materializing run configs

pub mod combination;
pub mod identity;
pub mod range;
pub mod template;
