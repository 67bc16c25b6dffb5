//! # OpsGraph Report
//!
//! Weekly operating-metrics report generator.
//!
//! This is the binary crate that wires configuration, logging and the
//! report manager together and logs the outcome of a run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod report;

pub use error::*;
pub use report::*;
