//! # OpsGraph Common
//!
//! Shared types, utilities, and common functionality for OpsGraph.
//!
//! This crate provides the error taxonomy, the closed categorical domains
//! (VIP tiers, zone ages, report sections) and the logging setup used
//! across all other crates in the workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::{LoadError, OpsGraphError, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use types::*;
pub use utils::*;
