//! # OpsGraph Config
//!
//! Type-safe configuration for the weekly operations report.
//!
//! Configuration is read once from YAML or TOML, overlaid with `OPSGRAPH_*`
//! environment variables and validated before any section runs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validator;

pub use defaults::*;
pub use loader::*;
pub use schema::*;
pub use validator::*;
