//! # OpsGraph Graphs
//!
//! Sheet loading, tabular transforms and chart rendering for the weekly
//! operating report.
//!
//! Data flows one way: [`SheetLoader`] reads a sheet into a [`Table`], the
//! cleaning, [`transform`] and [`aggregate`] helpers reshape it, each
//! report section turns the result into a [`Figure`], and the renderer
//! draws that figure to a jpg with plotters. [`ReportManager`] runs the
//! five sections in order and keeps their failures apart.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod clean;
pub mod figure;
pub mod loader;
pub mod manager;
pub mod renderer;
pub mod style;
pub mod table;
pub mod traits;
pub mod transform;
pub mod utils;

// Report sections
pub mod activities;
pub mod currency;
pub mod hero;
pub mod kpi;
pub mod user_base;

pub use figure::{BarMode, ChartPanel, Figure, HeatmapPanel, Marker, Panel, Scale, Series, ValueFormat};
pub use loader::SheetLoader;
pub use manager::*;
pub use renderer::render_figure;
pub use style::ChartStyle;
pub use table::{ColumnKind, Row, Schema, Table, Value};
pub use traits::*;
