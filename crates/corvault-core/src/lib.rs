//! # corvault-core
//!
//! Turns the text output of the Seagate Corvault management CLI into a
//! Prometheus-style metrics snapshot.
//!
//! ## Quick Start
//!
//! ```
//! use corvault_core::{CommandOutput, Pipeline};
//!
//! let controllers = CommandOutput::from_stdout(r#"{"controller-statistics": []}"#);
//! let disks = CommandOutput::from_stdout(r#"{"disk-statistics": []}"#);
//!
//! let snapshot = Pipeline::new("cv1", 0).collect(&controllers, &disks).unwrap();
//! assert_eq!(snapshot.series().len(), 17);
//! ```
//!
//! ## Architecture
//!
//! CLI text → [`mod@frame`] (drop banner and `#` lines) → [`record`] (JSON records)
//! → [`mod@project`] (catalog observations) → [`snapshot`] (series per metric)
//!
//! The [`catalog`] is a `static` table shared by every pipeline in the process.
//! Fetching the text over SSH and serving the snapshot are left to the caller.

pub mod catalog;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod project;
pub mod record;
pub mod snapshot;

pub use catalog::{CATALOG, Category, FieldSource, MetricDef};
pub use error::{CollectError, Result};
pub use frame::{COMMENT_MARKER, DEFAULT_HEADER_LINES, frame, isolate_payload};
pub use pipeline::{CommandOutput, Pipeline, Stage};
pub use project::{Labels, Observation, PathIndex, project};
pub use record::{Record, RecordCollection, parse};
pub use snapshot::{Series, Snapshot, assemble};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
