//! Core data types for cellmark.
//!
//! Box geometry in image pixel space and the per-model detection tables
//! that feed the suppression stage.

pub mod error;
pub mod geometry;
pub mod records;

pub use error::RecordError;
pub use geometry::{Point, Rect};
pub use records::{ColumnMap, DetectionRow, DetectionTable, InstanceFilter, ResultsStore};
