//! Detection tables produced by the segmentation models.

pub mod store;
pub mod table;

pub use store::{image_key, InstanceFilter, ResultsStore};
pub use table::{ColumnMap, DetectionRow, DetectionTable};
