//! Per-image review: filter the results tables, suppress overlaps, report

pub mod config;
pub mod reviewer;

pub use config::{DrawingConfig, ReviewConfig, SuppressionConfig};
pub use reviewer::{AnnotationReviewer, ModelReview, ReviewResult, ReviewStats};
