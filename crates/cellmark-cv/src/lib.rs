//! Cellmark detection review library
//!
//! Overlap suppression for detection boxes read from per-model results
//! tables, and the glue that filters, suppresses and renders them.

pub mod bbox;
pub mod error;
pub mod review;
pub mod utils;

// Re-export commonly used types
pub use bbox::{BBox, BBoxCollection, BBoxStats};
pub use error::NmsError;
pub use review::{AnnotationReviewer, ModelReview, ReviewConfig, ReviewResult};
pub use utils::nms::{checked_suppress, iou, suppress, suppress_by_key, suppress_indices, suppress_owned};
pub use utils::{GreedyNms, Overlay, OverlayStyle, Pen};

pub use cellmark_core::{Point, Rect};

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the suppression stage
pub mod traits {
    use super::*;
    use cellmark_core::DetectionRow;

    /// Anything that occupies an axis-aligned rectangle
    pub trait HasRect {
        fn rect(&self) -> Rect;
    }

    /// Trait for non-maximum suppression implementations
    pub trait NonMaxSuppression {
        fn apply_nms(&self, boxes: Vec<BBox>, threshold: f64) -> Vec<BBox>;
    }

    impl HasRect for Rect {
        fn rect(&self) -> Rect {
            *self
        }
    }

    impl HasRect for (f64, f64, f64, f64) {
        fn rect(&self) -> Rect {
            Rect::from(*self)
        }
    }

    impl HasRect for [f64; 4] {
        fn rect(&self) -> Rect {
            Rect::from(*self)
        }
    }

    impl HasRect for BBox {
        fn rect(&self) -> Rect {
            self.rect
        }
    }

    impl HasRect for DetectionRow {
        fn rect(&self) -> Rect {
            self.rect
        }
    }

    impl<T: HasRect + ?Sized> HasRect for &T {
        fn rect(&self) -> Rect {
            (**self).rect()
        }
    }
}
