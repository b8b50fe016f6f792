//! Utility modules

pub mod nms;
pub mod overlay;

pub use nms::GreedyNms;
pub use overlay::{Overlay, OverlayStyle, Pen};
