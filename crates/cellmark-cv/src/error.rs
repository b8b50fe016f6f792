use thiserror::Error;

/// Errors from the opt-in checked suppression entry points
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum NmsError {
    /// Threshold is NaN or outside `[0, 1]`
    #[error("IoU threshold must lie in [0, 1], got {0}")]
    InvalidThreshold(f64),
}
