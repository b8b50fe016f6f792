//! Box outlines drawn onto RGB canvases

use crate::bbox::{BBox, BBoxCollection};
use crate::Result;
use anyhow::Context;
use cellmark_core::Rect;
use image::{Rgb, RgbImage};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Outline colour and thickness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pen {
    pub color: (u8, u8, u8),
    pub width: u32,
}

impl Pen {
    /// Boxes the annotator has accepted
    pub const ACCEPTED: Pen = Pen {
        color: (0, 255, 0),
        width: 3,
    };
    /// Centre markers
    pub const CENTER: Pen = Pen {
        color: (255, 0, 0),
        width: 2,
    };
    pub const CANDIDATE: Pen = Pen {
        color: (0, 255, 255),
        width: 2,
    };

    pub fn rgb(&self) -> Rgb<u8> {
        Rgb([self.color.0, self.color.1, self.color.2])
    }
}

impl Default for Pen {
    fn default() -> Self {
        Self::CANDIDATE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Pen for boxes whose model has no entry in `per_model`
    pub pen: Pen,
    pub per_model: BTreeMap<String, Pen>,
    /// Border added around the boxes when sizing a blank canvas
    pub margin: u32,
    /// Largest side of a blank canvas; boxes beyond it are clipped
    pub max_canvas_side: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            pen: Pen::CANDIDATE,
            per_model: BTreeMap::new(),
            margin: 10,
            max_canvas_side: 16384,
        }
    }
}

/// Draws collections of boxes onto a canvas
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    style: OverlayStyle,
}

impl Overlay {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn pen_for(&self, bbox: &BBox) -> Pen {
        self.style
            .per_model
            .get(&bbox.model)
            .copied()
            .unwrap_or(self.style.pen)
    }

    /// Draw every box, returning how many touched the canvas.
    pub fn draw(&self, canvas: &mut RgbImage, boxes: &BBoxCollection) -> usize {
        boxes
            .iter()
            .filter(|bbox| draw_outline(canvas, &bbox.rect, self.pen_for(bbox)))
            .count()
    }

    /// Black canvas reaching past the furthest box edge by the margin,
    /// capped at `max_canvas_side` per side.
    pub fn blank_canvas_for(&self, boxes: &BBoxCollection) -> RgbImage {
        let (mut width, mut height) = (0.0_f64, 0.0_f64);
        for bbox in boxes {
            let rect = bbox.rect.normalized();
            if rect.x_max.is_finite() && rect.y_max.is_finite() {
                width = width.max(rect.x_max.ceil());
                height = height.max(rect.y_max.ceil());
            }
        }

        let margin = self.style.margin as f64;
        let cap = self.style.max_canvas_side.max(1) as f64;
        if width + margin > cap || height + margin > cap {
            warn!(
                "Boxes reach {}x{}, capping blank canvas at {} px per side",
                width, height, cap
            );
        }

        let width = (width + margin).clamp(1.0, cap) as u32;
        let height = (height + margin).clamp(1.0, cap) as u32;
        RgbImage::new(width, height)
    }

    /// Save a canvas; the format follows the file extension
    pub fn save<P: AsRef<Path>>(canvas: &RgbImage, path: P) -> Result<()> {
        canvas
            .save(path.as_ref())
            .with_context(|| format!("Failed to save overlay: {:?}", path.as_ref()))
    }
}

/// Outline growing inwards from the rectangle edge. Pixels outside the
/// canvas are clipped. Returns false when nothing was drawn.
fn draw_outline(canvas: &mut RgbImage, rect: &Rect, pen: Pen) -> bool {
    let rect = rect.normalized();
    if ![rect.x_min, rect.y_min, rect.x_max, rect.y_max]
        .iter()
        .all(|v| v.is_finite())
    {
        return false;
    }

    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let x0 = rect.x_min.round() as i64;
    let y0 = rect.y_min.round() as i64;
    let x1 = rect.x_max.round() as i64;
    let y1 = rect.y_max.round() as i64;

    if x1 < 0 || y1 < 0 || x0 >= w || y0 >= h {
        return false;
    }

    let color = pen.rgb();
    let mut put = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    };

    for k in 0..pen.width.max(1) as i64 {
        let (left, right) = (x0 + k, x1 - k);
        let (top, bottom) = (y0 + k, y1 - k);
        if left > right || top > bottom {
            break;
        }
        for x in left.max(0)..=right.min(w - 1) {
            put(x, top);
            put(x, bottom);
        }
        for y in top.max(0)..=bottom.min(h - 1) {
            put(left, y);
            put(right, y);
        }
    }

    true
}
