//! Bounding boxes with their detection payload
//!
//! The suppression stage only looks at [`BBox::rect`]; everything else is
//! carried along for reporting and rendering.

use crate::utils::nms;
use cellmark_core::{DetectionRow, Point, Rect};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A detection box with associated metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub rect: Rect,
    /// Results folder the box was read from
    pub model: String,
    pub label: String,
    pub segmentation_number: Option<i64>,
    /// Region area as reported by the model (not the box area)
    pub region_area: Option<f64>,
    pub score: Option<f64>,
    pub metadata: BTreeMap<String, String>,
}

impl BBox {
    /// Create a new bounding box
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            ..Self::default()
        }
    }

    /// Create from a top-left corner plus size
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Rect::from_xywh(x, y, width, height))
    }

    /// Build from a results table row, keeping its extra columns as metadata
    pub fn from_row(model: &str, row: &DetectionRow) -> Self {
        let metadata = row
            .extra
            .iter()
            .filter(|(header, _)| !header.is_empty())
            .cloned()
            .collect();

        Self {
            rect: row.rect,
            model: model.to_string(),
            label: row.file_name.clone(),
            segmentation_number: row.segmentation_number,
            region_area: Some(row.area).filter(|a| !a.is_nan()),
            score: None,
            metadata,
        }
    }

    /// Signed box area
    pub fn area(&self) -> f64 {
        self.rect.area()
    }

    pub fn center(&self) -> Point {
        self.rect.center()
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BBox) -> f64 {
        nms::iou(&self.rect, &other.rect)
    }

    /// Check if this box overlaps another by more than `threshold`
    pub fn overlaps(&self, other: &BBox, threshold: f64) -> bool {
        self.iou(other) > threshold
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }
}

/// Ordered collection of boxes. Order is suppression priority.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BBoxCollection {
    boxes: Vec<BBox>,
}

impl BBoxCollection {
    /// Create new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from vector of boxes
    pub fn from_vec(boxes: Vec<BBox>) -> Self {
        Self { boxes }
    }

    /// Boxes for the given rows, in row order
    pub fn from_rows(model: &str, rows: &[&DetectionRow]) -> Self {
        rows.iter().map(|row| BBox::from_row(model, row)).collect()
    }

    /// Add a box to the collection
    pub fn push(&mut self, bbox: BBox) {
        self.boxes.push(bbox);
    }

    /// Extend with another collection
    pub fn extend(&mut self, other: BBoxCollection) {
        self.boxes.extend(other.boxes);
    }

    /// Get boxes as slice
    pub fn as_slice(&self) -> &[BBox] {
        &self.boxes
    }

    pub fn into_vec(self) -> Vec<BBox> {
        self.boxes
    }

    /// Get number of boxes
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.boxes.iter().map(|b| b.rect).collect()
    }

    /// Sort by score, highest first. Unscored boxes go last and ties keep
    /// their current order. Suppression never calls this on its own.
    pub fn sort_by_score(&mut self) {
        self.boxes.sort_by(|a, b| match (a.score, b.score) {
            (Some(x), Some(y)) if !x.is_nan() && !y.is_nan() => {
                y.partial_cmp(&x).unwrap_or(Ordering::Equal)
            }
            (Some(x), _) if !x.is_nan() => Ordering::Less,
            (_, Some(y)) if !y.is_nan() => Ordering::Greater,
            _ => Ordering::Equal,
        });
    }

    /// Filter by model
    pub fn filter_by_model(mut self, model: &str) -> Self {
        self.boxes.retain(|bbox| bbox.model == model);
        self
    }

    /// Apply non-maximum suppression in the current order
    pub fn apply_nms(self, threshold: f64) -> Self {
        Self::from_vec(nms::suppress_owned(self.boxes, threshold))
    }

    /// Apply NMS within each model separately. Models appear in the order
    /// they are first seen.
    pub fn apply_model_nms(self, threshold: f64) -> Self {
        let mut groups: Vec<(String, Vec<BBox>)> = Vec::new();

        for bbox in self.boxes {
            match groups.iter_mut().find(|(model, _)| *model == bbox.model) {
                Some((_, group)) => group.push(bbox),
                None => groups.push((bbox.model.clone(), vec![bbox])),
            }
        }

        groups
            .into_iter()
            .flat_map(|(_, boxes)| nms::suppress_owned(boxes, threshold))
            .collect()
    }

    /// Get boxes grouped by model
    pub fn group_by_model(&self) -> BTreeMap<String, Vec<&BBox>> {
        let mut groups: BTreeMap<String, Vec<&BBox>> = BTreeMap::new();

        for bbox in &self.boxes {
            groups.entry(bbox.model.clone()).or_default().push(bbox);
        }

        groups
    }

    /// Get statistics
    pub fn stats(&self) -> BBoxStats {
        let mut model_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_area = 0.0;
        let mut max_area = f64::NEG_INFINITY;
        let mut min_area = f64::INFINITY;

        for bbox in &self.boxes {
            *model_counts.entry(bbox.model.clone()).or_insert(0) += 1;
            let area = bbox.area();
            total_area += area;
            max_area = max_area.max(area);
            min_area = min_area.min(area);
        }

        let avg_area = if self.boxes.is_empty() {
            0.0
        } else {
            total_area / self.boxes.len() as f64
        };

        BBoxStats {
            total_boxes: self.boxes.len(),
            model_counts,
            avg_area,
            max_area: if self.boxes.is_empty() { 0.0 } else { max_area },
            min_area: if self.boxes.is_empty() { 0.0 } else { min_area },
        }
    }

    /// Convert to iterator
    pub fn iter(&self) -> std::slice::Iter<'_, BBox> {
        self.boxes.iter()
    }
}

impl IntoIterator for BBoxCollection {
    type Item = BBox;
    type IntoIter = std::vec::IntoIter<BBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.into_iter()
    }
}

impl<'a> IntoIterator for &'a BBoxCollection {
    type Item = &'a BBox;
    type IntoIter = std::slice::Iter<'a, BBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}

impl FromIterator<BBox> for BBoxCollection {
    fn from_iter<T: IntoIterator<Item = BBox>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Statistics about a collection of bounding boxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBoxStats {
    pub total_boxes: usize,
    pub model_counts: BTreeMap<String, usize>,
    pub avg_area: f64,
    pub max_area: f64,
    pub min_area: f64,
}
