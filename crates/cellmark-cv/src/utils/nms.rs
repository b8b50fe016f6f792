//! Greedy non-maximum suppression
//!
//! Candidates are processed in the order given: the first remaining one is
//! always kept and every later candidate overlapping it by more than the
//! threshold is dropped. Nothing here sorts, so callers must pass the
//! candidates highest priority first (or use [`suppress_by_key`]).

use crate::bbox::BBox;
use crate::error::NmsError;
use crate::traits::{HasRect, NonMaxSuppression};
use cellmark_core::Rect;
use std::cmp::Ordering;

/// Intersection over union of two boxes.
///
/// Areas are not clamped, so inverted boxes contribute negative area. When
/// the union is at most 1 the boxes are treated as fully overlapping and
/// the result is exactly `1.0`.
pub fn iou(box1: &Rect, box2: &Rect) -> f64 {
    let x1 = box1.x_min.max(box2.x_min);
    let y1 = box1.y_min.max(box2.y_min);
    let x2 = box1.x_max.min(box2.x_max);
    let y2 = box1.y_max.min(box2.y_max);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = box1.area() + box2.area() - intersection;

    if union > 1.0 {
        intersection / union
    } else {
        1.0
    }
}

/// Indices of the surviving candidates, ascending.
pub fn suppress_indices<T: HasRect>(items: &[T], iou_threshold: f64) -> Vec<usize> {
    if items.is_empty() {
        return Vec::new();
    }

    let rects: Vec<Rect> = items.iter().map(HasRect::rect).collect();
    let mut keep = Vec::new();
    let mut suppressed = vec![false; rects.len()];

    for i in 0..rects.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(i);

        for j in (i + 1)..rects.len() {
            if suppressed[j] {
                continue;
            }
            // IoU equal to the threshold survives; a NaN threshold keeps nothing
            let acceptable = iou(&rects[i], &rects[j]) <= iou_threshold;
            if !acceptable {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Surviving candidates, borrowed from `items` in their original order.
pub fn suppress<T: HasRect>(items: &[T], iou_threshold: f64) -> Vec<&T> {
    suppress_indices(items, iou_threshold)
        .into_iter()
        .map(|i| &items[i])
        .collect()
}

/// Same selection as [`suppress`], moving the survivors out of `items`.
pub fn suppress_owned<T: HasRect>(items: Vec<T>, iou_threshold: f64) -> Vec<T> {
    let keep = suppress_indices(&items, iou_threshold);
    let mut keep = keep.into_iter().peekable();

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}

/// Rank by `key` (highest first, NaN last, ties keep input order), then
/// suppress. Survivors come back in ranked order.
pub fn suppress_by_key<T, F>(items: &[T], iou_threshold: f64, mut key: F) -> Vec<&T>
where
    T: HasRect,
    F: FnMut(&T) -> f64,
{
    let mut ranked: Vec<(f64, &T)> = items.iter().map(|item| (key(item), item)).collect();
    ranked.sort_by(|a, b| descending(a.0, b.0));

    let ordered: Vec<&T> = ranked.into_iter().map(|(_, item)| item).collect();
    suppress_indices(&ordered, iou_threshold)
        .into_iter()
        .map(|i| ordered[i])
        .collect()
}

/// Reject thresholds that are NaN or outside `[0, 1]`.
pub fn validate_threshold(iou_threshold: f64) -> Result<f64, NmsError> {
    if (0.0..=1.0).contains(&iou_threshold) {
        Ok(iou_threshold)
    } else {
        Err(NmsError::InvalidThreshold(iou_threshold))
    }
}

/// [`suppress`] with the threshold validated first.
pub fn checked_suppress<T: HasRect>(items: &[T], iou_threshold: f64) -> Result<Vec<&T>, NmsError> {
    let iou_threshold = validate_threshold(iou_threshold)?;
    Ok(suppress(items, iou_threshold))
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// The greedy suppressor used by the review pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyNms;

impl NonMaxSuppression for GreedyNms {
    fn apply_nms(&self, boxes: Vec<BBox>, threshold: f64) -> Vec<BBox> {
        suppress_owned(boxes, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Rect {
        Rect::new(x_min, y_min, x_max, y_max)
    }

    #[test]
    fn test_iou_self_and_symmetry() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(5.0, 5.0, 15.0, 15.0);
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &b), iou(&b, &a));
        // 25 / (100 + 100 - 25)
        assert!((iou(&a, &b) - 25.0 / 175.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_disjoint_and_touching() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        assert_eq!(iou(&a, &r(20.0, 20.0, 30.0, 30.0)), 0.0);
        assert_eq!(iou(&a, &r(10.0, 0.0, 20.0, 10.0)), 0.0);
    }

    #[test]
    fn test_iou_degenerate_union() {
        // both zero area, far apart: union 0 -> 1.0
        let line = r(0.0, 0.0, 0.0, 10.0);
        let dot = r(100.0, 100.0, 100.0, 100.0);
        assert_eq!(iou(&line, &dot), 1.0);

        // union exactly 1 still counts as degenerate
        let unit = r(0.0, 0.0, 1.0, 1.0);
        assert_eq!(iou(&unit, &dot), 1.0);

        // union just above 1 divides normally
        let wide = r(0.0, 0.0, 1.5, 1.0);
        assert_eq!(iou(&wide, &dot), 0.0);
    }

    #[test]
    fn test_iou_inverted_box_area_unclamped() {
        // inverted box has area -100, intersection 0, union 0 -> 1.0
        let a = r(0.0, 0.0, 10.0, 10.0);
        let inverted = r(10.0, 0.0, 0.0, 10.0);
        assert_eq!(iou(&a, &inverted), 1.0);

        // inverted box with area -50 against area 100: union 50
        let half = r(30.0, 0.0, 20.0, 5.0);
        assert_eq!(iou(&a, &half), 0.0);
    }

    #[test]
    fn test_suppress_empty_and_single() {
        let empty: Vec<Rect> = Vec::new();
        assert!(suppress(&empty, 0.5).is_empty());

        let one = vec![r(1.0, 2.0, 3.0, 4.0)];
        for t in [-1.0, 0.0, 0.5, 2.0, f64::NAN] {
            assert_eq!(suppress(&one, t), vec![&one[0]]);
        }
    }

    #[test]
    fn test_overlapping_box_suppressed() {
        let boxes = vec![
            r(0.0, 0.0, 10.0, 10.0),
            r(1.0, 1.0, 11.0, 11.0),
            r(50.0, 50.0, 60.0, 60.0),
        ];
        let kept = suppress(&boxes, 0.5);
        assert_eq!(kept, vec![&boxes[0], &boxes[2]]);
        assert_eq!(suppress_indices(&boxes, 0.5), vec![0, 2]);
    }

    #[test]
    fn test_zero_threshold_keeps_disjoint() {
        let boxes = vec![r(0.0, 0.0, 10.0, 10.0), r(20.0, 20.0, 30.0, 30.0)];
        assert_eq!(suppress(&boxes, 0.0).len(), 2);

        // any positive overlap goes at threshold 0
        let boxes = vec![r(0.0, 0.0, 10.0, 10.0), r(9.0, 9.0, 19.0, 19.0)];
        assert_eq!(suppress(&boxes, 0.0).len(), 1);
    }

    #[test]
    fn test_identical_boxes() {
        let boxes = vec![r(0.0, 0.0, 10.0, 10.0), r(0.0, 0.0, 10.0, 10.0)];
        let kept = suppress(&boxes, 0.99);
        assert_eq!(kept.len(), 1);
        assert!(std::ptr::eq(kept[0], &boxes[0]));
    }

    #[test]
    fn test_threshold_boundary_is_kept() {
        // half overlap: 50 / (100 + 100 - 50) = 1/3
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(5.0, 0.0, 15.0, 10.0);
        let t = iou(&a, &b);
        let boxes = vec![a, b];
        assert_eq!(suppress(&boxes, t).len(), 2);
        assert_eq!(suppress(&boxes, t - 1e-9).len(), 1);
    }

    #[test]
    fn test_suppressed_box_does_not_suppress_others() {
        // b overlaps a and c, a and c are disjoint: b goes, c stays
        let boxes = vec![
            r(0.0, 0.0, 10.0, 10.0),
            r(2.0, 0.0, 12.0, 10.0),
            r(11.0, 0.0, 21.0, 10.0),
        ];
        assert_eq!(suppress_indices(&boxes, 0.3), vec![0, 2]);
    }

    #[test]
    fn test_suppress_owned_matches_borrowed() {
        let boxes = vec![
            (0.0, 0.0, 10.0, 10.0),
            (1.0, 1.0, 11.0, 11.0),
            (50.0, 50.0, 60.0, 60.0),
            (51.0, 50.0, 61.0, 60.0),
        ];
        let borrowed: Vec<_> = suppress(&boxes, 0.5).into_iter().copied().collect();
        assert_eq!(suppress_owned(boxes.clone(), 0.5), borrowed);
        assert_eq!(borrowed, vec![(0.0, 0.0, 10.0, 10.0), (50.0, 50.0, 60.0, 60.0)]);
    }

    #[test]
    fn test_input_left_untouched() {
        let boxes = vec![[0.0, 0.0, 10.0, 10.0], [0.0, 0.0, 10.0, 10.0]];
        let before = boxes.clone();
        let _ = suppress(&boxes, 0.1);
        assert_eq!(boxes, before);
    }

    #[test]
    fn test_suppress_by_key_ranks_first() {
        let boxes = vec![
            (r(0.0, 0.0, 10.0, 10.0), 0.2),
            (r(1.0, 1.0, 11.0, 11.0), 0.9),
            (r(50.0, 50.0, 60.0, 60.0), f64::NAN),
        ];
        let rects: Vec<Rect> = boxes.iter().map(|(rect, _)| *rect).collect();
        let kept = suppress_by_key(&rects, 0.5, |rect| {
            boxes.iter().find(|(b, _)| b == rect).map(|(_, s)| *s).unwrap_or(0.0)
        });
        assert_eq!(kept, vec![&rects[1], &rects[2]]);
    }

    #[test]
    fn test_checked_threshold() {
        let boxes = vec![r(0.0, 0.0, 1.0, 1.0)];
        assert!(checked_suppress(&boxes, 0.0).is_ok());
        assert!(checked_suppress(&boxes, 1.0).is_ok());
        assert_eq!(checked_suppress(&boxes, 1.5), Err(NmsError::InvalidThreshold(1.5)));
        assert!(checked_suppress(&boxes, f64::NAN).is_err());
        assert!(checked_suppress(&boxes, -0.1).is_err());
    }

    #[test]
    fn test_greedy_nms_trait() {
        let boxes = vec![
            BBox::new(r(0.0, 0.0, 10.0, 10.0)),
            BBox::new(r(0.0, 0.0, 10.0, 10.0)).with_label("dup"),
        ];
        let kept = GreedyNms.apply_nms(boxes, 0.5);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].label.is_empty());
    }
}
