//! Detection review for a single image

use super::config::ReviewConfig;
use crate::bbox::BBoxCollection;
use crate::traits::NonMaxSuppression;
use crate::utils::nms::{validate_threshold, GreedyNms};
use crate::utils::Overlay;
use crate::Result;
use anyhow::Context;
use cellmark_core::records::image_key;
use cellmark_core::{DetectionRow, InstanceFilter, Point, Rect, ResultsStore};
use image::RgbImage;
use log::{debug, info};
use serde::Serialize;
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Boxes of one model for the reviewed image
#[derive(Debug, Clone, Serialize)]
pub struct ModelReview {
    pub model: String,
    /// Rows that passed the image and instance filter
    pub candidates: usize,
    pub survivors: BBoxCollection,
}

impl ModelReview {
    pub fn suppressed(&self) -> usize {
        self.candidates - self.survivors.len()
    }
}

/// Review statistics
#[derive(Debug, Clone, Serialize)]
pub struct ReviewStats {
    pub total_candidates: usize,
    pub total_survivors: usize,
    pub suppressed: usize,
    pub processing_time_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    /// Key matched against the file name column
    pub image: String,
    pub filter: InstanceFilter,
    pub iou_threshold: f64,
    pub per_model: Vec<ModelReview>,
    pub stats: ReviewStats,
}

impl ReviewResult {
    pub fn model(&self, name: &str) -> Option<&ModelReview> {
        self.per_model.iter().find(|m| m.model == name)
    }

    /// Survivors of every model, model by model
    pub fn all_survivors(&self) -> BBoxCollection {
        let mut all = BBoxCollection::new();
        for review in &self.per_model {
            all.extend(review.survivors.clone());
        }
        all
    }
}

/// Filters, suppresses and renders the detections of one image at a time
pub struct AnnotationReviewer {
    config: ReviewConfig,
    nms: GreedyNms,
    overlay: Overlay,
}

impl AnnotationReviewer {
    /// Create a reviewer; fails only when threshold validation is on and
    /// the threshold is out of range.
    pub fn new(config: ReviewConfig) -> Result<Self> {
        if config.suppression.validate_threshold {
            validate_threshold(config.suppression.iou_threshold)
                .context("Invalid suppression settings")?;
        }

        let overlay = Overlay::new(config.overlay.clone());

        Ok(Self {
            config,
            nms: GreedyNms,
            overlay,
        })
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Load every model table under a results folder
    pub fn load_store<P: AsRef<Path>>(&self, results_dir: P) -> Result<ResultsStore> {
        let results_dir = results_dir.as_ref();
        ResultsStore::load(
            results_dir,
            &self.config.csv_file_name,
            &self.config.columns,
        )
        .with_context(|| format!("Failed to load results from {:?}", results_dir))
    }

    /// Review one image. An empty `models` slice reviews every model.
    pub fn review<P, S>(
        &self,
        store: &ResultsStore,
        image_path: P,
        models: &[S],
        filter: InstanceFilter,
    ) -> ReviewResult
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let start_time = std::time::Instant::now();
        let image = image_key(&image_path);
        let selected = store.filter_for_image(&image_path, models, filter);

        #[cfg(feature = "parallel")]
        let per_model: Vec<ModelReview> = selected
            .par_iter()
            .map(|(model, rows)| self.review_model(model, rows))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let per_model: Vec<ModelReview> = selected
            .iter()
            .map(|(model, rows)| self.review_model(model, rows))
            .collect();

        let total_candidates: usize = per_model.iter().map(|m| m.candidates).sum();
        let total_survivors: usize = per_model.iter().map(|m| m.survivors.len()).sum();

        let stats = ReviewStats {
            total_candidates,
            total_survivors,
            suppressed: total_candidates - total_survivors,
            processing_time_us: start_time.elapsed().as_micros() as u64,
        };

        info!(
            "Image '{}': kept {} of {} boxes across {} models",
            image,
            stats.total_survivors,
            stats.total_candidates,
            per_model.len()
        );

        ReviewResult {
            image,
            filter,
            iou_threshold: self.config.suppression.iou_threshold,
            per_model,
            stats,
        }
    }

    /// Suppress the rows of one model, in row order
    pub fn review_model(&self, model: &str, rows: &[&DetectionRow]) -> ModelReview {
        let candidates = BBoxCollection::from_rows(model, rows);
        let count = candidates.len();
        let survivors = BBoxCollection::from_vec(self.nms.apply_nms(
            candidates.into_vec(),
            self.config.suppression.iou_threshold,
        ));

        debug!(
            "Model '{}': {} candidates, {} survivors",
            model,
            count,
            survivors.len()
        );

        ModelReview {
            model: model.to_string(),
            candidates: count,
            survivors,
        }
    }

    /// Rectangle for a finished mouse drag, or `None` if it is too small to
    /// keep.
    pub fn accept_drawn(&self, start: Point, end: Point) -> Option<Rect> {
        let rect = Rect::from_drag(start, end);
        rect.is_drawable(self.config.drawing.min_box_side)
            .then_some(rect)
    }

    /// Draw all survivors, on `background` if given, else on a blank canvas
    /// sized to the boxes.
    pub fn render(&self, result: &ReviewResult, background: Option<RgbImage>) -> RgbImage {
        let survivors = result.all_survivors();
        let mut canvas =
            background.unwrap_or_else(|| self.overlay.blank_canvas_for(&survivors));
        let drawn = self.overlay.draw(&mut canvas, &survivors);
        debug!("Drew {} of {} boxes", drawn, survivors.len());
        canvas
    }

    /// Export review results in JSON format
    pub fn export_json(&self, result: &ReviewResult, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(result)
            .context("Failed to serialize review results")?;

        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write JSON to: {:?}", output_path))?;

        Ok(())
    }
}
