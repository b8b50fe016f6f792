//! One review run driven by the command line

use anyhow::{Context, Result};
use cellmark_core::InstanceFilter;
use cellmark_cv::{AnnotationReviewer, Overlay, ReviewConfig, ReviewResult};
use log::info;

use crate::cli::Args;

/// Build the config from the optional file plus command line overrides
pub fn build_config(args: &Args) -> Result<ReviewConfig> {
    let mut config = match &args.config {
        Some(path) => ReviewConfig::load(path)?,
        None => ReviewConfig::default(),
    };

    if let Some(threshold) = args.threshold {
        config.suppression.iou_threshold = threshold;
    }
    if args.validate {
        config.suppression.validate_threshold = true;
    }

    Ok(config)
}

pub fn run(args: &Args) -> Result<ReviewResult> {
    let config = build_config(args)?;
    let reviewer = AnnotationReviewer::new(config)?;

    let store = reviewer.load_store(&args.results)?;
    let filter = InstanceFilter::from_instance(args.instance);
    let result = reviewer.review(&store, &args.image, args.models.as_slice(), filter);

    if let Some(path) = &args.json {
        reviewer.export_json(&result, path)?;
        info!("Review written to {:?}", path);
    }

    if let Some(path) = &args.overlay {
        let background = match &args.background {
            Some(bg) => Some(
                image::open(bg)
                    .with_context(|| format!("Failed to open background image: {:?}", bg))?
                    .to_rgb8(),
            ),
            None => None,
        };

        let canvas = reviewer.render(&result, background);
        Overlay::save(&canvas, path)?;
        info!("Overlay saved: {:?}", path);
    }

    Ok(result)
}

pub fn print_summary(result: &ReviewResult) {
    println!(
        "Image '{}' ({:?}, IoU threshold {}):",
        result.image, result.filter, result.iou_threshold
    );

    if result.per_model.is_empty() {
        println!("  - no matching models");
    }

    for review in &result.per_model {
        println!(
            "  - {}: {} kept, {} suppressed",
            review.model,
            review.survivors.len(),
            review.suppressed()
        );
        for bbox in review.survivors.iter() {
            println!(
                "      #{} {}",
                bbox.segmentation_number.unwrap_or(-1),
                bbox.rect
            );
        }
    }

    println!(
        "  - total: {} of {} boxes in {}us",
        result.stats.total_survivors, result.stats.total_candidates, result.stats.processing_time_us
    );
}
