// tests/core_tests.rs
use cellmark_core::{InstanceFilter, Rect, ResultsStore};
use cellmark_cv::{iou, suppress, suppress_indices, AnnotationReviewer, ReviewConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::PathBuf;

const HEADER: &str = ",File Name,Area,Segmentation Number,x_min,y_min,x_max,y_max\n";

/// Scratch results folder, removed on drop
struct ResultsDir(PathBuf);

impl ResultsDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("cellmark-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn add_model(&self, model: &str, rows: &str) {
        let model_dir = self.0.join(model);
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(
            model_dir.join(ResultsStore::DEFAULT_CSV_NAME),
            format!("{}{}", HEADER, rows),
        )
        .unwrap();
    }
}

impl Drop for ResultsDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn random_rect(rng: &mut StdRng) -> Rect {
    let x = rng.gen_range(0.0..100.0);
    let y = rng.gen_range(0.0..100.0);
    // a few inverted and degenerate boxes on purpose
    let w = rng.gen_range(-5.0..30.0);
    let h = rng.gen_range(-5.0..30.0);
    Rect::from_xywh(x, y, w, h)
}

#[test]
fn test_review_from_results_folder() {
    let results = ResultsDir::new("review");
    results.add_model(
        "unet",
        "0,img_01,100,1,0,0,10,10\n\
         1,img_01,90,2,1,1,11,11\n\
         2,img_01,80,3,50,50,60,60\n\
         3,img_02,70,1,0,0,10,10\n",
    );
    results.add_model("cellpose", "0,img_01,100,7,0,0,10,10\n1,img_01,100,8,0,0,10,10\n");
    fs::create_dir_all(results.0.join("empty_model")).unwrap();

    let reviewer = AnnotationReviewer::new(ReviewConfig::default()).unwrap();
    let store = reviewer.load_store(&results.0).unwrap();
    let models: Vec<&str> = store.models().collect();
    assert_eq!(models, vec!["cellpose", "unet"]);

    let result = reviewer.review(&store, "/raw/img_01.czi", &["unet", "cellpose"], InstanceFilter::AnyPositiveArea);

    let unet = result.model("unet").unwrap();
    let kept: Vec<Rect> = unet.survivors.rects();
    assert_eq!(kept, vec![Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(50.0, 50.0, 60.0, 60.0)]);

    let cellpose = result.model("cellpose").unwrap();
    assert_eq!(cellpose.survivors.len(), 1);
    assert_eq!(cellpose.survivors.as_slice()[0].segmentation_number, Some(7));

    assert_eq!(result.stats.total_candidates, 5);
    assert_eq!(result.stats.total_survivors, 3);

    let json_path = results.0.join("review.json");
    reviewer.export_json(&result, &json_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["image"], "img_01");
    assert_eq!(json["per_model"][0]["model"], "unet");
}

#[test]
fn test_missing_results_folder() {
    let reviewer = AnnotationReviewer::new(ReviewConfig::default()).unwrap();
    let missing = std::env::temp_dir().join("cellmark-does-not-exist-4b1d");
    assert!(reviewer.load_store(&missing).is_err());
}

#[test]
fn test_malformed_box_reported() {
    let results = ResultsDir::new("malformed");
    results.add_model("unet", "0,img_01,100,1,0,0,ten,10\n");

    let reviewer = AnnotationReviewer::new(ReviewConfig::default()).unwrap();
    let err = reviewer.load_store(&results.0).unwrap_err();
    assert!(format!("{:#}", err).contains("Malformed box"));
}

#[test]
fn test_iou_properties_random() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let a = random_rect(&mut rng);
        let b = random_rect(&mut rng);
        assert_eq!(iou(&a, &b), iou(&b, &a));
        if a.is_proper() && a.area() > 1.0 {
            assert_eq!(iou(&a, &a), 1.0);
        }
    }
}

#[test]
fn test_suppression_properties_random() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let n = rng.gen_range(0..40);
        let boxes: Vec<Rect> = (0..n).map(|_| random_rect(&mut rng)).collect();
        let threshold = rng.gen_range(0.0..1.0);

        let kept = suppress(&boxes, threshold);
        assert!(kept.len() <= boxes.len());
        if !boxes.is_empty() {
            assert!(std::ptr::eq(kept[0], &boxes[0]));
        }

        // survivors are the caller's own elements, in input order
        let indices = suppress_indices(&boxes, threshold);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        for (survivor, &i) in kept.iter().zip(&indices) {
            assert!(std::ptr::eq(*survivor, &boxes[i]));
        }

        // no pair of survivors overlaps beyond the threshold
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                assert!(iou(a, b) <= threshold);
            }
        }

        // idempotent
        let again = suppress(&kept, threshold);
        assert_eq!(again.len(), kept.len());
    }
}
