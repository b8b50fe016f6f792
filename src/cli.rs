use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deduplicate and review detection boxes for one microscopy image")]
pub struct Args {
    /// Results folder with one sub-directory per detection model
    #[arg(short, long)]
    pub results: PathBuf,

    /// Image file name or path, matched against the file name column
    #[arg(short, long)]
    pub image: PathBuf,

    /// Model to review (repeatable); all models when omitted
    #[arg(short, long = "model")]
    pub models: Vec<String>,

    /// Segmentation number to show; -1 shows every region with positive area
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub instance: i64,

    /// IoU threshold; overrides the config file
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Reject thresholds outside [0, 1]
    #[arg(long)]
    pub validate: bool,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the review as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Write surviving boxes drawn as an image
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Image to draw the overlay on instead of a blank canvas
    #[arg(long, requires = "overlay")]
    pub background: Option<PathBuf>,
}
