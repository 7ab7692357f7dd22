use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "extract",
    version,
    about = "Extracts valid-region CNN feature maps for a batch of images"
)]
pub struct Cli {
    /// Model description (JSON layer graph)
    pub model: PathBuf,

    /// Pretrained weights file
    pub weights: PathBuf,

    /// Mean file (C×H×W feature record)
    pub mean: PathBuf,

    /// Layer whose output to extract
    pub layer: String,

    /// Two-column job list: input image, output record
    pub jobs: PathBuf,

    /// Inference engine backing the forward passes
    #[arg(long, default_value = "mock")]
    pub engine: String,

    /// Per-input preprocessing overrides (JSON)
    #[arg(long)]
    pub preprocess: Option<PathBuf>,
}
