use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ortho_core::io::image_io::load_frame;
use ortho_core::quality::rank_frames;

#[derive(Args)]
pub struct QualityArgs {
    /// Images to score
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Show top N images only
    #[arg(long, default_value = "20")]
    pub top: usize,

    /// Mark images at or below this score as blurred
    #[arg(long)]
    pub blur_threshold: Option<f64>,
}

pub fn run(args: &QualityArgs) -> Result<()> {
    let total = args.files.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Reading images");

    let mut frames = Vec::with_capacity(total);
    for (i, path) in args.files.iter().enumerate() {
        let frame =
            load_frame(path).with_context(|| format!("Failed to read {}", path.display()))?;
        frames.push(frame);
        pb.set_position(i as u64 + 1);
    }
    pb.finish_with_message("Scoring images (laplacian)");

    let ranked = rank_frames(&frames);

    println!("\nTop {} images by sharpness (of {}):", args.top.min(total), total);
    println!("{:>5}  {:>12}  {}", "Rank", "Score", "File");
    println!("{}", "-".repeat(40));

    for (rank, (idx, score)) in ranked.iter().take(args.top).enumerate() {
        let mark = match args.blur_threshold {
            Some(t) if *score <= t => "  (blurred)",
            _ => "",
        };
        println!(
            "{:>5}  {:>12.2}  {}{}",
            rank + 1,
            score,
            args.files[*idx].display(),
            mark
        );
    }

    if let (Some(best), Some(worst)) = (ranked.first(), ranked.last()) {
        println!("\nBest score:  {:.2}", best.1);
        println!("Worst score: {:.2}", worst.1);
    }

    Ok(())
}
