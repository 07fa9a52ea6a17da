use std::path::PathBuf;
use std::process;

use clap::Parser;

use face_morph::{
    jobs_from_manifest, read_manifest, MorphEngine, MorphOptions, Progress, PtsFileSource,
};

#[derive(Parser)]
#[command(
    name = "face-morph",
    about = "Generate morphed face images from pairs of source photographs",
    version,
    after_help = "The pairs file holds one `A,B` row per morph, no header.\n\
                  Each source image needs an ibug-format `.pts` landmark sidecar\n\
                  next to it (e.g. photos/a.png + photos/a.pts)."
)]
struct Cli {
    /// Directory containing the raw source images
    #[arg(short, long)]
    src: PathBuf,

    /// Output directory for the morphed images
    #[arg(short, long)]
    morphed: PathBuf,

    /// Manifest file listing the image pairs to morph
    #[arg(short, long)]
    pairs: PathBuf,

    /// Morphing blend factor in [0, 1]
    #[arg(short, long, default_value_t = 0.5, value_parser = parse_alpha)]
    alpha: f32,

    /// Print per-pair triangle statistics
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_alpha(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("alpha must be in [0, 1], got {value}"))
    }
}

fn main() {
    let cli = Cli::parse();

    if !cli.src.is_dir() {
        eprintln!("Error: source directory does not exist: {}", cli.src.display());
        process::exit(1);
    }
    if !cli.pairs.is_file() {
        eprintln!("Error: pairs manifest does not exist: {}", cli.pairs.display());
        process::exit(1);
    }
    if let Err(e) = std::fs::create_dir_all(&cli.morphed) {
        eprintln!(
            "Error: cannot create output directory {}: {e}",
            cli.morphed.display()
        );
        process::exit(1);
    }

    let pairs = match read_manifest(&cli.pairs) {
        Ok(pairs) => pairs,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let jobs = jobs_from_manifest(&pairs, &cli.src, &cli.morphed);

    let opts = MorphOptions {
        alpha: cli.alpha,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if !opts.quiet {
        eprintln!(
            "Generating morphs for {} pairs with alpha {}",
            jobs.len(),
            opts.alpha
        );
    }

    let progress = if opts.quiet {
        Progress::none()
    } else {
        Progress::new(|done, total| eprint!("\r[{done}/{total}]"))
    };

    let engine = MorphEngine::new(PtsFileSource::new());
    let results = engine.process_manifest(&jobs, &opts, &progress);
    if !opts.quiet {
        eprintln!();
    }

    if opts.verbose {
        for r in results.iter().filter(|r| r.success) {
            let stats = r.stats.unwrap_or_default();
            eprintln!(
                "[OK] {}: {} triangles ({} skipped), {} background pixels",
                r.pair, stats.triangles, stats.skipped_triangles, stats.background_pixels
            );
        }
    }

    let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
    if !failed.is_empty() {
        eprintln!();
        eprintln!("{} pairs of images could not be processed:", failed.len());
        for r in &failed {
            eprintln!("[FAIL] {}: {}", r.pair, r.message);
        }
    } else if !opts.quiet {
        eprintln!("All {} pairs written to {}", results.len(), cli.morphed.display());
    }
}
