//! Morph a single pair of face images.
//!
//! Both images need an ibug-format `.pts` landmark sidecar next to them.
//!
//! Usage:
//! ```sh
//! cargo run --example morph_pair -- a.png b.png morphed.png 0.5
//! ```

use std::env;
use std::path::Path;
use std::process;

use face_morph::{morph_images, LandmarkSource, PtsFileSource};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <image-a> <image-b> <output> [alpha]", args[0]);
        process::exit(1);
    }

    let alpha: f32 = args.get(4).map_or(0.5, |s| s.parse().expect("bad alpha"));

    let img_a = image::open(&args[1]).expect("failed to load image A").to_rgb8();
    let img_b = image::open(&args[2]).expect("failed to load image B").to_rgb8();

    let source = PtsFileSource::new();
    let lm_a = source
        .landmarks(Path::new(&args[1]), &img_a)
        .expect("no landmarks for image A");
    let lm_b = source
        .landmarks(Path::new(&args[2]), &img_b)
        .expect("no landmarks for image B");

    match morph_images(&img_a, &lm_a, &img_b, &lm_b, alpha) {
        Ok((morph, stats)) => {
            morph.save(&args[3]).expect("failed to save output");
            println!(
                "Done: {} triangles ({} skipped), {} background pixels",
                stats.triangles, stats.skipped_triangles, stats.background_pixels
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
