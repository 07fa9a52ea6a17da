//! Generate morphed face images via landmark-guided triangulated warping.
//!
//! For every pair of source photographs in a manifest, this crate blends the
//! two faces into one composite parameterized by a blend factor `alpha` in
//! `[0, 1]`: the landmark geometries are averaged, the averaged points are
//! Delaunay-triangulated over the canvas rectangle, and each triangle is
//! affine-warped from both sources into the output and alpha-blended. Canvas
//! pixels outside the mesh receive the global blend of the raw sources.
//!
//! # Quick Start
//!
//! ```no_run
//! use face_morph::{morph_images, Point};
//!
//! let img_a = image::open("a.png").unwrap().to_rgb8();
//! let img_b = image::open("b.png").unwrap().to_rgb8();
//! let lm_a: Vec<Point> = vec![/* 68 fiducial points for A */];
//! let lm_b: Vec<Point> = vec![/* 68 fiducial points for B */];
//!
//! let (morph, stats) = morph_images(&img_a, &lm_a, &img_b, &lm_b, 0.5).unwrap();
//! println!("{} triangles, {} skipped", stats.triangles, stats.skipped_triangles);
//! morph.save("a_b.png").unwrap();
//! ```
//!
//! # Batch processing
//!
//! The [`MorphEngine`] drives a whole manifest of pairs with per-pair failure
//! isolation: a pair that fails (unreadable file, no detected face,
//! mismatched landmark counts) is recorded and reported, never aborting the
//! batch.
//!
//! ```no_run
//! use face_morph::{jobs_from_manifest, read_manifest, MorphEngine, MorphOptions, Progress};
//! use face_morph::PtsFileSource;
//! use std::path::Path;
//!
//! let pairs = read_manifest(Path::new("pairs.csv")).unwrap();
//! let jobs = jobs_from_manifest(&pairs, Path::new("src"), Path::new("morphed"));
//! let engine = MorphEngine::new(PtsFileSource::new());
//! let results = engine.process_manifest(&jobs, &MorphOptions::default(), &Progress::none());
//! let failed = results.iter().filter(|r| !r.success).count();
//! println!("{failed} pairs failed");
//! ```
//!
//! Landmark detection itself is pluggable through the [`LandmarkSource`]
//! trait; the bundled [`PtsFileSource`] reads ibug-format `.pts` sidecar
//! annotations produced by an offline detector.

#![deny(missing_docs)]

pub mod engine;
pub mod error;
pub mod landmarks;
pub mod source;
pub mod triangulation;
pub mod warp;

pub use engine::{
    jobs_from_manifest, morph_images, output_format, read_manifest, save_image, MorphEngine,
    MorphJob, MorphOptions, MorphResult, MorphStats, Progress,
};
pub use error::{Error, Result};
pub use landmarks::{average_landmarks, LandmarkSet, Point};
pub use source::{LandmarkSource, PtsFileSource};
pub use triangulation::{triangulate, Triangle};
pub use warp::{fill_background, morph_triangle, AffineMap};
