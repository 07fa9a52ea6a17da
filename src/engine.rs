//! Core morphing engine and batch job driver.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};
use crate::landmarks::{average_landmarks, Point};
use crate::source::LandmarkSource;
use crate::triangulation::triangulate;
use crate::warp::{fill_background, morph_triangle};

/// Options controlling morph generation.
#[derive(Debug, Clone)]
pub struct MorphOptions {
    /// Blend factor in `[0, 1]`: 0 is all image A, 1 is all image B.
    pub alpha: f32,
    /// Enable verbose per-pair reporting.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for MorphOptions {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            verbose: false,
            quiet: false,
        }
    }
}

/// One unit of work: morph two named images into one output file.
#[derive(Debug, Clone)]
pub struct MorphJob {
    /// Path of source image A.
    pub input_a: PathBuf,
    /// Path of source image B.
    pub input_b: PathBuf,
    /// Destination path of the morphed image.
    pub output: PathBuf,
    /// Pair key `<A>_<B>` used in reports.
    pub pair: String,
}

impl MorphJob {
    /// Build a job from a manifest pair and the source/output directories.
    ///
    /// The output file is named `<A>_<B>` inside `out_dir`.
    #[must_use]
    pub fn new(src_dir: &Path, out_dir: &Path, name_a: &str, name_b: &str) -> Self {
        let pair = format!("{name_a}_{name_b}");
        Self {
            input_a: src_dir.join(name_a),
            input_b: src_dir.join(name_b),
            output: out_dir.join(&pair),
            pair,
        }
    }
}

/// Diagnostics from morphing one pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct MorphStats {
    /// Number of triangles in the averaged mesh.
    pub triangles: usize,
    /// Triangles skipped as degenerate (zero area / singular transform).
    pub skipped_triangles: usize,
    /// Canvas pixels filled by the global background blend.
    pub background_pixels: u64,
}

/// Outcome of processing one morph job.
///
/// Failures are recorded here rather than propagated, so one pair's failure
/// never aborts the batch.
#[derive(Debug)]
pub struct MorphResult {
    /// Pair key `<A>_<B>`.
    pub pair: String,
    /// Destination path of the morphed image.
    pub output: PathBuf,
    /// Whether the output file was written.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
    /// Per-pair diagnostics, present on success.
    pub stats: Option<MorphStats>,
}

/// A completion callback invoked after each finished pair.
///
/// Receives `(completed, total)`, where `completed` increases monotonically
/// regardless of processing order.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize) + Send + Sync>,
}

impl Progress {
    /// Create a progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op reporter that discards all updates.
    #[must_use]
    pub fn none() -> Self {
        Self::new(|_, _| {})
    }

    /// Report that `completed` of `total` pairs have finished.
    #[inline]
    pub fn report(&self, completed: usize, total: usize) {
        (self.callback)(completed, total);
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

/// Morph two decoded images guided by their landmark sets.
///
/// Averages the landmarks at `alpha`, triangulates the averaged geometry over
/// image A's rectangle, warps and blends every triangle into a fresh canvas,
/// then background-fills the pixels no triangle touched.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the landmark sets differ in length.
///
/// # Panics
///
/// Panics if `img_b` is smaller than `img_a`; callers are expected to reject
/// mismatched source dimensions first (the driver does).
pub fn morph_images(
    img_a: &RgbImage,
    lm_a: &[Point],
    img_b: &RgbImage,
    lm_b: &[Point],
    alpha: f32,
) -> Result<(RgbImage, MorphStats)> {
    let averaged = average_landmarks(lm_a, lm_b, alpha)?;
    let (width, height) = img_a.dimensions();
    let mesh = triangulate(&averaged, width, height);

    let mut canvas = RgbImage::new(width, height);
    let mut skipped = 0_usize;
    for t in &mesh {
        let t_a = [lm_a[t.a], lm_a[t.b], lm_a[t.c]];
        let t_b = [lm_b[t.a], lm_b[t.b], lm_b[t.c]];
        let t_m = [averaged[t.a], averaged[t.b], averaged[t.c]];
        if !morph_triangle(img_a, img_b, &mut canvas, t_a, t_b, t_m, alpha) {
            skipped += 1;
        }
    }
    let background_pixels = fill_background(&mut canvas, img_a, img_b, alpha);

    Ok((
        canvas,
        MorphStats {
            triangles: mesh.len(),
            skipped_triangles: skipped,
            background_pixels,
        },
    ))
}

/// The morph engine tying a landmark source to the per-pair pipeline.
///
/// Create once and reuse across the whole batch; the landmark source is the
/// only shared resource and is only ever borrowed immutably.
pub struct MorphEngine<S> {
    source: S,
}

impl<S: LandmarkSource> MorphEngine<S> {
    /// Create an engine over the given landmark source.
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Process a single pair: load, detect, morph, save.
    ///
    /// Every error along the way is converted into a failed [`MorphResult`];
    /// nothing propagates.
    #[must_use]
    pub fn process_job(&self, job: &MorphJob, opts: &MorphOptions) -> MorphResult {
        match self.run_job(job, opts) {
            Ok(stats) => MorphResult {
                pair: job.pair.clone(),
                output: job.output.clone(),
                success: true,
                message: "morph written".to_string(),
                stats: Some(stats),
            },
            Err(e) => MorphResult {
                pair: job.pair.clone(),
                output: job.output.clone(),
                success: false,
                message: e.to_string(),
                stats: None,
            },
        }
    }

    fn run_job(&self, job: &MorphJob, opts: &MorphOptions) -> Result<MorphStats> {
        let img_a = image::open(&job.input_a)?.to_rgb8();
        let img_b = image::open(&job.input_b)?.to_rgb8();

        if img_a.dimensions() != img_b.dimensions() {
            return Err(Error::DimensionMismatch {
                a_width: img_a.width(),
                a_height: img_a.height(),
                b_width: img_b.width(),
                b_height: img_b.height(),
            });
        }

        let lm_a = self.source.landmarks(&job.input_a, &img_a)?;
        let lm_b = self.source.landmarks(&job.input_b, &img_b)?;

        let (canvas, stats) = morph_images(&img_a, &lm_a, &img_b, &lm_b, opts.alpha)?;

        if let Some(parent) = job.output.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        save_image(&canvas, &job.output, output_format(&job.input_a)?)?;
        Ok(stats)
    }

    /// Process a whole manifest of jobs, isolating failures per pair.
    ///
    /// Runs in parallel via rayon when the `cli` feature is enabled, serially
    /// otherwise. Results come back in manifest order either way; `progress`
    /// is invoked once per completed pair with a monotonically increasing
    /// count.
    #[must_use]
    pub fn process_manifest(
        &self,
        jobs: &[MorphJob],
        opts: &MorphOptions,
        progress: &Progress,
    ) -> Vec<MorphResult>
    where
        S: Sync,
    {
        let total = jobs.len();
        let completed = AtomicUsize::new(0);
        let run = |job: &MorphJob| {
            let result = self.process_job(job, opts);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress.report(done, total);
            result
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            jobs.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            jobs.iter().map(run).collect()
        }
    }
}

/// Read a pair manifest: one `A,B` row per line, no header.
///
/// Blank lines are skipped and fields are trimmed. Rows map 1:1 to jobs in
/// file order.
///
/// # Errors
///
/// Returns [`Error::ManifestRow`] for any row without exactly two non-empty
/// comma-separated fields, and [`Error::Io`] if the file cannot be read.
pub fn read_manifest(path: &Path) -> Result<Vec<(String, String)>> {
    let text = std::fs::read_to_string(path)?;
    let mut pairs = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let row_error = || Error::ManifestRow {
            path: path.to_path_buf(),
            line: index + 1,
        };

        let mut fields = line.split(',');
        let (Some(a), Some(b), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(row_error());
        };
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            return Err(row_error());
        }
        pairs.push((a.to_string(), b.to_string()));
    }
    Ok(pairs)
}

/// Build the job list for a manifest against source and output directories.
#[must_use]
pub fn jobs_from_manifest(
    pairs: &[(String, String)],
    src_dir: &Path,
    out_dir: &Path,
) -> Vec<MorphJob> {
    pairs
        .iter()
        .map(|(a, b)| MorphJob::new(src_dir, out_dir, a, b))
        .collect()
}

/// Pick the output encoding from image A's extension.
///
/// The morphed file is named `<A>_<B>`, so its own trailing extension is B's;
/// the batch convention is that A's extension decides the format.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] if the extension is not a known
/// image format.
pub fn output_format(input_a: &Path) -> Result<ImageFormat> {
    ImageFormat::from_path(input_a).map_err(|e| Error::UnsupportedFormat(e.to_string()))
}

/// Save an RGB image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path, format: ImageFormat) -> Result<()> {
    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&DynamicImage::ImageRgb8(img.clone()))?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }
    Ok(())
}
