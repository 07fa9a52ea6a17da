//! Error types for the face-morph crate.

use std::path::PathBuf;

/// Errors that can occur while morphing a pair of face images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The two landmark sets of a pair have different lengths.
    #[error("landmark count mismatch: {left} vs {right}")]
    ShapeMismatch {
        /// Number of landmarks found for image A.
        left: usize,
        /// Number of landmarks found for image B.
        right: usize,
    },

    /// No face (and therefore no landmark set) is available for an image.
    #[error("no face detected in {}", .path.display())]
    NoFaceDetected {
        /// Path of the image without a detectable face.
        path: PathBuf,
    },

    /// A landmark annotation file exists but could not be parsed.
    #[error("invalid landmark file {}: {reason}", .path.display())]
    LandmarkParse {
        /// Path of the malformed annotation file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The two source images of a pair have different dimensions.
    #[error("source dimensions differ: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// Width of image A in pixels.
        a_width: u32,
        /// Height of image A in pixels.
        a_height: u32,
        /// Width of image B in pixels.
        b_width: u32,
        /// Height of image B in pixels.
        b_height: u32,
    },

    /// A manifest row does not hold exactly two comma-separated filenames.
    #[error("manifest {} line {line}: expected two comma-separated filenames", .path.display())]
    ManifestRow {
        /// Path of the manifest file.
        path: PathBuf,
        /// One-based line number of the offending row.
        line: usize,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// The output image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
