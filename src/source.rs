//! Landmark acquisition.
//!
//! The landmark detector proper (face-region detection plus regression of the
//! fiducial points) is an external collaborator; this module defines the seam
//! it plugs into, plus a file-backed implementation reading ibug/300-W `.pts`
//! sidecar annotations of the kind produced by offline detectors.

use std::fs;
use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};
use crate::landmarks::{LandmarkSet, Point};

/// Maps an image to its ordered landmark set.
///
/// Implementations must return landmarks in a fixed, caller-known index
/// ordering shared across all images (the same fiducial scheme), so that
/// index `i` denotes the same anatomical feature in every image of a batch.
pub trait LandmarkSource {
    /// Produce the landmark set for the (single) face in `image`.
    ///
    /// `image_path` is the path the image was decoded from; file-backed
    /// sources locate their annotations relative to it, model-backed
    /// detectors can ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFaceDetected`] if no face is found.
    fn landmarks(&self, image_path: &Path, image: &RgbImage) -> Result<LandmarkSet>;
}

/// Reads landmarks from ibug-format `.pts` sidecar files.
///
/// For an image at `photos/a.png`, the annotation is expected at
/// `photos/a.pts`:
///
/// ```text
/// version: 1
/// n_points: 68
/// {
/// 236.52 143.84
/// ...
/// }
/// ```
///
/// A missing or empty sidecar is reported as [`Error::NoFaceDetected`],
/// matching what a live detector would return for that image.
#[derive(Debug, Default, Clone, Copy)]
pub struct PtsFileSource;

impl PtsFileSource {
    /// Create a new sidecar-file landmark source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LandmarkSource for PtsFileSource {
    fn landmarks(&self, image_path: &Path, _image: &RgbImage) -> Result<LandmarkSet> {
        let pts_path = image_path.with_extension("pts");
        let text = match fs::read_to_string(&pts_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NoFaceDetected {
                    path: image_path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let points = parse_pts(&text).map_err(|reason| Error::LandmarkParse {
            path: pts_path,
            reason,
        })?;

        if points.is_empty() {
            return Err(Error::NoFaceDetected {
                path: image_path.to_path_buf(),
            });
        }
        Ok(points)
    }
}

/// Parse the body of an ibug `.pts` file.
///
/// Header lines (`version:`, `n_points:`) are accepted before the opening
/// brace; coordinate lines between the braces are `x y` pairs. When an
/// `n_points` header is present the declared count must match.
fn parse_pts(text: &str) -> std::result::Result<Vec<Point>, String> {
    let mut declared: Option<usize> = None;
    let mut in_body = false;
    let mut points = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !in_body {
            if let Some(rest) = line.strip_prefix("n_points:") {
                declared = Some(
                    rest.trim()
                        .parse()
                        .map_err(|_| format!("bad n_points value {:?}", rest.trim()))?,
                );
            } else if line == "{" {
                in_body = true;
            }
            // other header lines (version: ...) are ignored
            continue;
        }
        if line == "}" {
            in_body = false;
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(x), Some(y)) = (fields.next(), fields.next()) else {
            return Err(format!("expected `x y` pair, got {line:?}"));
        };
        if fields.next().is_some() {
            return Err(format!("expected `x y` pair, got {line:?}"));
        }
        let x: f32 = x.parse().map_err(|_| format!("bad coordinate {x:?}"))?;
        let y: f32 = y.parse().map_err(|_| format!("bad coordinate {y:?}"))?;
        points.push(Point::new(x, y));
    }

    if in_body {
        return Err("unterminated point list (missing `}`)".to_string());
    }
    if let Some(n) = declared {
        if n != points.len() {
            return Err(format!("n_points says {n} but file holds {}", points.len()));
        }
    }
    Ok(points)
}
