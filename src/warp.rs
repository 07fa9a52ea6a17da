//! Affine triangle warping and alpha blending.
//!
//! The morph canvas is assembled one triangle at a time: each averaged
//! triangle is filled by inverse-warping the corresponding triangles of both
//! source images into it and blending the two samples per channel:
//! `output = (1 - alpha) * warped_a + alpha * warped_b`

use image::RgbImage;

use crate::landmarks::Point;

/// Triangles with twice-area below this are treated as degenerate.
const DEGENERATE_AREA: f64 = 1e-7;

/// Containment slack so triangle-boundary pixels land in exactly one mask.
const EDGE_TOLERANCE: f32 = 1e-3;

/// A 2D affine transform `(x, y) -> (a*x + b*y + c, d*x + e*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    m: [f64; 6],
}

impl AffineMap {
    /// Compute the unique affine map taking `src[i]` to `dst[i]` for the
    /// three vertex correspondences, by Cramer's rule.
    ///
    /// Returns `None` when `src` is degenerate (collinear vertices), in which
    /// case no such map exists.
    #[must_use]
    pub fn from_triangles(src: [Point; 3], dst: [Point; 3]) -> Option<Self> {
        let [s0, s1, s2] = src.map(|p| (f64::from(p.x), f64::from(p.y)));
        let [d0, d1, d2] = dst.map(|p| (f64::from(p.x), f64::from(p.y)));

        let det = s0.0 * (s1.1 - s2.1) - s0.1 * (s1.0 - s2.0) + (s1.0 * s2.1 - s2.0 * s1.1);
        if det.abs() < DEGENERATE_AREA {
            return None;
        }

        let solve = |r0: f64, r1: f64, r2: f64| -> [f64; 3] {
            [
                (r0 * (s1.1 - s2.1) + r1 * (s2.1 - s0.1) + r2 * (s0.1 - s1.1)) / det,
                (r0 * (s2.0 - s1.0) + r1 * (s0.0 - s2.0) + r2 * (s1.0 - s0.0)) / det,
                (r0 * (s1.0 * s2.1 - s2.0 * s1.1)
                    + r1 * (s2.0 * s0.1 - s0.0 * s2.1)
                    + r2 * (s0.0 * s1.1 - s1.0 * s0.1))
                    / det,
            ]
        };

        let [a, b, c] = solve(d0.0, d1.0, d2.0);
        let [d, e, f] = solve(d0.1, d1.1, d2.1);
        Some(Self {
            m: [a, b, c, d, e, f],
        })
    }

    /// Apply the transform to a point.
    #[must_use]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let (x, y) = (f64::from(x), f64::from(y));
        let [a, b, c, d, e, f] = self.m;
        #[allow(clippy::cast_possible_truncation)]
        {
            ((a * x + b * y + c) as f32, (d * x + e * y + f) as f32)
        }
    }
}

/// Twice the signed area of the triangle.
fn doubled_area(t: [Point; 3]) -> f64 {
    let [a, b, c] = t.map(|p| (f64::from(p.x), f64::from(p.y)));
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Point-in-triangle containment including boundary pixels.
fn contains(t: [Point; 3], x: f32, y: f32) -> bool {
    let p = Point::new(x, y);
    let edge = |a: Point, b: Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);

    let d0 = edge(t[0], t[1]);
    let d1 = edge(t[1], t[2]);
    let d2 = edge(t[2], t[0]);

    let any_neg = d0 < -EDGE_TOLERANCE || d1 < -EDGE_TOLERANCE || d2 < -EDGE_TOLERANCE;
    let any_pos = d0 > EDGE_TOLERANCE || d1 > EDGE_TOLERANCE || d2 > EDGE_TOLERANCE;
    !(any_neg && any_pos)
}

/// Sample an image at fractional coordinates with bilinear interpolation.
///
/// Coordinates are clamped to the image borders, so samples slightly outside
/// the source triangle read the nearest edge pixel.
fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> [f32; 3] {
    #[allow(clippy::cast_precision_loss)]
    let max_x = (img.width() - 1) as f32;
    #[allow(clippy::cast_precision_loss)]
    let max_y = (img.height() - 1) as f32;

    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);

    #[allow(clippy::cast_precision_loss)]
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut out = [0.0_f32; 3];
    for (ch, value) in out.iter_mut().enumerate() {
        let top = f32::from(p00[ch]) * (1.0 - fx) + f32::from(p10[ch]) * fx;
        let bottom = f32::from(p01[ch]) * (1.0 - fx) + f32::from(p11[ch]) * fx;
        *value = top * (1.0 - fy) + bottom * fy;
    }
    out
}

/// Per-channel alpha blend quantized back to 8 bits.
fn blend(a: f32, b: f32, alpha: f32) -> u8 {
    let value = (1.0 - alpha) * a + alpha * b;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        value.clamp(0.0, 255.0) as u8
    }
}

/// Warp one triangle from both sources into the canvas and blend.
///
/// Every canvas pixel inside the target triangle `t_m` (boundary included)
/// receives `(1 - alpha) * a + alpha * b`, where `a` and `b` are bilinear
/// samples of `img_a` and `img_b` through the affine maps taking `t_m` back
/// onto `t_a` and `t_b` respectively.
///
/// Returns `false` without touching the canvas when any of the three
/// triangles is degenerate; such triangles contribute no visible area and
/// are skipped rather than treated as errors.
pub fn morph_triangle(
    img_a: &RgbImage,
    img_b: &RgbImage,
    canvas: &mut RgbImage,
    t_a: [Point; 3],
    t_b: [Point; 3],
    t_m: [Point; 3],
    alpha: f32,
) -> bool {
    if doubled_area(t_a).abs() < DEGENERATE_AREA
        || doubled_area(t_b).abs() < DEGENERATE_AREA
        || doubled_area(t_m).abs() < DEGENERATE_AREA
    {
        return false;
    }
    let (Some(to_a), Some(to_b)) = (
        AffineMap::from_triangles(t_m, t_a),
        AffineMap::from_triangles(t_m, t_b),
    ) else {
        return false;
    };

    // Bounding box of the target triangle, clipped to the canvas.
    let xs = t_m.map(|p| p.x);
    let ys = t_m.map(|p| p.y);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let min_x = xs.iter().copied().fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let min_y = ys.iter().copied().fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max_x = (xs.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil().max(0.0) as u32)
        .min(canvas.width().saturating_sub(1));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max_y = (ys.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil().max(0.0) as u32)
        .min(canvas.height().saturating_sub(1));

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            #[allow(clippy::cast_precision_loss)]
            let (fx, fy) = (x as f32, y as f32);
            if !contains(t_m, fx, fy) {
                continue;
            }

            let (ax, ay) = to_a.apply(fx, fy);
            let (bx, by) = to_b.apply(fx, fy);
            let sample_a = sample_bilinear(img_a, ax, ay);
            let sample_b = sample_bilinear(img_b, bx, by);

            let px = canvas.get_pixel_mut(x, y);
            for ch in 0..3 {
                px[ch] = blend(sample_a[ch], sample_b[ch], alpha);
            }
        }
    }
    true
}

/// Fill canvas pixels left untouched by the triangle pass.
///
/// The triangulation covers only the convex hull of the landmarks, so canvas
/// pixels still at the zero sentinel get the global blend of the raw source
/// pixels at the same coordinate. Pixels already written by a triangle are
/// never overwritten. Returns the number of pixels filled.
///
/// # Panics
///
/// Panics if either source image is smaller than the canvas.
pub fn fill_background(
    canvas: &mut RgbImage,
    img_a: &RgbImage,
    img_b: &RgbImage,
    alpha: f32,
) -> u64 {
    let mut filled = 0_u64;
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            let current = *canvas.get_pixel(x, y);
            if current.0 != [0, 0, 0] {
                continue;
            }
            let a = img_a.get_pixel(x, y);
            let b = img_b.get_pixel(x, y);
            let px = canvas.get_pixel_mut(x, y);
            for ch in 0..3 {
                px[ch] = blend(f32::from(a[ch]), f32::from(b[ch]), alpha);
            }
            filled += 1;
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(coords: [(f32, f32); 3]) -> [Point; 3] {
        coords.map(|(x, y)| Point::new(x, y))
    }

    #[test]
    fn affine_map_reproduces_vertices_exactly() {
        let src = tri([(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        let dst = tri([(2.0, 2.0), (12.0, 2.0), (2.0, 12.0)]);

        let map = AffineMap::from_triangles(src, dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let (x, y) = map.apply(s.x, s.y);
            assert!((x - d.x).abs() < 1e-4);
            assert!((y - d.y).abs() < 1e-4);
        }
    }

    #[test]
    fn affine_map_handles_rotation_and_shear() {
        let src = tri([(1.0, 1.0), (5.0, 2.0), (2.0, 6.0)]);
        let dst = tri([(4.0, -1.0), (9.0, 3.0), (0.0, 7.0)]);

        let map = AffineMap::from_triangles(src, dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let (x, y) = map.apply(s.x, s.y);
            assert!((x - d.x).abs() < 1e-3);
            assert!((y - d.y).abs() < 1e-3);
        }
    }

    #[test]
    fn collinear_source_triangle_has_no_map() {
        let src = tri([(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)]);
        let dst = tri([(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        assert!(AffineMap::from_triangles(src, dst).is_none());
    }

    #[test]
    fn bilinear_sampling_interpolates_between_pixels() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([0, 0, 0]));
        img.put_pixel(1, 0, image::Rgb([100, 200, 50]));

        let sample = sample_bilinear(&img, 0.5, 0.0);
        assert!((sample[0] - 50.0).abs() < 1e-4);
        assert!((sample[1] - 100.0).abs() < 1e-4);
        assert!((sample[2] - 25.0).abs() < 1e-4);

        // Out-of-bounds coordinates clamp to the border pixel.
        let clamped = sample_bilinear(&img, -3.0, 7.0);
        assert!((clamped[0] - 0.0).abs() < 1e-4);
    }

    #[test]
    fn alpha_zero_copies_only_image_a() {
        let img_a = RgbImage::from_pixel(40, 40, image::Rgb([100, 150, 200]));
        let img_b = RgbImage::from_pixel(40, 40, image::Rgb([10, 20, 30]));
        let mut canvas = RgbImage::new(40, 40);

        let t = tri([(5.0, 5.0), (35.0, 5.0), (5.0, 35.0)]);
        assert!(morph_triangle(&img_a, &img_b, &mut canvas, t, t, t, 0.0));

        assert_eq!(*canvas.get_pixel(10, 10), image::Rgb([100, 150, 200]));
        // Pixels outside the triangle stay at the sentinel.
        assert_eq!(*canvas.get_pixel(39, 39), image::Rgb([0, 0, 0]));
    }

    #[test]
    fn alpha_one_copies_only_image_b() {
        let img_a = RgbImage::from_pixel(40, 40, image::Rgb([100, 150, 200]));
        let img_b = RgbImage::from_pixel(40, 40, image::Rgb([10, 20, 30]));
        let mut canvas = RgbImage::new(40, 40);

        let t = tri([(5.0, 5.0), (35.0, 5.0), (5.0, 35.0)]);
        assert!(morph_triangle(&img_a, &img_b, &mut canvas, t, t, t, 1.0));

        assert_eq!(*canvas.get_pixel(10, 10), image::Rgb([10, 20, 30]));
    }

    #[test]
    fn halfway_blend_mixes_both_sources() {
        let img_a = RgbImage::from_pixel(20, 20, image::Rgb([200, 0, 100]));
        let img_b = RgbImage::from_pixel(20, 20, image::Rgb([0, 200, 100]));
        let mut canvas = RgbImage::new(20, 20);

        let t = tri([(1.0, 1.0), (18.0, 1.0), (1.0, 18.0)]);
        assert!(morph_triangle(&img_a, &img_b, &mut canvas, t, t, t, 0.5));

        assert_eq!(*canvas.get_pixel(5, 5), image::Rgb([100, 100, 100]));
    }

    #[test]
    fn degenerate_triangles_are_skipped() {
        let img_a = RgbImage::new(20, 20);
        let img_b = RgbImage::new(20, 20);
        let mut canvas = RgbImage::new(20, 20);

        let flat = tri([(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let ok = tri([(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);

        assert!(!morph_triangle(&img_a, &img_b, &mut canvas, flat, ok, ok, 0.5));
        assert!(!morph_triangle(&img_a, &img_b, &mut canvas, ok, flat, ok, 0.5));
        assert!(!morph_triangle(&img_a, &img_b, &mut canvas, ok, ok, flat, 0.5));
    }

    #[test]
    fn warp_translates_source_patch() {
        // A 10px translation: target triangle samples A shifted by (-10, 0).
        let mut img_a = RgbImage::new(40, 40);
        for y in 0..40 {
            for x in 0..40 {
                #[allow(clippy::cast_possible_truncation)]
                img_a.put_pixel(x, y, image::Rgb([(x * 6) as u8, (y * 6) as u8, 0]));
            }
        }
        let img_b = img_a.clone();
        let mut canvas = RgbImage::new(40, 40);

        let t_src = tri([(2.0, 2.0), (22.0, 2.0), (2.0, 22.0)]);
        let t_dst = tri([(12.0, 2.0), (32.0, 2.0), (12.0, 22.0)]);
        assert!(morph_triangle(&img_a, &img_b, &mut canvas, t_src, t_src, t_dst, 0.0));

        assert_eq!(*canvas.get_pixel(15, 5), *img_a.get_pixel(5, 5));
        assert_eq!(*canvas.get_pixel(20, 10), *img_a.get_pixel(10, 10));
    }

    #[test]
    fn background_fill_blends_untouched_pixels_only() {
        let img_a = RgbImage::from_pixel(10, 10, image::Rgb([100, 100, 100]));
        let img_b = RgbImage::from_pixel(10, 10, image::Rgb([200, 200, 200]));
        let mut canvas = RgbImage::new(10, 10);
        canvas.put_pixel(3, 3, image::Rgb([7, 7, 7]));

        let filled = fill_background(&mut canvas, &img_a, &img_b, 0.5);

        assert_eq!(filled, 99);
        assert_eq!(*canvas.get_pixel(3, 3), image::Rgb([7, 7, 7]));
        assert_eq!(*canvas.get_pixel(0, 0), image::Rgb([150, 150, 150]));
    }

    #[test]
    fn background_fill_endpoints_match_sources() {
        let img_a = RgbImage::from_pixel(4, 4, image::Rgb([11, 22, 33]));
        let img_b = RgbImage::from_pixel(4, 4, image::Rgb([99, 88, 77]));

        let mut canvas = RgbImage::new(4, 4);
        fill_background(&mut canvas, &img_a, &img_b, 0.0);
        assert_eq!(*canvas.get_pixel(2, 2), image::Rgb([11, 22, 33]));

        let mut canvas = RgbImage::new(4, 4);
        fill_background(&mut canvas, &img_a, &img_b, 1.0);
        assert_eq!(*canvas.get_pixel(2, 2), image::Rgb([99, 88, 77]));
    }
}
