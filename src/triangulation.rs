//! Delaunay triangulation of the averaged landmark set.
//!
//! Incremental Bowyer-Watson insertion over a super-triangle. All storage is
//! `Vec`-based and points are inserted in index order, so a fixed input always
//! produces the same triangle list (required for reproducible meshes).

use crate::landmarks::Point;

/// Points closer than this per coordinate collapse to a single vertex.
///
/// Matches the 1 px vertex-matching tolerance of the classical OpenCV morph
/// pipeline; the later of two coincident landmarks is dropped silently.
const DUPLICATE_TOLERANCE: f32 = 1.0;

/// One face of the triangulation, as indices into the landmark set.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Triangle {
    /// First vertex index.
    pub a: usize,
    /// Second vertex index.
    pub b: usize,
    /// Third vertex index.
    pub c: usize,
}

impl From<[usize; 3]> for Triangle {
    fn from([a, b, c]: [usize; 3]) -> Self {
        Self { a, b, c }
    }
}

/// Local triangle over vertex-list indices (0..3 are the super-triangle).
#[derive(Debug, Clone, Copy)]
struct Face {
    v: [usize; 3],
}

/// Twice the signed area of `abc`; positive when counter-clockwise.
fn orient2d(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Whether `p` lies strictly inside the circumcircle of counter-clockwise `abc`.
fn in_circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64), p: (f64, f64)) -> bool {
    let (ax, ay) = (a.0 - p.0, a.1 - p.1);
    let (bx, by) = (b.0 - p.0, b.1 - p.1);
    let (cx, cy) = (c.0 - p.0, c.1 - p.1);

    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    det > 0.0
}

/// Build a Delaunay triangulation of `points`, bounded by `[0, width) x [0, height)`.
///
/// Returned triangles index into `points` in its original order. Points
/// outside the rectangle and near-duplicates of earlier points are skipped
/// silently, so some indices may never appear in the mesh. Triangles are
/// emitted in discovery order with counter-clockwise vertex winding; the
/// order carries no meaning but is stable for a given input.
#[must_use]
pub fn triangulate(points: &[Point], width: u32, height: u32) -> Vec<Triangle> {
    let w = f64::from(width);
    let h = f64::from(height);

    // Super-triangle comfortably enclosing the canvas rectangle.
    let margin = 10.0 * w.max(h).max(1.0);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let mut verts: Vec<(f64, f64)> = vec![
        (cx - 2.0 * margin, cy - margin),
        (cx + 2.0 * margin, cy - margin),
        (cx, cy + 2.0 * margin),
    ];
    // Landmark index behind each inserted vertex (verts[i + 3] <-> original[i]).
    let mut original: Vec<usize> = Vec::with_capacity(points.len());
    let mut kept: Vec<Point> = Vec::with_capacity(points.len());

    let mut faces = vec![Face { v: [0, 1, 2] }];

    for (index, &point) in points.iter().enumerate() {
        if point.x < 0.0 || point.y < 0.0 || f64::from(point.x) >= w || f64::from(point.y) >= h {
            continue;
        }
        let duplicate = kept.iter().any(|q| {
            (q.x - point.x).abs() < DUPLICATE_TOLERANCE
                && (q.y - point.y).abs() < DUPLICATE_TOLERANCE
        });
        if duplicate {
            continue;
        }

        kept.push(point);
        original.push(index);
        let p = (f64::from(point.x), f64::from(point.y));
        let local = verts.len();
        verts.push(p);

        insert_vertex(local, p, &verts, &mut faces);
    }

    faces
        .iter()
        .filter(|f| f.v.iter().all(|&v| v >= 3))
        .map(|f| Triangle {
            a: original[f.v[0] - 3],
            b: original[f.v[1] - 3],
            c: original[f.v[2] - 3],
        })
        .collect()
}

/// One Bowyer-Watson insertion step: carve the cavity of faces whose
/// circumcircle contains `p` and re-triangulate its boundary against `p`.
fn insert_vertex(local: usize, p: (f64, f64), verts: &[(f64, f64)], faces: &mut Vec<Face>) {
    let mut bad = Vec::new();
    for (i, face) in faces.iter().enumerate() {
        let [a, b, c] = face.v;
        if in_circumcircle(verts[a], verts[b], verts[c], p) {
            bad.push(i);
        }
    }

    // Cavity boundary: edges belonging to exactly one bad face, in the order
    // they are first seen so the output stays deterministic.
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(bad.len() * 3);
    for &i in &bad {
        let [a, b, c] = faces[i].v;
        edges.push((a, b));
        edges.push((b, c));
        edges.push((c, a));
    }
    let boundary: Vec<(usize, usize)> = edges
        .iter()
        .filter(|&&(a, b)| {
            edges
                .iter()
                .filter(|&&(x, y)| (x, y) == (a, b) || (x, y) == (b, a))
                .count()
                == 1
        })
        .copied()
        .collect();

    for &i in bad.iter().rev() {
        faces.remove(i);
    }

    for (a, b) in boundary {
        let mut v = [a, b, local];
        if orient2d(verts[v[0]], verts[v[1]], verts[v[2]]) < 0.0 {
            v.swap(1, 2);
        }
        faces.push(Face { v });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_points() -> Vec<Point> {
        vec![
            Point::new(10.0, 10.0),
            Point::new(90.0, 10.0),
            Point::new(90.0, 90.0),
            Point::new(10.0, 90.0),
        ]
    }

    fn triangle_area(points: &[Point], t: &Triangle) -> f64 {
        let a = points[t.a];
        let b = points[t.b];
        let c = points[t.c];
        (orient2d(
            (f64::from(a.x), f64::from(a.y)),
            (f64::from(b.x), f64::from(b.y)),
            (f64::from(c.x), f64::from(c.y)),
        ) / 2.0)
            .abs()
    }

    #[test]
    fn square_splits_into_two_triangles() {
        let points = square_points();
        let mesh = triangulate(&points, 100, 100);

        assert_eq!(mesh.len(), 2);
        let total: f64 = mesh.iter().map(|t| triangle_area(&points, t)).sum();
        assert!((total - 6400.0).abs() < 1e-6);
    }

    #[test]
    fn vertex_indices_stay_in_range() {
        let points = vec![
            Point::new(5.0, 5.0),
            Point::new(50.0, 8.0),
            Point::new(95.0, 20.0),
            Point::new(30.0, 60.0),
            Point::new(70.0, 75.0),
            Point::new(12.0, 88.0),
        ];
        let mesh = triangulate(&points, 100, 100);

        assert!(!mesh.is_empty());
        for t in &mesh {
            assert!(t.a < points.len());
            assert!(t.b < points.len());
            assert!(t.c < points.len());
            assert!(t.a != t.b && t.b != t.c && t.a != t.c);
        }
    }

    #[test]
    fn empty_circumcircle_property_holds() {
        let points = vec![
            Point::new(5.0, 5.0),
            Point::new(50.0, 8.0),
            Point::new(95.0, 20.0),
            Point::new(30.0, 60.0),
            Point::new(70.0, 75.0),
            Point::new(12.0, 88.0),
            Point::new(55.0, 40.0),
        ];
        let mesh = triangulate(&points, 100, 100);

        for t in &mesh {
            let a = points[t.a];
            let b = points[t.b];
            let c = points[t.c];
            let mut abc = [
                (f64::from(a.x), f64::from(a.y)),
                (f64::from(b.x), f64::from(b.y)),
                (f64::from(c.x), f64::from(c.y)),
            ];
            if orient2d(abc[0], abc[1], abc[2]) < 0.0 {
                abc.swap(1, 2);
            }
            for (i, p) in points.iter().enumerate() {
                if i == t.a || i == t.b || i == t.c {
                    continue;
                }
                assert!(
                    !in_circumcircle(abc[0], abc[1], abc[2], (f64::from(p.x), f64::from(p.y))),
                    "point {i} inside circumcircle of {t:?}"
                );
            }
        }
    }

    #[test]
    fn output_is_deterministic() {
        let points = vec![
            Point::new(5.0, 5.0),
            Point::new(50.0, 8.0),
            Point::new(95.0, 20.0),
            Point::new(30.0, 60.0),
            Point::new(70.0, 75.0),
        ];
        let first = triangulate(&points, 100, 100);
        let second = triangulate(&points, 100, 100);
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_points_are_dropped() {
        let mut points = square_points();
        points.push(Point::new(10.2, 10.3)); // within tolerance of index 0

        let mesh = triangulate(&points, 100, 100);
        assert_eq!(mesh.len(), 2);
        for t in &mesh {
            assert!(t.a != 4 && t.b != 4 && t.c != 4);
        }
    }

    #[test]
    fn out_of_rect_points_are_dropped() {
        let mut points = square_points();
        points.push(Point::new(150.0, 50.0));
        points.push(Point::new(-3.0, 50.0));

        let mesh = triangulate(&points, 100, 100);
        for t in &mesh {
            assert!(t.a < 4 && t.b < 4 && t.c < 4);
        }
    }

    #[test]
    fn fewer_than_three_points_yield_empty_mesh() {
        assert!(triangulate(&[], 100, 100).is_empty());
        assert!(triangulate(&[Point::new(1.0, 1.0)], 100, 100).is_empty());
        assert!(
            triangulate(&[Point::new(1.0, 1.0), Point::new(9.0, 9.0)], 100, 100).is_empty()
        );
    }

    #[test]
    fn dense_border_grid_covers_most_of_the_rectangle() {
        let mut points = Vec::new();
        for gy in 0..5 {
            for gx in 0..5 {
                #[allow(clippy::cast_precision_loss)]
                points.push(Point::new(gx as f32 * 24.75, gy as f32 * 24.75));
            }
        }
        let mesh = triangulate(&points, 100, 100);

        let total: f64 = mesh.iter().map(|t| triangle_area(&points, t)).sum();
        let hull_area = f64::from(24.75_f32 * 4.0) * f64::from(24.75_f32 * 4.0);
        assert!((total - hull_area).abs() < 1.0);
    }
}
