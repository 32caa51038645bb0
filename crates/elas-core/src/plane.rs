//! C5: per-triangle disparity plane fitting.

use crate::support::SupportPoint;

/// A triangle over three support-point indices, carrying both its
/// left-referenced and right-referenced plane fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub c1: u32,
    pub c2: u32,
    pub c3: u32,
    /// Left-referenced plane: `d = a*u + b*v + c`.
    pub plane1: (f32, f32, f32),
    /// Right-referenced plane (u measured as `u - d`).
    pub plane2: (f32, f32, f32),
}

/// Solve `a*u_i + b*v_i + c = d_i` for `i in {1,2,3}` via Cramer's rule.
/// Returns `(0,0,0)` (a degenerate/flagged plane) when the system is
/// singular, matching the original's Gauss-Jordan failure path.
fn fit_plane(pts: [(f32, f32, f32); 3]) -> (f32, f32, f32) {
    let [(u1, v1, d1), (u2, v2, d2), (u3, v3, d3)] = pts;

    // A = [[u1 v1 1] [u2 v2 1] [u3 v3 1]], solve A x = [d1 d2 d3]^T.
    let det = u1 * (v2 - v3) - v1 * (u2 - u3) + (u2 * v3 - u3 * v2);
    const EPS: f32 = 1e-6;
    if det.abs() < EPS {
        return (0.0, 0.0, 0.0);
    }

    let a = (d1 * (v2 - v3) - v1 * (d2 - d3) + (d2 * v3 - d3 * v2)) / det;
    let b = (u1 * (d2 - d3) - d1 * (u2 - u3) + (u2 * d3 - u3 * d2)) / det;
    let c = (u1 * (v2 * d3 - v3 * d2) - v1 * (u2 * d3 - u3 * d2) + d1 * (u2 * v3 - u3 * v2)) / det;
    (a, b, c)
}

/// C5 entry point: fit both left- and right-referenced planes for every
/// triangle produced by the Delaunay layer.
pub fn compute_disparity_planes(supports: &[SupportPoint], tris: &[[u32; 3]]) -> Vec<Triangle> {
    tris.iter()
        .map(|&[c1, c2, c3]| {
            let p1 = supports[c1 as usize];
            let p2 = supports[c2 as usize];
            let p3 = supports[c3 as usize];

            let plane1 = fit_plane([
                (p1.u as f32, p1.v as f32, p1.d as f32),
                (p2.u as f32, p2.v as f32, p2.d as f32),
                (p3.u as f32, p3.v as f32, p3.d as f32),
            ]);

            let plane2 = fit_plane([
                ((p1.u - p1.d) as f32, p1.v as f32, p1.d as f32),
                ((p2.u - p2.d) as f32, p2.v as f32, p2.d as f32),
                ((p3.u - p3.d) as f32, p3.v as f32, p3.d as f32),
            ]);

            Triangle {
                c1,
                c2,
                c3,
                plane1,
                plane2,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_an_exact_plane() {
        // d = 2u + 3v + 1
        let pts = [(0.0, 0.0, 1.0), (1.0, 0.0, 3.0), (0.0, 1.0, 4.0)];
        let (a, b, c) = fit_plane(pts);
        assert!((a - 2.0).abs() < 1e-4);
        assert!((b - 3.0).abs() < 1e-4);
        assert!((c - 1.0).abs() < 1e-4);
    }

    #[test]
    fn collinear_points_yield_degenerate_plane() {
        let pts = [(0.0, 0.0, 0.0), (1.0, 0.0, 1.0), (2.0, 0.0, 2.0)];
        assert_eq!(fit_plane(pts), (0.0, 0.0, 0.0));
    }

    #[test]
    fn compute_disparity_planes_produces_one_entry_per_triangle() {
        let supports = vec![
            SupportPoint::new(0, 0, 5),
            SupportPoint::new(10, 0, 6),
            SupportPoint::new(0, 10, 7),
            SupportPoint::new(10, 10, 8),
        ];
        let tris = vec![[0, 1, 2], [1, 2, 3]];
        let planes = compute_disparity_planes(&supports, &tris);
        assert_eq!(planes.len(), 2);
    }
}
