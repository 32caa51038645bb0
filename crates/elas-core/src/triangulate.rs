//! C4: the Delaunay triangulation collaborator.
//!
//! `spec.md` §6 treats 2-D Delaunay triangulation as an external
//! collaborator — the core needs the contract, not an in-tree algorithm.
//! [`Triangulator`] is that contract; [`DelaunatorTriangulation`] is a
//! concrete implementation backed by the `delaunator` crate (a real,
//! published 2-D Delaunay triangulation crate — the teacher workspace has
//! no equivalent dependency to align with, so this one is imported fresh,
//! the way the spec's own §6 suggests "an existing implementation... e.g.
//! Shewchuk's Triangle" would be plugged in).

/// Triangulates a set of 2-D points, returning index triples into the
/// input slice. Implementations are free to emit degenerate triangles for
/// (near-)collinear input — the plane fitter (`plane.rs`) is responsible
/// for flagging those, not the triangulator.
pub trait Triangulator {
    fn triangulate(&self, points: &[(f32, f32)]) -> Vec<[u32; 3]>;
}

/// Default triangulator, backed by `delaunator`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelaunatorTriangulation;

impl Triangulator for DelaunatorTriangulation {
    fn triangulate(&self, points: &[(f32, f32)]) -> Vec<[u32; 3]> {
        if points.len() < 3 {
            return Vec::new();
        }
        let pts: Vec<delaunator::Point> = points
            .iter()
            .map(|&(x, y)| delaunator::Point {
                x: x as f64,
                y: y as f64,
            })
            .collect();
        let result = delaunator::triangulate(&pts);
        result
            .triangles
            .chunks_exact(3)
            .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangulates_a_simple_quad() {
        let pts = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let tri = DelaunatorTriangulation.triangulate(&pts);
        // A convex quad splits into exactly two triangles.
        assert_eq!(tri.len(), 2);
        for t in &tri {
            assert!(t.iter().all(|&i| (i as usize) < pts.len()));
        }
    }

    #[test]
    fn fewer_than_three_points_yields_no_triangles() {
        let pts = [(0.0, 0.0), (1.0, 1.0)];
        assert!(DelaunatorTriangulation.triangulate(&pts).is_empty());
    }
}
