//! Per-triangle geometry cached for sampling.

use glam::Vec3;
use rand::Rng;

/// A sampled point paired with the emission direction at that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAndNormal {
    pub position: Vec3,
    pub normal: Vec3,
}

/// One triangle with everything sampling needs precomputed: vertex and
/// edge normals, the face normal, and the squared surface area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v1: Vec3,
    pub v2: Vec3,
    pub v3: Vec3,
    pub vn1: Vec3,
    pub vn2: Vec3,
    pub vn3: Vec3,
    pub en1: Vec3,
    pub en2: Vec3,
    pub en3: Vec3,
    pub surface_normal: Vec3,
    pub square_surface: f32,
}

impl Triangle {
    pub fn new(v1: Vec3, v2: Vec3, v3: Vec3, vn1: Vec3, vn2: Vec3, vn3: Vec3) -> Self {
        let cross = (v2 - v1).cross(v3 - v1);
        Self {
            v1,
            v2,
            v3,
            vn1,
            vn2,
            vn3,
            en1: edge_normal(v1, v2),
            en2: edge_normal(v2, v3),
            en3: edge_normal(v3, v1),
            surface_normal: cross.normalize_or_zero(),
            // |cross| is twice the area, so this is (2A)^2 / 4 = A^2.
            square_surface: 0.25 * cross.length_squared(),
        }
    }

    /// Uniform point on the surface with the normal interpolated from
    /// the vertex normals at the same barycentric coordinates.
    pub fn random_surface_point<R: Rng + ?Sized>(&self, rng: &mut R) -> PositionAndNormal {
        let mut a = rng.gen::<f32>();
        let mut b = rng.gen::<f32>();
        // Fold draws outside the triangle back across the diagonal.
        if a + b > 1.0 {
            a = 1.0 - a;
            b = 1.0 - b;
        }
        let c = 1.0 - a - b;
        PositionAndNormal {
            position: self.v1 * c + self.v2 * a + self.v3 * b,
            normal: (self.vn1 * c + self.vn2 * a + self.vn3 * b).normalize_or_zero(),
        }
    }

    /// One of the three corners with its vertex normal.
    pub fn random_vertex<R: Rng + ?Sized>(&self, rng: &mut R) -> PositionAndNormal {
        let (position, normal) = match rng.gen_range(0..3u8) {
            0 => (self.v1, self.vn1),
            1 => (self.v2, self.vn2),
            _ => (self.v3, self.vn3),
        };
        PositionAndNormal { position, normal }
    }

    /// Uniform point along one of the three edges with that edge's normal.
    pub fn random_edge_point<R: Rng + ?Sized>(&self, rng: &mut R) -> PositionAndNormal {
        let t = rng.gen::<f32>();
        let (position, normal) = match rng.gen_range(0..3u8) {
            0 => (self.v1.lerp(self.v2, t), self.en1),
            1 => (self.v2.lerp(self.v3, t), self.en2),
            _ => (self.v3.lerp(self.v1, t), self.en3),
        };
        PositionAndNormal { position, normal }
    }
}

fn edge_normal(a: Vec3, b: Vec3) -> Vec3 {
    a.cross(b).normalize_or_zero()
}
