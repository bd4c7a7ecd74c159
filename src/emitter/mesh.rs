//! Mesh source data and the registry emitters build from.

use std::collections::HashMap;

use glam::Vec3;

/// Raw triangle-mesh data for a named resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals; computed on demand when absent.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: None,
            indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// True when the index list forms whole triangles that all refer to
    /// existing vertices.
    pub fn is_valid(&self) -> bool {
        self.indices.len() % 3 == 0
            && self
                .indices
                .iter()
                .all(|&i| (i as usize) < self.positions.len())
    }

    /// Smooth per-vertex normals accumulated from face cross products
    /// (larger faces weigh more). Vertices touched by no face get +Y.
    /// Returns false without touching `normals` when the mesh is invalid.
    pub fn compute_normals(&mut self) -> bool {
        if !self.is_valid() {
            return false;
        }
        self.normals = Some(smoothed_normals(&self.positions, &self.indices));
        true
    }
}

/// Area-weighted vertex normals for an already validated index list.
pub(crate) fn smoothed_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let p0 = Vec3::from(positions[i0]);
        let p1 = Vec3::from(positions[i1]);
        let p2 = Vec3::from(positions[i2]);
        let face = (p1 - p0).cross(p2 - p0);
        acc[i0] += face;
        acc[i1] += face;
        acc[i2] += face;
    }
    acc.into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO {
                [0.0, 1.0, 0.0]
            } else {
                n.to_array()
            }
        })
        .collect()
}

/// An axis-aligned box centered at the origin, with per-face normals so
/// emission directions match the faces exactly.
pub fn make_box(size: [f32; 3]) -> MeshData {
    let [hx, hy, hz] = [size[0] * 0.5, size[1] * 0.5, size[2] * 0.5];
    // (face normal, corners counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [1.0, 0.0, 0.0],
            [[hx, -hy, -hz], [hx, hy, -hz], [hx, hy, hz], [hx, -hy, hz]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-hx, -hy, hz], [-hx, hy, hz], [-hx, hy, -hz], [-hx, -hy, -hz]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-hx, hy, -hz], [-hx, hy, hz], [hx, hy, hz], [hx, hy, -hz]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-hx, -hy, hz], [-hx, -hy, -hz], [hx, -hy, -hz], [hx, -hy, hz]],
        ),
        (
            [0.0, 0.0, 1.0],
            [[-hx, -hy, hz], [hx, -hy, hz], [hx, hy, hz], [-hx, hy, hz]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[hx, -hy, -hz], [-hx, -hy, -hz], [-hx, hy, -hz], [hx, hy, -hz]],
        ),
    ];

    let mut mesh = MeshData::default();
    let mut normals = Vec::with_capacity(24);
    for (normal, corners) in faces {
        let base = mesh.positions.len() as u32;
        mesh.positions.extend(corners);
        normals.extend([normal; 4]);
        mesh.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh.normals = Some(normals);
    mesh
}

/// A flat grid in the XZ plane with +Y normals, `divisions` quads per axis.
pub fn make_plane(size: [f32; 2], divisions: [u32; 2]) -> MeshData {
    let (dx, dz) = (divisions[0].max(1), divisions[1].max(1));
    let mut mesh = MeshData::default();
    for iz in 0..=dz {
        for ix in 0..=dx {
            let x = (ix as f32 / dx as f32 - 0.5) * size[0];
            let z = (iz as f32 / dz as f32 - 0.5) * size[1];
            mesh.positions.push([x, 0.0, z]);
        }
    }
    let stride = dx + 1;
    for iz in 0..dz {
        for ix in 0..dx {
            let a = iz * stride + ix;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            mesh.indices.extend([a, c, b, b, c, d]);
        }
    }
    mesh.normals = Some(vec![[0.0, 1.0, 0.0]; mesh.positions.len()]);
    mesh
}

/// Named mesh registry, the stand-in for an engine resource cache.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: HashMap<String, MeshData>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, mesh: MeshData) {
        self.meshes.insert(name.into(), mesh);
    }

    pub fn get(&self, name: &str) -> Option<&MeshData> {
        self.meshes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn box_counts() {
        let mesh = make_box([2.0, 2.0, 2.0]);
        assert_eq!(mesh.positions.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.is_valid());
    }

    #[test]
    fn box_normals_are_axis_aligned() {
        let mesh = make_box([1.0, 1.0, 1.0]);
        for n in mesh.normals.as_ref().unwrap() {
            let v = Vec3::from(*n);
            assert_approx_eq!(v.length(), 1.0, 1e-6);
            let axis_hits = n.iter().filter(|c| c.abs() == 1.0).count();
            assert_eq!(axis_hits, 1, "box normal should sit on one axis: {n:?}");
        }
    }

    #[test]
    fn plane_counts_and_extents() {
        let mesh = make_plane([4.0, 2.0], [2, 1]);
        assert_eq!(mesh.positions.len(), 6);
        assert_eq!(mesh.triangle_count(), 4);
        let xs: Vec<f32> = mesh.positions.iter().map(|p| p[0]).collect();
        assert!(xs.iter().all(|&x| (-2.0..=2.0).contains(&x)));
    }

    #[test]
    fn compute_normals_flat_triangle() {
        let mut mesh = MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            vec![0, 1, 2],
        );
        assert!(mesh.compute_normals());
        for n in mesh.normals.as_ref().unwrap() {
            assert_approx_eq!(n[1], 1.0, 1e-6);
        }
    }

    #[test]
    fn compute_normals_rejects_bad_indices() {
        let mut mesh = MeshData::new(vec![[0.0; 3]; 3], vec![0, 1, 7]);
        assert!(!mesh.compute_normals());
        assert!(mesh.normals.is_none());

        let mut mesh = MeshData::new(vec![[0.0; 3]; 3], vec![0, 1]);
        assert!(!mesh.compute_normals());
    }

    #[test]
    fn isolated_vertex_gets_up_normal() {
        let mut mesh = MeshData::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 0.0, -1.0],
                [9.0, 9.0, 9.0],
            ],
            vec![0, 1, 2],
        );
        assert!(mesh.compute_normals());
        assert_eq!(mesh.normals.as_ref().unwrap()[3], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn library_lookup() {
        let mut library = MeshLibrary::new();
        assert!(library.is_empty());
        library.insert("crystal", make_box([1.0, 1.0, 1.0]));
        assert!(library.contains("crystal"));
        assert_eq!(library.len(), 1);
        assert_eq!(library.get("crystal").unwrap().triangle_count(), 12);
        assert!(library.get("missing").is_none());
    }
}
