//! The mesh-surface emitter: configuration, snapshot builds, and the
//! per-particle emission hooks.

use glam::{Quat, Vec3};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::emitter::error::EmitterError;
use crate::emitter::mesh::{self, MeshLibrary};
use crate::emitter::snapshot::{Distribution, MeshSnapshot};
use crate::emitter::triangle::Triangle;
use crate::emitter::Particle;
use crate::script::{ObjectDef, PropertyDef, Value};

/// Script class this emitter materializes from.
pub const EMITTER_CLASS: &str = "mesh_surface_emitter";

pub const DEFAULT_SCALE: Vec3 = Vec3::ONE;

/// Emits particles from the surface of a named mesh.
///
/// Configure, then [`build`](Self::build) against a [`MeshLibrary`] to take
/// a snapshot of the transformed geometry. The emission hooks sample that
/// snapshot; configuration changes only take effect at the next build.
#[derive(Debug)]
pub struct MeshSurfaceEmitter {
    mesh_name: String,
    orientation: Quat,
    scale: Vec3,
    distribution: Distribution,
    use_normals: bool,
    snapshot: Option<MeshSnapshot>,
    rng: ChaCha8Rng,
    triangle_index: usize,
    pending_normal: Vec3,
    direction_set: bool,
}

impl MeshSurfaceEmitter {
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    /// Deterministic emitter for reproducible streams.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            mesh_name: String::new(),
            orientation: Quat::IDENTITY,
            scale: DEFAULT_SCALE,
            distribution: Distribution::default(),
            use_normals: true,
            snapshot: None,
            rng,
            triangle_index: 0,
            pending_normal: Vec3::ZERO,
            direction_set: false,
        }
    }

    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    pub fn set_mesh_name(&mut self, name: impl Into<String>) {
        self.mesh_name = name.into();
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation;
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn set_distribution(&mut self, distribution: Distribution) {
        self.distribution = distribution;
    }

    pub fn use_normals(&self) -> bool {
        self.use_normals
    }

    pub fn set_use_normals(&mut self, use_normals: bool) {
        self.use_normals = use_normals;
    }

    pub fn is_built(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&MeshSnapshot> {
        self.snapshot.as_ref()
    }

    /// Index of the triangle the last emitted particle came from.
    pub fn triangle_index(&self) -> usize {
        self.triangle_index
    }

    /// Drops the snapshot, returning the emitter to its unbuilt state.
    pub fn reset(&mut self) {
        self.snapshot = None;
        self.triangle_index = 0;
        self.direction_set = false;
    }

    /// Points the emitter at `name` and builds immediately.
    pub fn set_mesh(
        &mut self,
        name: impl Into<String>,
        library: &MeshLibrary,
    ) -> Result<(), EmitterError> {
        self.mesh_name = name.into();
        self.build(library)
    }

    /// Takes a fresh snapshot of the named mesh under the current
    /// orientation, scale, and distribution. On failure the previous
    /// snapshot stays in place.
    pub fn build(&mut self, library: &MeshLibrary) -> Result<(), EmitterError> {
        let mesh = library
            .get(&self.mesh_name)
            .ok_or_else(|| EmitterError::MeshNotFound(self.mesh_name.clone()))?;
        if !mesh.is_valid() {
            return Err(EmitterError::InvalidMesh {
                name: self.mesh_name.clone(),
                reason: "index list is broken or refers to missing vertices".to_string(),
            });
        }

        let computed;
        let normals: &[[f32; 3]] = match mesh.normals.as_deref() {
            Some(normals) if normals.len() == mesh.positions.len() => normals,
            _ => {
                computed = mesh::smoothed_normals(&mesh.positions, &mesh.indices);
                &computed
            }
        };

        let inv_scale = inverse_scale(self.scale);
        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        for tri in mesh.indices.chunks_exact(3) {
            let idx = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let p = idx.map(|i| self.orientation * (self.scale * Vec3::from(mesh.positions[i])));
            let n = idx.map(|i| {
                (self.orientation * (Vec3::from(normals[i]) * inv_scale)).normalize_or_zero()
            });
            triangles.push(Triangle::new(p[0], p[1], p[2], n[0], n[1], n[2]));
        }

        debug!(
            "built surface snapshot of '{}': {} triangles, {} distribution",
            self.mesh_name,
            triangles.len(),
            self.distribution.as_str()
        );
        self.snapshot = Some(MeshSnapshot::new(triangles, self.distribution));
        self.triangle_index = 0;
        self.direction_set = false;
        Ok(())
    }

    /// Emission hook: places the particle on the mesh surface. Returns
    /// false (leaving the particle untouched) when no snapshot is built
    /// or the snapshot holds no triangles.
    pub fn init_particle_position(&mut self, particle: &mut Particle) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return false;
        };
        let Some(index) = snapshot.random_triangle_index(&mut self.rng) else {
            return false;
        };
        let Ok(sample) = snapshot.random_position_and_normal(&mut self.rng, index) else {
            return false;
        };
        self.triangle_index = index;
        particle.position = sample.position;
        if self.use_normals {
            self.pending_normal = sample.normal;
            self.direction_set = true;
        }
        true
    }

    /// Emission hook: points the particle along the normal sampled by the
    /// preceding position hook. Returns false when normals are disabled
    /// or no fresh sample is pending.
    pub fn init_particle_direction(&mut self, particle: &mut Particle) -> bool {
        if !(self.use_normals && self.direction_set) {
            return false;
        }
        particle.direction = self.pending_normal;
        self.direction_set = false;
        true
    }

    /// Builds an emitter from a materialized `mesh_surface_emitter`
    /// definition.
    pub fn from_def(def: &ObjectDef) -> Result<Self, EmitterError> {
        if def.class != EMITTER_CLASS {
            return Err(EmitterError::Definition(format!(
                "expected class '{EMITTER_CLASS}', got '{}'",
                def.class
            )));
        }
        let mesh_name = def
            .property("mesh_name")
            .and_then(|p| p.values.first())
            .and_then(Value::as_str)
            .ok_or_else(|| EmitterError::Definition("missing 'mesh_name' property".to_string()))?;

        let seed = def
            .property("seed")
            .and_then(|p| p.values.first())
            .and_then(Value::as_u64);
        let mut emitter = match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        };
        emitter.set_mesh_name(mesh_name);

        if let Some(prop) = def.property("distribution") {
            let word = prop.values.first().and_then(Value::as_str).ok_or_else(|| {
                EmitterError::Definition("'distribution' takes one word".to_string())
            })?;
            emitter.set_distribution(word.parse()?);
        }
        if let Some(prop) = def.property("scale") {
            let v = floats::<3>(prop)?;
            emitter.set_scale(Vec3::from_array(v));
        }
        if let Some(prop) = def.property("orientation") {
            // Scripts write quaternions w x y z.
            let v = floats::<4>(prop)?;
            let quat = Quat::from_xyzw(v[1], v[2], v[3], v[0]);
            if quat.length_squared() <= 0.0 {
                return Err(EmitterError::Definition(
                    "'orientation' must be a non-zero quaternion".to_string(),
                ));
            }
            emitter.set_orientation(quat.normalize());
        }
        if let Some(prop) = def.property("use_normals") {
            let flag = prop.values.first().and_then(Value::as_bool).ok_or_else(|| {
                EmitterError::Definition("'use_normals' takes true or false".to_string())
            })?;
            emitter.set_use_normals(flag);
        }
        Ok(emitter)
    }
}

impl Default for MeshSurfaceEmitter {
    fn default() -> Self {
        Self::new()
    }
}

fn floats<const N: usize>(prop: &PropertyDef) -> Result<[f32; N], EmitterError> {
    if prop.values.len() != N {
        return Err(EmitterError::Definition(format!(
            "'{}' expects {N} numbers, got {}",
            prop.name,
            prop.values.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(&prop.values) {
        *slot = value.as_f32().ok_or_else(|| {
            EmitterError::Definition(format!("'{}' expects numeric values", prop.name))
        })?;
    }
    Ok(out)
}

fn inverse_scale(scale: Vec3) -> Vec3 {
    Vec3::new(
        if scale.x != 0.0 { scale.x.recip() } else { 0.0 },
        if scale.y != 0.0 { scale.y.recip() } else { 0.0 },
        if scale.z != 0.0 { scale.z.recip() } else { 0.0 },
    )
}
