//! Surface emission: placing particles on mesh geometry.
//!
//! [`MeshSurfaceEmitter`] snapshots a named mesh from a [`MeshLibrary`]
//! and hands out positions (and optionally directions) on its surface,
//! one particle at a time, according to a [`Distribution`].

use glam::Vec3;

pub mod error;
pub mod mesh;
pub mod snapshot;
pub mod surface;
pub mod triangle;

pub use error::EmitterError;
pub use mesh::{make_box, make_plane, MeshData, MeshLibrary};
pub use snapshot::{gaussian_random, Distribution, MeshSnapshot, DEFAULT_GAUSS_CUTOFF};
pub use surface::{MeshSurfaceEmitter, EMITTER_CLASS};
pub use triangle::{PositionAndNormal, Triangle};

/// The slice of particle state the emission hooks touch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub direction: Vec3,
}
