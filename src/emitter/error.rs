//! Error types for mesh-surface emission.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitterError {
    /// A triangle index past the end of the snapshot. Never clamped; the
    /// calling operation fails.
    OutOfRange { index: usize, count: usize },
    /// The named mesh is not present in the library.
    MeshNotFound(String),
    /// The mesh exists but its data cannot form triangles.
    InvalidMesh { name: String, reason: String },
    /// A materialized definition had the wrong shape for this emitter.
    Definition(String),
}

impl fmt::Display for EmitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitterError::OutOfRange { index, count } => {
                write!(f, "triangle index {index} out of range ({count} triangles)")
            }
            EmitterError::MeshNotFound(name) => {
                write!(f, "mesh '{name}' not found in library")
            }
            EmitterError::InvalidMesh { name, reason } => {
                write!(f, "mesh '{name}': {reason}")
            }
            EmitterError::Definition(message) => {
                write!(f, "invalid emitter definition: {message}")
            }
        }
    }
}

impl std::error::Error for EmitterError {}
