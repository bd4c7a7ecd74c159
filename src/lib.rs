//! Ember: a particle-effect script compiler and mesh-surface emission sampler.

pub mod emitter;
pub mod script;
