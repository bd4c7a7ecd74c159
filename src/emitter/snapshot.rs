//! Frozen sampling table the emitter draws from.

use std::str::FromStr;

use rand::Rng;

use crate::emitter::error::EmitterError;
use crate::emitter::triangle::{PositionAndNormal, Triangle};

/// Standard deviations beyond which a gaussian draw is rethrown.
pub const DEFAULT_GAUSS_CUTOFF: f32 = 4.0;

/// Triangle-selection policy for surface emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Distribution {
    /// Every triangle equally likely, regardless of area.
    #[default]
    Homogeneous,
    /// Smaller triangles favored: inverse-area weights, table sorted
    /// ascending by area.
    Heterogeneous1,
    /// Larger triangles favored: area weights, table sorted descending.
    Heterogeneous2,
    /// Points come from triangle corners.
    Vertex,
    /// Points come from triangle edges.
    Edge,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Homogeneous => "homogeneous",
            Distribution::Heterogeneous1 => "heterogeneous_1",
            Distribution::Heterogeneous2 => "heterogeneous_2",
            Distribution::Vertex => "vertex",
            Distribution::Edge => "edge",
        }
    }
}

impl FromStr for Distribution {
    type Err = EmitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homogeneous" => Ok(Distribution::Homogeneous),
            "heterogeneous_1" => Ok(Distribution::Heterogeneous1),
            "heterogeneous_2" => Ok(Distribution::Heterogeneous2),
            "vertex" => Ok(Distribution::Vertex),
            "edge" => Ok(Distribution::Edge),
            other => Err(EmitterError::Definition(format!(
                "unknown distribution '{other}'"
            ))),
        }
    }
}

/// The emitter's view of a mesh at build time: transformed triangles
/// plus the cumulative selection table for the weighted distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSnapshot {
    triangles: Vec<Triangle>,
    distribution: Distribution,
    /// Cumulative selection weights, parallel to `triangles`. Empty for
    /// the uniform distributions.
    cumulative: Vec<f32>,
}

impl MeshSnapshot {
    pub fn new(mut triangles: Vec<Triangle>, distribution: Distribution) -> Self {
        let cumulative = match distribution {
            Distribution::Heterogeneous1 => {
                triangles.sort_by(|a, b| a.square_surface.total_cmp(&b.square_surface));
                cumulative_weights(&triangles, |t| {
                    if t.square_surface > 0.0 {
                        t.square_surface.sqrt().recip()
                    } else {
                        0.0
                    }
                })
            }
            Distribution::Heterogeneous2 => {
                triangles.sort_by(|a, b| b.square_surface.total_cmp(&a.square_surface));
                cumulative_weights(&triangles, |t| t.square_surface.sqrt())
            }
            _ => Vec::new(),
        };
        Self {
            triangles,
            distribution,
            cumulative,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle(&self, index: usize) -> Result<&Triangle, EmitterError> {
        self.triangles.get(index).ok_or(EmitterError::OutOfRange {
            index,
            count: self.triangles.len(),
        })
    }

    /// Total selection weight: the cumulative tail for weighted modes,
    /// the triangle count for uniform ones.
    pub fn total_weight(&self) -> f32 {
        match self.cumulative.last() {
            Some(&tail) => tail,
            None => self.triangles.len() as f32,
        }
    }

    /// The weight triangle `index` contributes to selection.
    pub fn selection_weight(&self, index: usize) -> Result<f32, EmitterError> {
        if index >= self.triangles.len() {
            return Err(EmitterError::OutOfRange {
                index,
                count: self.triangles.len(),
            });
        }
        Ok(if self.cumulative.is_empty() {
            1.0
        } else if index == 0 {
            self.cumulative[0]
        } else {
            self.cumulative[index] - self.cumulative[index - 1]
        })
    }

    /// Picks a triangle according to the distribution. `None` only when
    /// the snapshot holds no triangles.
    pub fn random_triangle_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if self.triangles.is_empty() {
            return None;
        }
        match self.distribution {
            Distribution::Heterogeneous1 | Distribution::Heterogeneous2 => {
                let total = self.total_weight();
                if total <= 0.0 {
                    return Some(0);
                }
                let t = gaussian_random(rng, total, DEFAULT_GAUSS_CUTOFF);
                // `<= t` steps over zero-weight spans, so degenerate
                // triangles are never drawn.
                let index = self.cumulative.partition_point(|&w| w <= t);
                if index == self.cumulative.len() {
                    // t landed exactly on the total; take the last entry
                    // that still carries weight.
                    Some(self.cumulative.partition_point(|&w| w < total))
                } else {
                    Some(index)
                }
            }
            _ => Some(rng.gen_range(0..self.triangles.len())),
        }
    }

    /// Samples a point and its emission normal on triangle `index`,
    /// honoring the vertex/edge distributions.
    pub fn random_position_and_normal<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        index: usize,
    ) -> Result<PositionAndNormal, EmitterError> {
        let tri = self.triangle(index)?;
        Ok(match self.distribution {
            Distribution::Vertex => tri.random_vertex(rng),
            Distribution::Edge => tri.random_edge_point(rng),
            _ => tri.random_surface_point(rng),
        })
    }
}

/// Folded normal draw, rethrown (never clamped) when it lands past
/// `cutoff` standard deviations, then rescaled into `[0, high]` with the
/// mass biased toward 0.
pub fn gaussian_random<R: Rng + ?Sized>(rng: &mut R, high: f32, cutoff: f32) -> f32 {
    if cutoff.is_nan() || cutoff <= 0.0 {
        return 0.0;
    }
    let g = loop {
        // Polar Box-Muller; pairs outside the unit disc are retried.
        let x = 2.0 * rng.gen::<f32>() - 1.0;
        let y = 2.0 * rng.gen::<f32>() - 1.0;
        let s = x * x + y * y;
        if s == 0.0 || s >= 1.0 {
            continue;
        }
        let g = (x * (-2.0 * s.ln() / s).sqrt()).abs();
        if g <= cutoff {
            break g;
        }
    };
    g * high / cutoff
}

fn cumulative_weights(triangles: &[Triangle], weight: impl Fn(&Triangle) -> f32) -> Vec<f32> {
    let mut running = 0.0;
    triangles
        .iter()
        .map(|t| {
            running += weight(t);
            running
        })
        .collect()
}
