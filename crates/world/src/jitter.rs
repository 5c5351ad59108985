//! Fixed-seed deterministic jitter noise.
//!
//! One noise source, seeded with 42, is shared by height-offset smoothing,
//! biome-blend jitter and border-carving jitter. Reproducibility across
//! runs depends on every consumer using this same source.

use noise::{NoiseFn, Perlin};

/// Seed shared by every blending jitter consumer.
pub const BLEND_NOISE_SEED: u32 = 42;

/// Input scale keeping integer block/quart queries off the noise lattice,
/// where gradient noise would degenerate to zero.
const SHIFT_FREQUENCY: f64 = 0.177;

/// Deterministic coordinate jitter for blending boundaries.
#[derive(Debug, Clone, Copy)]
pub struct JitterNoise {
    perlin: Perlin,
}

impl JitterNoise {
    /// The fixed-seed jitter source.
    pub fn new() -> Self {
        Self {
            perlin: Perlin::new(BLEND_NOISE_SEED),
        }
    }

    /// Jitter value in roughly `[-1, 1]` for a coordinate triple.
    pub fn shift(&self, a: f64, b: f64, c: f64) -> f64 {
        self.perlin.get([
            a * SHIFT_FREQUENCY,
            b * SHIFT_FREQUENCY,
            c * SHIFT_FREQUENCY,
        ])
    }
}

impl Default for JitterNoise {
    fn default() -> Self {
        Self::new()
    }
}
