//! Seam utilities at the edge between legacy and newly generated chunks.
//!
//! Two concerns live here: re-queueing leaf and fluid blocks along the
//! seam so physics settles after blending, and shielding legacy chunk
//! volumes from cave carving so caves never slice through a blended
//! boundary.

use crate::chunk::{blend_sides, BlendSides, ChunkSource, GenerationRegion, CHUNK_SIZE_X, CHUNK_SIZE_Z};
use crate::jitter::JitterNoise;
use terraseam_core::coords::{BlockPos, ChunkPos};

/// Per-coordinate jitter amplitude applied before the cuboid distance
/// test, in blocks.
const CARVING_JITTER_AMPLITUDE: f64 = 4.0;

/// Blocks within this distance of a legacy chunk volume are protected
/// from carving.
const CARVING_PROTECTION_DISTANCE: f64 = 4.0;

/// Positions at the seam of the chunk at `pos` that need a scheduled tick
/// after blending: leaf and fluid blocks on the edges facing a differing
/// generation mode, or on all four edges when the chunk itself is legacy.
///
/// Returns nothing for chunks without blend data.
pub fn border_tick_positions<R: GenerationRegion>(region: &R, pos: ChunkPos) -> Vec<BlockPos> {
    let Some(chunk) = region.chunk(pos) else {
        return Vec::new();
    };
    let Some(cache) = chunk.blend_cache() else {
        return Vec::new();
    };
    let area = *cache.area();

    let mut edges = if chunk.is_legacy() {
        BlendSides::NORTH | BlendSides::SOUTH | BlendSides::WEST | BlendSides::EAST
    } else {
        BlendSides::empty()
    };
    edges |= blend_sides(region, pos)
        & (BlendSides::NORTH | BlendSides::SOUTH | BlendSides::WEST | BlendSides::EAST);

    // Corner columns belong to two edges; collect into a set first.
    let mut columns = std::collections::BTreeSet::new();
    for (flag, dx, dz) in BlendSides::CARDINALS {
        if !edges.contains(flag) {
            continue;
        }
        if dz != 0 {
            let z = if dz < 0 { 0 } else { CHUNK_SIZE_Z - 1 };
            columns.extend((0..CHUNK_SIZE_X).map(|x| (x, z)));
        } else {
            let x = if dx < 0 { 0 } else { CHUNK_SIZE_X - 1 };
            columns.extend((0..CHUNK_SIZE_Z).map(|z| (x, z)));
        }
    }

    let base_x = pos.min_block_x();
    let base_z = pos.min_block_z();
    let mut positions = Vec::new();
    for (x, z) in columns {
        for y in area.min_block_y()..area.max_block_y() {
            let id = chunk.block_at(x, y, z);
            if terraseam_core::block::is_leaves(id) || terraseam_core::block::is_fluid(id) {
                positions.push(BlockPos::new(base_x + x, y, base_z + z));
            }
        }
    }
    positions
}

/// Axis-aligned block volume of one legacy chunk, stored as center and
/// half-extent per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cuboid {
    center: [f64; 3],
    half: [f64; 3],
}

impl Cuboid {
    fn of_legacy_chunk(pos: ChunkPos, min_y: i32, max_y: i32) -> Self {
        let min = [pos.min_block_x() as f64, min_y as f64, pos.min_block_z() as f64];
        let max = [
            (pos.min_block_x() + CHUNK_SIZE_X) as f64,
            max_y as f64,
            (pos.min_block_z() + CHUNK_SIZE_Z) as f64,
        ];
        Self {
            center: [
                (min[0] + max[0]) / 2.0,
                (min[1] + max[1]) / 2.0,
                (min[2] + max[2]) / 2.0,
            ],
            half: [
                (max[0] - min[0]) / 2.0,
                (max[1] - min[1]) / 2.0,
                (max[2] - min[2]) / 2.0,
            ],
        }
    }

    /// Euclidean distance from a point to the cuboid surface, zero inside.
    fn distance(&self, point: [f64; 3]) -> f64 {
        let mut sum = 0.0;
        for axis in 0..3 {
            let outside = ((point[axis] - self.center[axis]).abs() - self.half[axis]).max(0.0);
            sum += outside * outside;
        }
        sum.sqrt()
    }
}

/// Suppresses cave carving near legacy chunk volumes.
///
/// Built per generation task from the legacy chunks around the carved
/// chunk. Query coordinates are jittered before the distance test so the
/// protection boundary is irregular rather than a flat wall.
pub struct CarvingMaskFilter {
    cuboids: Vec<Cuboid>,
    jitter: JitterNoise,
}

impl CarvingMaskFilter {
    /// Collect the legacy volumes of the chunk at `pos` and its eight
    /// neighbors. None when no legacy chunk is adjacent, meaning carving
    /// needs no filtering at all.
    pub fn new<R: GenerationRegion>(region: &R, pos: ChunkPos) -> Option<Self> {
        let mut cuboids = Vec::new();
        for dz in -1..=1 {
            for dx in -1..=1 {
                let neighbor = pos.offset(dx, dz);
                let Some(chunk) = region.chunk(neighbor) else {
                    continue;
                };
                let Some(cache) = chunk.blend_cache() else {
                    continue;
                };
                let area = cache.area();
                cuboids.push(Cuboid::of_legacy_chunk(
                    neighbor,
                    area.min_block_y(),
                    area.max_block_y(),
                ));
            }
        }
        if cuboids.is_empty() {
            return None;
        }
        Some(Self {
            cuboids,
            jitter: JitterNoise::new(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_volumes(volumes: &[(ChunkPos, i32, i32)]) -> Self {
        Self {
            cuboids: volumes
                .iter()
                .map(|&(pos, min_y, max_y)| Cuboid::of_legacy_chunk(pos, min_y, max_y))
                .collect(),
            jitter: JitterNoise::new(),
        }
    }

    /// Whether the block at `(x, y, z)` must not be carved.
    pub fn is_protected(&self, x: i32, y: i32, z: i32) -> bool {
        let (fx, fy, fz) = (x as f64, y as f64, z as f64);
        let point = [
            fx + self.jitter.shift(fx, fz, fy) * CARVING_JITTER_AMPLITUDE,
            fy + self.jitter.shift(fy, fx, fz) * CARVING_JITTER_AMPLITUDE,
            fz + self.jitter.shift(fz, fy, fx) * CARVING_JITTER_AMPLITUDE,
        ];
        self.cuboids
            .iter()
            .map(|cuboid| cuboid.distance(point))
            .fold(f64::INFINITY, f64::min)
            < CARVING_PROTECTION_DISTANCE
    }
}
