//! Chunk and generation-region interfaces consumed by the blending engine.
//!
//! The engine never owns chunk storage. It reads blocks, primed height
//! trackers and noise biomes through [`ChunkSource`], and discovers
//! neighboring chunks through [`GenerationRegion`].

use crate::blend_cache::BlendCache;
use crate::heightmap::{HeightTracker, HeightmapKind};
use std::sync::Arc;
use terraseam_core::block::{BiomeId, BlockId};
use terraseam_core::coords::ChunkPos;

/// Chunk width (X axis) in blocks.
pub const CHUNK_SIZE_X: i32 = 16;
/// Chunk depth (Z axis) in blocks.
pub const CHUNK_SIZE_Z: i32 = 16;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Compass directions along which a chunk borders a differing
    /// generation mode. North is -Z, west is -X.
    pub struct BlendSides: u8 {
        const NORTH = 0b0000_0001;
        const SOUTH = 0b0000_0010;
        const WEST = 0b0000_0100;
        const EAST = 0b0000_1000;
        const NORTH_WEST = 0b0001_0000;
        const NORTH_EAST = 0b0010_0000;
        const SOUTH_WEST = 0b0100_0000;
        const SOUTH_EAST = 0b1000_0000;
    }
}

impl BlendSides {
    /// Each direction flag with its chunk-coordinate offset.
    pub const DIRECTIONS: [(BlendSides, i32, i32); 8] = [
        (BlendSides::NORTH, 0, -1),
        (BlendSides::SOUTH, 0, 1),
        (BlendSides::WEST, -1, 0),
        (BlendSides::EAST, 1, 0),
        (BlendSides::NORTH_WEST, -1, -1),
        (BlendSides::NORTH_EAST, 1, -1),
        (BlendSides::SOUTH_WEST, -1, 1),
        (BlendSides::SOUTH_EAST, 1, 1),
    ];

    /// The four cardinal directions with their offsets.
    pub const CARDINALS: [(BlendSides, i32, i32); 4] = [
        (BlendSides::NORTH, 0, -1),
        (BlendSides::SOUTH, 0, 1),
        (BlendSides::WEST, -1, 0),
        (BlendSides::EAST, 1, 0),
    ];
}

/// Read access to a single chunk's generation-relevant data.
///
/// `x`/`z` arguments are chunk-local block coordinates in `0..16`; `y` is
/// an absolute world coordinate. Quart arguments follow the same split:
/// local on the horizontal axes, absolute vertically.
pub trait ChunkSource {
    /// Block at the given position. Out-of-range Y reads as air.
    fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId;

    /// A primed height tracker of the given kind, if the chunk has one.
    fn height_tracker(&self, kind: HeightmapKind) -> Option<&HeightTracker>;

    /// Noise biome at quart resolution.
    fn noise_biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> BiomeId;

    /// True when this chunk was generated under the previous parameter set.
    fn is_legacy(&self) -> bool;

    /// The chunk's blend cache, present only on legacy chunks.
    fn blend_cache(&self) -> Option<Arc<BlendCache>>;

    /// Lowest block Y of the chunk.
    fn min_y(&self) -> i32;

    /// Total vertical extent in blocks.
    fn height(&self) -> i32;
}

/// A bounded window of chunks around one generation task.
pub trait GenerationRegion {
    /// Concrete chunk type served by this region.
    type Chunk: ChunkSource;

    /// Chunk coordinates of the chunk being generated.
    fn center(&self) -> ChunkPos;

    /// Look up a chunk by position, if loaded in this region.
    fn chunk(&self, pos: ChunkPos) -> Option<&Self::Chunk>;

    /// True when any chunk within `radius` (Chebyshev, in chunks) of
    /// `center` carries legacy blend data.
    fn legacy_within(&self, center: ChunkPos, radius: i32) -> bool {
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                if let Some(chunk) = self.chunk(center.offset(dx, dz)) {
                    if chunk.blend_cache().is_some() {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// The subset of the 8 compass directions along which the neighbor's
/// generation mode differs from the chunk at `pos` (i.e., a real boundary
/// exists). Unloaded neighbors contribute nothing.
pub fn blend_sides<R: GenerationRegion>(region: &R, pos: ChunkPos) -> BlendSides {
    let Some(chunk) = region.chunk(pos) else {
        return BlendSides::empty();
    };
    let legacy = chunk.is_legacy();
    let mut sides = BlendSides::empty();
    for (flag, dx, dz) in BlendSides::DIRECTIONS {
        if let Some(neighbor) = region.chunk(pos.offset(dx, dz)) {
            if neighbor.is_legacy() != legacy {
                sides |= flag;
            }
        }
    }
    sides
}
