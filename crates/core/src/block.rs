//! Block registry and the predicates the blending engine depends on.
//!
//! Only the blocks that matter to boundary blending are registered here:
//! the opacity predicates behind each heightmap kind, the "groundness"
//! test used by density sampling, and the fixed set of surface materials
//! accepted when sampling a legacy column's height.

use serde::{Deserialize, Serialize};

/// Block identifier referencing the registry.
pub type BlockId = u16;

/// Reserved ID for air.
pub const BLOCK_AIR: BlockId = 0;
/// ID for stone.
pub const BLOCK_STONE: BlockId = 1;
/// ID for dirt.
pub const BLOCK_DIRT: BlockId = 2;
/// ID for grass block.
pub const BLOCK_GRASS: BlockId = 3;
/// ID for sand.
pub const BLOCK_SAND: BlockId = 4;
/// ID for gravel.
pub const BLOCK_GRAVEL: BlockId = 5;
/// ID for water.
pub const BLOCK_WATER: BlockId = 6;
/// ID for lava.
pub const BLOCK_LAVA: BlockId = 7;
/// ID for snow block.
pub const BLOCK_SNOW: BlockId = 8;
/// ID for clay.
pub const BLOCK_CLAY: BlockId = 9;
/// ID for bedrock.
pub const BLOCK_BEDROCK: BlockId = 10;
/// ID for oak log.
pub const BLOCK_OAK_LOG: BlockId = 11;
/// ID for oak leaves.
pub const BLOCK_OAK_LEAVES: BlockId = 12;
/// ID for red sand.
pub const BLOCK_RED_SAND: BlockId = 13;
/// ID for coarse dirt.
pub const BLOCK_COARSE_DIRT: BlockId = 14;
/// ID for podzol.
pub const BLOCK_PODZOL: BlockId = 15;
/// ID for mycelium.
pub const BLOCK_MYCELIUM: BlockId = 16;
/// ID for terracotta.
pub const BLOCK_TERRACOTTA: BlockId = 17;
/// ID for mushroom block (both cap colors share one entry here).
pub const BLOCK_MUSHROOM: BlockId = 18;
/// ID for ice.
pub const BLOCK_ICE: BlockId = 19;

/// True for air.
#[inline]
pub fn is_air(id: BlockId) -> bool {
    id == BLOCK_AIR
}

/// True for fluid blocks.
#[inline]
pub fn is_fluid(id: BlockId) -> bool {
    matches!(id, BLOCK_WATER | BLOCK_LAVA)
}

/// True for leaf blocks.
#[inline]
pub fn is_leaves(id: BlockId) -> bool {
    id == BLOCK_OAK_LEAVES
}

/// True for log blocks.
#[inline]
pub fn is_log(id: BlockId) -> bool {
    id == BLOCK_OAK_LOG
}

/// True for mushroom cap blocks.
#[inline]
pub fn is_mushroom_block(id: BlockId) -> bool {
    id == BLOCK_MUSHROOM
}

/// True for blocks with a solid collision footprint.
#[inline]
pub fn blocks_motion(id: BlockId) -> bool {
    !is_air(id) && !is_fluid(id)
}

/// True for blocks that stop motion or are fluids.
#[inline]
pub fn blocks_motion_or_fluid(id: BlockId) -> bool {
    !is_air(id)
}

/// Groundness predicate for density sampling: solid collision footprint,
/// excluding leaves, logs and mushroom blocks.
#[inline]
pub fn is_ground(id: BlockId) -> bool {
    blocks_motion(id) && !is_leaves(id) && !is_log(id) && !is_mushroom_block(id)
}

/// The fixed set of materials accepted when sampling a legacy column's
/// surface height. Anything outside this set (air, fluids, leaves, logs,
/// mushroom blocks) is skipped during the downward scan.
#[inline]
pub fn is_surface_material(id: BlockId) -> bool {
    matches!(
        id,
        BLOCK_STONE
            | BLOCK_DIRT
            | BLOCK_GRASS
            | BLOCK_SAND
            | BLOCK_RED_SAND
            | BLOCK_GRAVEL
            | BLOCK_COARSE_DIRT
            | BLOCK_PODZOL
            | BLOCK_MYCELIUM
            | BLOCK_SNOW
            | BLOCK_TERRACOTTA
            | BLOCK_CLAY
    )
}

/// Opaque biome identifier.
///
/// Biome assignment lives outside this workspace; the blending engine only
/// caches and resolves ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BiomeId(pub u16);
