//! Coordinate types and resolution conversions.
//!
//! The generation pipeline works at four horizontal resolutions: blocks,
//! quarter-blocks ("quarts", 4 blocks), sections (16 blocks) and blending
//! cells (4 blocks horizontally, 8 vertically). Chunk coordinates coincide
//! with section coordinates on the horizontal axes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blocks per section edge.
pub const SECTION_SIZE: i32 = 16;
/// Vertical extent of a blending cell in blocks.
pub const CELL_HEIGHT: i32 = 8;

/// Convert a block coordinate to quart resolution.
#[inline]
pub fn block_to_quart(block: i32) -> i32 {
    block >> 2
}

/// Convert a quart coordinate to the block coordinate of its low corner.
#[inline]
pub fn quart_to_block(quart: i32) -> i32 {
    quart << 2
}

/// Convert a block coordinate to section resolution.
#[inline]
pub fn block_to_section(block: i32) -> i32 {
    block >> 4
}

/// Convert a section coordinate to the block coordinate of its low corner.
#[inline]
pub fn section_to_block(section: i32) -> i32 {
    section << 4
}

/// Convert a quart coordinate to section resolution.
#[inline]
pub fn quart_to_section(quart: i32) -> i32 {
    quart >> 2
}

/// Convert a section coordinate to the quart coordinate of its low corner.
#[inline]
pub fn section_to_quart(section: i32) -> i32 {
    section << 2
}

/// Convert a block Y coordinate to blending-cell resolution (8-block cells).
#[inline]
pub fn block_to_cell_y(block_y: i32) -> i32 {
    block_y.div_euclid(CELL_HEIGHT)
}

/// Positive modulo: the result is always in `[0, modulus)`.
#[inline]
pub fn positive_modulo(value: f64, modulus: f64) -> f64 {
    value.rem_euclid(modulus)
}

/// Absolute block position (X, Y, Z) in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// Block X coordinate.
    pub x: i32,
    /// Block Y coordinate.
    pub y: i32,
    /// Block Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Construct from block coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkPos {
    /// Chunk X coordinate.
    pub x: i32,
    /// Chunk Z coordinate.
    pub z: i32,
}

impl ChunkPos {
    /// Construct from chunk coordinates.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Translate by whole chunks.
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Pack into a single 64-bit key (x in the high word, z in the low word).
    pub fn as_long(self) -> i64 {
        (((self.x as u64) << 32) | (self.z as u32 as u64)) as i64
    }

    /// Inverse of [`ChunkPos::as_long`].
    pub fn from_long(key: i64) -> Self {
        Self {
            x: (key >> 32) as i32,
            z: key as i32,
        }
    }

    /// Block coordinate of this chunk's minimum corner on the X axis.
    pub fn min_block_x(self) -> i32 {
        section_to_block(self.x)
    }

    /// Block coordinate of this chunk's minimum corner on the Z axis.
    pub fn min_block_z(self) -> i32 {
        section_to_block(self.z)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quart_conversions() {
        assert_eq!(block_to_quart(0), 0);
        assert_eq!(block_to_quart(3), 0);
        assert_eq!(block_to_quart(4), 1);
        assert_eq!(block_to_quart(-1), -1);
        assert_eq!(block_to_quart(-4), -1);
        assert_eq!(block_to_quart(-5), -2);
        assert_eq!(quart_to_block(2), 8);
        assert_eq!(quart_to_block(-1), -4);
    }

    #[test]
    fn section_conversions() {
        assert_eq!(block_to_section(15), 0);
        assert_eq!(block_to_section(16), 1);
        assert_eq!(block_to_section(-16), -1);
        assert_eq!(block_to_section(-17), -2);
        assert_eq!(section_to_block(-4), -64);
        assert_eq!(section_to_quart(3), 12);
        assert_eq!(quart_to_section(12), 3);
        assert_eq!(quart_to_section(-1), -1);
    }

    #[test]
    fn cell_y_conversion() {
        assert_eq!(block_to_cell_y(0), 0);
        assert_eq!(block_to_cell_y(7), 0);
        assert_eq!(block_to_cell_y(8), 1);
        assert_eq!(block_to_cell_y(-1), -1);
        assert_eq!(block_to_cell_y(-8), -1);
        assert_eq!(block_to_cell_y(-9), -2);
    }

    #[test]
    fn positive_modulo_wraps_negatives() {
        assert_eq!(positive_modulo(9.5, 8.0), 1.5);
        assert_eq!(positive_modulo(-0.5, 8.0), 7.5);
        assert_eq!(positive_modulo(0.0, 8.0), 0.0);
    }

    #[test]
    fn chunk_pos_long_roundtrip() {
        for pos in [
            ChunkPos::new(0, 0),
            ChunkPos::new(1, -1),
            ChunkPos::new(-30_000_000 / 16, 30_000_000 / 16),
            ChunkPos::new(i32::MIN, i32::MAX),
        ] {
            assert_eq!(ChunkPos::from_long(pos.as_long()), pos);
        }
    }

    #[test]
    fn chunk_pos_ordering_is_x_then_z() {
        assert!(ChunkPos::new(0, 5) < ChunkPos::new(1, 0));
        assert!(ChunkPos::new(0, 0) < ChunkPos::new(0, 1));
    }

    #[test]
    fn chunk_pos_min_block_corner() {
        let pos = ChunkPos::new(-2, 3);
        assert_eq!(pos.min_block_x(), -32);
        assert_eq!(pos.min_block_z(), 48);
    }
}
