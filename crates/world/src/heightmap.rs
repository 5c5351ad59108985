//! Per-column height tracking under pluggable opacity predicates.
//!
//! Each chunk keeps one tracker per requested kind. An entry records the
//! "first available" height of a column: one above the highest block the
//! kind's predicate considers opaque, stored relative to the chunk floor.

use crate::chunk::{ChunkSource, CHUNK_SIZE_X, CHUNK_SIZE_Z};
use crate::packed::PackedArray;
use terraseam_core::block::{self, BlockId};
use tracing::warn;

/// Height-tracker kinds, each with its own opacity predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightmapKind {
    /// Highest non-air block.
    WorldSurface,
    /// Highest block that stops motion or is a fluid.
    MotionBlocking,
    /// Highest block that stops motion, ignoring fluids.
    OceanFloor,
}

impl HeightmapKind {
    /// The opacity predicate defining this kind.
    #[inline]
    pub fn is_opaque(self, id: BlockId) -> bool {
        match self {
            HeightmapKind::WorldSurface => !block::is_air(id),
            HeightmapKind::MotionBlocking => block::blocks_motion_or_fluid(id),
            HeightmapKind::OceanFloor => block::blocks_motion(id),
        }
    }
}

/// Bit-packed per-column record of the highest relevant block in a chunk.
#[derive(Debug, Clone)]
pub struct HeightTracker {
    kind: HeightmapKind,
    min_y: i32,
    height: i32,
    data: PackedArray,
}

impl HeightTracker {
    /// Create an empty tracker for a chunk spanning `height` blocks above
    /// `min_y`. Every column starts at the chunk floor.
    pub fn new(kind: HeightmapKind, min_y: i32, height: i32) -> Self {
        let bits = PackedArray::bits_for(height as u64);
        Self {
            kind,
            min_y,
            height,
            data: PackedArray::new(bits, (CHUNK_SIZE_X * CHUNK_SIZE_Z) as usize),
        }
    }

    /// The kind this tracker was created for.
    pub fn kind(&self) -> HeightmapKind {
        self.kind
    }

    #[inline]
    fn index(x: i32, z: i32) -> usize {
        debug_assert!((0..CHUNK_SIZE_X).contains(&x));
        debug_assert!((0..CHUNK_SIZE_Z).contains(&z));
        (z * CHUNK_SIZE_X + x) as usize
    }

    /// One above the highest opaque block of the column, in world Y.
    /// Equals `min_y` for an empty column.
    pub fn first_available(&self, x: i32, z: i32) -> i32 {
        self.data.get(Self::index(x, z)) as i32 + self.min_y
    }

    /// The highest opaque block of the column, in world Y.
    /// `min_y - 1` for an empty column.
    pub fn highest_taken(&self, x: i32, z: i32) -> i32 {
        self.first_available(x, z) - 1
    }

    /// Bulk-priming hook: set a column's first-available height directly.
    /// The value is clamped into the chunk's vertical range.
    pub fn set_first_available(&mut self, x: i32, z: i32, y: i32) {
        let relative = (y - self.min_y).clamp(0, self.height);
        self.data.set(Self::index(x, z), relative as u64);
    }

    /// Incremental update after a block write at `(x, y, z)`.
    ///
    /// `column` reads the column's current blocks (the new block already
    /// written) and is only consulted for the downward rescan when the
    /// block that defined the height is removed. Returns whether the
    /// tracked height changed.
    pub fn update(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        block: BlockId,
        column: impl Fn(i32) -> BlockId,
    ) -> bool {
        let first = self.first_available(x, z);
        // Buried placement: cannot affect the tracked surface.
        if y <= first - 2 {
            return false;
        }
        if self.kind.is_opaque(block) {
            if y >= first {
                self.set_first_available(x, z, y + 1);
                return true;
            }
        } else if first - 1 == y {
            // The defining block is gone; rescan downward for the next one.
            for scan_y in (self.min_y..y).rev() {
                if self.kind.is_opaque(column(scan_y)) {
                    self.set_first_available(x, z, scan_y + 1);
                    return true;
                }
            }
            self.set_first_available(x, z, self.min_y);
            return true;
        }
        false
    }

    /// Bulk-initialize one tracker per requested kind with a single
    /// top-to-bottom scan per column. Kinds drop out of the working set as
    /// soon as their column height is found.
    pub fn prime_all<C: ChunkSource + ?Sized>(
        chunk: &C,
        kinds: &[HeightmapKind],
    ) -> Vec<HeightTracker> {
        let min_y = chunk.min_y();
        let height = chunk.height();
        let mut trackers: Vec<HeightTracker> = kinds
            .iter()
            .map(|&kind| HeightTracker::new(kind, min_y, height))
            .collect();
        let top = min_y + height - 1;

        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                let mut remaining: Vec<usize> = (0..trackers.len()).collect();
                for y in (min_y..=top).rev() {
                    if remaining.is_empty() {
                        break;
                    }
                    let id = chunk.block_at(x, y, z);
                    if block::is_air(id) {
                        continue;
                    }
                    remaining.retain(|&i| {
                        if trackers[i].kind.is_opaque(id) {
                            trackers[i].set_first_available(x, z, y + 1);
                            false
                        } else {
                            true
                        }
                    });
                }
            }
        }
        trackers
    }

    /// Raw packed words for persistence.
    pub fn raw(&self) -> &[u64] {
        self.data.raw()
    }

    /// Restore from persisted packed words.
    ///
    /// If the stored length does not match the width expected for the
    /// current chunk height, the data is rejected (logged) and the caller
    /// must re-prime from block data.
    pub fn set_raw(&mut self, words: &[u64]) -> bool {
        if !self.data.set_raw(words) {
            warn!(
                kind = ?self.kind,
                expected = self.data.raw().len(),
                actual = words.len(),
                "stored height tracker does not match current chunk height, re-priming"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraseam_core::block::{BLOCK_AIR, BLOCK_STONE, BLOCK_WATER};

    const MIN_Y: i32 = -64;
    const HEIGHT: i32 = 384;

    fn empty_column(_: i32) -> BlockId {
        BLOCK_AIR
    }

    #[test]
    fn empty_tracker_sits_at_floor() {
        let tracker = HeightTracker::new(HeightmapKind::WorldSurface, MIN_Y, HEIGHT);
        assert_eq!(tracker.first_available(0, 0), MIN_Y);
        assert_eq!(tracker.highest_taken(15, 15), MIN_Y - 1);
    }

    #[test]
    fn opaque_placement_raises_height() {
        let mut tracker = HeightTracker::new(HeightmapKind::WorldSurface, MIN_Y, HEIGHT);
        assert!(tracker.update(3, 70, 4, BLOCK_STONE, empty_column));
        assert_eq!(tracker.first_available(3, 4), 71);
        assert_eq!(tracker.highest_taken(3, 4), 70);
    }

    #[test]
    fn buried_placement_is_a_noop() {
        let mut tracker = HeightTracker::new(HeightmapKind::WorldSurface, MIN_Y, HEIGHT);
        tracker.set_first_available(5, 5, 71);
        // y <= first_available - 2
        assert!(!tracker.update(5, 69, 5, BLOCK_STONE, empty_column));
        assert!(!tracker.update(5, 0, 5, BLOCK_AIR, empty_column));
        assert_eq!(tracker.first_available(5, 5), 71);
    }

    #[test]
    fn removing_surface_block_rescans_downward() {
        let mut tracker = HeightTracker::new(HeightmapKind::WorldSurface, MIN_Y, HEIGHT);
        tracker.set_first_available(2, 2, 71);
        // Column has stone at y=60, air above after the removal at y=70.
        let column = |y: i32| if y == 60 { BLOCK_STONE } else { BLOCK_AIR };
        assert!(tracker.update(2, 70, 2, BLOCK_AIR, column));
        assert_eq!(tracker.highest_taken(2, 2), 60);
    }

    #[test]
    fn removing_surface_with_nothing_below_drops_to_floor() {
        let mut tracker = HeightTracker::new(HeightmapKind::WorldSurface, MIN_Y, HEIGHT);
        tracker.set_first_available(2, 2, 71);
        assert!(tracker.update(2, 70, 2, BLOCK_AIR, empty_column));
        assert_eq!(tracker.first_available(2, 2), MIN_Y);
    }

    #[test]
    fn non_opaque_above_surface_is_a_noop() {
        let mut tracker = HeightTracker::new(HeightmapKind::OceanFloor, MIN_Y, HEIGHT);
        tracker.set_first_available(1, 1, 63);
        // Water is not opaque to OceanFloor; placing it above changes nothing.
        assert!(!tracker.update(1, 64, 1, BLOCK_WATER, empty_column));
        assert_eq!(tracker.first_available(1, 1), 63);
    }

    #[test]
    fn kinds_disagree_on_fluids() {
        assert!(HeightmapKind::MotionBlocking.is_opaque(BLOCK_WATER));
        assert!(!HeightmapKind::OceanFloor.is_opaque(BLOCK_WATER));
        assert!(HeightmapKind::WorldSurface.is_opaque(BLOCK_WATER));
    }

    #[test]
    fn raw_reload_rejects_wrong_length() {
        let mut tracker = HeightTracker::new(HeightmapKind::WorldSurface, MIN_Y, HEIGHT);
        tracker.set_first_available(0, 0, 100);
        let good = tracker.raw().to_vec();

        let mut restored = HeightTracker::new(HeightmapKind::WorldSurface, MIN_Y, HEIGHT);
        assert!(restored.set_raw(&good));
        assert_eq!(restored.first_available(0, 0), 100);

        // A shorter world (fewer bits per entry) produces a different length.
        let mut mismatched = HeightTracker::new(HeightmapKind::WorldSurface, 0, 255);
        assert!(!mismatched.set_raw(&good));
        assert_eq!(mismatched.first_available(0, 0), 0);
    }
}
