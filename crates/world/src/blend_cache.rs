//! Per-chunk cache of legacy boundary samples.
//!
//! A legacy chunk caches, for its boundary columns only, the sampled
//! surface height, a vertical density profile and a biome column. The
//! cache covers the chunk's north/west edge columns plus a one-column halo
//! on the south/east edges, so two adjacent chunks can both contribute to
//! the same border without double-counting.
//!
//! Population is compute-then-publish: the first `calculate_data` call
//! builds all requested columns and publishes them atomically; later calls
//! are no-ops. Readers racing a concurrent population observe either an
//! empty cache or the fully built columns, never a partial one.

use crate::chunk::{BlendSides, ChunkSource};
use crate::heightmap::HeightmapKind;
use std::sync::OnceLock;
use terraseam_core::block::{self, BiomeId};
use terraseam_core::coords::{self, CELL_HEIGHT};

/// Sentinel for "no sample cached here".
pub const UNSET: f64 = f64::MAX;

/// Horizontal blending cells per chunk edge (cells are 4 blocks wide, so
/// cell indices coincide with chunk-local quart coordinates).
pub const CELLS_PER_CHUNK: i32 = 4;

const MAX_CELL_INDEX_INSIDE: i32 = CELLS_PER_CHUNK - 1;
const MAX_CELL_INDEX_OUTSIDE: i32 = CELLS_PER_CHUNK;
const INSIDE_COLUMN_COUNT: usize = (2 * MAX_CELL_INDEX_INSIDE + 1) as usize;

/// Total cached columns per chunk: the inside north/west edges plus the
/// south/east halo.
pub const COLUMN_COUNT: usize = INSIDE_COLUMN_COUNT + (2 * MAX_CELL_INDEX_OUTSIDE + 1) as usize;

/// Exact slope-correction constants, tuned against the generation formula
/// the blended offset corrects. Preserved verbatim.
const MIN_SLOPE: f64 = 1.0;
const SLOPE_SCALE: f64 = 0.25;

/// Width of the sliding groundness window in blocks.
const GROUND_WINDOW: usize = 7;

/// Index of an inside column (north edge `z == 0` or west edge `x == 0`).
pub(crate) fn inside_index(cell_x: i32, cell_z: i32) -> usize {
    debug_assert!(cell_x == 0 || cell_z == 0);
    (MAX_CELL_INDEX_INSIDE - cell_x + cell_z) as usize
}

/// Index of a halo column (`x == 4` or `z == 4`).
pub(crate) fn outside_index(cell_x: i32, cell_z: i32) -> usize {
    debug_assert!(cell_x == MAX_CELL_INDEX_OUTSIDE || cell_z == MAX_CELL_INDEX_OUTSIDE);
    INSIDE_COLUMN_COUNT + (cell_x + MAX_CELL_INDEX_OUTSIDE - cell_z) as usize
}

/// Column index for a chunk-local cell position, or None for interior
/// cells (which are never cached).
pub(crate) fn column_index(cell_x: i32, cell_z: i32) -> Option<usize> {
    if !(0..=MAX_CELL_INDEX_OUTSIDE).contains(&cell_x)
        || !(0..=MAX_CELL_INDEX_OUTSIDE).contains(&cell_z)
    {
        None
    } else if cell_x == MAX_CELL_INDEX_OUTSIDE || cell_z == MAX_CELL_INDEX_OUTSIDE {
        Some(outside_index(cell_x, cell_z))
    } else if cell_x == 0 || cell_z == 0 {
        Some(inside_index(cell_x, cell_z))
    } else {
        None
    }
}

/// Inverse of the column index scheme: chunk-local cell position.
fn column_cell(index: usize) -> (i32, i32) {
    debug_assert!(index < COLUMN_COUNT);
    if index < INSIDE_COLUMN_COUNT {
        let i = index as i32;
        if i <= MAX_CELL_INDEX_INSIDE {
            (MAX_CELL_INDEX_INSIDE - i, 0)
        } else {
            (0, i - MAX_CELL_INDEX_INSIDE)
        }
    } else {
        let k = (index - INSIDE_COLUMN_COUNT) as i32;
        if k <= MAX_CELL_INDEX_OUTSIDE {
            (k, MAX_CELL_INDEX_OUTSIDE)
        } else {
            (MAX_CELL_INDEX_OUTSIDE, 2 * MAX_CELL_INDEX_OUTSIDE - k)
        }
    }
}

/// Vertical extent a chunk was generated over under the previous
/// parameter set, in 16-block sections (both bounds inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyArea {
    min_section: i32,
    max_section: i32,
}

impl LegacyArea {
    /// Construct from inclusive section bounds.
    ///
    /// # Panics
    /// Panics if `min_section > max_section`.
    pub fn new(min_section: i32, max_section: i32) -> Self {
        assert!(min_section <= max_section, "inverted legacy section range");
        Self {
            min_section,
            max_section,
        }
    }

    /// Lowest section, inclusive.
    pub fn min_section(&self) -> i32 {
        self.min_section
    }

    /// Highest section, inclusive.
    pub fn max_section(&self) -> i32 {
        self.max_section
    }

    /// Lowest block Y, inclusive.
    pub fn min_block_y(&self) -> i32 {
        coords::section_to_block(self.min_section)
    }

    /// One above the highest block Y (exclusive top).
    pub fn max_block_y(&self) -> i32 {
        coords::section_to_block(self.max_section + 1)
    }

    fn section_count(&self) -> usize {
        (self.max_section - self.min_section + 1) as usize
    }

    /// Density cells (8 blocks tall) per cached column.
    pub fn cell_count_per_column(&self) -> usize {
        self.section_count() * 2
    }

    /// Biome quarts (4 blocks tall) per cached column.
    pub fn quart_count_per_column(&self) -> usize {
        self.section_count() * 4
    }

    fn min_cell_y(&self) -> i32 {
        coords::block_to_cell_y(self.min_block_y())
    }

    fn min_quart_y(&self) -> i32 {
        coords::block_to_quart(self.min_block_y())
    }

    /// Index of an absolute cell Y within a cached column, possibly out of
    /// range.
    fn cell_y_index(&self, cell_y: i32) -> i32 {
        cell_y - self.min_cell_y()
    }
}

/// The published boundary samples of one legacy chunk.
pub(crate) struct BlendColumns {
    pub(crate) heights: [f64; COLUMN_COUNT],
    pub(crate) densities: [Option<Box<[f64]>>; COLUMN_COUNT],
    pub(crate) biomes: [Option<Box<[BiomeId]>>; COLUMN_COUNT],
}

impl BlendColumns {
    pub(crate) fn unset() -> Self {
        Self {
            heights: [UNSET; COLUMN_COUNT],
            densities: std::array::from_fn(|_| None),
            biomes: std::array::from_fn(|_| None),
        }
    }
}

/// Lazily-computed boundary sample cache for one legacy chunk.
pub struct BlendCache {
    area: LegacyArea,
    /// Heights restored from a persisted record; kept verbatim by
    /// `calculate_data` instead of being resampled.
    seeded_heights: Option<Box<[f64; COLUMN_COUNT]>>,
    data: OnceLock<BlendColumns>,
}

impl BlendCache {
    /// Fresh cache for a chunk newly recognized as legacy.
    pub fn new(area: LegacyArea) -> Self {
        Self {
            area,
            seeded_heights: None,
            data: OnceLock::new(),
        }
    }

    /// Cache reconstructed from a persisted height array.
    pub fn from_heights(area: LegacyArea, heights: [f64; COLUMN_COUNT]) -> Self {
        Self {
            area,
            seeded_heights: Some(Box::new(heights)),
            data: OnceLock::new(),
        }
    }

    /// The legacy vertical bounds this cache covers.
    pub fn area(&self) -> &LegacyArea {
        &self.area
    }

    /// Whether boundary columns have been computed and published.
    pub fn is_computed(&self) -> bool {
        self.data.get().is_some()
    }

    #[cfg(test)]
    pub(crate) fn publish(&self, columns: BlendColumns) {
        let _ = self.data.set(columns);
    }

    /// Populate the boundary columns implicated by `sides`, the subset of
    /// compass directions along which the neighboring chunk's generation
    /// mode differs. Corner columns are only computed when both adjoining
    /// sides are implicated. A no-op once computed.
    pub fn calculate_data<C: ChunkSource + ?Sized>(&self, chunk: &C, sides: BlendSides) {
        self.data.get_or_init(|| self.compute::<C>(chunk, sides));
    }

    fn compute<C: ChunkSource + ?Sized>(&self, chunk: &C, sides: BlendSides) -> BlendColumns {
        let mut columns = BlendColumns::unset();
        if let Some(seeded) = &self.seeded_heights {
            columns.heights = **seeded;
        }

        if sides.intersects(BlendSides::NORTH | BlendSides::WEST | BlendSides::NORTH_WEST) {
            self.add_column(&mut columns, chunk, inside_index(0, 0), 0, 0);
        }
        if sides.contains(BlendSides::NORTH) {
            for i in 1..CELLS_PER_CHUNK {
                self.add_column(&mut columns, chunk, inside_index(i, 0), 4 * i, 0);
            }
        }
        if sides.contains(BlendSides::WEST) {
            for j in 1..CELLS_PER_CHUNK {
                self.add_column(&mut columns, chunk, inside_index(0, j), 0, 4 * j);
            }
        }
        if sides.contains(BlendSides::EAST) {
            for j in 1..CELLS_PER_CHUNK {
                self.add_column(
                    &mut columns,
                    chunk,
                    outside_index(MAX_CELL_INDEX_OUTSIDE, j),
                    15,
                    4 * j,
                );
            }
        }
        if sides.contains(BlendSides::SOUTH) {
            for i in 0..CELLS_PER_CHUNK {
                self.add_column(
                    &mut columns,
                    chunk,
                    outside_index(i, MAX_CELL_INDEX_OUTSIDE),
                    4 * i,
                    15,
                );
            }
        }
        if sides.contains(BlendSides::EAST) && sides.contains(BlendSides::NORTH_EAST) {
            self.add_column(
                &mut columns,
                chunk,
                outside_index(MAX_CELL_INDEX_OUTSIDE, 0),
                15,
                0,
            );
        }
        if sides.contains(BlendSides::EAST) && sides.contains(BlendSides::SOUTH_EAST) {
            self.add_column(
                &mut columns,
                chunk,
                outside_index(MAX_CELL_INDEX_OUTSIDE, MAX_CELL_INDEX_OUTSIDE),
                15,
                15,
            );
        }
        columns
    }

    /// Sample one boundary column at chunk-local block `(x, z)`.
    fn add_column<C: ChunkSource + ?Sized>(
        &self,
        columns: &mut BlendColumns,
        chunk: &C,
        index: usize,
        x: i32,
        z: i32,
    ) {
        if columns.heights[index] == UNSET {
            columns.heights[index] = self.height_at_xz(chunk, x, z) as f64;
        }
        let surface = columns.heights[index] as i32;
        columns.densities[index] = Some(self.density_column(chunk, x, z, surface));
        columns.biomes[index] = Some(self.biome_column(chunk, x, z));
    }

    /// Legacy surface height of a column: the first block from the top
    /// whose material has a solid collision footprint. Starts from the
    /// primed world-surface tracker when the chunk has one.
    fn height_at_xz<C: ChunkSource + ?Sized>(&self, chunk: &C, x: i32, z: i32) -> i32 {
        let top = self.area.max_block_y() - 1;
        let start = match chunk.height_tracker(HeightmapKind::WorldSurface) {
            Some(tracker) => tracker.highest_taken(x, z).min(top),
            None => top,
        };
        for y in (self.area.min_block_y()..=start).rev() {
            if block::is_surface_material(chunk.block_at(x, y, z)) {
                return y;
            }
        }
        self.area.min_block_y()
    }

    /// Smoothed groundness profile over the legacy vertical extent, one
    /// value per 8-block cell, written top-down. Each cell combines a
    /// 7-block window with its predecessor into `[-1, 1]`, then the two
    /// cells around the sampled surface are overwritten with an exact
    /// slope correction so the profile crosses zero at the surface. This
    /// is a boundary-matching heuristic, not a physical density model.
    fn density_column<C: ChunkSource + ?Sized>(
        &self,
        chunk: &C,
        x: i32,
        z: i32,
        surface: i32,
    ) -> Box<[f64]> {
        let len = self.area.cell_count_per_column();
        let mut column = vec![0.0; len];

        // Each step reads the block one below the cursor.
        let window = |cursor: &mut i32, count: usize| -> f64 {
            let mut sum = 0.0;
            for _ in 0..count {
                *cursor -= 1;
                sum += if block::is_ground(chunk.block_at(x, *cursor, z)) {
                    1.0
                } else {
                    -1.0
                };
            }
            sum
        };

        let mut cursor = self.area.max_block_y();
        let mut prev = window(&mut cursor, GROUND_WINDOW);
        for cell in (0..len.saturating_sub(1)).rev() {
            let single = window(&mut cursor, 1);
            let next = window(&mut cursor, GROUND_WINDOW);
            column[cell] = (prev + single + next) / 15.0;
            prev = next;
        }

        let surface_cell = self.area.cell_y_index(coords::block_to_cell_y(surface));
        if surface_cell >= 0 && (surface_cell as usize) < len.saturating_sub(1) {
            let cell = surface_cell as usize;
            let fraction =
                coords::positive_modulo(surface as f64 + 0.5, CELL_HEIGHT as f64) / CELL_HEIGHT as f64;
            let slope = (1.0 - fraction) / fraction;
            let scale = slope.max(MIN_SLOPE) * SLOPE_SCALE;
            column[cell + 1] = -slope / scale;
            column[cell] = 1.0 / scale;
        }
        column.into_boxed_slice()
    }

    /// One noise-biome sample per vertical quart over the legacy range.
    fn biome_column<C: ChunkSource + ?Sized>(&self, chunk: &C, x: i32, z: i32) -> Box<[BiomeId]> {
        let quart_x = coords::block_to_quart(x);
        let quart_z = coords::block_to_quart(z);
        let min_quart_y = self.area.min_quart_y();
        (0..self.area.quart_count_per_column() as i32)
            .map(|i| chunk.noise_biome(quart_x, min_quart_y + i, quart_z))
            .collect()
    }

    fn height_entry(&self, index: usize) -> f64 {
        if let Some(data) = self.data.get() {
            data.heights[index]
        } else if let Some(seeded) = &self.seeded_heights {
            seeded[index]
        } else {
            UNSET
        }
    }

    /// Snapshot of the height array, seeded or computed.
    pub(crate) fn heights_snapshot(&self) -> [f64; COLUMN_COUNT] {
        std::array::from_fn(|i| self.height_entry(i))
    }

    /// Cached surface height at a chunk-local cell position, [`UNSET`]
    /// for interior or unpopulated columns.
    pub fn get_height(&self, cell_x: i32, cell_z: i32) -> f64 {
        match column_index(cell_x, cell_z) {
            Some(index) => self.height_entry(index),
            None => UNSET,
        }
    }

    /// Cached density at a chunk-local cell position and absolute cell Y,
    /// [`UNSET`] when not cached.
    pub fn get_density(&self, cell_x: i32, cell_y: i32, cell_z: i32) -> f64 {
        let Some(index) = column_index(cell_x, cell_z) else {
            return UNSET;
        };
        let Some(data) = self.data.get() else {
            return UNSET;
        };
        let Some(column) = &data.densities[index] else {
            return UNSET;
        };
        let y_index = self.area.cell_y_index(cell_y);
        if y_index >= 0 && (y_index as usize) < column.len() {
            column[y_index as usize]
        } else {
            UNSET
        }
    }

    /// Visit every populated height column. `quart_x/z` are the absolute
    /// quart coordinates of the owning chunk's minimum corner.
    pub fn iterate_heights(&self, quart_x: i32, quart_z: i32, mut f: impl FnMut(i32, i32, f64)) {
        for index in 0..COLUMN_COUNT {
            let height = self.height_entry(index);
            if height != UNSET {
                let (cell_x, cell_z) = column_cell(index);
                f(quart_x + cell_x, quart_z + cell_z, height);
            }
        }
    }

    /// Visit every cached density sample with absolute cell Y in
    /// `min_cell_y..=max_cell_y`.
    pub fn iterate_densities(
        &self,
        quart_x: i32,
        quart_z: i32,
        min_cell_y: i32,
        max_cell_y: i32,
        mut f: impl FnMut(i32, i32, i32, f64),
    ) {
        let Some(data) = self.data.get() else {
            return;
        };
        for index in 0..COLUMN_COUNT {
            let Some(column) = &data.densities[index] else {
                continue;
            };
            let (cell_x, cell_z) = column_cell(index);
            for cell_y in min_cell_y..=max_cell_y {
                let y_index = self.area.cell_y_index(cell_y);
                if y_index >= 0 && (y_index as usize) < column.len() {
                    f(
                        quart_x + cell_x,
                        cell_y,
                        quart_z + cell_z,
                        column[y_index as usize],
                    );
                }
            }
        }
    }

    /// Visit every cached biome at the given absolute vertical quart.
    pub fn iterate_biomes(
        &self,
        quart_x: i32,
        quart_z: i32,
        quart_y: i32,
        mut f: impl FnMut(i32, i32, BiomeId),
    ) {
        let Some(data) = self.data.get() else {
            return;
        };
        let y_index = quart_y - self.area.min_quart_y();
        if y_index < 0 || y_index as usize >= self.area.quart_count_per_column() {
            return;
        }
        for index in 0..COLUMN_COUNT {
            if let Some(column) = &data.biomes[index] {
                let (cell_x, cell_z) = column_cell(index);
                f(quart_x + cell_x, quart_z + cell_z, column[y_index as usize]);
            }
        }
    }
}
