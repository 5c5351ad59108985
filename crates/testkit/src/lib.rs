#![warn(missing_docs)]
//! In-memory chunk and region fixtures for blending tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use terraseam_core::block::{BiomeId, BlockId, BLOCK_AIR};
use terraseam_core::coords::{section_to_block, ChunkPos, SECTION_SIZE};
use terraseam_world::{
    BlendCache, ChunkSource, GenerationRegion, HeightTracker, HeightmapKind, LegacyArea,
    CHUNK_SIZE_X, CHUNK_SIZE_Z,
};

type BiomeFn = Box<dyn Fn(i32, i32, i32) -> BiomeId + Send + Sync>;

/// A sparse in-memory chunk over a configurable section range.
///
/// Blocks default to air. Biomes come from a uniform value or a closure.
/// Height trackers are primed on demand and kept current through
/// [`TestChunk::set_block`].
pub struct TestChunk {
    min_section: i32,
    max_section: i32,
    blocks: BTreeMap<(i32, i32, i32), BlockId>,
    legacy: bool,
    biome: BiomeFn,
    blend_cache: Option<Arc<BlendCache>>,
    trackers: Vec<HeightTracker>,
}

impl TestChunk {
    /// An all-air, non-legacy chunk spanning the inclusive section range.
    pub fn new(min_section: i32, max_section: i32) -> Self {
        assert!(min_section <= max_section, "inverted section range");
        Self {
            min_section,
            max_section,
            blocks: BTreeMap::new(),
            legacy: false,
            biome: Box::new(|_, _, _| BiomeId(0)),
            blend_cache: None,
            trackers: Vec::new(),
        }
    }

    /// Mark this chunk legacy with a fresh blend cache over its full
    /// vertical extent.
    pub fn mark_legacy(&mut self) {
        self.legacy = true;
        self.blend_cache = Some(Arc::new(BlendCache::new(LegacyArea::new(
            self.min_section,
            self.max_section,
        ))));
    }

    /// Install a specific blend cache (e.g. one restored from a persisted
    /// record) and mark the chunk legacy.
    pub fn set_blend_cache(&mut self, cache: Arc<BlendCache>) {
        self.legacy = true;
        self.blend_cache = Some(cache);
    }

    /// Use a uniform biome everywhere.
    pub fn set_uniform_biome(&mut self, biome: BiomeId) {
        self.biome = Box::new(move |_, _, _| biome);
    }

    /// Derive biomes from a closure over absolute quart coordinates.
    pub fn set_biomes(&mut self, f: impl Fn(i32, i32, i32) -> BiomeId + Send + Sync + 'static) {
        self.biome = Box::new(f);
    }

    /// Fill the full 16x16 layer at world height `y`.
    pub fn fill_layer(&mut self, y: i32, block: BlockId) {
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                self.set_block(x, y, z, block);
            }
        }
    }

    /// Fill every layer in `min_y..=max_y`.
    pub fn fill_layers(&mut self, min_y: i32, max_y: i32, block: BlockId) {
        for y in min_y..=max_y {
            self.fill_layer(y, block);
        }
    }

    /// Write one block at chunk-local `(x, z)` and world `y`, keeping any
    /// primed height trackers current.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) {
        if block == BLOCK_AIR {
            self.blocks.remove(&(x, y, z));
        } else {
            self.blocks.insert((x, y, z), block);
        }
        let mut trackers = std::mem::take(&mut self.trackers);
        for tracker in &mut trackers {
            tracker.update(x, y, z, block, |scan_y| self.block_at(x, scan_y, z));
        }
        self.trackers = trackers;
    }

    /// Prime one height tracker per kind from the current block data,
    /// replacing any existing trackers.
    pub fn prime_heightmaps(&mut self, kinds: &[HeightmapKind]) {
        self.trackers = HeightTracker::prime_all(self, kinds);
    }
}

impl ChunkSource for TestChunk {
    fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.blocks.get(&(x, y, z)).copied().unwrap_or(BLOCK_AIR)
    }

    fn height_tracker(&self, kind: HeightmapKind) -> Option<&HeightTracker> {
        self.trackers.iter().find(|t| t.kind() == kind)
    }

    fn noise_biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> BiomeId {
        (self.biome)(quart_x, quart_y, quart_z)
    }

    fn is_legacy(&self) -> bool {
        self.legacy
    }

    fn blend_cache(&self) -> Option<Arc<BlendCache>> {
        self.blend_cache.clone()
    }

    fn min_y(&self) -> i32 {
        section_to_block(self.min_section)
    }

    fn height(&self) -> i32 {
        (self.max_section - self.min_section + 1) * SECTION_SIZE
    }
}

/// A bounded window of [`TestChunk`]s around one center.
pub struct TestRegion {
    center: ChunkPos,
    chunks: BTreeMap<ChunkPos, TestChunk>,
}

impl TestRegion {
    /// Empty region centered at `center`.
    pub fn new(center: ChunkPos) -> Self {
        Self {
            center,
            chunks: BTreeMap::new(),
        }
    }

    /// Add or replace the chunk at `pos`.
    pub fn insert(&mut self, pos: ChunkPos, chunk: TestChunk) {
        self.chunks.insert(pos, chunk);
    }

    /// Mutable access to a loaded chunk.
    pub fn chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut TestChunk> {
        self.chunks.get_mut(&pos)
    }
}

impl GenerationRegion for TestRegion {
    type Chunk = TestChunk;

    fn center(&self) -> ChunkPos {
        self.center
    }

    fn chunk(&self, pos: ChunkPos) -> Option<&TestChunk> {
        self.chunks.get(&pos)
    }
}
