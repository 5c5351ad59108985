//! End-to-end blending scenarios over in-memory regions.
//!
//! Covers the main blending contracts: pass-through with no legacy
//! neighbors, exact boundary-column hits, the hard range cutoff, density
//! trust at cached cells, biome takeover near legacy chunks, border tick
//! collection and the carving protection volume.

use terraseam_core::block::{
    BiomeId, BLOCK_GRASS, BLOCK_OAK_LEAVES, BLOCK_STONE, BLOCK_WATER,
};
use terraseam_core::coords::{BlockPos, ChunkPos};
use terraseam_testkit::{TestChunk, TestRegion};
use terraseam_world::{
    border_tick_positions, height_to_offset, BiomeResolver, BlendResult, CarvingMaskFilter,
    ChunkSource, GenerationRegion, RegionBlender, UNSET,
};

const MIN_SECTION: i32 = 0;
const MAX_SECTION: i32 = 15;
const SURFACE_Y: i32 = 64;

/// A region whose center chunk is newly generated and whose east neighbor
/// at (1, 0) is a legacy chunk with grass at y=64 over stone.
fn region_with_legacy_east() -> TestRegion {
    let mut region = TestRegion::new(ChunkPos::new(0, 0));
    region.insert(
        ChunkPos::new(0, 0),
        TestChunk::new(MIN_SECTION, MAX_SECTION),
    );

    let mut legacy = TestChunk::new(MIN_SECTION, MAX_SECTION);
    legacy.fill_layers(SURFACE_Y - 4, SURFACE_Y - 1, BLOCK_STONE);
    legacy.fill_layer(SURFACE_Y, BLOCK_GRASS);
    legacy.set_uniform_biome(BiomeId(7));
    legacy.mark_legacy();
    region.insert(ChunkPos::new(1, 0), legacy);
    region
}

#[test]
fn no_legacy_neighbors_is_pure_pass_through() {
    let mut region = TestRegion::new(ChunkPos::new(0, 0));
    for dz in -1..=1 {
        for dx in -1..=1 {
            region.insert(
                ChunkPos::new(dx, dz),
                TestChunk::new(MIN_SECTION, MAX_SECTION),
            );
        }
    }
    let blender = RegionBlender::of(&region);
    assert!(blender.is_empty());
    for (x, z) in [(0, 0), (8, 8), (-100, 37)] {
        assert_eq!(
            blender.blend_offset_and_factor(x, z),
            BlendResult::PASS_THROUGH
        );
    }
    for raw in [-2.0, 0.0, 0.5, 13.7] {
        assert_eq!(blender.blend_density(4, 60, 4, raw), raw);
    }
    assert_eq!(blender.blend_biome(1, 10, 1), None);
}

#[test]
fn exact_boundary_column_is_fully_trusted() {
    // Scenario: the legacy chunk's west-edge corner column sits at world
    // block (16, 0); its sampled height is the grass layer.
    let region = region_with_legacy_east();
    let blender = RegionBlender::of(&region);
    let result = blender.blend_offset_and_factor(16, 0);
    assert_eq!(result.alpha, 0.0);
    assert_eq!(result.offset, height_to_offset(SURFACE_Y as f64));
}

#[test]
fn twenty_cells_away_is_beyond_the_blending_range() {
    let region = region_with_legacy_east();
    let blender = RegionBlender::of(&region);
    // Block 96 is 20 cells from the cached columns at quart x=4.
    assert_eq!(
        blender.blend_offset_and_factor(96, 0),
        BlendResult::PASS_THROUGH
    );
}

#[test]
fn alpha_grows_with_distance_from_the_boundary() {
    let region = region_with_legacy_east();
    let blender = RegionBlender::of(&region);
    let near = blender.blend_offset_and_factor(20, 0);
    let far = blender.blend_offset_and_factor(48, 0);
    assert!(near.alpha > 0.0);
    assert!(near.alpha < far.alpha, "{near:?} vs {far:?}");
    assert!(far.alpha < 1.0);
}

#[test]
fn cached_density_cell_ignores_raw_density() {
    let region = region_with_legacy_east();
    let blender = RegionBlender::of(&region);

    let cache = region
        .chunk(ChunkPos::new(1, 0))
        .and_then(|chunk| chunk.blend_cache())
        .expect("legacy chunk has a cache");
    assert!(cache.is_computed());

    // Cell y=5 covers blocks 40..48, well inside the legacy range.
    let stored = cache.get_density(0, 5, 0);
    assert_ne!(stored, UNSET);
    for raw in [-10.0, 0.0, 0.25, 99.0] {
        assert_eq!(blender.blend_density(16, 40, 0, raw), stored);
    }
}

#[test]
fn legacy_biome_wins_near_the_boundary_and_fallback_wins_far_away() {
    let region = region_with_legacy_east();
    let blender = RegionBlender::of(&region);
    let resolver = blender.biome_resolver(|_, _, _| BiomeId(1));

    // The jitter can push individual quarts past the acceptance
    // threshold, but not all of the boundary at once.
    let candidates = [(4, 0), (4, 1), (4, 2), (4, 3), (5, 0), (5, 1), (5, 2)];
    let legacy_hits = candidates
        .iter()
        .filter(|&&(qx, qz)| resolver.noise_biome(qx, 10, qz) == BiomeId(7))
        .count();
    assert!(legacy_hits > 0, "no legacy biome survived at the boundary");

    assert_eq!(resolver.noise_biome(200, 10, 200), BiomeId(1));
    assert_eq!(blender.blend_biome(200, 10, 200), None);
}

#[test]
fn border_ticks_collect_seam_leaves_and_fluids() {
    let mut region = region_with_legacy_east();
    {
        let legacy = region.chunk_mut(ChunkPos::new(1, 0)).expect("legacy chunk");
        // West edge fluid, east edge leaves, and one interior fluid that
        // must not be re-queued.
        legacy.set_block(0, 70, 5, BLOCK_WATER);
        legacy.set_block(15, 70, 5, BLOCK_OAK_LEAVES);
        legacy.set_block(8, 70, 8, BLOCK_WATER);
    }

    let positions = border_tick_positions(&region, ChunkPos::new(1, 0));
    assert!(positions.contains(&BlockPos::new(16, 70, 5)));
    assert!(positions.contains(&BlockPos::new(31, 70, 5)));
    assert!(!positions.iter().any(|p| p.x == 24 && p.z == 8));
}

#[test]
fn chunks_without_blend_data_get_no_border_ticks() {
    let region = region_with_legacy_east();
    assert!(border_tick_positions(&region, ChunkPos::new(0, 0)).is_empty());
    assert!(border_tick_positions(&region, ChunkPos::new(7, 7)).is_empty());
}

#[test]
fn carving_is_suppressed_inside_legacy_volumes_only() {
    let region = region_with_legacy_east();
    let filter =
        CarvingMaskFilter::new(&region, ChunkPos::new(0, 0)).expect("legacy neighbor in range");
    // Deep inside the legacy chunk at (1, 0): jitter cannot move the
    // query outside the protection distance.
    assert!(filter.is_protected(24, 64, 8));
    // Far to the west of everything.
    assert!(!filter.is_protected(-200, 64, 8));
}

#[test]
fn no_legacy_neighbors_means_no_carving_filter() {
    let mut region = TestRegion::new(ChunkPos::new(0, 0));
    region.insert(
        ChunkPos::new(0, 0),
        TestChunk::new(MIN_SECTION, MAX_SECTION),
    );
    assert!(CarvingMaskFilter::new(&region, ChunkPos::new(0, 0)).is_none());
}

#[test]
fn primed_tracker_reports_single_opaque_block() {
    // Height tracker scenario: one stone block at local (5, 70, 5) in an
    // otherwise empty chunk with min_y = -64.
    let mut chunk = TestChunk::new(-4, 19);
    chunk.set_block(5, 70, 5, BLOCK_STONE);
    chunk.prime_heightmaps(&[terraseam_world::HeightmapKind::WorldSurface]);
    let tracker = chunk
        .height_tracker(terraseam_world::HeightmapKind::WorldSurface)
        .expect("primed tracker");
    assert_eq!(tracker.highest_taken(5, 5), 70);
    assert_eq!(tracker.first_available(5, 5), 71);
    // Untouched columns sit at the floor.
    assert_eq!(tracker.highest_taken(0, 0), -65);
}
