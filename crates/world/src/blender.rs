//! Region-level blending across legacy chunk boundaries.
//!
//! A [`RegionBlender`] is an immutable snapshot built once per generation
//! task. It aggregates the blend caches of surrounding legacy chunks and
//! answers three queries for the new chunk's evaluators: a blended height
//! offset/weight, a blended density correction, and a wrapped biome
//! resolver. With no legacy chunks nearby every query is a pass-through.

use crate::blend_cache::{BlendCache, CELLS_PER_CHUNK, UNSET};
use crate::chunk::{blend_sides, ChunkSource, GenerationRegion};
use crate::jitter::JitterNoise;
use std::collections::BTreeMap;
use std::sync::Arc;
use terraseam_core::block::BiomeId;
use terraseam_core::coords::{self, ChunkPos, CELL_HEIGHT};
use tracing::{debug, instrument};

/// Maximum cell distance at which a legacy height or biome sample still
/// influences a query point. Beyond it, influence is exactly zero.
pub const HEIGHT_BLENDING_RANGE_CELLS: i32 = 15;
/// Chunk scan radius covering the height blending range.
pub const HEIGHT_BLENDING_RANGE_CHUNKS: i32 =
    (HEIGHT_BLENDING_RANGE_CELLS + CELLS_PER_CHUNK - 1) / CELLS_PER_CHUNK;
/// Maximum cell distance for density blending. Density needs less lateral
/// context than height but more vertical precision.
pub const DENSITY_BLENDING_RANGE_CELLS: i32 = 2;
/// Chunk scan radius covering the density blending range.
pub const DENSITY_BLENDING_RANGE_CHUNKS: i32 = 1;

/// Amplitude of the biome-boundary jitter, in cells.
const BIOME_JITTER_AMPLITUDE: f64 = 12.0;

/// Vertical distances count double when weighting density samples,
/// compressing the vertical axis relative to horizontal.
const DENSITY_VERTICAL_STRETCH: f64 = 2.0;

/// Blended height output: `offset` is a density-offset term for the new
/// noise evaluator, `alpha` the weight of new generation (0 = pure legacy,
/// 1 = pure new).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendResult {
    /// Weight of the new generation's own output, in `[0, 1]`.
    pub alpha: f64,
    /// Density offset derived from blended legacy heights.
    pub offset: f64,
}

impl BlendResult {
    /// The pass-through result: full new generation, no legacy influence.
    pub const PASS_THROUGH: BlendResult = BlendResult {
        alpha: 1.0,
        offset: 0.0,
    };
}

/// Cubic Hermite ease `3t^2 - 2t^3`, so legacy influence decays smoothly
/// rather than with a hard cutoff.
#[inline]
fn smooth(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn length2(dx: f64, dz: f64) -> f64 {
    (dx * dx + dz * dz).sqrt()
}

#[inline]
fn length3(dx: f64, dy: f64, dz: f64) -> f64 {
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Inverse-distance weight `1 / d^4`.
#[inline]
fn idw_weight(distance: f64) -> f64 {
    let sq = distance * distance;
    1.0 / (sq * sq)
}

/// Translate an absolute legacy surface height into a density-offset term
/// for the new noise evaluator. Piecewise-periodic with period
/// [`CELL_HEIGHT`] in its fractional residue; constants tuned against the
/// generation formula they correct and preserved verbatim.
pub fn height_to_offset(height: f64) -> f64 {
    let shifted = height + 0.5;
    let residue = coords::positive_modulo(shifted, CELL_HEIGHT as f64);
    (32.0 * (shifted - 128.0) - 3.0 * (shifted - 120.0) * residue + 3.0 * residue * residue)
        / (128.0 * (32.0 - 3.0 * residue))
}

/// Resolves a noise biome at quart resolution.
pub trait BiomeResolver {
    /// Biome at the given absolute quart position.
    fn noise_biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> BiomeId;
}

impl<F: Fn(i32, i32, i32) -> BiomeId> BiomeResolver for F {
    fn noise_biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> BiomeId {
        self(quart_x, quart_y, quart_z)
    }
}

/// A biome resolver that prefers nearby legacy biomes and falls back to
/// the wrapped resolver everywhere else.
pub struct BlendedBiomeResolver<'a, F> {
    blender: &'a RegionBlender,
    fallback: F,
}

impl<F: BiomeResolver> BiomeResolver for BlendedBiomeResolver<'_, F> {
    fn noise_biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> BiomeId {
        match self.blender.blend_biome(quart_x, quart_y, quart_z) {
            Some(biome) => biome,
            None => self.fallback.noise_biome(quart_x, quart_y, quart_z),
        }
    }
}

/// Immutable aggregate of the blend caches around one generation task.
///
/// Two maps at different radii: height/biome blending needs more lateral
/// context than density blending. The empty instance (both maps empty)
/// already produces the pass-through answer on every code path.
pub struct RegionBlender {
    height_and_biome: BTreeMap<ChunkPos, Arc<BlendCache>>,
    density: BTreeMap<ChunkPos, Arc<BlendCache>>,
    jitter: JitterNoise,
}

impl RegionBlender {
    /// A blender with no legacy data: every query passes through.
    pub fn empty() -> Self {
        Self {
            height_and_biome: BTreeMap::new(),
            density: BTreeMap::new(),
            jitter: JitterNoise::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        height_and_biome: BTreeMap<ChunkPos, Arc<BlendCache>>,
        density: BTreeMap<ChunkPos, Arc<BlendCache>>,
    ) -> Self {
        Self {
            height_and_biome,
            density,
            jitter: JitterNoise::new(),
        }
    }

    /// Build the snapshot for a generation task by scanning the chunks
    /// around the region center. Each legacy chunk's cache is populated
    /// for the sides where a real generation boundary exists, then filed
    /// under one or both radii.
    #[instrument(skip(region), fields(center = %region.center()))]
    pub fn of<R: GenerationRegion>(region: &R) -> Self {
        let center = region.center();
        if !region.legacy_within(center, HEIGHT_BLENDING_RANGE_CHUNKS) {
            return Self::empty();
        }

        let mut height_and_biome = BTreeMap::new();
        let mut density = BTreeMap::new();
        for dz in -HEIGHT_BLENDING_RANGE_CHUNKS..=HEIGHT_BLENDING_RANGE_CHUNKS {
            for dx in -HEIGHT_BLENDING_RANGE_CHUNKS..=HEIGHT_BLENDING_RANGE_CHUNKS {
                let pos = center.offset(dx, dz);
                let Some(chunk) = region.chunk(pos) else {
                    continue;
                };
                let Some(cache) = chunk.blend_cache() else {
                    continue;
                };
                cache.calculate_data(chunk, blend_sides(region, pos));
                if dx.abs() <= DENSITY_BLENDING_RANGE_CHUNKS
                    && dz.abs() <= DENSITY_BLENDING_RANGE_CHUNKS
                {
                    density.insert(pos, Arc::clone(&cache));
                }
                height_and_biome.insert(pos, cache);
            }
        }
        debug!(
            legacy_chunks = height_and_biome.len(),
            "region blender built"
        );
        Self {
            height_and_biome,
            density,
            jitter: JitterNoise::new(),
        }
    }

    /// True when no legacy chunk contributes to this snapshot.
    pub fn is_empty(&self) -> bool {
        self.height_and_biome.is_empty()
    }

    /// Look up an exact cached sample at a quart column, trying the owning
    /// chunk first and then the neighbors for which this column is a halo
    /// column.
    fn cached_value(
        map: &BTreeMap<ChunkPos, Arc<BlendCache>>,
        quart_x: i32,
        quart_z: i32,
        get: impl Fn(&BlendCache, i32, i32) -> f64,
    ) -> Option<f64> {
        let chunk_x = coords::quart_to_section(quart_x);
        let chunk_z = coords::quart_to_section(quart_z);
        let local_x = quart_x - coords::section_to_quart(chunk_x);
        let local_z = quart_z - coords::section_to_quart(chunk_z);

        let lookup = |cx: i32, cz: i32, lx: i32, lz: i32| -> Option<f64> {
            let cache = map.get(&ChunkPos::new(cx, cz))?;
            let value = get(cache, lx, lz);
            (value != UNSET).then_some(value)
        };

        lookup(chunk_x, chunk_z, local_x, local_z)
            .or_else(|| {
                (local_x == 0).then(|| lookup(chunk_x - 1, chunk_z, CELLS_PER_CHUNK, local_z))?
            })
            .or_else(|| {
                (local_z == 0).then(|| lookup(chunk_x, chunk_z - 1, local_x, CELLS_PER_CHUNK))?
            })
            .or_else(|| {
                (local_x == 0 && local_z == 0)
                    .then(|| lookup(chunk_x - 1, chunk_z - 1, CELLS_PER_CHUNK, CELLS_PER_CHUNK))?
            })
    }

    /// Blended height offset and new-generation weight at a block column.
    ///
    /// An exact legacy sample at this quart column is trusted fully
    /// (`alpha = 0`). Otherwise every populated legacy height column
    /// within [`HEIGHT_BLENDING_RANGE_CELLS`] contributes with inverse
    /// fourth-power distance weight, and `alpha` eases from 0 to 1 with
    /// the distance to the closest sample. Nothing in range yields the
    /// pass-through `(1, 0)`.
    pub fn blend_offset_and_factor(&self, block_x: i32, block_z: i32) -> BlendResult {
        let quart_x = coords::block_to_quart(block_x);
        let quart_z = coords::block_to_quart(block_z);

        if let Some(height) =
            Self::cached_value(&self.height_and_biome, quart_x, quart_z, |cache, x, z| {
                cache.get_height(x, z)
            })
        {
            return BlendResult {
                alpha: 0.0,
                offset: height_to_offset(height),
            };
        }

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut min_distance = f64::INFINITY;
        for (pos, cache) in &self.height_and_biome {
            let base_x = coords::section_to_quart(pos.x);
            let base_z = coords::section_to_quart(pos.z);
            cache.iterate_heights(base_x, base_z, |sample_x, sample_z, height| {
                let distance = length2((quart_x - sample_x) as f64, (quart_z - sample_z) as f64);
                if distance <= HEIGHT_BLENDING_RANGE_CELLS as f64 {
                    if distance < min_distance {
                        min_distance = distance;
                    }
                    let weight = idw_weight(distance);
                    weighted_sum += weight * height;
                    weight_total += weight;
                }
            });
        }

        if min_distance.is_infinite() {
            return BlendResult::PASS_THROUGH;
        }
        let average = weighted_sum / weight_total;
        let eased = (min_distance / (HEIGHT_BLENDING_RANGE_CELLS + 1) as f64).clamp(0.0, 1.0);
        BlendResult {
            alpha: smooth(eased),
            offset: height_to_offset(average),
        }
    }

    /// Blended density at a block position. An exact legacy sample at the
    /// query cell is returned directly; otherwise nearby legacy samples
    /// (vertical distance doubled) are inverse-distance averaged and
    /// interpolated against `raw_density` with a falloff normalized over
    /// radius 3 (deliberately wider than the 2-cell sampling radius).
    pub fn blend_density(&self, block_x: i32, block_y: i32, block_z: i32, raw_density: f64) -> f64 {
        let quart_x = coords::block_to_quart(block_x);
        let quart_z = coords::block_to_quart(block_z);
        let cell_y = coords::block_to_cell_y(block_y);

        if let Some(value) = Self::cached_value(&self.density, quart_x, quart_z, |cache, x, z| {
            cache.get_density(x, cell_y, z)
        }) {
            return value;
        }

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut min_distance = f64::INFINITY;
        for (pos, cache) in &self.density {
            let base_x = coords::section_to_quart(pos.x);
            let base_z = coords::section_to_quart(pos.z);
            cache.iterate_densities(
                base_x,
                base_z,
                cell_y - 1,
                cell_y + 1,
                |sample_x, sample_y, sample_z, value| {
                    let distance = length3(
                        (quart_x - sample_x) as f64,
                        (cell_y - sample_y) as f64 * DENSITY_VERTICAL_STRETCH,
                        (quart_z - sample_z) as f64,
                    );
                    if distance <= DENSITY_BLENDING_RANGE_CELLS as f64 {
                        if distance < min_distance {
                            min_distance = distance;
                        }
                        let weight = idw_weight(distance);
                        weighted_sum += weight * value;
                        weight_total += weight;
                    }
                },
            );
        }

        if min_distance.is_infinite() {
            return raw_density;
        }
        let average = weighted_sum / weight_total;
        let alpha = smooth(
            (min_distance / (DENSITY_BLENDING_RANGE_CELLS + 1) as f64).clamp(0.0, 1.0),
        );
        average + alpha * (raw_density - average)
    }

    /// The legacy biome at a quart position, if one wins the jittered
    /// distance test, else None.
    pub fn blend_biome(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> Option<BiomeId> {
        let mut best = None;
        let mut min_distance = f64::INFINITY;
        for (pos, cache) in &self.height_and_biome {
            let base_x = coords::section_to_quart(pos.x);
            let base_z = coords::section_to_quart(pos.z);
            cache.iterate_biomes(base_x, base_z, quart_y, |sample_x, sample_z, biome| {
                let distance = length2((quart_x - sample_x) as f64, (quart_z - sample_z) as f64);
                if distance <= HEIGHT_BLENDING_RANGE_CELLS as f64 && distance < min_distance {
                    min_distance = distance;
                    best = Some(biome);
                }
            });
        }
        if min_distance.is_infinite() {
            return None;
        }

        // Perturb the winning distance so the blend boundary is irregular
        // rather than a perfect circle.
        let offset = self.jitter.shift(quart_x as f64, 0.0, quart_z as f64) * BIOME_JITTER_AMPLITUDE;
        let perturbed =
            ((min_distance + offset) / (HEIGHT_BLENDING_RANGE_CELLS + 1) as f64).clamp(0.0, 1.0);
        if perturbed <= 0.5 {
            best
        } else {
            None
        }
    }

    /// Wrap a biome resolver: legacy biomes win near legacy chunks, the
    /// fallback resolves everywhere else.
    pub fn biome_resolver<F: BiomeResolver>(&self, fallback: F) -> BlendedBiomeResolver<'_, F> {
        BlendedBiomeResolver {
            blender: self,
            fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend_cache::{inside_index, outside_index, BlendColumns, LegacyArea};

    fn single_height_cache(cell_x: i32, cell_z: i32, height: f64) -> Arc<BlendCache> {
        let cache = BlendCache::new(LegacyArea::new(-4, 19));
        let mut columns = BlendColumns::unset();
        let index = crate::blend_cache::column_index(cell_x, cell_z).expect("border column");
        columns.heights[index] = height;
        cache.publish(columns);
        Arc::new(cache)
    }

    fn height_map(pos: ChunkPos, cache: Arc<BlendCache>) -> BTreeMap<ChunkPos, Arc<BlendCache>> {
        let mut map = BTreeMap::new();
        map.insert(pos, cache);
        map
    }

    #[test]
    fn empty_blender_passes_through() {
        let blender = RegionBlender::empty();
        assert_eq!(
            blender.blend_offset_and_factor(10, -20),
            BlendResult::PASS_THROUGH
        );
        assert_eq!(blender.blend_density(0, 64, 0, 0.75), 0.75);
        assert_eq!(blender.blend_biome(0, 16, 0), None);
    }

    #[test]
    fn exact_height_sample_is_fully_trusted() {
        let cache = single_height_cache(0, 0, 64.0);
        let blender =
            RegionBlender::from_parts(height_map(ChunkPos::new(0, 0), cache), BTreeMap::new());
        let result = blender.blend_offset_and_factor(0, 0);
        assert_eq!(result.alpha, 0.0);
        assert_eq!(result.offset, height_to_offset(64.0));
    }

    #[test]
    fn exact_lookup_reaches_halo_columns_of_the_west_neighbor() {
        // Halo column (4, 2) of chunk (0,0) covers quart (4, 2), which is
        // owned by chunk (1, 0) at local (0, 2).
        let cache = single_height_cache(4, 2, 90.0);
        let blender =
            RegionBlender::from_parts(height_map(ChunkPos::new(0, 0), cache), BTreeMap::new());
        let result = blender.blend_offset_and_factor(16, 8);
        assert_eq!(result.alpha, 0.0);
        assert_eq!(result.offset, height_to_offset(90.0));
    }

    #[test]
    fn nearby_sample_blends_with_partial_alpha() {
        let cache = single_height_cache(0, 0, 64.0);
        let blender =
            RegionBlender::from_parts(height_map(ChunkPos::new(0, 0), cache), BTreeMap::new());
        // 5 cells east of the sample: inside range, no exact hit.
        let result = blender.blend_offset_and_factor(20, 0);
        assert!(result.alpha > 0.0 && result.alpha < 1.0, "{result:?}");
        // Single sample: the weighted average is the sample itself.
        assert!((result.offset - height_to_offset(64.0)).abs() < 1e-12);
    }

    #[test]
    fn beyond_range_is_pure_new_generation() {
        let cache = single_height_cache(0, 0, 64.0);
        let blender =
            RegionBlender::from_parts(height_map(ChunkPos::new(0, 0), cache), BTreeMap::new());
        // 20 cells away on the X axis, beyond HEIGHT_BLENDING_RANGE_CELLS.
        let result = blender.blend_offset_and_factor(80, 0);
        assert_eq!(result, BlendResult::PASS_THROUGH);
    }

    #[test]
    fn exact_density_sample_wins_over_raw() {
        let cache = BlendCache::new(LegacyArea::new(-4, 19));
        let mut columns = BlendColumns::unset();
        let index = inside_index(0, 0);
        columns.heights[index] = 64.0;
        // Cell y=8 (blocks 64..72) carries 0.3.
        let mut column = vec![UNSET; 48];
        column[16] = 0.3;
        columns.densities[index] = Some(column.into_boxed_slice());
        cache.publish(columns);
        let cache = Arc::new(cache);

        let blender = RegionBlender::from_parts(
            height_map(ChunkPos::new(0, 0), Arc::clone(&cache)),
            height_map(ChunkPos::new(0, 0), cache),
        );
        for raw in [-1.0, 0.0, 0.5, 64.0] {
            assert_eq!(blender.blend_density(0, 64, 0, raw), 0.3);
        }
    }

    #[test]
    fn density_interpolates_toward_raw_with_distance() {
        let cache = BlendCache::new(LegacyArea::new(-4, 19));
        let mut columns = BlendColumns::unset();
        let index = inside_index(0, 0);
        columns.heights[index] = 64.0;
        columns.densities[index] = Some(vec![-0.5; 48].into_boxed_slice());
        cache.publish(columns);
        let cache = Arc::new(cache);

        let blender = RegionBlender::from_parts(
            height_map(ChunkPos::new(0, 0), Arc::clone(&cache)),
            height_map(ChunkPos::new(0, 0), cache),
        );
        // Two cells east of the cached column: on the sampling radius.
        let blended = blender.blend_density(8, 64, 0, 1.0);
        assert!(blended > -0.5 && blended <= 1.0, "{blended}");
    }

    #[test]
    fn biome_wins_close_to_the_sample_and_loses_far_away() {
        let cache = BlendCache::new(LegacyArea::new(-4, 19));
        let mut columns = BlendColumns::unset();
        let index = outside_index(4, 4);
        columns.heights[index] = 64.0;
        columns.biomes[index] = Some(vec![BiomeId(7); 96].into_boxed_slice());
        cache.publish(columns);

        let blender = RegionBlender::from_parts(
            height_map(ChunkPos::new(0, 0), Arc::new(cache)),
            BTreeMap::new(),
        );
        // On the sample itself the perturbed distance stays at most
        // 12/16 * noise; noise can push it past 0.5 only with distance
        // near zero left aside, so assert via the resolver fallback path
        // far away instead of pinning the jitter value.
        assert_eq!(blender.blend_biome(200, 16, 200), None);

        let resolver = blender.biome_resolver(|_, _, _| BiomeId(1));
        assert_eq!(resolver.noise_biome(200, 16, 200), BiomeId(1));
    }

    #[test]
    fn height_to_offset_period_residue_law() {
        // Same fractional residue 8 blocks apart shifts the offset by
        // exactly 1/16.
        for height in [-64.0, 0.0, 33.3, 63.5, 100.0, 255.9] {
            let delta = height_to_offset(height + 8.0) - height_to_offset(height);
            assert!((delta - 1.0 / 16.0).abs() < 1e-9, "height {height}: {delta}");
        }
    }

    #[test]
    fn smooth_is_a_cubic_hermite_ease() {
        assert_eq!(smooth(0.0), 0.0);
        assert_eq!(smooth(1.0), 1.0);
        assert_eq!(smooth(0.5), 0.5);
        assert!(smooth(0.25) < 0.25);
        assert!(smooth(0.75) > 0.75);
    }

    #[test]
    fn blending_range_constants() {
        assert_eq!(HEIGHT_BLENDING_RANGE_CHUNKS, 4);
        assert_eq!(DENSITY_BLENDING_RANGE_CHUNKS, 1);
        // The documented scenario: 20 cells is beyond the height range.
        assert!(20 > HEIGHT_BLENDING_RANGE_CELLS);
    }
}
