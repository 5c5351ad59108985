//! Packed persistence of a legacy chunk's blend state.
//!
//! Only the vertical bounds and the height array survive a save; density
//! profiles and biome columns are cheap to resample and are rebuilt on the
//! next `calculate_data`. Validation happens at decode time: a record that
//! does not match the expected shape is rejected as a whole rather than
//! silently truncated or padded.

use crate::blend_cache::{BlendCache, LegacyArea, COLUMN_COUNT, UNSET};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use terraseam_core::error::DecodeError;

/// Wire form of a legacy chunk's blend state.
///
/// `heights` is `None` when every column was unset at pack time, which
/// keeps persisted chunks small in the common fully-blended case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedBlendState {
    min_section: i32,
    max_section: i32,
    heights: Option<Vec<f64>>,
}

/// Capture a cache's persistable state.
pub fn pack(cache: &BlendCache) -> PackedBlendState {
    let snapshot = cache.heights_snapshot();
    let heights = if snapshot.iter().all(|&h| h == UNSET) {
        None
    } else {
        Some(snapshot.to_vec())
    };
    PackedBlendState {
        min_section: cache.area().min_section(),
        max_section: cache.area().max_section(),
        heights,
    }
}

/// Rebuild a cache from a persisted record. `None` in means `None` out:
/// a chunk without a stored record has no legacy blend data.
///
/// A height array of the wrong length or inverted section bounds fails
/// with a [`DecodeError`]; callers treat the chunk as having no legacy
/// data rather than aborting generation.
pub fn unpack(packed: Option<&PackedBlendState>) -> Result<Option<BlendCache>, DecodeError> {
    let Some(packed) = packed else {
        return Ok(None);
    };
    if packed.min_section > packed.max_section {
        return Err(DecodeError::Corrupt(format!(
            "inverted legacy section range {}..={}",
            packed.min_section, packed.max_section
        )));
    }
    let area = LegacyArea::new(packed.min_section, packed.max_section);
    let cache = match &packed.heights {
        None => BlendCache::new(area),
        Some(heights) => {
            let array: [f64; COLUMN_COUNT] =
                heights
                    .as_slice()
                    .try_into()
                    .map_err(|_| DecodeError::HeightArrayLength {
                        expected: COLUMN_COUNT,
                        actual: heights.len(),
                    })?;
            BlendCache::from_heights(area, array)
        }
    };
    Ok(Some(cache))
}

impl PackedBlendState {
    /// Serialize to the binary chunk-record form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("Failed to serialize blend state")
    }

    /// Deserialize from the binary chunk-record form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        bincode::deserialize(bytes)
            .map_err(|err| DecodeError::Corrupt(format!("blend state: {err}")))
    }
}
