//! Fixed-width bit-packed integer array.
//!
//! Backing store for every height-tracker kind: 256 column entries packed
//! at the smallest width that can represent the chunk's height range.
//! Entries never straddle word boundaries, so `get`/`set` are single-word
//! shift-and-mask operations.

/// Bit-packed array of fixed-width unsigned entries backed by `u64` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedArray {
    bits: u32,
    mask: u64,
    len: usize,
    entries_per_word: usize,
    words: Vec<u64>,
}

impl PackedArray {
    /// Create a zero-filled array of `len` entries, `bits` wide each.
    ///
    /// # Panics
    /// Panics if `bits` is outside `1..=32`.
    pub fn new(bits: u32, len: usize) -> Self {
        assert!((1..=32).contains(&bits), "entry width out of range");
        let entries_per_word = (64 / bits) as usize;
        let word_count = len.div_ceil(entries_per_word);
        Self {
            bits,
            mask: (1u64 << bits) - 1,
            len,
            entries_per_word,
            words: vec![0; word_count],
        }
    }

    /// Smallest entry width able to represent `max_value`.
    pub fn bits_for(max_value: u64) -> u32 {
        (64 - max_value.leading_zeros()).max(1)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the array holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entry width in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Read the entry at `index`.
    pub fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.len);
        let word = self.words[index / self.entries_per_word];
        let shift = (index % self.entries_per_word) as u32 * self.bits;
        (word >> shift) & self.mask
    }

    /// Write the entry at `index`. Values wider than the entry are masked.
    pub fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.len);
        debug_assert!(value <= self.mask, "value {value} exceeds entry mask");
        let word = &mut self.words[index / self.entries_per_word];
        let shift = (index % self.entries_per_word) as u32 * self.bits;
        *word = (*word & !(self.mask << shift)) | ((value & self.mask) << shift);
    }

    /// Borrow the raw backing words for persistence.
    pub fn raw(&self) -> &[u64] {
        &self.words
    }

    /// Replace the backing words from a persisted copy.
    ///
    /// Returns false (leaving the array untouched) when `words` does not
    /// match the expected backing length for this array's width.
    pub fn set_raw(&mut self, words: &[u64]) -> bool {
        if words.len() != self.words.len() {
            return false;
        }
        self.words.copy_from_slice(words);
        true
    }
}
