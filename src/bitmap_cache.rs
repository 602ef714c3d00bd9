/*
 *  Copyright (c) 2021 Works Applications Co., Ltd.
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Per-level Bloom-style absence filter (spec.md §4.4).
//!
//! A `0` bit proves an m-gram hash is absent from the trie and lets the
//! query engine skip consulting it; a `1` bit only means "possibly
//! present" — the trie remains authoritative (spec.md §3's invariant on
//! the cache being a conservative approximation).

use crate::util::next_pow2;

/// Default bucket count multiplier, empirically chosen for <5%
/// false-positive rate at negligible memory cost (spec.md §4.4,
/// confirmed by `original_source`'s `__BitmapHashCache::BUCKET_MULTIPLIER_FACTOR`).
pub const BUCKET_MULTIPLIER_FACTOR: f64 = 20.0;

pub struct BitmapHashCache {
    bits: Vec<u64>,
    mask: u64,
}

const WORD_BITS: usize = 64;

impl BitmapHashCache {
    /// Allocates a bit array sized `next_pow2(multiplier * count)`.
    pub fn with_count(count: usize, multiplier: f64) -> Self {
        let size = next_pow2(((count as f64) * multiplier).ceil().max(1.0) as usize);
        let words = size.div_ceil(WORD_BITS);
        BitmapHashCache {
            bits: vec![0u64; words.max(1)],
            mask: (size as u64).saturating_sub(1),
        }
    }

    pub fn new(count: usize) -> Self {
        Self::with_count(count, BUCKET_MULTIPLIER_FACTOR)
    }

    #[inline]
    fn slot(&self, hash: u64) -> (usize, u64) {
        let bit_index = hash & self.mask;
        ((bit_index as usize) / WORD_BITS, 1u64 << (bit_index % WORD_BITS as u64))
    }

    /// Records that an m-gram with this hash was inserted into the trie.
    #[inline]
    pub fn set(&mut self, hash: u64) {
        let (word, bit) = self.slot(hash);
        self.bits[word] |= bit;
    }

    /// `false` proves the m-gram is absent from the trie; `true` means
    /// "possibly present, go check the trie".
    #[inline]
    pub fn probably_present(&self, hash: u64) -> bool {
        let (word, bit) = self.slot(hash);
        self.bits[word] & bit != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_hash_never_reports_present() {
        let mut cache = BitmapHashCache::new(8);
        for h in [1u64, 77, 900, 123456] {
            cache.set(h);
        }
        assert!(cache.probably_present(1));
        assert!(cache.probably_present(77));
    }

    #[test]
    fn unset_bit_proves_absence() {
        let cache = BitmapHashCache::new(100);
        // Nothing was inserted: every probe must come back absent.
        for h in [0u64, 5, 999, u64::MAX] {
            assert!(!cache.probably_present(h));
        }
    }
}
