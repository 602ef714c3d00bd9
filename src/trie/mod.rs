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

//! Pluggable trie storage (spec.md §4.3): seven concrete layouts sharing
//! one [`Trie`] contract.

pub mod c2d_hybrid;
pub mod c2d_map;
pub mod c2w_array;
pub mod g2d_map;
pub mod h2d_map;
pub mod w2c_array;
pub mod w2c_hybrid;

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::LmError;
use crate::hash::RoMu;
use crate::payload::Payload;
use crate::word_index::{WordId, WordIndexType};

/// Maximum supported M-gram level (spec.md §1, §9(c)).
pub const N_MAX: usize = 7;

/// Which concrete trie layout is in use (spec.md §6's `trie_variant` key).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TrieVariant {
    C2dMap,
    C2dHybrid,
    C2wArray,
    W2cHybrid,
    W2cArray,
    G2dMap,
    H2dMap,
}

impl FromStr for TrieVariant {
    type Err = LmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c2d-map" => Ok(TrieVariant::C2dMap),
            "c2d-hybrid" => Ok(TrieVariant::C2dHybrid),
            "c2w-array" => Ok(TrieVariant::C2wArray),
            "w2c-hybrid" => Ok(TrieVariant::W2cHybrid),
            "w2c-array" => Ok(TrieVariant::W2cArray),
            "g2d-map" => Ok(TrieVariant::G2dMap),
            "h2d-map" => Ok(TrieVariant::H2dMap),
            other => Err(LmError::UnknownTrieVariant(other.to_string())),
        }
    }
}

impl TrieVariant {
    /// The word index variant the original calibration pins for this
    /// trie when the caller does not override `word_index` explicitly
    /// (`original_source/inc/Configuration.hpp`, one constant per trie
    /// namespace).
    pub fn default_word_index(&self) -> WordIndexType {
        match self {
            TrieVariant::C2dMap => WordIndexType::Basic,
            TrieVariant::C2dHybrid => WordIndexType::Basic,
            TrieVariant::C2wArray => WordIndexType::Counting,
            TrieVariant::W2cHybrid => WordIndexType::Counting,
            TrieVariant::W2cArray => WordIndexType::Counting,
            TrieVariant::G2dMap => WordIndexType::Counting,
            TrieVariant::H2dMap => WordIndexType::Hashing,
        }
    }

    /// Whether the bitmap hash cache is enabled by default for this trie
    /// (spec.md §4.4 / §6; `Configuration.hpp`'s per-trie
    /// `DO_BITMAP_HASH_CACHE`).
    pub fn default_bitmap_cache(&self) -> bool {
        matches!(
            self,
            TrieVariant::C2dMap | TrieVariant::C2wArray | TrieVariant::W2cArray
        )
    }
}

/// Per-level M-gram counts declared by the ARPA header, indexed `[0]` for
/// level 1 up to `[N-1]` for level N.
pub type NgramCounts = Vec<usize>;

/// Hash-map/bucket sizing knobs for trie construction (spec.md §6), kept
/// separate from [`crate::config::Config`] so this module doesn't need to
/// depend on it.
#[derive(Copy, Clone, Debug)]
pub struct TrieTuning {
    pub bitmap_bucket_multiplier: f64,
    pub bucket_factor_c2d_m: f64,
    pub bucket_factor_c2d_n: f64,
    pub bucket_factor_c2d_hybrid_m: f64,
    pub bucket_factor_c2d_hybrid_n: f64,
    pub words_per_bucket_g2d: f64,
}

impl Default for TrieTuning {
    fn default() -> Self {
        TrieTuning {
            bitmap_bucket_multiplier: crate::bitmap_cache::BUCKET_MULTIPLIER_FACTOR,
            bucket_factor_c2d_m: c2d_map::MID_LEVEL_MEMORY_FACTOR,
            bucket_factor_c2d_n: c2d_map::TOP_LEVEL_MEMORY_FACTOR,
            bucket_factor_c2d_hybrid_m: c2d_hybrid::MID_LEVEL_MEMORY_FACTOR,
            bucket_factor_c2d_hybrid_n: c2d_hybrid::TOP_LEVEL_MEMORY_FACTOR,
            words_per_bucket_g2d: g2d_map::WORDS_PER_BUCKET_FACTOR,
        }
    }
}

/// Recursive Szudzik pairing function, used to fold a word-id sequence
/// into a single bijective-over-the-representable-range context id
/// (spec.md §3/§4.3 "Context-to-Data Map Trie"). Every trie variant here
/// uses the same fold to derive the key for a prefix of any length; this
/// keeps "two distinct prefixes never collide within a level" true
/// uniformly, rather than only for the one variant spec.md calls it out
/// for by name.
#[inline]
fn szudzik_pair(a: u64, b: u64) -> u64 {
    if a >= b {
        a * a + a + b
    } else {
        a + b * b
    }
}

/// Folds `word_ids` into a single context/M-gram id. Folding a prefix
/// `word_ids[..k]` and then continuing with the remaining words yields
/// the same result as folding the whole slice at once, so this same
/// function serves both "the id of this whole m-gram" and "the id of its
/// (M-1)-word prefix" uses.
pub fn fold_context_id(word_ids: &[WordId]) -> u64 {
    let mut iter = word_ids.iter();
    let mut acc = match iter.next() {
        Some(w) => w.as_raw() as u64,
        None => return 0,
    };
    for w in iter {
        acc = szudzik_pair(acc, w.as_raw() as u64);
    }
    acc
}

/// Per-level storage for the unigram table (spec.md §3: "For level 1 an
/// entry for every known word exists, including `UNKNOWN_WORD_ID`").
/// Dense when the word index hands out continuous ids, sparse otherwise
/// (the `hashing` word index).
pub enum UnigramTable {
    Dense(Vec<Payload>),
    Sparse(HashMap<u32, Payload, RoMu>),
}

impl UnigramTable {
    pub fn new(is_continuous: bool, count_hint: usize) -> Self {
        if is_continuous {
            UnigramTable::Dense(vec![Payload::UNKNOWN_SENTINEL; count_hint.max(1)])
        } else {
            UnigramTable::Sparse(HashMap::with_capacity_and_hasher(count_hint, RoMu::new()))
        }
    }

    pub fn set(&mut self, id: WordId, payload: Payload) {
        match self {
            UnigramTable::Dense(v) => {
                let idx = id.as_raw() as usize;
                if idx >= v.len() {
                    v.resize(idx + 1, Payload::UNKNOWN_SENTINEL);
                }
                v[idx] = payload;
            }
            UnigramTable::Sparse(m) => {
                m.insert(id.as_raw(), payload);
            }
        }
    }

    /// Always succeeds: unknown/never-inserted ids fall back to the
    /// sentinel payload (spec.md §4.3 `get_unigram_payload`).
    pub fn get(&self, id: WordId) -> Payload {
        match self {
            UnigramTable::Dense(v) => v
                .get(id.as_raw() as usize)
                .copied()
                .unwrap_or(Payload::UNKNOWN_SENTINEL),
            UnigramTable::Sparse(m) => m
                .get(&id.as_raw())
                .copied()
                .unwrap_or(Payload::UNKNOWN_SENTINEL),
        }
    }
}

/// Common query/ingestion contract implemented by all seven trie variants
/// (spec.md §4.3).
pub trait Trie {
    /// Capacity hint, one count per level `1..=N`.
    fn pre_allocate(&mut self, counts: &NgramCounts);

    fn add_unigram(&mut self, word_id: WordId, payload: Payload);

    /// `1 < M < N`.
    fn add_m_gram(&mut self, word_ids: &[WordId], payload: Payload);

    /// `M == N`: log-prob only, no back-off.
    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32);

    fn get_unigram_payload(&self, word_id: WordId) -> Payload;

    /// `1 < M < N`.
    fn get_m_gram_payload(&self, word_ids: &[WordId]) -> Option<Payload>;

    /// `M == N`.
    fn get_n_gram_log_prob(&self, word_ids: &[WordId]) -> Option<f32>;

    /// Learn this m-gram's hash for the bitmap cache, called during
    /// ingestion. A no-op for variants with no cache attached.
    fn register_m_gram_hash(&mut self, _word_ids: &[WordId]) {}

    /// Seals internal storage (sorts arrays, shrinks maps) once ingestion
    /// is complete.
    fn finalize(&mut self) {}
}

/// Builds the concrete trie for `variant`. `use_cache` should come from
/// [`TrieVariant::default_bitmap_cache`] unless the caller's config
/// overrides it (spec.md §6 `bitmap_cache`); variants with no bitmap
/// cache of their own ignore the flag.
pub fn build(
    variant: TrieVariant,
    n: usize,
    is_continuous: bool,
    use_cache: bool,
    tuning: TrieTuning,
) -> Box<dyn Trie> {
    match variant {
        TrieVariant::C2dMap => Box::new(c2d_map::C2dMapTrie::new(
            n,
            is_continuous,
            use_cache,
            tuning.bucket_factor_c2d_m,
            tuning.bucket_factor_c2d_n,
            tuning.bitmap_bucket_multiplier,
        )),
        TrieVariant::C2dHybrid => Box::new(c2d_hybrid::C2dHybridTrie::new(
            n,
            is_continuous,
            tuning.bucket_factor_c2d_hybrid_m,
            tuning.bucket_factor_c2d_hybrid_n,
        )),
        TrieVariant::C2wArray => Box::new(c2w_array::C2wArrayTrie::new(
            n,
            is_continuous,
            use_cache,
            tuning.bitmap_bucket_multiplier,
        )),
        TrieVariant::W2cHybrid => Box::new(w2c_hybrid::W2cHybridTrie::new(n, is_continuous)),
        TrieVariant::W2cArray => Box::new(w2c_array::W2cArrayTrie::new(
            n,
            is_continuous,
            use_cache,
            tuning.bitmap_bucket_multiplier,
        )),
        TrieVariant::G2dMap => Box::new(g2d_map::G2dMapTrie::new(
            n,
            is_continuous,
            tuning.words_per_bucket_g2d,
        )),
        TrieVariant::H2dMap => Box::new(h2d_map::H2dMapTrie::new(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn szudzik_pairing_is_injective_for_small_values() {
        let mut seen = std::collections::HashSet::new();
        for a in 0u64..40 {
            for b in 0u64..40 {
                assert!(seen.insert(szudzik_pair(a, b)), "collision at ({}, {})", a, b);
            }
        }
    }

    #[test]
    fn fold_context_id_is_prefix_stable() {
        let ids = vec![
            WordId::from_raw(3),
            WordId::from_raw(7),
            WordId::from_raw(11),
        ];
        let prefix_then_full = {
            let prefix = fold_context_id(&ids[..2]);
            szudzik_pair(prefix, ids[2].as_raw() as u64)
        };
        assert_eq!(prefix_then_full, fold_context_id(&ids));
    }

    #[test]
    fn trie_variant_from_str_roundtrip() {
        for (s, v) in [
            ("c2d-map", TrieVariant::C2dMap),
            ("c2d-hybrid", TrieVariant::C2dHybrid),
            ("c2w-array", TrieVariant::C2wArray),
            ("w2c-hybrid", TrieVariant::W2cHybrid),
            ("w2c-array", TrieVariant::W2cArray),
            ("g2d-map", TrieVariant::G2dMap),
            ("h2d-map", TrieVariant::H2dMap),
        ] {
            assert_eq!(TrieVariant::from_str(s).unwrap(), v);
        }
        assert!(TrieVariant::from_str("bogus").is_err());
    }

    #[test]
    fn default_bitmap_cache_matches_calibration() {
        assert!(TrieVariant::C2dMap.default_bitmap_cache());
        assert!(!TrieVariant::C2dHybrid.default_bitmap_cache());
        assert!(!TrieVariant::G2dMap.default_bitmap_cache());
    }
}
