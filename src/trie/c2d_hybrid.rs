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

//! Context-to-Data Hybrid Trie (spec.md §4.3): sorted arrays for the
//! lowest fan-out levels, hash maps for the rest, switched over at
//! [`ARRAY_LEVEL_THRESHOLD`].

use std::collections::HashMap;

use crate::hash::RoMu;
use crate::payload::Payload;
use crate::trie::{fold_context_id, NgramCounts, Trie, UnigramTable};
use crate::word_index::WordId;

/// Memory factor for the array-backed mid levels, matching
/// `original_source`'s `__C2DHybridTrie::UM_M_GRAM_MEMORY_FACTOR`.
pub const MID_LEVEL_MEMORY_FACTOR: f64 = 2.1;
/// Memory factor for the map-backed top level, matching
/// `__C2DHybridTrie::UM_N_GRAM_MEMORY_FACTOR`.
pub const TOP_LEVEL_MEMORY_FACTOR: f64 = 2.0;

/// Levels `2..=ARRAY_LEVEL_THRESHOLD` use a sorted array; levels above it
/// use a hash map, on the reasoning that low levels have few, dense
/// contexts (good for binary search) and high levels have many, sparse
/// ones (good for hashing).
const ARRAY_LEVEL_THRESHOLD: usize = 3;

enum LevelStore {
    Array(Vec<(u64, Payload)>),
    Map(HashMap<u64, Payload, RoMu>),
}

impl LevelStore {
    fn for_level(level: usize) -> Self {
        if level <= ARRAY_LEVEL_THRESHOLD {
            LevelStore::Array(Vec::new())
        } else {
            LevelStore::Map(HashMap::with_hasher(RoMu::new()))
        }
    }

    fn reserve(&mut self, cap: usize) {
        match self {
            LevelStore::Array(v) => v.reserve(cap),
            LevelStore::Map(m) => m.reserve(cap),
        }
    }

    fn insert(&mut self, key: u64, payload: Payload) {
        match self {
            LevelStore::Array(v) => v.push((key, payload)),
            LevelStore::Map(m) => {
                m.insert(key, payload);
            }
        }
    }

    fn get(&self, key: u64) -> Option<Payload> {
        match self {
            LevelStore::Array(v) => v
                .binary_search_by_key(&key, |(k, _)| *k)
                .ok()
                .map(|i| v[i].1),
            LevelStore::Map(m) => m.get(&key).copied(),
        }
    }

    fn finalize(&mut self) {
        if let LevelStore::Array(v) = self {
            v.sort_unstable_by_key(|(k, _)| *k);
        }
    }
}

pub struct C2dHybridTrie {
    unigrams: UnigramTable,
    mid_levels: Vec<LevelStore>,
    top_level: HashMap<u64, f32, RoMu>,
    n: usize,
    mid_level_factor: f64,
    top_level_factor: f64,
}

impl C2dHybridTrie {
    pub fn new(n: usize, is_continuous: bool, mid_level_factor: f64, top_level_factor: f64) -> Self {
        C2dHybridTrie {
            unigrams: UnigramTable::new(is_continuous, 0),
            mid_levels: (2..n).map(LevelStore::for_level).collect(),
            top_level: HashMap::with_hasher(RoMu::new()),
            n,
            mid_level_factor,
            top_level_factor,
        }
    }
}

impl Trie for C2dHybridTrie {
    fn pre_allocate(&mut self, counts: &NgramCounts) {
        for (i, level) in (2..self.n).enumerate() {
            if let Some(&count) = counts.get(level - 1) {
                self.mid_levels[i].reserve((count as f64 * self.mid_level_factor) as usize);
            }
        }
        if let Some(&count) = counts.get(self.n.saturating_sub(1)) {
            self.top_level
                .reserve((count as f64 * self.top_level_factor) as usize);
        }
    }

    fn add_unigram(&mut self, word_id: WordId, payload: Payload) {
        self.unigrams.set(word_id, payload);
    }

    fn add_m_gram(&mut self, word_ids: &[WordId], payload: Payload) {
        let idx = word_ids.len() - 2;
        let key = fold_context_id(word_ids);
        self.mid_levels[idx].insert(key, payload);
    }

    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32) {
        let key = fold_context_id(word_ids);
        self.top_level.insert(key, log_prob);
    }

    fn get_unigram_payload(&self, word_id: WordId) -> Payload {
        self.unigrams.get(word_id)
    }

    fn get_m_gram_payload(&self, word_ids: &[WordId]) -> Option<Payload> {
        let idx = word_ids.len() - 2;
        let key = fold_context_id(word_ids);
        self.mid_levels.get(idx).and_then(|s| s.get(key))
    }

    fn get_n_gram_log_prob(&self, word_ids: &[WordId]) -> Option<f32> {
        let key = fold_context_id(word_ids);
        self.top_level.get(&key).copied()
    }

    fn finalize(&mut self) {
        for level in &mut self.mid_levels {
            level.finalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_backed_level_survives_finalize_and_lookup() {
        let mut trie = C2dHybridTrie::new(3, true, MID_LEVEL_MEMORY_FACTOR, TOP_LEVEL_MEMORY_FACTOR);
        let ids = [WordId::from_raw(4), WordId::from_raw(9)];
        trie.add_m_gram(&ids, Payload::new(-1.0, -0.3));
        trie.finalize();
        assert_eq!(trie.get_m_gram_payload(&ids), Some(Payload::new(-1.0, -0.3)));
    }

    #[test]
    fn map_backed_top_level_round_trips() {
        let mut trie = C2dHybridTrie::new(5, true, MID_LEVEL_MEMORY_FACTOR, TOP_LEVEL_MEMORY_FACTOR);
        let ids = [
            WordId::from_raw(1),
            WordId::from_raw(2),
            WordId::from_raw(3),
            WordId::from_raw(4),
        ];
        trie.add_n_gram(&ids, -2.5);
        assert_eq!(trie.get_n_gram_log_prob(&ids), Some(-2.5));
    }
}
