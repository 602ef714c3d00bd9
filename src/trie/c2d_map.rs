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

//! Context-to-Data Map Trie (spec.md §4.3): one hash map per level,
//! keyed by the Szudzik-paired context id of the whole m-gram.

use std::collections::HashMap;

use crate::bitmap_cache::BitmapHashCache;
use crate::hash::RoMu;
use crate::payload::Payload;
use crate::trie::{fold_context_id, NgramCounts, Trie, UnigramTable};
use crate::word_index::WordId;

/// Memory factor for mid levels (`2..N`), matching `original_source`'s
/// `__C2DMapTrie::UM_M_GRAM_MEMORY_FACTOR`.
pub const MID_LEVEL_MEMORY_FACTOR: f64 = 2.0;
/// Memory factor for the top (N-th) level, matching
/// `__C2DMapTrie::UM_N_GRAM_MEMORY_FACTOR`.
pub const TOP_LEVEL_MEMORY_FACTOR: f64 = 2.5;

pub struct C2dMapTrie {
    unigrams: UnigramTable,
    mid_levels: Vec<HashMap<u64, Payload, RoMu>>,
    top_level: HashMap<u64, f32, RoMu>,
    caches: Vec<Option<BitmapHashCache>>,
    n: usize,
    use_cache: bool,
    mid_level_factor: f64,
    top_level_factor: f64,
    bitmap_bucket_multiplier: f64,
}

impl C2dMapTrie {
    pub fn new(
        n: usize,
        is_continuous: bool,
        use_cache: bool,
        mid_level_factor: f64,
        top_level_factor: f64,
        bitmap_bucket_multiplier: f64,
    ) -> Self {
        C2dMapTrie {
            unigrams: UnigramTable::new(is_continuous, 0),
            mid_levels: (0..n.saturating_sub(2))
                .map(|_| HashMap::with_hasher(RoMu::new()))
                .collect(),
            top_level: HashMap::with_hasher(RoMu::new()),
            caches: (0..n.saturating_sub(1)).map(|_| None).collect(),
            n,
            use_cache,
            mid_level_factor,
            top_level_factor,
            bitmap_bucket_multiplier,
        }
    }

    fn mid_index(&self, level: usize) -> usize {
        // level is 2..n-1 inclusive; slot 0 holds level 2.
        level - 2
    }
}

impl Trie for C2dMapTrie {
    fn pre_allocate(&mut self, counts: &NgramCounts) {
        if let Some(&c) = counts.first() {
            self.unigrams = UnigramTable::new(
                matches!(self.unigrams, UnigramTable::Dense(_)),
                c,
            );
        }
        for level in 2..self.n {
            let idx = self.mid_index(level);
            if let Some(table) = self.mid_levels.get_mut(idx) {
                if let Some(&count) = counts.get(level - 1) {
                    let cap = (count as f64 * self.mid_level_factor) as usize;
                    table.reserve(cap);
                    if self.use_cache {
                        self.caches[idx] = Some(BitmapHashCache::with_count(count, self.bitmap_bucket_multiplier));
                    }
                }
            }
        }
        if let Some(&count) = counts.get(self.n.saturating_sub(1)) {
            self.top_level
                .reserve((count as f64 * self.top_level_factor) as usize);
            if self.use_cache && self.n >= 2 {
                let idx = self.n - 2;
                self.caches[idx] = Some(BitmapHashCache::with_count(count, self.bitmap_bucket_multiplier));
            }
        }
    }

    fn add_unigram(&mut self, word_id: WordId, payload: Payload) {
        self.unigrams.set(word_id, payload);
    }

    fn add_m_gram(&mut self, word_ids: &[WordId], payload: Payload) {
        let level = word_ids.len();
        let idx = self.mid_index(level);
        let key = fold_context_id(word_ids);
        if let Some(table) = self.mid_levels.get_mut(idx) {
            table.insert(key, payload);
        }
    }

    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32) {
        let key = fold_context_id(word_ids);
        self.top_level.insert(key, log_prob);
    }

    fn get_unigram_payload(&self, word_id: WordId) -> Payload {
        self.unigrams.get(word_id)
    }

    fn get_m_gram_payload(&self, word_ids: &[WordId]) -> Option<Payload> {
        let level = word_ids.len();
        let idx = self.mid_index(level);
        let key = fold_context_id(word_ids);
        if self.use_cache {
            if let Some(Some(cache)) = self.caches.get(idx) {
                if !cache.probably_present(key) {
                    return None;
                }
            }
        }
        self.mid_levels.get(idx).and_then(|t| t.get(&key)).copied()
    }

    fn get_n_gram_log_prob(&self, word_ids: &[WordId]) -> Option<f32> {
        let key = fold_context_id(word_ids);
        if self.use_cache && self.n >= 2 {
            let idx = self.n - 2;
            if let Some(Some(cache)) = self.caches.get(idx) {
                if !cache.probably_present(key) {
                    return None;
                }
            }
        }
        self.top_level.get(&key).copied()
    }

    fn register_m_gram_hash(&mut self, word_ids: &[WordId]) {
        if !self.use_cache {
            return;
        }
        let level = word_ids.len();
        let key = fold_context_id(word_ids);
        let idx = if level == self.n {
            self.n.saturating_sub(2)
        } else {
            self.mid_index(level)
        };
        if let Some(Some(cache)) = self.caches.get_mut(idx) {
            cache.set(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_trigram_payload() {
        let mut trie = C2dMapTrie::new(3, true, false, MID_LEVEL_MEMORY_FACTOR, TOP_LEVEL_MEMORY_FACTOR, 20.0);
        let ids = [WordId::from_raw(1), WordId::from_raw(2)];
        trie.add_m_gram(&ids, Payload::new(-0.5, -0.1));
        assert_eq!(trie.get_m_gram_payload(&ids), Some(Payload::new(-0.5, -0.1)));
    }

    #[test]
    fn bitmap_cache_proves_absence_without_touching_the_map() {
        let mut trie = C2dMapTrie::new(3, true, true, MID_LEVEL_MEMORY_FACTOR, TOP_LEVEL_MEMORY_FACTOR, 20.0);
        trie.pre_allocate(&vec![10, 10, 10]);
        let present = [WordId::from_raw(1), WordId::from_raw(2)];
        trie.add_m_gram(&present, Payload::new(-0.2, 0.0));
        trie.register_m_gram_hash(&present);

        let absent = [WordId::from_raw(9), WordId::from_raw(9)];
        assert_eq!(trie.get_m_gram_payload(&absent), None);
        assert_eq!(trie.get_m_gram_payload(&present), Some(Payload::new(-0.2, 0.0)));
    }

    #[test]
    fn unknown_unigram_falls_back_to_sentinel() {
        let trie = C2dMapTrie::new(3, true, false, MID_LEVEL_MEMORY_FACTOR, TOP_LEVEL_MEMORY_FACTOR, 20.0);
        assert_eq!(trie.get_unigram_payload(WordId::from_raw(42)), Payload::UNKNOWN_SENTINEL);
    }
}
