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

//! Hash-to-Data Map Trie (spec.md §4.3): the m-gram's own 64-bit hash
//! *is* the key, with none of its originating bytes kept around. Two
//! distinct m-grams landing on the same hash is accepted as an
//! astronomically unlikely event rather than guarded against, which is
//! why this is the only variant paired with the `hashing` word index
//! (spec.md §4.1) — there is no id space dense enough to array-index
//! into here in the first place.

use std::collections::HashMap;
use std::hash::Hasher;

use crate::hash::RoMu;
use crate::mgram_id;
use crate::payload::Payload;
use crate::trie::{NgramCounts, Trie, UnigramTable};
use crate::util::fxhash::FxHasher64;
use crate::word_index::WordId;

fn hash_m_gram(word_ids: &[WordId]) -> u64 {
    let packed = mgram_id::pack(word_ids);
    let mut hasher = FxHasher64::default();
    hasher.write(&packed);
    hasher.finish()
}

pub struct H2dMapTrie {
    unigrams: UnigramTable,
    mid_levels: Vec<HashMap<u64, Payload, RoMu>>,
    top_level: HashMap<u64, f32, RoMu>,
    n: usize,
}

impl H2dMapTrie {
    pub fn new(n: usize) -> Self {
        H2dMapTrie {
            // hashing word index never produces continuous ids.
            unigrams: UnigramTable::new(false, 0),
            mid_levels: (0..n.saturating_sub(2))
                .map(|_| HashMap::with_hasher(RoMu::new()))
                .collect(),
            top_level: HashMap::with_hasher(RoMu::new()),
            n,
        }
    }
}

impl Trie for H2dMapTrie {
    fn pre_allocate(&mut self, counts: &NgramCounts) {
        for (i, level) in self.mid_levels.iter_mut().enumerate() {
            if let Some(&count) = counts.get(i + 1) {
                level.reserve(count);
            }
        }
        if let Some(&count) = counts.get(self.n.saturating_sub(1)) {
            self.top_level.reserve(count);
        }
    }

    fn add_unigram(&mut self, word_id: WordId, payload: Payload) {
        self.unigrams.set(word_id, payload);
    }

    fn add_m_gram(&mut self, word_ids: &[WordId], payload: Payload) {
        let idx = word_ids.len() - 2;
        let key = hash_m_gram(word_ids);
        self.mid_levels[idx].insert(key, payload);
    }

    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32) {
        let key = hash_m_gram(word_ids);
        self.top_level.insert(key, log_prob);
    }

    fn get_unigram_payload(&self, word_id: WordId) -> Payload {
        self.unigrams.get(word_id)
    }

    fn get_m_gram_payload(&self, word_ids: &[WordId]) -> Option<Payload> {
        let idx = word_ids.len() - 2;
        let key = hash_m_gram(word_ids);
        self.mid_levels.get(idx).and_then(|m| m.get(&key)).copied()
    }

    fn get_n_gram_log_prob(&self, word_ids: &[WordId]) -> Option<f32> {
        let key = hash_m_gram(word_ids);
        self.top_level.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_storing_the_original_key() {
        let mut trie = H2dMapTrie::new(3);
        let ids = [WordId::from_raw(100), WordId::from_raw(200)];
        trie.add_m_gram(&ids, Payload::new(-0.9, -0.05));
        assert_eq!(trie.get_m_gram_payload(&ids), Some(Payload::new(-0.9, -0.05)));
        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(100), WordId::from_raw(201)]),
            None
        );
    }
}
