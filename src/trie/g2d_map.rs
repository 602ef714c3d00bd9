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

//! Byte M-gram-id-to-Data Map Trie (spec.md §4.2/§4.3): levels are keyed
//! by the [`mgram_id`] byte-packed encoding of the whole m-gram, stored
//! in fixed-size separate-chaining buckets sized against the ARPA
//! header's declared count for that level.
//!
//! [`mgram_id`]: crate::mgram_id

use std::hash::Hasher;

use crate::mgram_id;
use crate::payload::Payload;
use crate::trie::{NgramCounts, Trie, UnigramTable};
use crate::util::fxhash::FxHasher64;
use crate::word_index::WordId;

/// Default bucket count is `count / WORDS_PER_BUCKET_FACTOR`, matching
/// `original_source`'s `__G2DMapTrie::WORDS_PER_BUCKET_FACTOR`.
pub const WORDS_PER_BUCKET_FACTOR: f64 = 1.0;

struct Level {
    buckets: Vec<Vec<(Vec<u8>, Payload)>>,
}

impl Level {
    fn with_capacity(count: usize, words_per_bucket: f64) -> Self {
        let n_buckets = ((count as f64 / words_per_bucket).ceil() as usize).max(1);
        Level {
            buckets: (0..n_buckets).map(|_| Vec::new()).collect(),
        }
    }

    fn empty(words_per_bucket: f64) -> Self {
        Self::with_capacity(1, words_per_bucket)
    }

    fn bucket_index(&self, key: &[u8]) -> usize {
        let mut hasher = FxHasher64::default();
        hasher.write(key);
        (hasher.finish() as usize) % self.buckets.len()
    }

    fn insert(&mut self, key: Vec<u8>, payload: Payload) {
        let idx = self.bucket_index(&key);
        let bucket = &mut self.buckets[idx];
        if let Some(slot) = bucket.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = payload;
        } else {
            bucket.push((key, payload));
        }
    }

    fn get(&self, key: &[u8]) -> Option<Payload> {
        let idx = self.bucket_index(key);
        self.buckets[idx]
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, p)| *p)
    }
}

pub struct G2dMapTrie {
    unigrams: UnigramTable,
    mid_levels: Vec<Level>,
    top_level: Level,
    n: usize,
    words_per_bucket: f64,
}

impl G2dMapTrie {
    pub fn new(n: usize, is_continuous: bool, words_per_bucket: f64) -> Self {
        G2dMapTrie {
            unigrams: UnigramTable::new(is_continuous, 0),
            mid_levels: (0..n.saturating_sub(2))
                .map(|_| Level::empty(words_per_bucket))
                .collect(),
            top_level: Level::empty(words_per_bucket),
            n,
            words_per_bucket,
        }
    }
}

impl Trie for G2dMapTrie {
    fn pre_allocate(&mut self, counts: &NgramCounts) {
        for (i, level) in self.mid_levels.iter_mut().enumerate() {
            if let Some(&count) = counts.get(i + 1) {
                *level = Level::with_capacity(count, self.words_per_bucket);
            }
        }
        if let Some(&count) = counts.get(self.n.saturating_sub(1)) {
            self.top_level = Level::with_capacity(count, self.words_per_bucket);
        }
    }

    fn add_unigram(&mut self, word_id: WordId, payload: Payload) {
        self.unigrams.set(word_id, payload);
    }

    fn add_m_gram(&mut self, word_ids: &[WordId], payload: Payload) {
        let idx = word_ids.len() - 2;
        let key = mgram_id::pack(word_ids);
        self.mid_levels[idx].insert(key, payload);
    }

    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32) {
        let key = mgram_id::pack(word_ids);
        self.top_level.insert(key, Payload::log_prob_only(log_prob));
    }

    fn get_unigram_payload(&self, word_id: WordId) -> Payload {
        self.unigrams.get(word_id)
    }

    fn get_m_gram_payload(&self, word_ids: &[WordId]) -> Option<Payload> {
        let idx = word_ids.len() - 2;
        let key = mgram_id::pack(word_ids);
        self.mid_levels.get(idx).and_then(|l| l.get(&key))
    }

    fn get_n_gram_log_prob(&self, word_ids: &[WordId]) -> Option<f32> {
        let key = mgram_id::pack(word_ids);
        self.top_level.get(&key).map(|p| p.log_prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_packed_keys_round_trip_through_a_bucket() {
        let mut trie = G2dMapTrie::new(3, true, WORDS_PER_BUCKET_FACTOR);
        trie.pre_allocate(&vec![5, 4, 3]);
        let ids = [WordId::from_raw(10), WordId::from_raw(300)];
        trie.add_m_gram(&ids, Payload::new(-0.7, -0.2));
        assert_eq!(trie.get_m_gram_payload(&ids), Some(Payload::new(-0.7, -0.2)));
        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(10), WordId::from_raw(301)]),
            None
        );
    }
}
