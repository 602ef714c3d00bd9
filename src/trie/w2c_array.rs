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

//! Word-to-Context Array Trie (spec.md §4.3): like [`w2c_hybrid`], indexed
//! by head word id, but every head's remaining-context ids live in one
//! contiguous backing array (CSR layout: an `offsets` array marks where
//! each head word's span starts) rather than in per-head hash maps.
//!
//! [`w2c_hybrid`]: super::w2c_hybrid

use crate::bitmap_cache::BitmapHashCache;
use crate::payload::Payload;
use crate::trie::{fold_context_id, NgramCounts, Trie, UnigramTable};
use crate::word_index::WordId;

struct Level {
    // (head_word_id, rest_context_id, payload), unsorted until finalize().
    staging: Vec<(u32, u64, Payload)>,
    // CSR: offsets[h]..offsets[h+1] is head h's span in `rest`/`payload`.
    offsets: Vec<usize>,
    rest: Vec<u64>,
    payloads: Vec<Payload>,
}

impl Level {
    fn new() -> Self {
        Level {
            staging: Vec::new(),
            offsets: Vec::new(),
            rest: Vec::new(),
            payloads: Vec::new(),
        }
    }

    fn push(&mut self, head: u32, rest: u64, payload: Payload) {
        self.staging.push((head, rest, payload));
    }

    fn finalize(&mut self) {
        // Stable sort + dedup-keep-last so a duplicate m-gram's later
        // payload wins (spec.md §9(b)), mirroring c2w_array's Level.
        self.staging.sort_by_key(|(h, r, _)| (*h, *r));
        self.staging.dedup_by(|later, earlier| {
            let same_key = later.0 == earlier.0 && later.1 == earlier.1;
            if same_key {
                earlier.2 = later.2;
            }
            same_key
        });
        let max_head = self.staging.iter().map(|(h, _, _)| *h).max().unwrap_or(0) as usize;
        self.offsets = vec![0usize; max_head + 2];
        self.rest = Vec::with_capacity(self.staging.len());
        self.payloads = Vec::with_capacity(self.staging.len());

        for (head, rest, payload) in self.staging.drain(..) {
            self.offsets[head as usize + 1] += 1;
            self.rest.push(rest);
            self.payloads.push(payload);
        }
        for i in 1..self.offsets.len() {
            self.offsets[i] += self.offsets[i - 1];
        }
    }

    fn get(&self, head: u32, rest: u64) -> Option<Payload> {
        let head = head as usize;
        if head + 1 >= self.offsets.len() {
            return None;
        }
        let (start, end) = (self.offsets[head], self.offsets[head + 1]);
        self.rest[start..end]
            .binary_search(&rest)
            .ok()
            .map(|i| self.payloads[start + i])
    }
}

pub struct W2cArrayTrie {
    unigrams: UnigramTable,
    mid_levels: Vec<Level>,
    top_level: Level,
    caches: Vec<Option<BitmapHashCache>>,
    n: usize,
    use_cache: bool,
    bitmap_bucket_multiplier: f64,
}

fn split(word_ids: &[WordId]) -> (u32, u64) {
    let (head, rest) = word_ids.split_at(1);
    (head[0].as_raw(), fold_context_id(rest))
}

impl W2cArrayTrie {
    pub fn new(n: usize, is_continuous: bool, use_cache: bool, bitmap_bucket_multiplier: f64) -> Self {
        W2cArrayTrie {
            unigrams: UnigramTable::new(is_continuous, 0),
            mid_levels: (0..n.saturating_sub(2)).map(|_| Level::new()).collect(),
            top_level: Level::new(),
            caches: (0..n.saturating_sub(1)).map(|_| None).collect(),
            n,
            use_cache,
            bitmap_bucket_multiplier,
        }
    }

    fn top_cache_index(&self) -> usize {
        self.n.saturating_sub(2)
    }
}

impl Trie for W2cArrayTrie {
    fn pre_allocate(&mut self, counts: &NgramCounts) {
        for (i, level) in self.mid_levels.iter_mut().enumerate() {
            if let Some(&count) = counts.get(i + 1) {
                level.staging.reserve(count);
                if self.use_cache {
                    self.caches[i] = Some(BitmapHashCache::with_count(count, self.bitmap_bucket_multiplier));
                }
            }
        }
        if let Some(&count) = counts.get(self.n.saturating_sub(1)) {
            self.top_level.staging.reserve(count);
            if self.use_cache && self.n >= 2 {
                let idx = self.top_cache_index();
                self.caches[idx] = Some(BitmapHashCache::with_count(count, self.bitmap_bucket_multiplier));
            }
        }
    }

    fn add_unigram(&mut self, word_id: WordId, payload: Payload) {
        self.unigrams.set(word_id, payload);
    }

    fn add_m_gram(&mut self, word_ids: &[WordId], payload: Payload) {
        let idx = word_ids.len() - 2;
        let (head, rest) = split(word_ids);
        self.mid_levels[idx].push(head, rest, payload);
    }

    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32) {
        let (head, rest) = split(word_ids);
        self.top_level.push(head, rest, Payload::log_prob_only(log_prob));
    }

    fn get_unigram_payload(&self, word_id: WordId) -> Payload {
        self.unigrams.get(word_id)
    }

    fn get_m_gram_payload(&self, word_ids: &[WordId]) -> Option<Payload> {
        let idx = word_ids.len() - 2;
        if self.use_cache {
            if let Some(Some(cache)) = self.caches.get(idx) {
                if !cache.probably_present(fold_context_id(word_ids)) {
                    return None;
                }
            }
        }
        let (head, rest) = split(word_ids);
        self.mid_levels.get(idx).and_then(|l| l.get(head, rest))
    }

    fn get_n_gram_log_prob(&self, word_ids: &[WordId]) -> Option<f32> {
        if self.use_cache && self.n >= 2 {
            let idx = self.top_cache_index();
            if let Some(Some(cache)) = self.caches.get(idx) {
                if !cache.probably_present(fold_context_id(word_ids)) {
                    return None;
                }
            }
        }
        let (head, rest) = split(word_ids);
        self.top_level.get(head, rest).map(|p| p.log_prob)
    }

    fn register_m_gram_hash(&mut self, word_ids: &[WordId]) {
        if !self.use_cache {
            return;
        }
        let level = word_ids.len();
        let idx = if level == self.n {
            self.top_cache_index()
        } else {
            level - 2
        };
        if let Some(Some(cache)) = self.caches.get_mut(idx) {
            cache.set(fold_context_id(word_ids));
        }
    }

    fn finalize(&mut self) {
        for level in &mut self.mid_levels {
            level.finalize();
        }
        self.top_level.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_layout_separates_spans_per_head_word() {
        let mut trie = W2cArrayTrie::new(3, true, false, 20.0);
        trie.add_m_gram(&[WordId::from_raw(5), WordId::from_raw(1)], Payload::new(-1.0, 0.0));
        trie.add_m_gram(&[WordId::from_raw(5), WordId::from_raw(2)], Payload::new(-2.0, 0.0));
        trie.add_m_gram(&[WordId::from_raw(0), WordId::from_raw(7)], Payload::new(-3.0, 0.0));
        trie.finalize();

        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(5), WordId::from_raw(1)]),
            Some(Payload::new(-1.0, 0.0))
        );
        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(5), WordId::from_raw(2)]),
            Some(Payload::new(-2.0, 0.0))
        );
        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(0), WordId::from_raw(7)]),
            Some(Payload::new(-3.0, 0.0))
        );
        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(5), WordId::from_raw(3)]),
            None
        );
    }

    #[test]
    fn bitmap_cache_proves_absence_without_a_binary_search() {
        let mut trie = W2cArrayTrie::new(3, true, true, 20.0);
        trie.pre_allocate(&vec![10, 10, 10]);
        let present = [WordId::from_raw(5), WordId::from_raw(1)];
        trie.add_m_gram(&present, Payload::new(-1.0, 0.0));
        trie.register_m_gram_hash(&present);
        trie.finalize();

        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(5), WordId::from_raw(9)]),
            None
        );
        assert_eq!(trie.get_m_gram_payload(&present), Some(Payload::new(-1.0, 0.0)));
    }
}
