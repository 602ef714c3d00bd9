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

//! Context-to-Word Array Trie (spec.md §4.3): per level, a single sorted
//! array of `(context_id, word_id, payload)` triples. Context ids share
//! a contiguous span found by binary search; the trailing word id is
//! then found by a second binary search within that span.

use crate::bitmap_cache::BitmapHashCache;
use crate::payload::Payload;
use crate::trie::{fold_context_id, NgramCounts, Trie, UnigramTable};
use crate::word_index::WordId;

struct Entry {
    context_id: u64,
    word_id: u32,
    payload: Payload,
}

struct Level {
    entries: Vec<Entry>,
    sorted: bool,
}

impl Level {
    fn new() -> Self {
        Level {
            entries: Vec::new(),
            sorted: true,
        }
    }

    fn push(&mut self, context_id: u64, word_id: u32, payload: Payload) {
        self.entries.push(Entry {
            context_id,
            word_id,
            payload,
        });
        self.sorted = false;
    }

    fn finalize(&mut self) {
        // Stable sort preserves insertion order within equal keys, so a
        // duplicate m-gram's later `payload` can be folded into the
        // earlier, retained entry below (last occurrence wins, per
        // spec.md §9(b)).
        self.entries.sort_by_key(|e| (e.context_id, e.word_id));
        self.entries.dedup_by(|later, earlier| {
            let same_key = later.context_id == earlier.context_id && later.word_id == earlier.word_id;
            if same_key {
                earlier.payload = later.payload;
            }
            same_key
        });
        self.sorted = true;
    }

    fn get(&self, context_id: u64, word_id: u32) -> Option<Payload> {
        debug_assert!(self.sorted, "Level::get called before finalize()");
        let start = self.entries.partition_point(|e| e.context_id < context_id);
        let span = &self.entries[start..];
        let span_end = span.partition_point(|e| e.context_id == context_id);
        span[..span_end]
            .binary_search_by_key(&word_id, |e| e.word_id)
            .ok()
            .map(|i| span[i].payload)
    }
}

pub struct C2wArrayTrie {
    unigrams: UnigramTable,
    mid_levels: Vec<Level>,
    top_level: Level,
    caches: Vec<Option<BitmapHashCache>>,
    n: usize,
    use_cache: bool,
    bitmap_bucket_multiplier: f64,
}

fn split(word_ids: &[WordId]) -> (u64, u32) {
    let (prefix, last) = word_ids.split_at(word_ids.len() - 1);
    (fold_context_id(prefix), last[0].as_raw())
}

impl C2wArrayTrie {
    pub fn new(n: usize, is_continuous: bool, use_cache: bool, bitmap_bucket_multiplier: f64) -> Self {
        C2wArrayTrie {
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

impl Trie for C2wArrayTrie {
    fn pre_allocate(&mut self, counts: &NgramCounts) {
        for (i, level) in self.mid_levels.iter_mut().enumerate() {
            if let Some(&count) = counts.get(i + 1) {
                level.entries.reserve(count);
                if self.use_cache {
                    self.caches[i] = Some(BitmapHashCache::with_count(count, self.bitmap_bucket_multiplier));
                }
            }
        }
        if let Some(&count) = counts.get(self.n.saturating_sub(1)) {
            self.top_level.entries.reserve(count);
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
        let (context_id, word_id) = split(word_ids);
        self.mid_levels[idx].push(context_id, word_id, payload);
    }

    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32) {
        let (context_id, word_id) = split(word_ids);
        self.top_level
            .push(context_id, word_id, Payload::log_prob_only(log_prob));
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
        let (context_id, word_id) = split(word_ids);
        self.mid_levels.get(idx).and_then(|l| l.get(context_id, word_id))
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
        let (context_id, word_id) = split(word_ids);
        self.top_level.get(context_id, word_id).map(|p| p.log_prob)
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
    fn binary_search_finds_the_right_word_within_a_shared_context() {
        let mut trie = C2wArrayTrie::new(3, true, false, 20.0);
        let ctx = WordId::from_raw(1);
        for w in [2u32, 5, 9, 20] {
            trie.add_m_gram(&[ctx, WordId::from_raw(w)], Payload::new(-(w as f32), 0.0));
        }
        trie.finalize();
        for w in [2u32, 5, 9, 20] {
            let got = trie.get_m_gram_payload(&[ctx, WordId::from_raw(w)]);
            assert_eq!(got, Some(Payload::new(-(w as f32), 0.0)));
        }
        assert_eq!(trie.get_m_gram_payload(&[ctx, WordId::from_raw(3)]), None);
    }

    #[test]
    fn bitmap_cache_proves_absence_without_a_binary_search() {
        let mut trie = C2wArrayTrie::new(3, true, true, 20.0);
        trie.pre_allocate(&vec![10, 10, 10]);
        let ctx = WordId::from_raw(1);
        let present = [ctx, WordId::from_raw(9)];
        trie.add_m_gram(&present, Payload::new(-0.2, 0.0));
        trie.register_m_gram_hash(&present);
        trie.finalize();

        assert_eq!(
            trie.get_m_gram_payload(&[ctx, WordId::from_raw(3)]),
            None
        );
        assert_eq!(trie.get_m_gram_payload(&present), Some(Payload::new(-0.2, 0.0)));
    }
}
