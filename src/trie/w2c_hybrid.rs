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

//! Word-to-Context Hybrid Trie (spec.md §4.3): an array indexed directly
//! by the m-gram's head word id, each slot holding a small hash map from
//! the remaining context id to its payload.

use std::collections::HashMap;

use crate::hash::RoMu;
use crate::payload::Payload;
use crate::trie::{fold_context_id, NgramCounts, Trie, UnigramTable};
use crate::word_index::WordId;

type Bucket = HashMap<u64, Payload, RoMu>;

struct Level {
    by_head: Vec<Option<Bucket>>,
}

impl Level {
    fn new() -> Self {
        Level { by_head: Vec::new() }
    }

    fn bucket_mut(&mut self, head: usize) -> &mut Bucket {
        if head >= self.by_head.len() {
            self.by_head.resize_with(head + 1, || None);
        }
        self.by_head[head].get_or_insert_with(|| HashMap::with_hasher(RoMu::new()))
    }

    fn get(&self, head: usize, rest: u64) -> Option<Payload> {
        self.by_head
            .get(head)
            .and_then(|b| b.as_ref())
            .and_then(|m| m.get(&rest))
            .copied()
    }
}

pub struct W2cHybridTrie {
    unigrams: UnigramTable,
    mid_levels: Vec<Level>,
    top_level: Level,
}

fn split(word_ids: &[WordId]) -> (usize, u64) {
    let (head, rest) = word_ids.split_at(1);
    (head[0].as_raw() as usize, fold_context_id(rest))
}

impl W2cHybridTrie {
    pub fn new(n: usize, is_continuous: bool) -> Self {
        W2cHybridTrie {
            unigrams: UnigramTable::new(is_continuous, 0),
            mid_levels: (0..n.saturating_sub(2)).map(|_| Level::new()).collect(),
            top_level: Level::new(),
        }
    }
}

impl Trie for W2cHybridTrie {
    fn pre_allocate(&mut self, counts: &NgramCounts) {
        if let Some(&vocab) = counts.first() {
            for level in &mut self.mid_levels {
                level.by_head.reserve(vocab);
            }
            self.top_level.by_head.reserve(vocab);
        }
    }

    fn add_unigram(&mut self, word_id: WordId, payload: Payload) {
        self.unigrams.set(word_id, payload);
    }

    fn add_m_gram(&mut self, word_ids: &[WordId], payload: Payload) {
        let idx = word_ids.len() - 2;
        let (head, rest) = split(word_ids);
        self.mid_levels[idx].bucket_mut(head).insert(rest, payload);
    }

    fn add_n_gram(&mut self, word_ids: &[WordId], log_prob: f32) {
        let (head, rest) = split(word_ids);
        self.top_level
            .bucket_mut(head)
            .insert(rest, Payload::log_prob_only(log_prob));
    }

    fn get_unigram_payload(&self, word_id: WordId) -> Payload {
        self.unigrams.get(word_id)
    }

    fn get_m_gram_payload(&self, word_ids: &[WordId]) -> Option<Payload> {
        let idx = word_ids.len() - 2;
        let (head, rest) = split(word_ids);
        self.mid_levels.get(idx).and_then(|l| l.get(head, rest))
    }

    fn get_n_gram_log_prob(&self, word_ids: &[WordId]) -> Option<f32> {
        let (head, rest) = split(word_ids);
        self.top_level.get(head, rest).map(|p| p.log_prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_are_keyed_independently_per_head_word() {
        let mut trie = W2cHybridTrie::new(3, true);
        let a = [WordId::from_raw(1), WordId::from_raw(9)];
        let b = [WordId::from_raw(2), WordId::from_raw(9)];
        trie.add_m_gram(&a, Payload::new(-1.0, 0.0));
        trie.add_m_gram(&b, Payload::new(-2.0, 0.0));
        assert_eq!(trie.get_m_gram_payload(&a), Some(Payload::new(-1.0, 0.0)));
        assert_eq!(trie.get_m_gram_payload(&b), Some(Payload::new(-2.0, 0.0)));
        assert_eq!(
            trie.get_m_gram_payload(&[WordId::from_raw(3), WordId::from_raw(9)]),
            None
        );
    }
}
