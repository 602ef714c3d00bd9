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

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::word_index::{WordId, WordIndex, UNK_TOKEN};

/// Counting word index: same surface as [`BasicWordIndex`], but ids are
/// reassigned at `finalize_counts()` so that more frequent words (higher
/// ARPA log-prob, used here as the frequency proxy per spec.md §4.1) get
/// smaller ids. This improves downstream packing in tries that favor
/// small word ids (notably G2D, per `Configuration.hpp`'s
/// `__G2DMapTrie::WORD_INDEX_TYPE`).
#[derive(Default)]
pub struct CountingWordIndex {
    /// token -> best observed score, collected during the counting pass
    counts: HashMap<Box<[u8]>, f32>,
    /// finalized append order is the id order once counting is done
    words: IndexSet<Box<[u8]>>,
    finalized: bool,
}

impl CountingWordIndex {
    pub fn new() -> Self {
        let mut counts = HashMap::new();
        counts.insert(Box::from(UNK_TOKEN), f32::NEG_INFINITY);
        CountingWordIndex {
            counts,
            words: IndexSet::new(),
            finalized: false,
        }
    }

    /// Records a sighting of `token` with score `prob` (the ARPA log-prob).
    /// Only meaningful before `finalize_counts()`.
    pub fn count_word(&mut self, token: &[u8], prob: f32) {
        let entry = self
            .counts
            .entry(Box::from(token))
            .or_insert(f32::NEG_INFINITY);
        if prob > *entry {
            *entry = prob;
        }
    }

    /// Assigns ids: rank words by descending score, keeping `<unk>` first
    /// so `UNKNOWN_WORD_ID` stays `0` as required by spec.md §3.
    pub fn finalize_counts(&mut self) {
        let mut ranked: Vec<(Box<[u8]>, f32)> = self.counts.drain().collect();
        ranked.sort_by(|(tok_a, score_a), (tok_b, score_b)| {
            if tok_a.as_ref() == UNK_TOKEN {
                return std::cmp::Ordering::Less;
            }
            if tok_b.as_ref() == UNK_TOKEN {
                return std::cmp::Ordering::Greater;
            }
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.words = ranked.into_iter().map(|(tok, _)| tok).collect();
        self.finalized = true;
    }
}

impl WordIndex for CountingWordIndex {
    fn reserve(&mut self, n: usize) {
        self.counts.reserve(n);
    }

    fn register_word(&mut self, token: &[u8]) -> WordId {
        if !self.finalized {
            self.count_word(token, f32::NEG_INFINITY);
            return WordId::UNDEFINED_WORD_ID;
        }
        let (idx, _) = self.words.insert_full(Box::from(token));
        WordId::from_raw(idx as u32)
    }

    fn get_word_id(&self, token: &[u8]) -> WordId {
        match self.words.get_index_of(token) {
            Some(idx) => WordId::from_raw(idx as u32),
            None => WordId::UNKNOWN_WORD_ID,
        }
    }

    fn len(&self) -> usize {
        self.words.len()
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn snapshot(&self) -> Vec<(Box<[u8]>, WordId)> {
        self.words
            .iter()
            .enumerate()
            .map(|(idx, tok)| (tok.clone(), WordId::from_raw(idx as u32)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_permutation_ranked_by_score() {
        let mut idx = CountingWordIndex::new();
        idx.count_word(b"rare", -5.0);
        idx.count_word(b"common", -0.1);
        idx.count_word(b"medium", -1.0);
        idx.finalize_counts();

        assert_eq!(idx.get_word_id(UNK_TOKEN), WordId::UNKNOWN_WORD_ID);
        let common = idx.get_word_id(b"common");
        let medium = idx.get_word_id(b"medium");
        let rare = idx.get_word_id(b"rare");
        assert!(common.as_raw() < medium.as_raw());
        assert!(medium.as_raw() < rare.as_raw());
        assert_eq!(idx.len(), 4);
    }
}
