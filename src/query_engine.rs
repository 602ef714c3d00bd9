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

//! Stream-right / step-down matrix query engine (spec.md §4.6/§4.7).
//!
//! Walks a sentence's word ids left to right. For each position it tries
//! the longest m-gram ending there, backing off one word at a time when
//! the trie has no entry, until a hit lands or the unigram table (which
//! always answers) is reached. A per-sentence scratch caches every
//! payload retrieved so a later back-off never re-queries the trie for a
//! window it already has the answer for.

use crate::payload::Payload;
use crate::trie::{Trie, N_MAX};
use crate::word_index::WordId;

/// Per-position lookup state (spec.md §4.7). Driven explicitly rather
/// than left implicit in the loop's control flow.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum State {
    Right,
    BackOff,
    UnknownColumn,
    Done,
}

/// `payloads[begin][end]` from spec.md §4.6, reshaped as two rows keyed
/// by window offset (`end - begin`, always `< N`) rather than by the
/// unbounded absolute `end`: only the immediately preceding position's
/// row is ever read back, so one "previous" and one "current" row of
/// `N_MAX` slots is all a query ever needs (spec.md §5: "stack-sized N x
/// N pointers, <= 49 for N=7").
///
/// Every window length ending at the current position is filled in here,
/// not just whichever one wins the position's own back-off walk: a later
/// position's back-off can descend past the length that won here (e.g.
/// all the way to the unigram) and needs that shorter window's back-off
/// even though this position never needed it itself.
struct QueryScratch {
    prev_row: [Option<Payload>; N_MAX],
    curr_row: [Option<Payload>; N_MAX],
    curr_len: usize,
}

impl QueryScratch {
    fn new() -> Self {
        QueryScratch {
            prev_row: [None; N_MAX],
            curr_row: [None; N_MAX],
            curr_len: 0,
        }
    }

    fn advance_position(&mut self) {
        self.prev_row = self.curr_row;
        self.curr_row = [None; N_MAX];
        self.curr_len = 0;
    }

    fn record(&mut self, offset: usize, payload: Payload) {
        self.curr_row[offset] = Some(payload);
    }

    /// The hit (if any) for the window of `len` words ending at the
    /// current position, `None` both for an actual trie miss and for a
    /// `len` this position never queried (beyond the model's order).
    fn hit_at(&self, len: usize) -> Option<Payload> {
        if len == 0 || len > self.curr_len {
            return None;
        }
        self.curr_row[len - 1]
    }

    /// Back-off weight of the window one position back at `offset`
    /// words of context (`0.0`, "no penalty", if that window was never a
    /// hit — spec.md §3). Also `0.0` for an `offset` the previous
    /// position never queried (its context is longer than the model's
    /// order, hence guaranteed absent).
    fn back_off_at(&self, offset: usize) -> f32 {
        self.prev_row.get(offset).copied().flatten().map(|p| p.back_off).unwrap_or(0.0)
    }
}

/// One lookup at `word_ids[begin..=end]`, dispatching to the unigram
/// table, a mid-level lookup, or the log-prob-only top level depending
/// on the window's length relative to `n` (spec.md §4.6 step 2). Windows
/// longer than `n` have no level to query at all and are always a miss.
fn lookup(trie: &dyn Trie, word_ids: &[WordId], n: usize) -> Option<Payload> {
    let m = word_ids.len();
    if m > n {
        return None;
    }
    if m == 1 {
        Some(trie.get_unigram_payload(word_ids[0]))
    } else if m == n {
        trie.get_n_gram_log_prob(word_ids).map(Payload::log_prob_only)
    } else {
        trie.get_m_gram_payload(word_ids)
    }
}

/// Per-position conditional log10 probabilities for a whole sentence
/// (spec.md §4.6 Output). `cumulative_log_prob` and `last_log_prob` read
/// off the two output modes spec.md describes without re-running the
/// engine.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub position_log_probs: Vec<f32>,
}

impl QueryResult {
    /// Output mode (a): the sentence's total log10 probability.
    pub fn cumulative_log_prob(&self) -> f32 {
        self.position_log_probs.iter().sum()
    }

    /// Output mode (b): the conditional for the last position only.
    pub fn last_log_prob(&self) -> f32 {
        self.position_log_probs.last().copied().unwrap_or(0.0)
    }
}

/// Scores `word_ids` against `trie` (an `n`-level back-off model),
/// returning one conditional log10 probability per position (spec.md
/// §4.6/§4.7). Never fails: unknown words consume the `<unk>` unigram
/// entry and a query never raises an error (spec.md §4.6 Failure, §7).
#[allow(unused_assignments)]
pub fn query_sentence(word_ids: &[WordId], trie: &dyn Trie, n: usize) -> QueryResult {
    let s = word_ids.len();
    let mut position_log_probs = Vec::with_capacity(s);
    if s == 0 {
        return QueryResult { position_log_probs };
    }

    let mut scratch = QueryScratch::new();
    let mut begin = 0usize;
    let mut state = State::Right;

    for end in 0..s {
        if end > 0 {
            scratch.advance_position();
        }

        if word_ids[end].is_unknown() {
            state = State::UnknownColumn;
            // The context retained across an unknown word collapses to
            // just the word immediately before it: its unigram back-off
            // is the only term spec.md's worked "<s> a c" / "x y" table
            // entries attribute to this position (spec.md §8).
            let back_off = if end > 0 {
                trie.get_unigram_payload(word_ids[end - 1]).back_off
            } else {
                0.0
            };
            let unk = trie.get_unigram_payload(WordId::UNKNOWN_WORD_ID);
            position_log_probs.push(back_off + unk.log_prob);
            begin = end + 1;
            state = State::Right;
            continue;
        }

        // Populate every window length ending here, up to the model's
        // order `n`, regardless of which one ends up winning this
        // position's own back-off walk below (spec.md §4.6: the local
        // scratch caches the full `payloads[begin][end]` matrix so a
        // later position's back-off reads never re-query the trie).
        let max_len = (end + 1).min(n);
        for len in 1..=max_len {
            let cur_begin = end + 1 - len;
            if let Some(payload) = lookup(trie, &word_ids[cur_begin..=end], n) {
                scratch.record(len - 1, payload);
            }
        }
        scratch.curr_len = max_len;

        let mut cur_begin = begin;
        state = State::Right;
        loop {
            let len = end - cur_begin + 1;
            match scratch.hit_at(len) {
                Some(payload) => {
                    accumulate_backoff(&mut position_log_probs, end, payload.log_prob);
                    begin = cur_begin;
                    state = State::Right;
                    break;
                }
                None => {
                    debug_assert!(cur_begin < end, "unigram lookup always succeeds");
                    state = State::BackOff;
                    let back_off_offset = end - 1 - cur_begin;
                    let bo = scratch.back_off_at(back_off_offset);
                    cur_begin += 1;
                    accumulate_backoff(&mut position_log_probs, end, bo);
                }
            }
        }
    }
    state = State::Done;
    debug_assert_eq!(state, State::Done);
    QueryResult { position_log_probs }
}

/// Adds a back-off contribution to the running total for `end`, pushing
/// a fresh `0.0` accumulator the first time this position is touched.
fn accumulate_backoff(position_log_probs: &mut Vec<f32>, end: usize, back_off: f32) {
    if position_log_probs.len() <= end {
        position_log_probs.push(back_off);
    } else {
        position_log_probs[end] += back_off;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{self, TrieVariant};
    use crate::word_index::{AnyWordIndex, WordIndex, WordIndexType};

    const FIXTURE: &str = "\\data\\\nngram 1=4\nngram 2=3\nngram 3=1\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\t<s>\t-0.30\n-0.4\ta\t-0.20\n-0.4\tb\t-0.10\n\n\\2-grams:\n-0.3\t<s> a\t-0.15\n-0.3\ta b\t-0.05\n-0.2\tb </s>\n\n\\3-grams:\n-0.1\t<s> a b\n\n\\end\\\n";

    fn build() -> (AnyWordIndex, Box<dyn Trie>) {
        let mut word_index = AnyWordIndex::new(WordIndexType::Basic);
        let mut trie = trie::build(TrieVariant::C2dMap, 3, true, true, trie::TrieTuning::default());
        crate::arpa::ingest(FIXTURE, &mut word_index, &mut *trie, 1.0).unwrap();
        (word_index, trie)
    }

    fn ids(word_index: &AnyWordIndex, tokens: &[&str]) -> Vec<WordId> {
        tokens
            .iter()
            .map(|t| word_index.get_word_id(t.as_bytes()))
            .collect()
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "{}",
            format!("expected {expected}, got {actual}")
        );
    }

    #[test]
    fn full_trigram_match() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["<s>", "a", "b"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -0.9);
    }

    #[test]
    fn unknown_word_mid_sentence_backs_off() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["<s>", "a", "c"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -2.0);
    }

    #[test]
    fn bigram_only() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["a", "b"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -0.7);
    }

    #[test]
    fn trigram_miss_backs_off_twice() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["a", "b", "</s>"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -0.95);
    }

    #[test]
    fn backed_off_final_position_sums_every_level_in_last_log_prob() {
        // P(</s>|a b): the trigram "a b </s>" is absent, so this backs off
        // through bo(a b) = -0.05 into the bigram "b </s>" hit = -0.2. The
        // final position's conditional must be their sum, not just the
        // terminal hit (spec.md §4.6 Output mode (b)).
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["a", "b", "</s>"]), &*trie, 3);
        assert_close(result.last_log_prob(), -0.25);
    }

    #[test]
    fn back_off_descending_two_levels_to_the_unigram_matches_reference_katz() {
        // "a b b": the trigram "a b b" and the bigram "b b" are both
        // absent. Back-off must descend past the bigram "a b" (the window
        // that won the previous position, length 2) all the way to the
        // unigram "b" (length 1, never the previous position's winner) to
        // pick up its back-off weight, matching reference Katz back-off:
        // P(a) + P(b|a) + [bo(a b) + bo(b) + P(b)]
        //   = -0.4 + -0.3 + (-0.05 + -0.10 + -0.4) = -1.25.
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["a", "b", "b"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -1.25);
    }

    #[test]
    fn short_prefix() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["<s>", "a"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -0.8);
    }

    #[test]
    fn both_words_unknown() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["x", "y"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -2.0);
    }

    #[test]
    fn single_word_sentence_is_its_unigram() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["a"]), &*trie, 3);
        assert_close(result.cumulative_log_prob(), -0.4);
    }

    #[test]
    fn last_log_prob_reads_the_final_position_only() {
        let (wi, trie) = build();
        let result = query_sentence(&ids(&wi, &["<s>", "a", "b"]), &*trie, 3);
        assert_close(result.last_log_prob(), -0.1);
    }

    #[test]
    fn empty_sentence_scores_to_zero() {
        let (_wi, trie) = build();
        let result = query_sentence(&[], &*trie, 3);
        assert_close(result.cumulative_log_prob(), 0.0);
    }
}
