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

//! Token-to-id mapping, the bottommost layer of the model (spec.md §4.1).
//!
//! Four interchangeable variants share the [`WordIndex`] contract: `basic`
//! (append order), `counting` (frequency-ranked ids), `optimizing` (wraps
//! either and rebuilds into an open-addressed table), and `hashing` (a
//! non-continuous, pure-hash index used only by the H2D trie).

pub mod basic;
pub mod counting;
pub mod hashing;
pub mod optimizing;

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use crate::error::LmError;

/// Dictionary word id, a dense 32-bit integer.
///
/// `UNKNOWN_WORD_ID` and `UNDEFINED_WORD_ID` are reserved sentinels; every
/// id actually returned for a registered token satisfies
/// `id < number_of_words` and is distinct from both.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct WordId(u32);

impl WordId {
    pub const UNKNOWN_WORD_ID: WordId = WordId(0);
    pub const UNDEFINED_WORD_ID: WordId = WordId(u32::MAX);

    #[inline(always)]
    pub const fn from_raw(raw: u32) -> WordId {
        WordId(raw)
    }

    #[inline(always)]
    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN_WORD_ID
    }

    #[inline(always)]
    pub fn is_defined(&self) -> bool {
        *self != Self::UNDEFINED_WORD_ID
    }
}

impl Debug for WordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for WordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sentence-boundary surface tokens, reserved by spec.md §2/§3.
pub const BOS_TOKEN: &[u8] = b"<s>";
pub const EOS_TOKEN: &[u8] = b"</s>";
pub const UNK_TOKEN: &[u8] = b"<unk>";

/// Which concrete [`WordIndex`] implementation to build, per spec.md §6's
/// `word_index` configuration key.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum WordIndexType {
    Basic,
    Counting,
    OptimizingBasic,
    OptimizingCounting,
    Hashing,
}

impl FromStr for WordIndexType {
    type Err = LmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(WordIndexType::Basic),
            "counting" => Ok(WordIndexType::Counting),
            "optimizing-basic" => Ok(WordIndexType::OptimizingBasic),
            "optimizing-counting" => Ok(WordIndexType::OptimizingCounting),
            "hashing" => Ok(WordIndexType::Hashing),
            other => Err(LmError::UnknownWordIndex(other.to_string())),
        }
    }
}

impl WordIndexType {
    /// True for variants whose ids form a dense `0..n-1` range. The
    /// word-to-context array trie variants require this; `hashing` never
    /// provides it (spec.md §4.1, §4.3 "H2D Map" entry).
    pub fn produces_continuous_ids(&self) -> bool {
        !matches!(self, WordIndexType::Hashing)
    }
}

/// Common contract implemented by all word index variants (spec.md §4.1).
pub trait WordIndex {
    /// Capacity hint for the backing store.
    fn reserve(&mut self, n: usize);

    /// Insert `token` if absent and return its id. Ingestion-only.
    fn register_word(&mut self, token: &[u8]) -> WordId;

    /// Look up `token`, returning `UNKNOWN_WORD_ID` if it was never
    /// registered.
    fn get_word_id(&self, token: &[u8]) -> WordId;

    /// Total number of distinct registered words, including the reserved
    /// unknown-word entry.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild internal storage for fast lookups (`optimizing` variant);
    /// a no-op for variants that need no post-processing.
    fn finalize(&mut self) {}

    /// True iff ids form a dense `0..n-1` range.
    fn is_continuous(&self) -> bool;

    /// All registered `(token, id)` pairs. Used by `optimizing` to rebuild
    /// its open-addressed table over an already-populated inner index.
    fn snapshot(&self) -> Vec<(Box<[u8]>, WordId)>;
}

/// Sum type over the five concrete word indices, so loading code can pick
/// one at runtime from [`WordIndexType`] without becoming generic itself.
pub enum AnyWordIndex {
    Basic(basic::BasicWordIndex),
    Counting(counting::CountingWordIndex),
    OptimizingBasic(optimizing::OptimizingWordIndex<basic::BasicWordIndex>),
    OptimizingCounting(optimizing::OptimizingWordIndex<counting::CountingWordIndex>),
    Hashing(hashing::HashingWordIndex),
}

impl AnyWordIndex {
    pub fn new(kind: WordIndexType) -> Self {
        Self::with_bucket_factor(kind, optimizing::DEFAULT_BUCKETS_FACTOR)
    }

    /// `bucket_factor` sizes the `optimizing` variants' rebuilt table
    /// (spec.md §6 `optimizing_index_bucket_factor`); ignored by every
    /// other variant.
    pub fn with_bucket_factor(kind: WordIndexType, bucket_factor: f32) -> Self {
        match kind {
            WordIndexType::Basic => AnyWordIndex::Basic(basic::BasicWordIndex::new()),
            WordIndexType::Counting => AnyWordIndex::Counting(counting::CountingWordIndex::new()),
            WordIndexType::OptimizingBasic => {
                AnyWordIndex::OptimizingBasic(optimizing::OptimizingWordIndex::with_bucket_factor(
                    basic::BasicWordIndex::new(),
                    bucket_factor,
                ))
            }
            WordIndexType::OptimizingCounting => {
                AnyWordIndex::OptimizingCounting(optimizing::OptimizingWordIndex::with_bucket_factor(
                    counting::CountingWordIndex::new(),
                    bucket_factor,
                ))
            }
            WordIndexType::Hashing => AnyWordIndex::Hashing(hashing::HashingWordIndex::new()),
        }
    }

    /// Counting-backed variants need every unigram's score seen before any
    /// id is assigned (spec.md §4.1); this reports whether that pre-pass
    /// is required.
    pub fn requires_count_pass(&self) -> bool {
        matches!(
            self,
            AnyWordIndex::Counting(_) | AnyWordIndex::OptimizingCounting(_)
        )
    }

    /// Records a unigram sighting during the counting pre-pass. A no-op
    /// for variants that don't need one.
    pub fn count_word(&mut self, token: &[u8], score: f32) {
        match self {
            AnyWordIndex::Counting(c) => c.count_word(token, score),
            AnyWordIndex::OptimizingCounting(o) => o.inner_mut().count_word(token, score),
            _ => {}
        }
    }

    /// Ranks counting-backed storage by score and assigns final ids.
    /// Must run after the counting pre-pass and before any `register_word`
    /// call that expects a real id back. A no-op otherwise.
    pub fn commit_counts(&mut self) {
        match self {
            AnyWordIndex::Counting(c) => c.finalize_counts(),
            AnyWordIndex::OptimizingCounting(o) => o.inner_mut().finalize_counts(),
            _ => {}
        }
    }
}

impl WordIndex for AnyWordIndex {
    fn reserve(&mut self, n: usize) {
        match self {
            AnyWordIndex::Basic(w) => w.reserve(n),
            AnyWordIndex::Counting(w) => w.reserve(n),
            AnyWordIndex::OptimizingBasic(w) => w.reserve(n),
            AnyWordIndex::OptimizingCounting(w) => w.reserve(n),
            AnyWordIndex::Hashing(w) => w.reserve(n),
        }
    }

    fn register_word(&mut self, token: &[u8]) -> WordId {
        match self {
            AnyWordIndex::Basic(w) => w.register_word(token),
            AnyWordIndex::Counting(w) => w.register_word(token),
            AnyWordIndex::OptimizingBasic(w) => w.register_word(token),
            AnyWordIndex::OptimizingCounting(w) => w.register_word(token),
            AnyWordIndex::Hashing(w) => w.register_word(token),
        }
    }

    fn get_word_id(&self, token: &[u8]) -> WordId {
        match self {
            AnyWordIndex::Basic(w) => w.get_word_id(token),
            AnyWordIndex::Counting(w) => w.get_word_id(token),
            AnyWordIndex::OptimizingBasic(w) => w.get_word_id(token),
            AnyWordIndex::OptimizingCounting(w) => w.get_word_id(token),
            AnyWordIndex::Hashing(w) => w.get_word_id(token),
        }
    }

    fn len(&self) -> usize {
        match self {
            AnyWordIndex::Basic(w) => w.len(),
            AnyWordIndex::Counting(w) => w.len(),
            AnyWordIndex::OptimizingBasic(w) => w.len(),
            AnyWordIndex::OptimizingCounting(w) => w.len(),
            AnyWordIndex::Hashing(w) => w.len(),
        }
    }

    fn finalize(&mut self) {
        match self {
            AnyWordIndex::Basic(w) => w.finalize(),
            AnyWordIndex::Counting(w) => w.finalize(),
            AnyWordIndex::OptimizingBasic(w) => w.finalize(),
            AnyWordIndex::OptimizingCounting(w) => w.finalize(),
            AnyWordIndex::Hashing(w) => w.finalize(),
        }
    }

    fn is_continuous(&self) -> bool {
        match self {
            AnyWordIndex::Basic(w) => w.is_continuous(),
            AnyWordIndex::Counting(w) => w.is_continuous(),
            AnyWordIndex::OptimizingBasic(w) => w.is_continuous(),
            AnyWordIndex::OptimizingCounting(w) => w.is_continuous(),
            AnyWordIndex::Hashing(w) => w.is_continuous(),
        }
    }

    fn snapshot(&self) -> Vec<(Box<[u8]>, WordId)> {
        match self {
            AnyWordIndex::Basic(w) => w.snapshot(),
            AnyWordIndex::Counting(w) => w.snapshot(),
            AnyWordIndex::OptimizingBasic(w) => w.snapshot(),
            AnyWordIndex::OptimizingCounting(w) => w.snapshot(),
            AnyWordIndex::Hashing(w) => w.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_id_sentinels_are_distinct() {
        assert_ne!(WordId::UNKNOWN_WORD_ID, WordId::UNDEFINED_WORD_ID);
        assert!(WordId::UNKNOWN_WORD_ID.is_defined());
        assert!(!WordId::UNDEFINED_WORD_ID.is_defined());
        assert!(WordId::UNKNOWN_WORD_ID.is_unknown());
    }

    #[test]
    fn word_index_type_from_str() {
        assert_eq!(
            WordIndexType::from_str("optimizing-counting").unwrap(),
            WordIndexType::OptimizingCounting
        );
        assert!(WordIndexType::from_str("bogus").is_err());
        assert!(!WordIndexType::Hashing.produces_continuous_ids());
        assert!(WordIndexType::Basic.produces_continuous_ids());
    }
}
