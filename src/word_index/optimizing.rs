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

use std::hash::Hasher;

use log::warn;

use crate::util::fxhash::FxHasher64;
use crate::util::next_pow2;
use crate::word_index::{WordId, WordIndex};

/// Default number of buckets allocated per word, before rounding to a
/// power of two (spec.md §6 `optimizing_index_bucket_factor`; matches
/// `original_source`'s `__OptimizingWordIndex::BUCKETS_FACTOR`).
pub const DEFAULT_BUCKETS_FACTOR: f32 = 10.0;

/// Warn when a probe chain grows at least this long; a well-sized table
/// should almost never see it (spec.md §4.1).
const WARN_BUCKET_LEN: usize = 3;

struct Entry {
    token: Box<[u8]>,
    id: WordId,
}

/// Wraps any [`WordIndex`] and, on `finalize()`, rebuilds an open-addressed
/// table over the collected tokens for faster final lookups (spec.md
/// §4.1's "Optimizing variant algorithm").
pub struct OptimizingWordIndex<I> {
    inner: I,
    table: Vec<Option<Entry>>,
    mask: usize,
    built: bool,
    buckets_factor: f32,
}

fn hash_token(token: &[u8]) -> u64 {
    let mut hasher = FxHasher64::default();
    hasher.write(token);
    hasher.finish()
}

impl<I: WordIndex> OptimizingWordIndex<I> {
    pub fn new(inner: I) -> Self {
        Self::with_bucket_factor(inner, DEFAULT_BUCKETS_FACTOR)
    }

    pub fn with_bucket_factor(inner: I, buckets_factor: f32) -> Self {
        OptimizingWordIndex {
            inner,
            table: Vec::new(),
            mask: 0,
            built: false,
            buckets_factor,
        }
    }

    pub fn into_inner(self) -> I {
        self.inner
    }

    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.inner
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    fn rebuild(&mut self, tokens: Vec<(Box<[u8]>, WordId)>) {
        let buckets = next_pow2(((tokens.len() as f32) * self.buckets_factor).ceil() as usize);
        let mask = buckets - 1;
        let mut table: Vec<Option<Entry>> = (0..buckets).map(|_| None).collect();
        let mut chain_len = vec![0usize; buckets];

        for (token, id) in tokens {
            let start = (hash_token(&token) as usize) & mask;
            let mut slot = start;
            let mut displacement = 0usize;
            while table[slot].is_some() {
                slot = (slot + 1) & mask;
                displacement += 1;
            }
            table[slot] = Some(Entry { token, id });
            chain_len[start] += 1;
            if chain_len[start] >= WARN_BUCKET_LEN {
                warn!(
                    "optimizing word index bucket {} reached {} entries (displacement {})",
                    start, chain_len[start], displacement
                );
            }
        }

        self.table = table;
        self.mask = mask;
        self.built = true;
    }
}

impl<I: WordIndex> WordIndex for OptimizingWordIndex<I> {
    fn reserve(&mut self, n: usize) {
        self.inner.reserve(n);
    }

    fn register_word(&mut self, token: &[u8]) -> WordId {
        self.inner.register_word(token)
    }

    fn get_word_id(&self, token: &[u8]) -> WordId {
        if !self.built {
            return self.inner.get_word_id(token);
        }
        let mask = self.mask;
        let mut slot = (hash_token(token) as usize) & mask;
        loop {
            match &self.table[slot] {
                Some(entry) if entry.token.as_ref() == token => return entry.id,
                Some(_) => slot = (slot + 1) & mask,
                None => return WordId::UNKNOWN_WORD_ID,
            }
        }
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn finalize(&mut self) {
        self.inner.finalize();
        let tokens = self.inner.snapshot();
        self.rebuild(tokens);
    }

    fn is_continuous(&self) -> bool {
        self.inner.is_continuous()
    }

    fn snapshot(&self) -> Vec<(Box<[u8]>, WordId)> {
        self.inner.snapshot()
    }
}
