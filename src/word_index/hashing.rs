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
use std::hash::Hasher;

use crate::util::fxhash::{FxBuildHasher, FxHasher64};
use crate::word_index::{WordId, WordIndex, UNK_TOKEN};

/// Non-continuous, pure-hash word index: a token's id is derived from its
/// 64-bit hash (truncated to 32 bits) rather than assigned by append
/// order. Two distinct tokens may in principle share an id; this is
/// acceptable only when paired with a trie variant whose own lookup
/// re-checks full m-gram identity rather than trusting the id alone — the
/// H2D map trie (spec.md §4.3 "H2D Map") is exactly such a consumer, and
/// is the only trie variant this word index may be paired with (spec.md
/// §6's `word_index = "hashing"`).
#[derive(Default)]
pub struct HashingWordIndex {
    registered: HashMap<u32, Box<[u8]>, FxBuildHasher>,
}

fn hash_to_id(token: &[u8]) -> WordId {
    let mut hasher = FxHasher64::default();
    hasher.write(token);
    let h = hasher.finish();
    WordId::from_raw((h as u32) ^ ((h >> 32) as u32))
}

impl HashingWordIndex {
    pub fn new() -> Self {
        let mut registered = HashMap::default();
        registered.insert(WordId::UNKNOWN_WORD_ID.as_raw(), Box::from(UNK_TOKEN));
        HashingWordIndex { registered }
    }
}

/// `<unk>` is pinned to the reserved `UNKNOWN_WORD_ID` (spec.md §3) like
/// every other word index variant, rather than whatever its hash happens
/// to land on — the query engine's own "word is unknown" test is `id ==
/// UNKNOWN_WORD_ID`, so the trie's `<unk>` payload must live at that same
/// id or an out-of-vocabulary word could never find it.
fn id_for(token: &[u8]) -> WordId {
    if token == UNK_TOKEN {
        WordId::UNKNOWN_WORD_ID
    } else {
        hash_to_id(token)
    }
}

impl WordIndex for HashingWordIndex {
    fn reserve(&mut self, n: usize) {
        self.registered.reserve(n);
    }

    fn register_word(&mut self, token: &[u8]) -> WordId {
        let id = id_for(token);
        self.registered
            .entry(id.as_raw())
            .or_insert_with(|| Box::from(token));
        id
    }

    fn get_word_id(&self, token: &[u8]) -> WordId {
        let id = id_for(token);
        match self.registered.get(&id.as_raw()) {
            Some(stored) if stored.as_ref() == token => id,
            _ => WordId::UNKNOWN_WORD_ID,
        }
    }

    fn len(&self) -> usize {
        self.registered.len()
    }

    fn is_continuous(&self) -> bool {
        false
    }

    fn snapshot(&self) -> Vec<(Box<[u8]>, WordId)> {
        self.registered
            .iter()
            .map(|(&id, tok)| (tok.clone(), WordId::from_raw(id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_token_round_trips() {
        let mut idx = HashingWordIndex::new();
        let id = idx.register_word(b"tree");
        assert_eq!(idx.get_word_id(b"tree"), id);
        assert_eq!(idx.get_word_id(b"forest"), WordId::UNKNOWN_WORD_ID);
        assert!(!idx.is_continuous());
    }
}
