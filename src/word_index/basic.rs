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

use indexmap::IndexSet;

use crate::word_index::{WordId, WordIndex, UNK_TOKEN};

/// Append-order word index: the Nth registered token gets id N.
///
/// Backed by an [`IndexSet`] so that `get_index_of` (lookup) and insertion
/// order (id assignment) come from the same structure, rather than pairing
/// a `HashMap<token, id>` with a separate `Vec<token>` for the reverse
/// direction.
#[derive(Default)]
pub struct BasicWordIndex {
    words: IndexSet<Box<[u8]>>,
}

impl BasicWordIndex {
    pub fn new() -> Self {
        let mut words = IndexSet::new();
        words.insert(Box::from(UNK_TOKEN));
        BasicWordIndex { words }
    }
}

impl WordIndex for BasicWordIndex {
    fn reserve(&mut self, n: usize) {
        self.words.reserve(n);
    }

    fn register_word(&mut self, token: &[u8]) -> WordId {
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
    fn unknown_word_is_id_zero() {
        let idx = BasicWordIndex::new();
        assert_eq!(idx.get_word_id(UNK_TOKEN), WordId::UNKNOWN_WORD_ID);
    }

    #[test]
    fn register_assigns_append_order_ids() {
        let mut idx = BasicWordIndex::new();
        let a = idx.register_word(b"a");
        let b = idx.register_word(b"b");
        let a_again = idx.register_word(b"a");
        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(idx.get_word_id(b"a"), a);
        assert_eq!(idx.get_word_id(b"zzz"), WordId::UNKNOWN_WORD_ID);
        assert_eq!(idx.len(), 3);
    }
}
