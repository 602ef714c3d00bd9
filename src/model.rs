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

//! [`LanguageModel`]: the object a host process builds once at startup
//! from an ARPA file and then queries directly (spec.md §1/§5). Ties
//! together the word index, the selected trie variant, and the query
//! engine behind one read-only handle.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::arpa::{self, ArpaBuildReport};
use crate::config::Config;
use crate::error::{LmError, LmResult};
use crate::query_engine::{self, QueryResult};
use crate::trie::{self, Trie};
use crate::word_index::{AnyWordIndex, WordIndex, WordId};

/// A loaded, immutable n-gram back-off language model (spec.md §2).
///
/// Built once by [`LanguageModel::from_arpa_str`] /
/// [`LanguageModel::from_arpa_file`], then shared `&self` across as many
/// query threads as the caller likes: nothing behind this handle is
/// mutated after [`arpa::ingest`] returns (spec.md §5).
pub struct LanguageModel {
    word_index: AnyWordIndex,
    trie: Box<dyn Trie>,
    n: usize,
    config: Config,
}

impl LanguageModel {
    /// Builds a model from ARPA-format `text` using `config`'s
    /// `trie_variant`/`word_index`/calibration keys (spec.md §6).
    pub fn from_arpa_str(text: &str, config: Config) -> LmResult<(Self, ArpaBuildReport)> {
        let counts = arpa::header_counts(text)?;
        let n = counts.len();
        if n == 0 || n > trie::N_MAX {
            return Err(LmError::LevelOverflow(n, trie::N_MAX));
        }
        log::info!("loading language model: {} levels, {:?} m-grams per level", n, counts);

        let word_index_kind = config.word_index.resolve(config.trie_variant.0);
        let mut word_index = AnyWordIndex::with_bucket_factor(
            word_index_kind,
            config.optimizing_index_bucket_factor,
        );
        let mut trie = trie::build(
            config.trie_variant.0,
            n,
            word_index_kind.produces_continuous_ids(),
            config.bitmap_cache,
            trie::TrieTuning {
                bitmap_bucket_multiplier: config.bitmap_bucket_multiplier,
                bucket_factor_c2d_m: config.bucket_factor_c2d_m,
                bucket_factor_c2d_n: config.bucket_factor_c2d_n,
                bucket_factor_c2d_hybrid_m: config.bucket_factor_c2d_hybrid_m,
                bucket_factor_c2d_hybrid_n: config.bucket_factor_c2d_hybrid_n,
                words_per_bucket_g2d: config.words_per_bucket_g2d,
            },
        );

        let report = arpa::ingest(text, &mut word_index, &mut *trie, config.lm_weight)?;
        if !report.is_clean() {
            log::warn!(
                "arpa load finished with {} count mismatch(es) and {} duplicate m-gram(s)",
                report.count_mismatches.len(),
                report.duplicates.len()
            );
        }
        log::info!("language model loaded: {} words", word_index.len());

        Ok((
            LanguageModel {
                word_index,
                trie,
                n,
                config,
            },
            report,
        ))
    }

    /// Builds a model from an ARPA file on disk, memory-mapped rather
    /// than read into a heap buffer up front (the same tradeoff the
    /// teacher's dictionary loader makes for its binary format).
    pub fn from_arpa_file<P: AsRef<Path>>(
        path: P,
        config: Config,
    ) -> LmResult<(Self, ArpaBuildReport)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            LmError::from(e).with_context(path.to_string_lossy().into_owned())
        })?;
        let mapping = unsafe { Mmap::map(&file) }
            .map_err(|e| LmError::from(e).with_context(path.to_string_lossy().into_owned()))?;
        let text = std::str::from_utf8(&mapping).map_err(|e| {
            LmError::ArpaHeader {
                offset: e.valid_up_to(),
                line: "file is not valid UTF-8".to_string(),
            }
        })?;
        Self::from_arpa_str(text, config)
    }

    /// The model's `N` (highest m-gram level).
    pub fn order(&self) -> usize {
        self.n
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Looks up a single token's id, `UNKNOWN_WORD_ID` if never
    /// registered (spec.md §4.1).
    pub fn word_id(&self, token: &[u8]) -> WordId {
        self.word_index.get_word_id(token)
    }

    /// Maps a tokenized sentence to word ids, unknown tokens mapping to
    /// `UNKNOWN_WORD_ID` (spec.md §4.6 Input).
    pub fn tokenize(&self, tokens: &[&[u8]]) -> Vec<WordId> {
        tokens.iter().map(|t| self.word_index.get_word_id(t)).collect()
    }

    /// Runs the query engine over already-resolved word ids (spec.md
    /// §4.6/§4.7). Never fails (spec.md §4.6 Failure).
    pub fn query_ids(&self, word_ids: &[WordId]) -> QueryResult {
        query_engine::query_sentence(word_ids, &*self.trie, self.n)
    }

    /// Tokenizes and scores `tokens`, returning the full per-position
    /// breakdown (spec.md §4.6 Output, both modes (a) and (b) can be read
    /// off the result).
    pub fn query(&self, tokens: &[&[u8]]) -> QueryResult {
        self.query_ids(&self.tokenize(tokens))
    }

    /// Output mode (a): the sentence's cumulative log10 probability.
    pub fn score_sentence(&self, tokens: &[&[u8]]) -> f32 {
        self.query(tokens).cumulative_log_prob()
    }

    /// Output mode (b): the conditional for the sentence's last position
    /// only.
    pub fn score_last(&self, tokens: &[&[u8]]) -> f32 {
        self.query(tokens).last_log_prob()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\\data\\\nngram 1=4\nngram 2=3\nngram 3=1\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\t<s>\t-0.30\n-0.4\ta\t-0.20\n-0.4\tb\t-0.10\n\n\\2-grams:\n-0.3\t<s> a\t-0.15\n-0.3\ta b\t-0.05\n-0.2\tb </s>\n\n\\3-grams:\n-0.1\t<s> a b\n\n\\end\\\n";

    fn assert_close(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 1e-6, "{}", format!("expected {expected}, got {actual}"));
    }

    #[test]
    fn loads_and_scores_the_worked_fixture() {
        let (model, report) = LanguageModel::from_arpa_str(FIXTURE, Config::default()).unwrap();
        assert!(report.is_clean());
        assert_eq!(model.order(), 3);
        assert_close(model.score_sentence(&[b"<s>", b"a", b"b"]), -0.9);
        assert_close(model.score_sentence(&[b"a", b"b", b"</s>"]), -0.95);
    }

    #[test]
    fn last_log_prob_is_the_final_positions_conditional() {
        let (model, _) = LanguageModel::from_arpa_str(FIXTURE, Config::default()).unwrap();
        assert_close(model.score_last(&[b"<s>", b"a", b"b"]), -0.1);
    }

    #[test]
    fn every_trie_variant_agrees_on_the_fixture() {
        for variant in [
            "c2d-map",
            "c2d-hybrid",
            "c2w-array",
            "w2c-hybrid",
            "w2c-array",
            "g2d-map",
            "h2d-map",
        ] {
            let cfg = Config::from_json_str(&format!(r#"{{"trieVariant": "{variant}"}}"#)).unwrap();
            let (model, _) = LanguageModel::from_arpa_str(FIXTURE, cfg).unwrap();
            assert_close(model.score_sentence(&[b"<s>", b"a", b"b"]), -0.9);
            assert_close(model.score_sentence(&[b"a", b"b", b"</s>"]), -0.95);
        }
    }

    #[test]
    fn rejects_a_level_above_n_max() {
        let mut header = String::from("\\data\\\n");
        for lvl in 1..=8 {
            header.push_str(&format!("ngram {lvl}=1\n"));
        }
        header.push_str("\n\\1-grams:\n-1.0\t<unk>\n\n\\end\\\n");
        let err = match LanguageModel::from_arpa_str(&header, Config::default()) {
            Err(e) => e,
            Ok(_) => panic!("expected a level overflow error"),
        };
        assert!(matches!(err, LmError::LevelOverflow(8, crate::trie::N_MAX)));
    }
}
