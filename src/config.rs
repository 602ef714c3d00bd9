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

//! JSON-driven configuration (spec.md §6): a `RawConfig` mirrors the
//! camelCase JSON surface exactly, and is validated into a `Config` with
//! resolved enum values and numeric defaults.

use std::io::Read;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::trie::TrieVariant;
use crate::word_index::WordIndexType;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidValue(String),
    #[error("lm_weight must be positive, got {0}")]
    NonPositiveLmWeight(f32),
}

/// Weight regrowth strategy for structures that grow past their initial
/// allocation (spec.md §6 `mem_inc_strategy`;
/// `original_source`'s `__G2DMapTrie::MEM_INC_TYPE`).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MemIncStrategy {
    Constant,
    Linear,
    Log2,
    Log10,
}

impl FromStr for MemIncStrategy {
    type Err = crate::error::LmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(MemIncStrategy::Constant),
            "linear" => Ok(MemIncStrategy::Linear),
            "log2" => Ok(MemIncStrategy::Log2),
            "log10" => Ok(MemIncStrategy::Log10),
            other => Err(crate::error::LmError::UnknownMemIncStrategy(other.to_string())),
        }
    }
}

#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Default)]
pub struct RawConfig {
    lmWeight: Option<f32>,
    trieVariant: Option<String>,
    wordIndex: Option<String>,
    bitmapCache: Option<bool>,
    bucketFactorC2dM: Option<f64>,
    bucketFactorC2dN: Option<f64>,
    bucketFactorC2dHybridM: Option<f64>,
    bucketFactorC2dHybridN: Option<f64>,
    optimizingIndexBucketFactor: Option<f32>,
    bitmapBucketMultiplier: Option<f64>,
    wordsPerBucketG2d: Option<f64>,
    minMemInc: Option<usize>,
    memIncFactor: Option<f64>,
    memIncStrategy: Option<String>,
}

/// Resolved, validated configuration (spec.md §6). `word_index` and
/// `bitmap_cache` fall back to `trie_variant`'s calibrated defaults
/// (`TrieVariant::default_word_index`/`default_bitmap_cache`) when the
/// raw JSON leaves them unset.
#[derive(Debug, Clone)]
pub struct Config {
    /// Multiplies every unigram/m-gram/n-gram `log_prob` at load time;
    /// never applied to `back_off` (spec.md §4.6, §9(a)).
    pub lm_weight: f32,
    pub trie_variant: TrieVariantChoice,
    pub word_index: WordIndexChoice,
    pub bitmap_cache: bool,
    pub bucket_factor_c2d_m: f64,
    pub bucket_factor_c2d_n: f64,
    pub bucket_factor_c2d_hybrid_m: f64,
    pub bucket_factor_c2d_hybrid_n: f64,
    pub optimizing_index_bucket_factor: f32,
    pub bitmap_bucket_multiplier: f64,
    pub words_per_bucket_g2d: f64,
    pub min_mem_inc: usize,
    pub mem_inc_factor: f64,
    pub mem_inc_strategy: MemIncStrategy,
}

/// `trie_variant`, held alongside the parsed [`TrieVariant`] it resolved
/// to so the config can still report which one was chosen.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TrieVariantChoice(pub TrieVariant);

/// `word_index`, `None` when the JSON left it unset and the caller
/// should fall back to `trie_variant.default_word_index()`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct WordIndexChoice(pub Option<WordIndexType>);

impl WordIndexChoice {
    pub fn resolve(&self, variant: TrieVariant) -> WordIndexType {
        self.0.unwrap_or_else(|| variant.default_word_index())
    }
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ConfigError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_json_str(&text)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let lm_weight = raw.lmWeight.unwrap_or(1.0);
        if lm_weight <= 0.0 {
            return Err(ConfigError::NonPositiveLmWeight(lm_weight));
        }

        let trie_variant = TrieVariantChoice(match raw.trieVariant {
            Some(s) => TrieVariant::from_str(&s).map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
            None => TrieVariant::C2dMap,
        });

        let word_index = WordIndexChoice(match raw.wordIndex {
            Some(s) => Some(WordIndexType::from_str(&s).map_err(|e| ConfigError::InvalidValue(e.to_string()))?),
            None => None,
        });

        let bitmap_cache = raw
            .bitmapCache
            .unwrap_or_else(|| trie_variant.0.default_bitmap_cache());

        let mem_inc_strategy = match raw.memIncStrategy {
            Some(s) => MemIncStrategy::from_str(&s).map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
            None => MemIncStrategy::Log2,
        };

        Ok(Config {
            lm_weight,
            trie_variant,
            word_index,
            bitmap_cache,
            bucket_factor_c2d_m: raw.bucketFactorC2dM.unwrap_or(2.0),
            bucket_factor_c2d_n: raw.bucketFactorC2dN.unwrap_or(2.5),
            bucket_factor_c2d_hybrid_m: raw.bucketFactorC2dHybridM.unwrap_or(2.1),
            bucket_factor_c2d_hybrid_n: raw.bucketFactorC2dHybridN.unwrap_or(2.0),
            optimizing_index_bucket_factor: raw.optimizingIndexBucketFactor.unwrap_or(10.0),
            bitmap_bucket_multiplier: raw.bitmapBucketMultiplier.unwrap_or(20.0),
            words_per_bucket_g2d: raw.wordsPerBucketG2d.unwrap_or(1.0),
            min_mem_inc: raw.minMemInc.unwrap_or(1),
            mem_inc_factor: raw.memIncFactor.unwrap_or(0.3),
            mem_inc_strategy,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_raw(RawConfig::default()).expect("defaults are always valid")
    }
}
