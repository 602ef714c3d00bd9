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

//! ARPA model file ingestion (spec.md §4.5): parses the `\data\` header
//! and every `\L-grams:` section, driving a [`Trie`] and [`AnyWordIndex`]
//! through it. Writing ARPA files back out is explicitly out of scope
//! (spec.md §1 Non-goals).

pub mod parse;
pub mod report;

use std::collections::HashSet;

use crate::error::LmError;
use crate::payload::Payload;
use crate::trie::{NgramCounts, Trie, N_MAX};
use crate::word_index::{AnyWordIndex, WordIndex};

pub use report::{ArpaBuildReport, CountMismatch, DuplicateMGram};

/// Parses the `\data\` header, returning per-level counts (`counts[0]`
/// is level 1) and the line index the first `\L-grams:` section starts
/// at.
fn read_header(lines: &[&str]) -> Result<(NgramCounts, usize), LmError> {
    let mut offset = 0usize;
    let mut i = 0;
    while i < lines.len() && lines[i].trim() != "\\data\\" {
        offset += lines[i].len() + 1;
        i += 1;
    }
    if i >= lines.len() {
        return Err(LmError::ArpaHeader {
            offset,
            line: "missing \\data\\ marker".to_string(),
        });
    }
    i += 1;

    let mut counts = NgramCounts::new();
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }
        match parse::parse_count_line(line) {
            Some((level, count)) => {
                if level == 0 || level > N_MAX {
                    return Err(LmError::LevelOverflow(level, N_MAX));
                }
                if counts.len() < level {
                    counts.resize(level, 0);
                }
                counts[level - 1] = count;
                i += 1;
            }
            None => break,
        }
    }
    Ok((counts, i))
}

/// Reads just the `\data\` header's per-level counts, so a caller can
/// size a [`Trie`] and word index before handing `text` to [`ingest`].
pub fn header_counts(text: &str) -> Result<NgramCounts, LmError> {
    let lines: Vec<&str> = text.lines().collect();
    read_header(&lines).map(|(counts, _)| counts)
}

/// Ingests ARPA `text` into `word_index` and `trie`, applying
/// `lm_weight` to every `log_prob` at load time (never to `back_off`,
/// spec.md §4.6/§9(a)). `n` is `counts.len()` from the header.
pub fn ingest(
    text: &str,
    word_index: &mut AnyWordIndex,
    trie: &mut dyn Trie,
    lm_weight: f32,
) -> Result<ArpaBuildReport, LmError> {
    let lines: Vec<&str> = text.lines().collect();
    let (counts, mut i) = read_header(&lines)?;
    let n = counts.len();
    trie.pre_allocate(&counts);
    word_index.reserve(counts.first().copied().unwrap_or(0));

    if word_index.requires_count_pass() {
        run_counting_pre_pass(&lines, i, word_index);
        word_index.commit_counts();
    }

    let mut report = ArpaBuildReport::default();
    let mut seen: Vec<HashSet<Vec<u32>>> = (0..n).map(|_| HashSet::new()).collect();
    let mut offset: usize = lines[..i].iter().map(|l| l.len() + 1).sum();
    let mut current_level: Option<usize> = None;
    let mut level_line_counts = vec![0usize; n];

    while i < lines.len() {
        let raw = lines[i];
        let line = raw.trim();
        let line_len = raw.len() + 1;

        if line == "\\end\\" {
            break;
        }
        if line.is_empty() {
            offset += line_len;
            i += 1;
            continue;
        }
        if let Some(level) = parse::parse_section_marker(line) {
            if level == 0 || level > N_MAX {
                return Err(LmError::LevelOverflow(level, N_MAX));
            }
            current_level = Some(level);
            offset += line_len;
            i += 1;
            continue;
        }

        let level = current_level.ok_or_else(|| LmError::ArpaHeader {
            offset,
            line: line.to_string(),
        })?;

        let parsed = parse::parse_data_line(line).ok_or_else(|| LmError::ArpaMGramLine {
            level,
            offset,
            line: line.to_string(),
        })?;

        let word_ids: Vec<_> = parsed.words.iter().map(|w| word_index.register_word(w.as_bytes())).collect();
        let raw_ids: Vec<u32> = word_ids.iter().map(|id| id.as_raw()).collect();
        if !seen[level - 1].insert(raw_ids) {
            report.duplicates.push(DuplicateMGram {
                level,
                line: line.to_string(),
            });
        }
        level_line_counts[level - 1] += 1;

        let weighted_log_prob = parsed.log_prob * lm_weight;
        if level == 1 {
            trie.add_unigram(
                word_ids[0],
                Payload::new(weighted_log_prob, parsed.back_off.unwrap_or(0.0)),
            );
        } else if level == n {
            trie.add_n_gram(&word_ids, weighted_log_prob);
            trie.register_m_gram_hash(&word_ids);
        } else {
            trie.add_m_gram(
                &word_ids,
                Payload::new(weighted_log_prob, parsed.back_off.unwrap_or(0.0)),
            );
            trie.register_m_gram_hash(&word_ids);
        }

        offset += line_len;
        i += 1;
    }

    word_index.finalize();
    trie.finalize();

    for (idx, &declared) in counts.iter().enumerate() {
        let actual = level_line_counts[idx];
        if declared != actual {
            report.count_mismatches.push(CountMismatch {
                level: idx + 1,
                declared,
                actual,
            });
        }
    }

    Ok(report)
}

fn run_counting_pre_pass(lines: &[&str], start: usize, word_index: &mut AnyWordIndex) {
    let mut i = start;
    let mut in_unigrams = false;
    while i < lines.len() {
        let line = lines[i].trim();
        if line == "\\end\\" {
            break;
        }
        if let Some(level) = parse::parse_section_marker(line) {
            in_unigrams = level == 1;
            i += 1;
            continue;
        }
        if in_unigrams {
            if let Some(parsed) = parse::parse_data_line(line) {
                if let Some(word) = parsed.words.first() {
                    word_index.count_word(word.as_bytes(), parsed.log_prob);
                }
            }
        } else if !line.is_empty() && parse::parse_section_marker(line).is_none() {
            // Past the unigram section with no further markers seen yet
            // is unreachable in a well-formed file; nothing to do.
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{self, TrieVariant};
    use crate::word_index::WordIndexType;

    const SAMPLE: &str = "\\data\\\nngram 1=4\nngram 2=3\n\n\\1-grams:\n-1.0\t<unk>\t0.0\n-0.5\t<s>\t-0.2\n-0.6\ta\t-0.1\n-0.7\tb\t0.0\n\n\\2-grams:\n-0.3\t<s> a\n-0.4\ta b\n-0.4\ta b\n\n\\end\\\n";

    #[test]
    fn ingests_unigrams_and_bigrams_with_last_duplicate_winning() {
        let mut word_index = AnyWordIndex::new(WordIndexType::Basic);
        let mut trie = trie::build(TrieVariant::C2dMap, 2, true, false, trie::TrieTuning::default());
        let report = ingest(SAMPLE, &mut word_index, &mut *trie, 1.0).unwrap();

        assert!(report.count_mismatches.is_empty());
        assert_eq!(report.duplicates.len(), 1);

        let a = word_index.get_word_id(b"a");
        let b = word_index.get_word_id(b"b");
        assert_eq!(
            trie.get_n_gram_log_prob(&[a, b]),
            Some(-0.4)
        );
    }

    #[test]
    fn applies_lm_weight_to_log_prob_only() {
        let mut word_index = AnyWordIndex::new(WordIndexType::Basic);
        let mut trie = trie::build(TrieVariant::C2dMap, 2, true, false, trie::TrieTuning::default());
        ingest(SAMPLE, &mut word_index, &mut *trie, 2.0).unwrap();

        let a = word_index.get_word_id(b"a");
        let payload = trie.get_unigram_payload(a);
        assert!((payload.log_prob - (-1.2)).abs() < 1e-6);
        assert_eq!(payload.back_off, -0.1);
    }

    #[test]
    fn reports_count_mismatch() {
        let text = "\\data\\\nngram 1=9\n\n\\1-grams:\n-1.0\t<unk>\t0.0\n\n\\end\\\n";
        let mut word_index = AnyWordIndex::new(WordIndexType::Basic);
        let mut trie = trie::build(TrieVariant::C2dMap, 1, true, false, trie::TrieTuning::default());
        let report = ingest(text, &mut word_index, &mut *trie, 1.0).unwrap();
        assert_eq!(report.count_mismatches.len(), 1);
        assert_eq!(report.count_mismatches[0].declared, 9);
        assert_eq!(report.count_mismatches[0].actual, 1);
    }
}
