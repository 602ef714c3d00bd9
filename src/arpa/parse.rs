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

//! Line-level ARPA format grammar (spec.md §6). The format is
//! line-oriented text, not a binary layout, so plain tokenizing handles
//! the surrounding structure (tabs, section markers); the one piece
//! genuinely worth a grammar is the float literal itself ("decimal
//! floating-point with optional sign and exponent"), parsed with `nom`'s
//! `recognize_float` so `-1.2345`, `+0.5e-3`, and bare `10` all parse the
//! same way the ARPA convention expects.

use nom::character::complete::multispace0;
use nom::number::complete::recognize_float;
use nom::sequence::delimited;
use nom::IResult;

fn float_literal(input: &str) -> IResult<&str, f32> {
    let (rest, digits) = delimited(multispace0, recognize_float, multispace0)(input)?;
    match digits.parse::<f32>() {
        Ok(v) => Ok((rest, v)),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

fn parse_float(field: &str) -> Option<f32> {
    let (rest, value) = float_literal(field).ok()?;
    if rest.is_empty() {
        Some(value)
    } else {
        None
    }
}

/// `ngram L=K` -> `(L, K)`.
pub fn parse_count_line(line: &str) -> Option<(usize, usize)> {
    let rest = line.strip_prefix("ngram")?.trim_start();
    let (level, count) = rest.split_once('=')?;
    Some((level.trim().parse().ok()?, count.trim().parse().ok()?))
}

/// `\L-grams:` -> `L`.
pub fn parse_section_marker(line: &str) -> Option<usize> {
    let rest = line.strip_prefix('\\')?;
    let rest = rest.strip_suffix(':')?;
    rest.strip_suffix("-grams")?.parse().ok()
}

/// One data line: `log_prob<TAB>w1 w2 ... wM[<TAB>back_off]`.
pub struct DataLine<'a> {
    pub log_prob: f32,
    pub words: Vec<&'a str>,
    pub back_off: Option<f32>,
}

pub fn parse_data_line(line: &str) -> Option<DataLine<'_>> {
    let mut fields = line.split('\t');
    let log_prob = parse_float(fields.next()?)?;
    let words_field = fields.next()?;
    let words: Vec<&str> = words_field.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let back_off = match fields.next() {
        Some(s) if !s.trim().is_empty() => Some(parse_float(s)?),
        _ => None,
    };
    Some(DataLine {
        log_prob,
        words,
        back_off,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_count_declarations() {
        assert_eq!(parse_count_line("ngram 1=5"), Some((1, 5)));
        assert_eq!(parse_count_line("ngram 12=340"), Some((12, 340)));
        assert_eq!(parse_count_line("not a count line"), None);
    }

    #[test]
    fn parses_section_markers() {
        assert_eq!(parse_section_marker("\\1-grams:"), Some(1));
        assert_eq!(parse_section_marker("\\3-grams:"), Some(3));
        assert_eq!(parse_section_marker("\\data\\"), None);
        assert_eq!(parse_section_marker("\\end\\"), None);
    }

    #[test]
    fn parses_mid_level_line_with_back_off() {
        let line = "-1.2345\ta b\t-0.5";
        let parsed = parse_data_line(line).unwrap();
        assert_eq!(parsed.log_prob, -1.2345);
        assert_eq!(parsed.words, vec!["a", "b"]);
        assert_eq!(parsed.back_off, Some(-0.5));
    }

    #[test]
    fn parses_exponent_and_explicit_sign_floats() {
        let line = "+1.5e-2\ta b\t-2E+1";
        let parsed = parse_data_line(line).unwrap();
        assert!((parsed.log_prob - 0.015).abs() < 1e-6);
        assert_eq!(parsed.back_off, Some(-20.0));
    }

    #[test]
    fn parses_top_level_line_without_back_off() {
        let line = "-0.9\tx y z";
        let parsed = parse_data_line(line).unwrap();
        assert_eq!(parsed.back_off, None);
        assert_eq!(parsed.words, vec!["x", "y", "z"]);
    }
}
