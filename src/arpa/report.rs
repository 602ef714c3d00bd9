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

//! Non-fatal warnings surfaced from an ARPA load (spec.md §4.5). Nothing
//! here stops a load; [`crate::error::LmError`] variants are reserved for
//! the lines that do.

/// A level's declared count (from the `\data\` header) disagreed with
/// how many data lines the level's section actually held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountMismatch {
    pub level: usize,
    pub declared: usize,
    pub actual: usize,
}

/// A later occurrence of the same m-gram overwrote an earlier one
/// (spec.md §9(b): last occurrence wins).
#[derive(Debug, Clone)]
pub struct DuplicateMGram {
    pub level: usize,
    pub line: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArpaBuildReport {
    pub count_mismatches: Vec<CountMismatch>,
    pub duplicates: Vec<DuplicateMGram>,
}

impl ArpaBuildReport {
    pub fn is_clean(&self) -> bool {
        self.count_mismatches.is_empty() && self.duplicates.is_empty()
    }
}
