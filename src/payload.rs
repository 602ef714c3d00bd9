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

//! The per-M-gram record stored by every trie variant (spec.md §3/§4.2).

/// Sentinel log-probability (log base 10) assigned to the unknown word
/// when the ARPA file does not itself supply one (spec.md §4.6).
pub const MIN_LOG_PROB: f32 = -10.0;

/// `(log_prob, back_off)`. The top (N-th) level only ever carries
/// `log_prob`; `back_off` defaults to `0.0`, meaning "no penalty" when a
/// shorter prefix has no explicit back-off weight (spec.md §3).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Payload {
    pub log_prob: f32,
    pub back_off: f32,
}

impl Payload {
    pub const fn new(log_prob: f32, back_off: f32) -> Self {
        Payload { log_prob, back_off }
    }

    /// A log-prob-only payload, as stored by the N-th (top) level.
    pub const fn log_prob_only(log_prob: f32) -> Self {
        Payload {
            log_prob,
            back_off: 0.0,
        }
    }

    pub const UNKNOWN_SENTINEL: Payload = Payload::new(MIN_LOG_PROB, 0.0);
}

impl Default for Payload {
    fn default() -> Self {
        Payload::new(0.0, 0.0)
    }
}
