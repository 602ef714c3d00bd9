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

//! An in-process N-gram language model core with Katz back-off and
//! pluggable trie storage, loaded from ARPA-format model files.
//!
//! There is no network or process boundary here: [`model::LanguageModel`]
//! is a library object a host process builds once at startup and then
//! queries directly.

pub mod arpa;
pub mod bitmap_cache;
pub mod config;
pub mod error;
pub mod mgram_id;
pub mod model;
pub mod payload;
pub mod query_engine;
pub mod trie;
pub mod word_index;

mod hash;
pub(crate) mod util;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{LmError, LmResult};
    pub use crate::model::LanguageModel;
    pub use crate::payload::Payload;
    pub use crate::query_engine::QueryResult;
    pub use crate::word_index::WordId;
}
