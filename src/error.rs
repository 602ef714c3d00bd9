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

use thiserror::Error;

use crate::config::ConfigError;

pub type LmResult<T> = Result<T, LmError>;

/// Language model error
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LmError {
    #[error("{context}: {cause}")]
    ErrWithContext {
        context: String,
        cause: Box<LmError>,
    },

    #[error("{context}: {cause}")]
    Io {
        cause: std::io::Error,
        context: String,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed ARPA header at byte offset {offset}: {line}")]
    ArpaHeader { offset: usize, line: String },

    #[error("Malformed {level}-gram line at byte offset {offset}: {line}")]
    ArpaMGramLine {
        level: usize,
        offset: usize,
        line: String,
    },

    #[error("N-gram level {0} exceeds the maximum supported level {1}")]
    LevelOverflow(usize, usize),

    #[error("Word count {0} exceeds the 32-bit word id space ({1})")]
    WordIdOverflow(usize, usize),

    #[error("Unsupported trie variant: {0}")]
    UnknownTrieVariant(String),

    #[error("Unsupported word index: {0}")]
    UnknownWordIndex(String),

    #[error("Unsupported memory increase strategy: {0}")]
    UnknownMemIncStrategy(String),
}

impl From<std::io::Error> for LmError {
    fn from(e: std::io::Error) -> Self {
        LmError::Io {
            cause: e,
            context: String::from("IO error"),
        }
    }
}

impl LmError {
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        match self {
            LmError::Io { cause, .. } => LmError::Io {
                cause,
                context: ctx.into(),
            },
            cause => LmError::ErrWithContext {
                cause: Box::new(cause),
                context: ctx.into(),
            },
        }
    }
}
