/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte, a cross-platform email client.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Tagliacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Tagliacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Errors from parsing, building and storing message trees.

use std::io;

use thiserror::Error;

use crate::mime::MimeParseError;

/// Errors from the tokenizer, the tree builder, the builders, or body storage.
#[derive(Debug, Error)]
pub enum Error {
    /// Input is not a well-formed message, or the event sequence was not properly nested.
    #[error("malformed message: {0}")]
    Malformed(#[from] MimeParseError),
    /// A builder was used out of sequence (e.g. raw bytes supplied twice).
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A value passed to a constructor violates its contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Reading the input or writing temporary storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Parser configuration could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(MimeParseError::new(msg))
    }

    /// True if the input itself was at fault, as opposed to misuse or I/O.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Malformed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
