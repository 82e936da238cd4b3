/*
 * config.rs
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

//! Parser configuration: tokenizer limits and the body storage strategy.
//! Loadable from JSON; every field is optional and falls back to its default.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{
    AdaptiveBuilderFactory, FileBackedBuilderFactory, FileFactory, InMemoryBuilderFactory,
    MessageBuilderFactory, TempDirFileFactory, DEFAULT_IN_MEMORY_THRESHOLD,
};

/// How leaf bodies are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuilderStrategy {
    /// Every body is held in memory.
    InMemory,
    /// Bodies up to the threshold in memory, larger ones in a temporary file.
    #[default]
    Adaptive,
    /// Every body is written to a temporary file.
    FileBacked,
}

impl BuilderStrategy {
    /// Factory for this strategy. File-based strategies use `file_factory`, or a fresh
    /// [`TempDirFileFactory`] when none is given.
    pub fn factory(
        self,
        in_memory_threshold: usize,
        file_factory: Option<Arc<dyn FileFactory>>,
    ) -> Result<Box<dyn MessageBuilderFactory>> {
        let files = || -> Result<Arc<dyn FileFactory>> {
            match &file_factory {
                Some(f) => Ok(Arc::clone(f)),
                None => Ok(Arc::new(TempDirFileFactory::new()?)),
            }
        };
        Ok(match self {
            BuilderStrategy::InMemory => Box::new(InMemoryBuilderFactory),
            BuilderStrategy::Adaptive => Box::new(
                AdaptiveBuilderFactory::new(files()?).with_threshold(in_memory_threshold),
            ),
            BuilderStrategy::FileBacked => Box::new(FileBackedBuilderFactory::new(files()?)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Longest accepted line, excluding its line ending. `None` is unlimited.
    pub max_line_length: Option<usize>,
    /// Longest accepted header field including folded lines. `None` is unlimited.
    pub max_header_length: Option<usize>,
    /// Most header fields accepted in one header block. `None` is unlimited.
    pub max_header_count: Option<usize>,
    /// Deepest accepted nesting of multiparts and message/rfc822 bodies.
    pub max_depth: Option<usize>,
    /// Reject truncated or syntactically invalid input instead of recovering.
    pub strict: bool,
    /// Bodies larger than this many bytes leave memory (adaptive strategy).
    pub in_memory_threshold: usize,
    pub strategy: BuilderStrategy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_line_length: None,
            max_header_length: None,
            max_header_count: None,
            max_depth: Some(100),
            strict: false,
            in_memory_threshold: DEFAULT_IN_MEMORY_THRESHOLD,
            strategy: BuilderStrategy::Adaptive,
        }
    }
}

impl ParserConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Builder factory for the configured strategy and threshold.
    pub fn builder_factory(
        &self,
        file_factory: Option<Arc<dyn FileFactory>>,
    ) -> Result<Box<dyn MessageBuilderFactory>> {
        self.strategy.factory(self.in_memory_threshold, file_factory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unlimited_except_depth() {
        let config = ParserConfig::default();
        assert_eq!(config.max_line_length, None);
        assert_eq!(config.max_header_length, None);
        assert_eq!(config.max_header_count, None);
        assert_eq!(config.max_depth, Some(100));
        assert_eq!(config.in_memory_threshold, 100 * 1024);
        assert_eq!(config.strategy, BuilderStrategy::Adaptive);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ParserConfig::from_json(r#"{"strict": true, "strategy": "in-memory", "max_depth": null}"#).unwrap();
        assert!(config.strict);
        assert_eq!(config.strategy, BuilderStrategy::InMemory);
        assert_eq!(config.max_depth, None);
        assert_eq!(config.in_memory_threshold, DEFAULT_IN_MEMORY_THRESHOLD);
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = ParserConfig::from_json(r#"{"strategy": "on-tape"}"#).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parser.json");
        fs::write(&path, r#"{"in_memory_threshold": 16, "strategy": "file-backed"}"#).unwrap();
        let config = ParserConfig::load(&path).unwrap();
        assert_eq!(config.in_memory_threshold, 16);
        assert_eq!(config.strategy, BuilderStrategy::FileBacked);
    }
}
