/*
 * parser.rs
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

use std::io::Read;

use tracing::debug;

use super::body::Message;
use super::builder::MessageBuilderFactory;
use super::tree_builder::TreeBuilder;
use crate::config::ParserConfig;
use crate::error::Result;
use crate::mime::MimeParser;

/// Parses one message from a byte stream into an immutable tree.
///
/// The factory decides where leaf bodies are stored; the tree shape is the same for every factory.
/// Parsing blocks until the input is exhausted and either returns the whole tree or an error,
/// never a partial tree.
#[derive(Debug, Clone, Default)]
pub struct MessageParser {
    config: ParserConfig,
}

impl MessageParser {
    /// Lenient parser with no line or header limits.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse<R: Read>(&self, input: R, factory: &dyn MessageBuilderFactory) -> Result<Message> {
        let mut tokenizer = MimeParser::with_config(TreeBuilder::new(factory), self.config.clone());
        tokenizer.parse(input)?;
        let message = tokenizer.into_inner().finish()?;
        debug!(length = message.length(), "parsed message");
        Ok(message)
    }
}

/// Parse with the default configuration.
pub fn parse_message<R: Read>(input: R, factory: &dyn MessageBuilderFactory) -> Result<Message> {
    MessageParser::new().parse(input, factory)
}
