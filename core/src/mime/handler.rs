/*
 * handler.rs
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

//! MIME handler trait: receives structural parsing events (messages, headers, multiparts, bodies).

use std::fmt;
use std::io::Read;

use crate::error::Result;

/// Handler for MIME parsing events. The parser calls these in strictly nested order:
/// every `start_*` is matched by the corresponding `end_*` before the enclosing entity ends.
pub trait MimeHandler {
    fn set_locator(&mut self, _locator: MimeLocator) {}

    /// Start of the top-level message, or of a `message/rfc822` body.
    fn start_message(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_message(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_header(&mut self) -> Result<()> {
        Ok(())
    }

    /// One header field. `field.raw()` is the verbatim text including folding, without the final line ending.
    fn field(&mut self, _field: &RawField) -> Result<()> {
        Ok(())
    }

    fn end_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_multipart(&mut self, _descriptor: &BodyDescriptor) -> Result<()> {
        Ok(())
    }

    /// Bytes before the first boundary line (the line ending before the boundary excluded).
    fn preamble(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn start_body_part(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_body_part(&mut self) -> Result<()> {
        Ok(())
    }

    /// Bytes after the close delimiter line.
    fn epilogue(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn end_multipart(&mut self) -> Result<()> {
        Ok(())
    }

    /// Leaf body. `raw` yields the undecoded body bytes up to the next boundary (or end of input).
    /// Anything the handler leaves unread is skipped by the parser.
    fn body(&mut self, _descriptor: &BodyDescriptor, _raw: &mut dyn Read) -> Result<()> {
        Ok(())
    }
}

/// A header field as captured from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    name: String,
    raw: String,
}

impl RawField {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Unfolded, trimmed text after the first colon; empty if there is none.
    pub fn body(&self) -> String {
        let value = self.raw.split_once(':').map_or("", |(_, v)| v);
        unfold(value).trim().to_string()
    }
}

fn unfold(value: &str) -> String {
    value.replace("\r\n", "").replace('\n', "")
}

/// What the parser learned about an entity from its header, passed with multipart and body events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDescriptor {
    /// Lower-case `type/subtype`.
    pub mime_type: String,
    pub boundary: Option<String>,
    pub charset: Option<String>,
    /// Lower-case Content-Transfer-Encoding, `None` if absent.
    pub transfer_encoding: Option<String>,
}

impl BodyDescriptor {
    pub fn is_multipart(&self) -> bool {
        self.mime_type.starts_with("multipart/")
    }

    pub fn is_message(&self) -> bool {
        self.mime_type == "message/rfc822"
    }
}

impl Default for BodyDescriptor {
    fn default() -> Self {
        Self {
            mime_type: "text/plain".to_string(),
            boundary: None,
            charset: None,
            transfer_encoding: None,
        }
    }
}

/// Position within the input for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeLocator {
    pub offset: u64,
    pub line: u64,
    pub column: u64,
}

impl fmt::Display for MimeLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {} (offset {})", self.line, self.column, self.offset)
    }
}

#[derive(Debug)]
pub struct MimeParseError {
    pub message: String,
    pub locator: Option<MimeLocator>,
}

impl MimeParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locator: None,
        }
    }

    pub fn at(message: impl Into<String>, locator: MimeLocator) -> Self {
        Self {
            message: message.into(),
            locator: Some(locator),
        }
    }
}

impl fmt::Display for MimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locator {
            Some(locator) => write!(f, "{} at {}", self.message, locator),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for MimeParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_field_body_is_unfolded_and_trimmed() {
        let field = RawField::new("Subject", "Subject: a long\r\n subject line ");
        assert_eq!(field.body(), "a long subject line");
    }

    #[test]
    fn raw_field_without_colon_has_empty_body() {
        assert_eq!(RawField::new("Subject", "X").body(), "");
        assert_eq!(RawField::new("Subject", "").body(), "");
        assert_eq!(RawField::new("X-Empty", "X-Empty:").body(), "");
    }

    #[test]
    fn parse_error_display_includes_locator() {
        let err = MimeParseError::at(
            "missing close delimiter",
            MimeLocator { offset: 42, line: 3, column: 1 },
        );
        assert_eq!(err.to_string(), "missing close delimiter at line 3, column 1 (offset 42)");
        assert_eq!(MimeParseError::new("bad").to_string(), "bad");
    }
}
