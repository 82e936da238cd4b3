/*
 * header.rs
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

//! Header fields and the immutable, case-insensitive header multimap.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use crate::error::{Error, Result};
use crate::mime::{parse_content_type, ContentType};

const CRLF: &[u8] = b"\r\n";

/// One header field: either a decoded `name: value` pair or the verbatim text captured from input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: Option<String>,
    raw: Option<String>,
}

impl HeaderField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            raw: None,
        }
    }

    /// Field whose display form is `raw`, which must start with `"<name>:"`.
    pub fn new_raw(name: impl Into<String>, raw: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let raw = raw.into();
        if !raw.starts_with(name.as_str()) || raw.as_bytes().get(name.len()) != Some(&b':') {
            return Err(Error::invalid_argument(format!(
                "raw header text must start with \"{}:\"",
                name
            )));
        }
        Ok(Self {
            name,
            value: None,
            raw: Some(raw),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded value, or the trimmed text after the first colon of the raw form.
    pub fn value(&self) -> Cow<'_, str> {
        if let Some(value) = &self.value {
            return Cow::Borrowed(value);
        }
        let raw = self.raw.as_deref().unwrap_or_default();
        match raw.find(':') {
            Some(i) => Cow::Borrowed(raw[i + 1..].trim()),
            None => Cow::Borrowed(""),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn has_raw_data(&self) -> bool {
        self.raw.is_some()
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            Some(raw) => f.write_str(raw),
            None => write!(f, "{}: {}", self.name, self.value()),
        }
    }
}

/// Immutable header: fields in input order, indexed by lower-cased name.
#[derive(Debug, Clone, Default)]
pub struct Header {
    fields: Vec<HeaderField>,
    index: HashMap<String, Vec<usize>>,
}

impl Header {
    fn from_fields(fields: Vec<HeaderField>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            index.entry(field.name.to_ascii_lowercase()).or_default().push(i);
        }
        Self { fields, index }
    }

    /// Total number of fields, duplicates included.
    pub fn size(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// Distinct field names in order of first occurrence, as first spelled.
    pub fn names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(i, field)| {
                self.index
                    .get(&field.name.to_ascii_lowercase())
                    .and_then(|positions| positions.first())
                    == Some(i)
            })
            .map(|(_, field)| field.name())
            .collect()
    }

    /// Value of the first field called `name` (any case).
    pub fn value(&self, name: &str) -> Option<Cow<'_, str>> {
        self.index
            .get(&name.to_ascii_lowercase())
            .and_then(|positions| positions.first())
            .map(|&i| self.fields[i].value())
    }

    /// Values of every field called `name` (any case), in input order.
    pub fn values(&self, name: &str) -> Vec<Cow<'_, str>> {
        match self.index.get(&name.to_ascii_lowercase()) {
            Some(positions) => positions.iter().map(|&i| self.fields[i].value()).collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// Parsed first Content-Type field, if present and well-formed.
    pub fn content_type(&self) -> Option<ContentType> {
        self.value("Content-Type").and_then(|v| parse_content_type(&v))
    }

    /// Serialize the fields, each terminated by CRLF. Raw fields are written verbatim.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        for field in &self.fields {
            match &field.raw {
                Some(raw) => out.write_all(raw.as_bytes())?,
                None => {
                    out.write_all(field.name.as_bytes())?;
                    out.write_all(b": ")?;
                    out.write_all(field.value().as_bytes())?;
                }
            }
            out.write_all(CRLF)?;
        }
        Ok(())
    }
}

/// Accumulates fields for a [`Header`].
#[derive(Debug, Default)]
pub struct HeaderBuilder {
    fields: Vec<HeaderField>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(HeaderField::new(name, value));
    }

    pub fn add_raw(&mut self, name: impl Into<String>, raw: impl Into<String>) -> Result<()> {
        self.fields.push(HeaderField::new_raw(name, raw)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn build(self) -> Header {
        Header::from_fields(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(pairs: &[(&str, &str)]) -> Header {
        let mut builder = HeaderBuilder::new();
        for (name, value) in pairs {
            builder.add(*name, *value);
        }
        builder.build()
    }

    #[test]
    fn size_counts_duplicates() {
        assert_eq!(header(&[]).size(), 0);
        let h = header(&[("X-Multiple", "One"), ("Content-Type", "text/html"), ("X-Multiple", "Two")]);
        assert_eq!(h.size(), 3);
    }

    #[test]
    fn value_lookup_ignores_case() {
        let h = header(&[("Content-Type", "text/plain")]);
        assert_eq!(h.value("Content-Type").as_deref(), Some("text/plain"));
        assert_eq!(h.value("CONTENT-type"), h.value("content-type"));
        assert_eq!(h.value("Subject"), None);
    }

    #[test]
    fn value_returns_first_and_values_returns_all_in_order() {
        let h = header(&[("x-multiple", "One"), ("Subject", "s"), ("X-Multiple", "Two"), ("X-MULTIPLE", "Three")]);
        assert_eq!(h.value("X-Multiple").as_deref(), Some("One"));
        assert_eq!(h.values("x-multiple"), vec!["One", "Two", "Three"]);
        assert!(h.values("Received").is_empty());
    }

    #[test]
    fn enumeration_preserves_casing_and_order() {
        let h = header(&[("x-multiple", "One"), ("Subject", "s"), ("X-Multiple", "Two")]);
        let names: Vec<&str> = h.fields().iter().map(HeaderField::name).collect();
        assert_eq!(names, vec!["x-multiple", "Subject", "X-Multiple"]);
        assert_eq!(h.names(), vec!["x-multiple", "Subject"]);
    }

    #[test]
    fn raw_field_value_is_derived() {
        let field = HeaderField::new_raw("Subject", "Subject:   hello  ").unwrap();
        assert!(field.has_raw_data());
        assert_eq!(field.value(), "hello");
        assert_eq!(HeaderField::new_raw("X-Empty", "X-Empty:").unwrap().value(), "");
        assert_eq!(field.to_string(), "Subject:   hello  ");
        assert_eq!(HeaderField::new("To", "bob").to_string(), "To: bob");
    }

    #[test]
    fn raw_field_must_start_with_name_and_colon() {
        assert!(HeaderField::new_raw("Subject", "Subj: x").is_err());
        assert!(HeaderField::new_raw("Subject", "Subjectx: x").is_err());
        let err = HeaderField::new_raw("To", "From: x").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn write_to_reproduces_raw_block() {
        let mut builder = HeaderBuilder::new();
        builder.add_raw("Subject", "Subject: folded\r\n  text").unwrap();
        builder.add_raw("to", "to:bob@x").unwrap();
        builder.add("X-Added", "yes");
        let mut out = Vec::new();
        builder.build().write_to(&mut out).unwrap();
        assert_eq!(out, b"Subject: folded\r\n  text\r\nto:bob@x\r\nX-Added: yes\r\n");
    }

    #[test]
    fn content_type_helper() {
        let h = header(&[("Content-Type", "text/html; charset=utf-8")]);
        let ct = h.content_type().unwrap();
        assert_eq!(ct.mime_type(), "text/html");
        assert_eq!(ct.charset(), "utf-8");
        assert!(header(&[]).content_type().is_none());
    }
}
