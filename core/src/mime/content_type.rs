/*
 * content_type.rs
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

//! Content-Type header (RFC 2045): media type, boundary and charset.

use std::collections::HashMap;

use super::parameter::Parameter;
use super::utils::is_token;

const DEFAULT_CHARSET: &str = "us-ascii";

#[derive(Debug, Clone)]
pub struct ContentType {
    primary_type: String,
    sub_type: String,
    parameter_map: HashMap<String, String>,
}

impl ContentType {
    pub fn new(
        primary_type: impl Into<String>,
        sub_type: impl Into<String>,
        parameters: Option<Vec<Parameter>>,
    ) -> Self {
        let parameter_map = parameters
            .map(|p| {
                p.into_iter()
                    .map(|param| (param.get_name().to_lowercase(), param.get_value().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            primary_type: primary_type.into().to_lowercase(),
            sub_type: sub_type.into().to_lowercase(),
            parameter_map,
        }
    }

    pub fn get_primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn get_sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Lower-case `type/subtype`.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.primary_type, self.sub_type)
    }

    pub fn is_mime_type(&self, primary: &str, sub: &str) -> bool {
        self.primary_type.eq_ignore_ascii_case(primary) && self.sub_type.eq_ignore_ascii_case(sub)
    }

    pub fn is_multipart(&self) -> bool {
        self.primary_type == "multipart"
    }

    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameter_map.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn boundary(&self) -> Option<&str> {
        self.get_parameter("boundary")
    }

    /// Declared charset, or `us-ascii` when none is given.
    pub fn charset(&self) -> &str {
        self.get_parameter("charset").unwrap_or(DEFAULT_CHARSET)
    }
}

/// Parse Content-Type header value. Returns `None` when the media type is not `token/token`.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (type_part, params_part) = match value.find(';') {
        Some(i) => {
            let (a, b) = value.split_at(i);
            (a.trim(), b[1..].trim())
        }
        None => (value, ""),
    };
    let slash = type_part.find('/')?;
    let primary = type_part[..slash].trim();
    let sub = type_part[slash + 1..].trim();
    if !is_token(primary) || !is_token(sub) {
        return None;
    }
    let parameters = parse_parameter_list(params_part);
    Some(ContentType::new(primary, sub, parameters))
}

/// Parse semicolon-separated parameter list (name=value; name="value"). Malformed entries are skipped.
pub fn parse_parameter_list(params_part: &str) -> Option<Vec<Parameter>> {
    let bytes = params_part.trim().as_bytes();
    let len = bytes.len();
    let mut parameters = Vec::new();
    let mut pos = 0;

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        let eq_abs = match bytes[pos..].iter().position(|&b| b == b'=') {
            Some(eq) => pos + eq,
            None => break,
        };
        let name = String::from_utf8_lossy(&bytes[pos..eq_abs]).trim().to_string();
        if !is_token(&name) {
            match bytes[pos..].iter().position(|&b| b == b';') {
                Some(semi) => {
                    pos += semi + 1;
                    continue;
                }
                None => break,
            }
        }
        pos = eq_abs + 1;
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = Vec::new();
            while pos < len {
                let c = bytes[pos];
                if c == b'\\' && pos + 1 < len {
                    v.push(bytes[pos + 1]);
                    pos += 2;
                } else if c == b'"' {
                    pos += 1;
                    break;
                } else {
                    v.push(c);
                    pos += 1;
                }
            }
            String::from_utf8_lossy(&v).into_owned()
        } else {
            let end = bytes[pos..].iter().position(|&b| b == b';').map(|i| pos + i).unwrap_or(len);
            let v = String::from_utf8_lossy(&bytes[pos..end]).trim().to_string();
            pos = end;
            if !is_token(&v) {
                continue;
            }
            v
        };
        parameters.push(Parameter::new(name, value));
    }
    if parameters.is_empty() {
        None
    } else {
        Some(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_with_unquoted_boundary() {
        let ct = parse_content_type("multipart/alternative; boundary=--boundary").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.mime_type(), "multipart/alternative");
        assert_eq!(ct.boundary(), Some("--boundary"));
    }

    #[test]
    fn quoted_parameters_and_default_charset() {
        let ct = parse_content_type("Multipart/Mixed; BOUNDARY=\"a b\\\"c\"").unwrap();
        assert_eq!(ct.mime_type(), "multipart/mixed");
        assert_eq!(ct.boundary(), Some("a b\"c"));
        assert_eq!(ct.charset(), "us-ascii");

        let ct = parse_content_type("text/plain; charset=UTF-8").unwrap();
        assert_eq!(ct.charset(), "UTF-8");
        assert!(ct.is_mime_type("TEXT", "plain"));
    }

    #[test]
    fn rejects_invalid_media_type() {
        assert!(parse_content_type("").is_none());
        assert!(parse_content_type("text").is_none());
        assert!(parse_content_type("text/pl ain").is_none());
    }
}
