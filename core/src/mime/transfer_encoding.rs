/*
 * transfer_encoding.rs
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

//! Content-Transfer-Encoding selection: picks the decoder for a leaf body's raw bytes.

use std::io::{self, Read};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::read::DecoderReader;

use crate::error::{Error, Result};
use crate::message::{Body, Part};
use crate::mime::quoted_printable::QuotedPrintableReader;

/// Base64 as found in mail: padding optional, trailing bits tolerated.
static MIME_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    None,
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
}

impl TransferEncoding {
    /// Map a Content-Transfer-Encoding value (case-insensitive). Absent means `None`; unknown values are an error.
    pub fn from_value(value: Option<&str>) -> Result<Self> {
        let value = match value {
            Some(v) => v.trim(),
            None => return Ok(TransferEncoding::None),
        };
        if value.eq_ignore_ascii_case("7bit") {
            Ok(TransferEncoding::SevenBit)
        } else if value.eq_ignore_ascii_case("8bit") {
            Ok(TransferEncoding::EightBit)
        } else if value.eq_ignore_ascii_case("binary") {
            Ok(TransferEncoding::Binary)
        } else if value.eq_ignore_ascii_case("base64") {
            Ok(TransferEncoding::Base64)
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            Ok(TransferEncoding::QuotedPrintable)
        } else {
            Err(Error::invalid_argument(format!("unknown transfer encoding: {}", value)))
        }
    }

    /// True for encodings whose raw bytes are the content itself.
    pub fn is_identity(self) -> bool {
        !matches!(self, TransferEncoding::Base64 | TransferEncoding::QuotedPrintable)
    }

    /// Wrap `raw` in the matching decoder.
    pub fn decode_reader<'a>(self, raw: Box<dyn Read + Send + 'a>) -> Box<dyn Read + Send + 'a> {
        match self {
            TransferEncoding::Base64 => {
                Box::new(DecoderReader::new(WhitespaceFilter { inner: raw }, &MIME_BASE64))
            }
            TransferEncoding::QuotedPrintable => Box::new(QuotedPrintableReader::new(raw)),
            _ => raw,
        }
    }

    /// Decoded content of a leaf part, using its Content-Transfer-Encoding header.
    pub fn decode(part: &Part) -> Result<Box<dyn Read + Send>> {
        let value = part.header().and_then(|h| h.value("Content-Transfer-Encoding"));
        let encoding = TransferEncoding::from_value(value.as_deref())?;
        match part.body() {
            Some(Body::Content(body)) => Ok(encoding.decode_reader(body.raw()?)),
            _ => Err(Error::invalid_state("body needs to be a content body")),
        }
    }
}

/// Drops ASCII whitespace (line breaks in base64 text) before decoding.
struct WhitespaceFilter<R> {
    inner: R,
}

impl<R: Read> Read for WhitespaceFilter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let b = buf[i];
                if !b.is_ascii_whitespace() {
                    buf[kept] = b;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}
