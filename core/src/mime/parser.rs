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

//! MIME tokenizer: reads a message line by line and reports its structure to a [`MimeHandler`].
//!
//! Leaf bodies are not buffered: the handler receives a reader that streams the body up to the
//! next boundary line, so arbitrarily large bodies pass through in bounded memory.

use std::io::{self, BufRead, BufReader, Read};
use std::mem;

use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::mime::content_type::parse_content_type;
use crate::mime::handler::{BodyDescriptor, MimeHandler, MimeLocator, MimeParseError, RawField};
use crate::mime::transfer_encoding::TransferEncoding;
use crate::mime::utils::{is_field_name, is_lwsp, is_valid_boundary, trim_line_ending};

const DEFAULT_TYPE: &str = "text/plain";
const DIGEST_DEFAULT_TYPE: &str = "message/rfc822";
/// Largest piece of a body line held in memory at once.
const BODY_CHUNK: usize = 8 * 1024;

/// Event-driven MIME parser. Call [`MimeParser::parse`] with the input; the handler gets callbacks.
pub struct MimeParser<H> {
    handler: H,
    config: ParserConfig,
}

impl<H: MimeHandler> MimeParser<H> {
    pub fn new(handler: H) -> Self {
        Self::with_config(handler, ParserConfig::default())
    }

    pub fn with_config(handler: H, config: ParserConfig) -> Self {
        Self { handler, config }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Return the handler (e.g. after parse) for inspection.
    pub fn into_inner(self) -> H {
        self.handler
    }

    /// Parse one complete message from `input`. Blocks until the input is exhausted or an error occurs.
    pub fn parse<R: Read>(&mut self, input: R) -> Result<()> {
        let mut lines = LineReader::new(BufReader::new(input), self.config.max_line_length);
        let mut boundaries = Vec::new();
        self.handler.set_locator(lines.locator());
        self.parse_message(&mut lines, &mut boundaries, 0, DEFAULT_TYPE)
    }

    fn parse_message<R: BufRead>(
        &mut self,
        lines: &mut LineReader<R>,
        boundaries: &mut Vec<String>,
        depth: usize,
        default_type: &str,
    ) -> Result<()> {
        self.handler.start_message()?;
        self.parse_entity(lines, boundaries, depth, default_type)?;
        self.handler.end_message()
    }

    /// Header block followed by a body of whatever kind the header announces.
    fn parse_entity<R: BufRead>(
        &mut self,
        lines: &mut LineReader<R>,
        boundaries: &mut Vec<String>,
        depth: usize,
        default_type: &str,
    ) -> Result<()> {
        let descriptor = self.parse_header(lines, boundaries, default_type)?;
        if descriptor.is_multipart() {
            self.check_depth(lines, depth + 1)?;
            self.parse_multipart(lines, boundaries, &descriptor, depth + 1)
        } else if descriptor.is_message() && self.is_identity(&descriptor) {
            self.check_depth(lines, depth + 1)?;
            self.parse_message(lines, boundaries, depth + 1, DEFAULT_TYPE)
        } else {
            self.parse_body(lines, boundaries, &descriptor)
        }
    }

    fn check_depth<R: BufRead>(&self, lines: &LineReader<R>, depth: usize) -> Result<()> {
        match self.config.max_depth {
            Some(max) if depth > max => {
                warn!(depth, max, "MIME nesting depth limit exceeded");
                Err(self.error(lines, format!("nesting depth exceeds limit of {}", max)))
            }
            _ => Ok(()),
        }
    }

    fn is_identity(&self, descriptor: &BodyDescriptor) -> bool {
        TransferEncoding::from_value(descriptor.transfer_encoding.as_deref())
            .map(TransferEncoding::is_identity)
            .unwrap_or(false)
    }

    fn parse_header<R: BufRead>(
        &mut self,
        lines: &mut LineReader<R>,
        boundaries: &[String],
        default_type: &str,
    ) -> Result<BodyDescriptor> {
        self.handler.start_header()?;
        let mut fields = HeaderScan::default();
        let mut current: Option<Vec<u8>> = None;
        loop {
            let line = match lines.next_line()? {
                Some(line) => line,
                None => {
                    if self.config.strict {
                        return Err(self.error(lines, "unexpected end of input in header"));
                    }
                    debug!("header terminated by end of input");
                    break;
                }
            };
            let content = trim_line_ending(&line);
            if content.is_empty() {
                break;
            }
            if match_boundary(content, boundaries).is_some() {
                if self.config.strict {
                    return Err(self.error(lines, "boundary inside header"));
                }
                debug!("header terminated by boundary");
                lines.push_back(line);
                break;
            }
            if is_lwsp(content[0]) {
                match current.as_mut() {
                    Some(field) => field.extend_from_slice(&line),
                    None if self.config.strict => {
                        return Err(self.error(lines, "continuation line without header field"));
                    }
                    None => debug!("skipping continuation line without header field"),
                }
                continue;
            }
            if let Some(previous) = current.take() {
                self.emit_field(lines, &previous, &mut fields)?;
            }
            current = Some(line);
        }
        if let Some(previous) = current.take() {
            self.emit_field(lines, &previous, &mut fields)?;
        }
        self.handler.end_header()?;
        Ok(fields.into_descriptor(default_type))
    }

    fn emit_field<R: BufRead>(
        &mut self,
        lines: &LineReader<R>,
        text: &[u8],
        fields: &mut HeaderScan,
    ) -> Result<()> {
        let raw = trim_line_ending(text);
        let colon = raw.iter().position(|&b| b == b':');
        let name = match colon {
            Some(i) if is_field_name(&raw[..i]) => &raw[..i],
            _ => {
                if self.config.strict {
                    return Err(self.error(lines, "invalid header field"));
                }
                debug!(line = %String::from_utf8_lossy(raw), "skipping invalid header field");
                return Ok(());
            }
        };
        if let Some(max) = self.config.max_header_length {
            if raw.len() > max {
                return Err(self.error(lines, format!("header field longer than {} bytes", max)));
            }
        }
        fields.count += 1;
        if let Some(max) = self.config.max_header_count {
            if fields.count > max {
                return Err(self.error(lines, format!("more than {} header fields", max)));
            }
        }
        // Header text is kept as UTF-8; other 8-bit bytes become U+FFFD unless strict.
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text.to_string(),
            Err(_) if self.config.strict => {
                return Err(self.error(lines, "header field is not valid UTF-8"));
            }
            Err(_) => {
                debug!(
                    field = %String::from_utf8_lossy(name),
                    "replacing invalid UTF-8 in header field"
                );
                String::from_utf8_lossy(raw).into_owned()
            }
        };
        let field = RawField::new(String::from_utf8_lossy(name).into_owned(), text);
        fields.observe(&field);
        self.handler.field(&field)
    }

    fn parse_multipart<R: BufRead>(
        &mut self,
        lines: &mut LineReader<R>,
        boundaries: &mut Vec<String>,
        descriptor: &BodyDescriptor,
        depth: usize,
    ) -> Result<()> {
        let boundary = descriptor.boundary.clone().unwrap_or_default();
        let child_type = if descriptor.mime_type == "multipart/digest" {
            DIGEST_DEFAULT_TYPE
        } else {
            DEFAULT_TYPE
        };
        self.handler.start_multipart(descriptor)?;
        boundaries.push(boundary.clone());
        let own = boundaries.len() - 1;

        let (preamble, lines_read, mut end) = read_segment(lines, boundaries)?;
        if lines_read > 0 {
            self.handler.preamble(&preamble)?;
        }

        let mut closed = false;
        while let SegmentEnd::Boundary { index, closing } = end {
            if index != own {
                break;
            }
            let delimiter = lines.next_line()?.unwrap_or_default();
            if closing {
                closed = true;
                if delimiter.ends_with(b"\n") {
                    let (epilogue, _, _) = read_segment(lines, &boundaries[..own])?;
                    self.handler.epilogue(&epilogue)?;
                }
                break;
            }
            self.handler.start_body_part()?;
            self.parse_entity(lines, boundaries, depth, child_type)?;
            self.handler.end_body_part()?;
            end = peek_end(lines, boundaries)?;
        }
        boundaries.pop();

        if !closed {
            if self.config.strict {
                return Err(self.error(lines, format!("missing close delimiter for boundary \"{}\"", boundary)));
            }
            debug!(boundary = %boundary, "multipart ended without close delimiter");
        }
        self.handler.end_multipart()
    }

    fn parse_body<R: BufRead>(
        &mut self,
        lines: &mut LineReader<R>,
        boundaries: &[String],
        descriptor: &BodyDescriptor,
    ) -> Result<()> {
        let mut reader = BodyReader::new(lines, boundaries);
        let result = self.handler.body(descriptor, &mut reader);
        if let Some(failure) = reader.failure.take() {
            return Err(failure);
        }
        result?;
        // Skip whatever the handler did not read.
        let drained = io::copy(&mut reader, &mut io::sink());
        if let Some(failure) = reader.failure.take() {
            return Err(failure);
        }
        drained?;
        Ok(())
    }

    fn error<R: BufRead>(&self, lines: &LineReader<R>, message: impl Into<String>) -> Error {
        Error::Malformed(MimeParseError::at(message, lines.locator()))
    }
}

/// Content-Type and Content-Transfer-Encoding seen while scanning a header block.
#[derive(Default)]
struct HeaderScan {
    count: usize,
    content_type: Option<String>,
    transfer_encoding: Option<String>,
}

impl HeaderScan {
    fn observe(&mut self, field: &RawField) {
        if field.name().eq_ignore_ascii_case("content-type") && self.content_type.is_none() {
            self.content_type = Some(field.body());
        } else if field.name().eq_ignore_ascii_case("content-transfer-encoding")
            && self.transfer_encoding.is_none()
        {
            self.transfer_encoding = Some(field.body().to_lowercase());
        }
    }

    fn into_descriptor(self, default_type: &str) -> BodyDescriptor {
        let mut descriptor = BodyDescriptor {
            mime_type: default_type.to_string(),
            transfer_encoding: self.transfer_encoding,
            ..BodyDescriptor::default()
        };
        let content_type = match self.content_type.as_deref().and_then(parse_content_type) {
            Some(ct) => ct,
            None => return descriptor,
        };
        descriptor.charset = content_type.get_parameter("charset").map(str::to_string);
        if content_type.is_multipart() {
            match content_type.boundary() {
                Some(b) if is_valid_boundary(b) => {
                    descriptor.mime_type = content_type.mime_type();
                    descriptor.boundary = Some(b.to_string());
                }
                _ => {
                    debug!(content_type = %content_type.mime_type(), "multipart without usable boundary, treating as text/plain");
                    descriptor.mime_type = DEFAULT_TYPE.to_string();
                }
            }
        } else {
            descriptor.mime_type = content_type.mime_type();
        }
        descriptor
    }
}

/// How a body segment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentEnd {
    /// A delimiter line for `boundaries[index]` is next in the input (not yet consumed).
    Boundary { index: usize, closing: bool },
    Eof,
}

/// Match a line (without line ending) against the active boundaries, innermost first.
fn match_boundary(line: &[u8], boundaries: &[String]) -> Option<SegmentEnd> {
    if !line.starts_with(b"--") {
        return None;
    }
    let rest = &line[2..];
    for (index, boundary) in boundaries.iter().enumerate().rev() {
        let b = boundary.as_bytes();
        if !rest.starts_with(b) {
            continue;
        }
        let after = &rest[b.len()..];
        let (closing, padding) = match after.strip_prefix(b"--") {
            Some(p) => (true, p),
            None => (false, after),
        };
        if padding.iter().copied().all(is_lwsp) {
            return Some(SegmentEnd::Boundary { index, closing });
        }
    }
    None
}

fn read_segment<R: BufRead>(
    lines: &mut LineReader<R>,
    boundaries: &[String],
) -> Result<(Vec<u8>, usize, SegmentEnd)> {
    let mut reader = BodyReader::new(lines, boundaries);
    let mut data = Vec::new();
    let read = reader.read_to_end(&mut data);
    if let Some(failure) = reader.failure.take() {
        return Err(failure);
    }
    read?;
    let end = reader.end.unwrap_or(SegmentEnd::Eof);
    Ok((data, reader.lines_read, end))
}

/// After a child entity: the next line is a boundary, or the input is exhausted.
fn peek_end<R: BufRead>(lines: &mut LineReader<R>, boundaries: &[String]) -> Result<SegmentEnd> {
    match lines.next_line()? {
        None => Ok(SegmentEnd::Eof),
        Some(line) => {
            let end = match_boundary(trim_line_ending(&line), boundaries);
            lines.push_back(line);
            match end {
                Some(end) => Ok(end),
                None => Err(Error::Malformed(MimeParseError::at(
                    "expected boundary after body part",
                    lines.locator(),
                ))),
            }
        }
    }
}

/// Line source with one line of push-back and position tracking.
struct LineReader<R> {
    input: R,
    pushed_back: Option<Vec<u8>>,
    max_line_length: Option<usize>,
    locator: MimeLocator,
    line_start: MimeLocator,
    /// Bytes of the current line already returned by `next_piece`.
    partial: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(input: R, max_line_length: Option<usize>) -> Self {
        let start = MimeLocator {
            offset: 0,
            line: 1,
            column: 1,
        };
        Self {
            input,
            pushed_back: None,
            max_line_length,
            locator: start.clone(),
            line_start: start,
            partial: 0,
        }
    }

    fn locator(&self) -> MimeLocator {
        self.line_start.clone()
    }

    /// Next line including its line ending, `None` at end of input.
    fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(line) = self.pushed_back.take() {
            self.advance(line.len());
            return Ok(Some(line));
        }
        let mut line = Vec::new();
        match self.max_line_length {
            Some(max) => {
                (&mut self.input).take(max as u64 + 2).read_until(b'\n', &mut line)?;
                if trim_line_ending(&line).len() > max {
                    return Err(Error::Malformed(MimeParseError::at(
                        format!("line longer than {} bytes", max),
                        self.locator.clone(),
                    )));
                }
            }
            None => {
                self.input.read_until(b'\n', &mut line)?;
            }
        }
        if line.is_empty() {
            self.line_start = self.locator.clone();
            return Ok(None);
        }
        self.advance(line.len());
        Ok(Some(line))
    }

    /// Up to `limit` bytes of the current line. The flag is true when the piece finishes the
    /// line, either at its line ending or at end of input.
    fn next_piece(&mut self, limit: usize) -> Result<Option<(Vec<u8>, bool)>> {
        if let Some(line) = self.pushed_back.take() {
            self.advance(line.len());
            return Ok(Some((line, true)));
        }
        let mut piece = Vec::new();
        (&mut self.input).take(limit as u64).read_until(b'\n', &mut piece)?;
        if piece.is_empty() {
            self.partial = 0;
            self.line_start = self.locator.clone();
            return Ok(None);
        }
        let complete = piece.ends_with(b"\n") || piece.len() < limit;
        if let Some(max) = self.max_line_length {
            let content = if complete {
                trim_line_ending(&piece).len()
            } else {
                piece.len() - usize::from(piece.ends_with(b"\r"))
            };
            if self.partial + content > max {
                return Err(Error::Malformed(MimeParseError::at(
                    format!("line longer than {} bytes", max),
                    self.line_start.clone(),
                )));
            }
        }
        if self.partial == 0 {
            self.line_start = self.locator.clone();
        }
        self.locator.offset += piece.len() as u64;
        if complete {
            self.locator.line += 1;
            self.partial = 0;
        } else {
            self.partial += piece.len();
        }
        Ok(Some((piece, complete)))
    }

    fn advance(&mut self, len: usize) {
        self.line_start = self.locator.clone();
        self.locator.offset += len as u64;
        self.locator.line += 1;
    }

    fn push_back(&mut self, line: Vec<u8>) {
        self.locator = self.line_start.clone();
        self.pushed_back = Some(line);
    }
}

/// Streams body bytes up to (not including) the line ending before the next boundary line.
/// Long lines pass through in pieces of at most `BODY_CHUNK` bytes.
struct BodyReader<'a, R> {
    lines: &'a mut LineReader<R>,
    boundaries: &'a [String],
    /// Line ending of the previous line, emitted only once the next line proves not to be a
    /// boundary; or, inside a long line, a CR that may start the line ending.
    held: Vec<u8>,
    buf: Vec<u8>,
    pos: usize,
    at_line_start: bool,
    end: Option<SegmentEnd>,
    lines_read: usize,
    failure: Option<Error>,
}

impl<'a, R: BufRead> BodyReader<'a, R> {
    fn new(lines: &'a mut LineReader<R>, boundaries: &'a [String]) -> Self {
        Self {
            lines,
            boundaries,
            held: Vec::new(),
            buf: Vec::new(),
            pos: 0,
            at_line_start: true,
            end: None,
            lines_read: 0,
            failure: None,
        }
    }

    fn fill(&mut self) -> Result<()> {
        self.pos = 0;
        self.buf.clear();
        let (mut piece, complete) = match self.lines.next_piece(BODY_CHUNK)? {
            Some(piece) => piece,
            None => {
                // No boundary follows, so whatever was held belongs to the body.
                self.buf.append(&mut self.held);
                self.end = Some(SegmentEnd::Eof);
                return Ok(());
            }
        };
        if self.at_line_start {
            // A line that does not fit in one piece is never a delimiter.
            if complete {
                let content_len = trim_line_ending(&piece).len();
                if let Some(end) = match_boundary(&piece[..content_len], self.boundaries) {
                    self.held.clear();
                    self.lines.push_back(piece);
                    self.end = Some(end);
                    return Ok(());
                }
            }
            self.lines_read += 1;
            self.buf.append(&mut self.held);
        } else if !self.held.is_empty() {
            let mut joined = mem::take(&mut self.held);
            joined.extend_from_slice(&piece);
            piece = joined;
        }
        if complete {
            let content_len = trim_line_ending(&piece).len();
            self.buf.extend_from_slice(&piece[..content_len]);
            self.held.extend_from_slice(&piece[content_len..]);
        } else {
            if piece.ends_with(b"\r") {
                piece.pop();
                self.held.push(b'\r');
            }
            self.buf.extend_from_slice(&piece);
        }
        self.at_line_start = complete;
        Ok(())
    }
}

impl<R: BufRead> Read for BodyReader<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.buf.len() {
                let n = (self.buf.len() - self.pos).min(out.len());
                out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.end.is_some() || out.is_empty() {
                return Ok(0);
            }
            if let Err(e) = self.fill() {
                let message = e.to_string();
                self.failure = Some(e);
                return Err(io::Error::new(io::ErrorKind::Other, message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Records events as strings, reading bodies in full.
    #[derive(Default)]
    struct RecordingHandler {
        events: Vec<String>,
    }

    impl MimeHandler for RecordingHandler {
        fn start_message(&mut self) -> Result<()> {
            self.events.push("start_message".into());
            Ok(())
        }
        fn end_message(&mut self) -> Result<()> {
            self.events.push("end_message".into());
            Ok(())
        }
        fn start_header(&mut self) -> Result<()> {
            self.events.push("start_header".into());
            Ok(())
        }
        fn field(&mut self, field: &RawField) -> Result<()> {
            self.events.push(format!("field {}", field.raw()));
            Ok(())
        }
        fn end_header(&mut self) -> Result<()> {
            self.events.push("end_header".into());
            Ok(())
        }
        fn start_multipart(&mut self, descriptor: &BodyDescriptor) -> Result<()> {
            self.events.push(format!(
                "start_multipart {} {}",
                descriptor.mime_type,
                descriptor.boundary.as_deref().unwrap_or("")
            ));
            Ok(())
        }
        fn preamble(&mut self, data: &[u8]) -> Result<()> {
            self.events.push(format!("preamble {:?}", String::from_utf8_lossy(data)));
            Ok(())
        }
        fn start_body_part(&mut self) -> Result<()> {
            self.events.push("start_body_part".into());
            Ok(())
        }
        fn end_body_part(&mut self) -> Result<()> {
            self.events.push("end_body_part".into());
            Ok(())
        }
        fn epilogue(&mut self, data: &[u8]) -> Result<()> {
            self.events.push(format!("epilogue {:?}", String::from_utf8_lossy(data)));
            Ok(())
        }
        fn end_multipart(&mut self) -> Result<()> {
            self.events.push("end_multipart".into());
            Ok(())
        }
        fn body(&mut self, descriptor: &BodyDescriptor, raw: &mut dyn Read) -> Result<()> {
            let mut data = Vec::new();
            raw.read_to_end(&mut data)?;
            self.events.push(format!(
                "body {} {:?}",
                descriptor.mime_type,
                String::from_utf8_lossy(&data)
            ));
            Ok(())
        }
    }

    fn events(input: &[u8]) -> Vec<String> {
        let mut parser = MimeParser::new(RecordingHandler::default());
        parser.parse(input).unwrap();
        parser.into_inner().events
    }

    #[test]
    fn plain_text_message() {
        let msg = b"MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\nHello, world.\r\n";
        assert_eq!(
            events(msg),
            vec![
                "start_message",
                "start_header",
                "field MIME-Version: 1.0",
                "field Content-Type: text/plain; charset=utf-8",
                "end_header",
                "body text/plain \"Hello, world.\\r\\n\"",
                "end_message",
            ]
        );
    }

    #[test]
    fn multipart_single_part() {
        let msg = b"Content-Type: multipart/mixed; boundary=sep\r\n\r\n--sep\r\nContent-Type: text/plain\r\n\r\nPart one.\r\n--sep--\r\n";
        assert_eq!(
            events(msg),
            vec![
                "start_message",
                "start_header",
                "field Content-Type: multipart/mixed; boundary=sep",
                "end_header",
                "start_multipart multipart/mixed sep",
                "start_body_part",
                "start_header",
                "field Content-Type: text/plain",
                "end_header",
                "body text/plain \"Part one.\"",
                "end_body_part",
                "epilogue \"\"",
                "end_multipart",
                "end_message",
            ]
        );
    }

    #[test]
    fn folded_field_keeps_raw_text() {
        let msg = b"Subject: first\r\n second\r\n\tthird\r\nTo: a@b\r\n\r\n";
        let ev = events(msg);
        assert_eq!(ev[2], "field Subject: first\r\n second\r\n\tthird");
        assert_eq!(ev[3], "field To: a@b");
        assert_eq!(ev[5], "body text/plain \"\"");
    }

    #[test]
    fn nested_message_and_digest_default() {
        let msg = b"Content-Type: multipart/digest; boundary=d\r\n\r\n--d\r\n\r\nSubject: inner\r\n\r\ninner body\r\n--d--";
        let ev = events(msg);
        assert_eq!(
            ev[5..],
            [
                "start_body_part",
                "start_header",
                "end_header",
                "start_message",
                "start_header",
                "field Subject: inner",
                "end_header",
                "body text/plain \"inner body\"",
                "end_message",
                "end_body_part",
                "end_multipart",
                "end_message",
            ]
        );
    }

    #[test]
    fn base64_message_rfc822_is_a_leaf() {
        let msg = b"Content-Type: message/rfc822\r\nContent-Transfer-Encoding: base64\r\n\r\nU3ViamVjdDogeA==\r\n";
        let ev = events(msg);
        assert_eq!(ev[5], "body message/rfc822 \"U3ViamVjdDogeA==\\r\\n\"");
    }

    #[test]
    fn multipart_without_boundary_is_text() {
        let msg = b"Content-Type: multipart/mixed\r\n\r\n--x\r\nbody";
        let ev = events(msg);
        assert_eq!(ev[4], "body text/plain \"--x\\r\\nbody\"");
    }

    #[test]
    fn outer_boundary_terminates_truncated_inner_multipart() {
        let msg = b"Content-Type: multipart/mixed; boundary=outer\r\n\r\n\
--outer\r\nContent-Type: multipart/alternative; boundary=inner\r\n\r\n\
--inner\r\n\r\none\r\n--outer\r\n\r\ntwo\r\n--outer--\r\n";
        let ev = events(msg);
        let joined = ev.join("|");
        assert!(joined.contains("body text/plain \"one\"|end_body_part|end_multipart|end_body_part|start_body_part"));
        assert!(joined.ends_with("body text/plain \"two\"|end_body_part|epilogue \"\"|end_multipart|end_message"));
    }

    #[test]
    fn strict_mode_rejects_missing_close_delimiter() {
        let msg = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\ntext\r\n";
        let config = ParserConfig {
            strict: true,
            ..ParserConfig::default()
        };
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config);
        let err = parser.parse(&msg[..]).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("missing close delimiter"));

        // Lenient mode accepts the same input.
        let ev = events(msg);
        assert_eq!(ev[ev.len() - 2], "end_multipart");
    }

    #[test]
    fn invalid_field_skipped_unless_strict() {
        let msg = b"Bad Field: x\r\nGood: y\r\n\r\n";
        let ev = events(msg);
        assert_eq!(ev[2], "field Good: y");

        let config = ParserConfig {
            strict: true,
            ..ParserConfig::default()
        };
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config);
        assert!(parser.parse(&msg[..]).unwrap_err().is_malformed());
    }

    #[test]
    fn limits_are_enforced_when_configured() {
        let config = ParserConfig {
            max_line_length: Some(10),
            ..ParserConfig::default()
        };
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config);
        let err = parser.parse(&b"Subject: far too long\r\n\r\n"[..]).unwrap_err();
        assert!(err.to_string().contains("line longer than 10 bytes"));

        let config = ParserConfig {
            max_header_count: Some(1),
            ..ParserConfig::default()
        };
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config);
        assert!(parser.parse(&b"A: 1\r\nB: 2\r\n\r\n"[..]).is_err());
    }

    #[test]
    fn depth_limit() {
        let config = ParserConfig {
            max_depth: Some(1),
            ..ParserConfig::default()
        };
        let msg = b"Content-Type: message/rfc822\r\n\r\nContent-Type: message/rfc822\r\n\r\nSubject: deep\r\n\r\nx";
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config);
        let err = parser.parse(&msg[..]).unwrap_err();
        assert!(err.to_string().contains("nesting depth"));
    }

    /// Counts bytes pulled from the underlying input.
    struct CountingReader<R> {
        inner: R,
        consumed: Rc<Cell<usize>>,
    }

    impl<R: Read> Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.consumed.set(self.consumed.get() + n);
            Ok(n)
        }
    }

    /// Notes how much input had been consumed when the body's first byte arrived.
    struct FirstByte {
        consumed: Rc<Cell<usize>>,
        consumed_at_first_byte: Option<usize>,
        body: Vec<u8>,
    }

    impl MimeHandler for FirstByte {
        fn body(&mut self, _d: &BodyDescriptor, raw: &mut dyn Read) -> Result<()> {
            let mut first = [0u8; 1];
            raw.read_exact(&mut first)?;
            self.consumed_at_first_byte = Some(self.consumed.get());
            self.body.push(first[0]);
            raw.read_to_end(&mut self.body)?;
            Ok(())
        }
    }

    #[test]
    fn single_line_body_streams_before_input_is_consumed() {
        const SIZE: usize = 4 * 1024 * 1024;
        let mut msg = b"Content-Type: application/octet-stream\r\nContent-Transfer-Encoding: binary\r\n\r\n".to_vec();
        msg.extend(std::iter::repeat(b'z').take(SIZE));
        let consumed = Rc::new(Cell::new(0));
        let input = CountingReader {
            inner: &msg[..],
            consumed: Rc::clone(&consumed),
        };
        let handler = FirstByte {
            consumed: Rc::clone(&consumed),
            consumed_at_first_byte: None,
            body: Vec::new(),
        };
        let mut parser = MimeParser::new(handler);
        parser.parse(input).unwrap();
        let handler = parser.into_inner();
        assert!(handler.consumed_at_first_byte.unwrap() < 64 * 1024);
        assert_eq!(handler.body.len(), SIZE);
        assert_eq!(consumed.get(), msg.len());
    }

    #[test]
    fn long_lines_keep_line_endings_and_boundaries() {
        let long = "y".repeat(BODY_CHUNK * 2 + 1);
        // The CRLF after the long line straddles a piece boundary when the line is BODY_CHUNK - 1 bytes.
        let straddle = "w".repeat(BODY_CHUNK - 1);
        let msg = format!(
            "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\n{}\r\nshort\r\n--b\r\n\r\n{}\r\n--b--\r\n",
            long, straddle
        );
        let ev = events(msg.as_bytes());
        assert_eq!(ev[8], format!("body text/plain {:?}", format!("{}\r\nshort", long)));
        assert_eq!(ev[13], format!("body text/plain {:?}", straddle));
    }

    #[test]
    fn long_lines_respect_max_line_length() {
        let config = ParserConfig {
            max_line_length: Some(BODY_CHUNK + 10),
            ..ParserConfig::default()
        };
        let msg = format!("Subject: x\r\n\r\n{}\r\n", "q".repeat(BODY_CHUNK + 11));
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config.clone());
        assert!(parser.parse(msg.as_bytes()).unwrap_err().is_malformed());

        let msg = format!("Subject: x\r\n\r\n{}\r\n", "q".repeat(BODY_CHUNK + 10));
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config);
        parser.parse(msg.as_bytes()).unwrap();
    }

    #[test]
    fn non_utf8_header_is_replaced_unless_strict() {
        let msg = b"Subject: caf\xe9\r\n\r\nbody";
        let ev = events(msg);
        assert_eq!(ev[2], "field Subject: caf\u{fffd}");

        let utf8 = "Subject: café\r\n\r\nbody";
        assert_eq!(events(utf8.as_bytes())[2], "field Subject: café");

        let config = ParserConfig {
            strict: true,
            ..ParserConfig::default()
        };
        let mut parser = MimeParser::with_config(RecordingHandler::default(), config);
        let err = parser.parse(&msg[..]).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn handler_may_leave_body_unread() {
        struct Skipping(usize);
        impl MimeHandler for Skipping {
            fn body(&mut self, _d: &BodyDescriptor, _raw: &mut dyn Read) -> Result<()> {
                self.0 += 1;
                Ok(())
            }
        }
        let msg = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\none\r\n--b\r\n\r\ntwo\r\n--b--\r\n";
        let mut parser = MimeParser::new(Skipping(0));
        parser.parse(&msg[..]).unwrap();
        assert_eq!(parser.into_inner().0, 2);
    }
}
