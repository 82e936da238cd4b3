/*
 * body.rs
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

//! Immutable message tree: parts, the three body kinds, and serialization back to bytes.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{Buf, Bytes};
use tracing::warn;

use super::header::Header;
use super::storage::FileFactory;

const CRLF: &[u8] = b"\r\n";
const DASH_DASH: &[u8] = b"--";

/// A body is exactly one of: leaf content, a multipart container, or a nested message.
#[derive(Debug, Clone)]
pub enum Body {
    Content(ContentBody),
    Multipart(Multipart),
    Message(Box<Message>),
}

impl Body {
    pub fn as_content(&self) -> Option<&ContentBody> {
        match self {
            Body::Content(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_multipart(&self) -> Option<&Multipart> {
        match self {
            Body::Multipart(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Body::Message(m) => Some(m),
            _ => None,
        }
    }
}

/// Leaf body holding raw (still transfer-encoded) bytes. Both storage kinds read the same way.
#[derive(Debug, Clone)]
pub enum ContentBody {
    InMemory(InMemoryContentBody),
    FileBacked(FileBackedContentBody),
}

impl ContentBody {
    pub fn length(&self) -> u64 {
        match self {
            ContentBody::InMemory(b) => b.length(),
            ContentBody::FileBacked(b) => b.length(),
        }
    }

    /// Fresh reader over the raw bytes; each call starts from the beginning.
    pub fn raw(&self) -> io::Result<Box<dyn Read + Send>> {
        match self {
            ContentBody::InMemory(b) => Ok(Box::new(b.raw())),
            ContentBody::FileBacked(b) => Ok(Box::new(b.raw()?)),
        }
    }

    /// Copy the raw bytes to `out`. Returns the number of bytes written.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<u64> {
        match self {
            ContentBody::InMemory(b) => b.write_to(out),
            ContentBody::FileBacked(b) => b.write_to(out),
        }
    }

    /// Backing file, for file-backed bodies.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ContentBody::InMemory(_) => None,
            ContentBody::FileBacked(b) => Some(b.path()),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, ContentBody::InMemory(_))
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryContentBody {
    data: Bytes,
}

impl InMemoryContentBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn length(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn raw(&self) -> impl Read + Send {
        self.data.clone().reader()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<u64> {
        out.write_all(&self.data)?;
        Ok(self.length())
    }
}

/// Body stored in a file. The file's deletion belongs to whoever created it; a body built by
/// the parser holds its file factory, so the file stays readable while any clone of the body lives.
#[derive(Debug, Clone)]
pub struct FileBackedContentBody {
    path: PathBuf,
    length: u64,
    owner: Option<Arc<dyn FileFactory>>,
}

impl FileBackedContentBody {
    pub fn new(path: PathBuf, length: u64) -> Self {
        Self {
            path,
            length,
            owner: None,
        }
    }

    /// Keep `owner` (the factory that created the file) alive for as long as this body.
    pub fn with_owner(mut self, owner: Arc<dyn FileFactory>) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw(&self) -> io::Result<impl Read + Send> {
        Ok(BufReader::new(File::open(&self.path)?))
    }

    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<u64> {
        let mut file = File::open(&self.path)?;
        io::copy(&mut file, out)
    }
}

/// Ordered child parts plus the bytes around the boundaries.
/// The boundary itself lives in the enclosing part's Content-Type.
#[derive(Debug, Clone, Default)]
pub struct Multipart {
    preamble: Option<Bytes>,
    epilogue: Option<Bytes>,
    children: Vec<Part>,
}

impl Multipart {
    pub(crate) fn new(preamble: Option<Bytes>, epilogue: Option<Bytes>, children: Vec<Part>) -> Self {
        Self {
            preamble,
            epilogue,
            children,
        }
    }

    pub fn preamble(&self) -> Option<&[u8]> {
        self.preamble.as_deref()
    }

    pub fn epilogue(&self) -> Option<&[u8]> {
        self.epilogue.as_deref()
    }

    pub fn size(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[Part] {
        &self.children
    }

    /// Serialize with `boundary`: preamble, one delimited section per child, close delimiter, epilogue.
    pub fn write_to(&self, boundary: &str, out: &mut dyn Write) -> io::Result<()> {
        if let Some(preamble) = &self.preamble {
            out.write_all(preamble)?;
            out.write_all(CRLF)?;
        }
        for child in &self.children {
            out.write_all(DASH_DASH)?;
            out.write_all(boundary.as_bytes())?;
            out.write_all(CRLF)?;
            child.write_to(out)?;
            out.write_all(CRLF)?;
        }
        out.write_all(DASH_DASH)?;
        out.write_all(boundary.as_bytes())?;
        out.write_all(DASH_DASH)?;
        if let Some(epilogue) = &self.epilogue {
            out.write_all(CRLF)?;
            out.write_all(epilogue)?;
        }
        Ok(())
    }
}

/// A MIME entity: header and body, either of which may be absent.
#[derive(Debug, Clone, Default)]
pub struct Part {
    header: Option<Header>,
    body: Option<Body>,
}

impl Part {
    pub(crate) fn new(header: Option<Header>, body: Option<Body>) -> Self {
        Self { header, body }
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Header block, blank line, body. Multipart bodies take their boundary from this part's Content-Type.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        if let Some(header) = &self.header {
            header.write_to(out)?;
        }
        out.write_all(CRLF)?;
        match &self.body {
            None => {}
            Some(Body::Content(content)) => {
                content.write_to(out)?;
            }
            Some(Body::Multipart(multipart)) => {
                let boundary = self
                    .header
                    .as_ref()
                    .and_then(Header::content_type)
                    .and_then(|ct| ct.boundary().map(str::to_string))
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidInput, "multipart body without boundary")
                    })?;
                multipart.write_to(&boundary, out)?;
            }
            Some(Body::Message(message)) => message.write_to(out)?,
        }
        Ok(())
    }
}

/// A complete message: a part whose serialized length was computed when it was built.
#[derive(Debug, Clone, Default)]
pub struct Message {
    part: Part,
    length: i64,
}

impl Message {
    /// Wrap `part`, serializing it once to measure its length. A failure to serialize
    /// (e.g. a vanished body file) is reported as length `-1`.
    pub(crate) fn new(part: Part) -> Self {
        let mut counter = ByteCounter::default();
        let length = match part.write_to(&mut counter) {
            Ok(()) => counter.count as i64,
            Err(e) => {
                warn!(error = %e, "could not compute message length");
                -1
            }
        };
        Self { part, length }
    }

    pub fn header(&self) -> Option<&Header> {
        self.part.header()
    }

    pub fn body(&self) -> Option<&Body> {
        self.part.body()
    }

    pub fn as_part(&self) -> &Part {
        &self.part
    }

    /// Serialized size in bytes, or `-1` if it could not be determined.
    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        self.part.write_to(out)
    }
}

#[derive(Default)]
struct ByteCounter {
    count: u64,
}

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.count += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
