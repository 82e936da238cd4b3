/*
 * storage.rs
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

//! Where leaf bodies live: in memory, in a temporary file, or in memory until they grow past a
//! threshold. All three produce a [`ContentBody`] with the same read contract.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::debug;

use super::body::{ContentBody, FileBackedContentBody, InMemoryContentBody};
use super::builder::{ContentBodyBuilder, MessageBuilderFactory};
use crate::error::{Error, Result};

/// Bodies larger than this spill to a file under the adaptive strategy (100 KiB).
pub const DEFAULT_IN_MEMORY_THRESHOLD: usize = 100 * 1024;

/// Source of fresh, empty, uniquely named writable files. Owns their deletion.
pub trait FileFactory: fmt::Debug + Send + Sync {
    fn create_file(&self) -> io::Result<PathBuf>;
}

/// Creates files in a private temporary directory that is removed, with its files, on drop.
/// File-backed bodies built through a builder factory hold a reference to it, so the directory
/// goes away with the last of them.
#[derive(Debug)]
pub struct TempDirFileFactory {
    dir: TempDir,
}

impl TempDirFileFactory {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("mimetree-").tempdir()?,
        })
    }

    /// Place the temporary directory under `parent`.
    pub fn new_in(parent: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("mimetree-").tempdir_in(parent)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl FileFactory for TempDirFileFactory {
    fn create_file(&self) -> io::Result<PathBuf> {
        let file = tempfile::Builder::new().prefix("body-").tempfile_in(self.dir.path())?;
        file.into_temp_path().keep().map_err(|e| e.error)
    }
}

/// Write `prefix` then the rest of `source` to `path`; the file is closed on return.
fn write_file(path: &Path, prefix: &[u8], source: &mut dyn Read) -> io::Result<u64> {
    let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    let mut sink = BufWriter::new(file);
    sink.write_all(prefix)?;
    let copied = io::copy(source, &mut sink)?;
    sink.flush()?;
    Ok(prefix.len() as u64 + copied)
}

fn raw_called_twice() -> Error {
    debug!("content body builder received raw bytes twice");
    Error::invalid_state("raw() called more than once")
}

fn raw_missing() -> Error {
    Error::invalid_state("raw() must be called before build()")
}

/// Keeps the whole body in memory.
#[derive(Debug, Default)]
pub struct InMemoryContentBodyBuilder {
    raw_called: bool,
    data: Option<Vec<u8>>,
}

impl InMemoryContentBodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentBodyBuilder for InMemoryContentBodyBuilder {
    fn raw(&mut self, source: &mut dyn Read) -> Result<()> {
        if self.raw_called {
            return Err(raw_called_twice());
        }
        self.raw_called = true;
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        self.data = Some(data);
        Ok(())
    }

    fn build(self: Box<Self>) -> Result<ContentBody> {
        let data = self.data.ok_or_else(raw_missing)?;
        Ok(ContentBody::InMemory(InMemoryContentBody::new(data)))
    }
}

/// Writes every body to a new file from the file factory.
#[derive(Debug)]
pub struct FileBackedContentBodyBuilder {
    file_factory: Arc<dyn FileFactory>,
    raw_called: bool,
    body: Option<FileBackedContentBody>,
}

impl FileBackedContentBodyBuilder {
    pub fn new(file_factory: Arc<dyn FileFactory>) -> Self {
        Self {
            file_factory,
            raw_called: false,
            body: None,
        }
    }
}

impl ContentBodyBuilder for FileBackedContentBodyBuilder {
    fn raw(&mut self, source: &mut dyn Read) -> Result<()> {
        if self.raw_called {
            return Err(raw_called_twice());
        }
        self.raw_called = true;
        let path = self.file_factory.create_file()?;
        let length = write_file(&path, &[], source)?;
        let body =
            FileBackedContentBody::new(path, length).with_owner(Arc::clone(&self.file_factory));
        self.body = Some(body);
        Ok(())
    }

    fn build(self: Box<Self>) -> Result<ContentBody> {
        let body = self.body.ok_or_else(raw_missing)?;
        Ok(ContentBody::FileBacked(body))
    }
}

/// Buffers up to `threshold` bytes; a body that turns out larger goes to a file instead,
/// the buffered prefix first.
#[derive(Debug)]
pub struct AdaptiveContentBodyBuilder {
    file_factory: Arc<dyn FileFactory>,
    threshold: usize,
    raw_called: bool,
    body: Option<ContentBody>,
}

impl AdaptiveContentBodyBuilder {
    pub fn new(file_factory: Arc<dyn FileFactory>, threshold: usize) -> Self {
        Self {
            file_factory,
            threshold,
            raw_called: false,
            body: None,
        }
    }
}

impl ContentBodyBuilder for AdaptiveContentBodyBuilder {
    fn raw(&mut self, source: &mut dyn Read) -> Result<()> {
        if self.raw_called {
            return Err(raw_called_twice());
        }
        self.raw_called = true;

        // One byte past the threshold tells whether the body crosses it.
        let mut buffer = Vec::new();
        let limit = u64::try_from(self.threshold).unwrap_or(u64::MAX).saturating_add(1);
        (&mut *source).take(limit).read_to_end(&mut buffer)?;
        if buffer.len() <= self.threshold {
            self.body = Some(ContentBody::InMemory(InMemoryContentBody::new(buffer)));
            return Ok(());
        }

        let path = self.file_factory.create_file()?;
        let length = write_file(&path, &buffer, source)?;
        debug!(path = %path.display(), length, threshold = self.threshold, "spilled body to file");
        let body =
            FileBackedContentBody::new(path, length).with_owner(Arc::clone(&self.file_factory));
        self.body = Some(ContentBody::FileBacked(body));
        Ok(())
    }

    fn build(self: Box<Self>) -> Result<ContentBody> {
        self.body.ok_or_else(raw_missing)
    }
}

/// All bodies in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryBuilderFactory;

impl MessageBuilderFactory for InMemoryBuilderFactory {
    fn create_content_body_builder(&self) -> Box<dyn ContentBodyBuilder> {
        Box::new(InMemoryContentBodyBuilder::new())
    }
}

/// Small bodies in memory, large ones in files.
#[derive(Debug, Clone)]
pub struct AdaptiveBuilderFactory {
    file_factory: Arc<dyn FileFactory>,
    threshold: usize,
}

impl AdaptiveBuilderFactory {
    pub fn new(file_factory: Arc<dyn FileFactory>) -> Self {
        Self {
            file_factory,
            threshold: DEFAULT_IN_MEMORY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl MessageBuilderFactory for AdaptiveBuilderFactory {
    fn create_content_body_builder(&self) -> Box<dyn ContentBodyBuilder> {
        Box::new(AdaptiveContentBodyBuilder::new(
            Arc::clone(&self.file_factory),
            self.threshold,
        ))
    }
}

/// All bodies in files.
#[derive(Debug, Clone)]
pub struct FileBackedBuilderFactory {
    file_factory: Arc<dyn FileFactory>,
}

impl FileBackedBuilderFactory {
    pub fn new(file_factory: Arc<dyn FileFactory>) -> Self {
        Self { file_factory }
    }
}

impl MessageBuilderFactory for FileBackedBuilderFactory {
    fn create_content_body_builder(&self) -> Box<dyn ContentBodyBuilder> {
        Box::new(FileBackedContentBodyBuilder::new(Arc::clone(&self.file_factory)))
    }
}
