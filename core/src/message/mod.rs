/*
 * mod.rs
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

//! The immutable message tree, its builders, and where leaf bodies are stored.

mod body;
mod builder;
mod header;
mod parser;
mod storage;
mod tree_builder;

pub use body::{Body, ContentBody, FileBackedContentBody, InMemoryContentBody, Message, Multipart, Part};
pub use builder::{
    BodyBuilder, ContentBodyBuilder, MessageBuilder, MessageBuilderFactory, MultipartBuilder,
    PartBuilder,
};
pub use header::{Header, HeaderBuilder, HeaderField};
pub use parser::{parse_message, MessageParser};
pub use storage::{
    AdaptiveBuilderFactory, AdaptiveContentBodyBuilder, FileBackedBuilderFactory,
    FileBackedContentBodyBuilder, FileFactory, InMemoryBuilderFactory, InMemoryContentBodyBuilder,
    TempDirFileFactory, DEFAULT_IN_MEMORY_THRESHOLD,
};
pub use tree_builder::TreeBuilder;
