/*
 * lib.rs
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

//! Streaming MIME message parsing into an immutable part tree.
//!
//! [`mime::MimeParser`] tokenizes a raw RFC 5322 message into events; [`message::TreeBuilder`]
//! assembles them into a [`message::Message`] using the builders supplied by a
//! [`message::MessageBuilderFactory`]. The factory chooses where leaf bodies live: in memory,
//! in temporary files, or in memory up to a threshold.
//!
//! ```no_run
//! use mimetree_core::message::{AdaptiveBuilderFactory, MessageParser, TempDirFileFactory};
//! use std::sync::Arc;
//!
//! # fn main() -> mimetree_core::Result<()> {
//! let files = Arc::new(TempDirFileFactory::new()?);
//! let factory = AdaptiveBuilderFactory::new(files);
//! let input = std::fs::File::open("message.eml")?;
//! let message = MessageParser::new().parse(input, &factory)?;
//! println!("{} bytes", message.length());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod mime;

pub use config::{BuilderStrategy, ParserConfig};
pub use error::{Error, Result};
pub use message::{parse_message, Body, Message, MessageParser, Part};
