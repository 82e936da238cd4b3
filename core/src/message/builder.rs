/*
 * builder.rs
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

//! Builders: single-use accumulators that produce the immutable tree, and the factory that
//! supplies them. Each setter may be called once; a second call is an invalid-state error.

use std::fmt;
use std::io::Read;

use bytes::Bytes;
use tracing::trace;

use super::body::{Body, ContentBody, Message, Multipart, Part};
use super::header::HeaderBuilder;
use crate::error::{Error, Result};

/// Accumulates a leaf body's raw bytes. Implementations decide where the bytes are stored.
pub trait ContentBodyBuilder: fmt::Debug {
    /// Read `source` to its end as the body's raw bytes. May be called only once.
    fn raw(&mut self, source: &mut dyn Read) -> Result<()>;

    /// Produce the body. Fails if [`ContentBodyBuilder::raw`] was never called.
    fn build(self: Box<Self>) -> Result<ContentBody>;
}

/// Supplies the builders used while constructing a tree. Only the content body builder
/// differs between storage strategies; the structural builders have one implementation.
pub trait MessageBuilderFactory {
    fn create_message_builder(&self) -> MessageBuilder {
        MessageBuilder::new()
    }

    fn create_header_builder(&self) -> HeaderBuilder {
        HeaderBuilder::new()
    }

    fn create_part_builder(&self) -> PartBuilder {
        PartBuilder::new()
    }

    fn create_multipart_builder(&self) -> MultipartBuilder {
        MultipartBuilder::new()
    }

    fn create_content_body_builder(&self) -> Box<dyn ContentBodyBuilder>;
}

/// The builder for whichever kind of body a part has.
#[derive(Debug)]
pub enum BodyBuilder {
    Content(Box<dyn ContentBodyBuilder>),
    Multipart(MultipartBuilder),
    Message(Box<MessageBuilder>),
}

impl BodyBuilder {
    fn build(self) -> Result<Body> {
        Ok(match self {
            BodyBuilder::Content(builder) => Body::Content(builder.build()?),
            BodyBuilder::Multipart(builder) => Body::Multipart(builder.build()?),
            BodyBuilder::Message(builder) => Body::Message(Box::new(builder.build()?)),
        })
    }
}

#[derive(Debug, Default)]
pub struct PartBuilder {
    header: Option<HeaderBuilder>,
    body: Option<BodyBuilder>,
}

impl PartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&mut self, header: HeaderBuilder) -> Result<()> {
        if self.header.is_some() {
            return Err(Error::invalid_state("header already set"));
        }
        self.header = Some(header);
        Ok(())
    }

    pub fn set_body(&mut self, body: BodyBuilder) -> Result<()> {
        if self.body.is_some() {
            return Err(Error::invalid_state("body already set"));
        }
        self.body = Some(body);
        Ok(())
    }

    pub fn build(self) -> Result<Part> {
        let header = self.header.map(HeaderBuilder::build);
        let body = self.body.map(BodyBuilder::build).transpose()?;
        Ok(Part::new(header, body))
    }
}

/// Builds a [`Message`]; the message length is computed here, once.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    part: PartBuilder,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&mut self, header: HeaderBuilder) -> Result<()> {
        self.part.set_header(header)
    }

    pub fn set_body(&mut self, body: BodyBuilder) -> Result<()> {
        self.part.set_body(body)
    }

    pub fn build(self) -> Result<Message> {
        Ok(Message::new(self.part.build()?))
    }
}

#[derive(Debug, Default)]
pub struct MultipartBuilder {
    children: Vec<PartBuilder>,
    preamble: Option<Bytes>,
    epilogue: Option<Bytes>,
    boundary: Option<String>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one child in document order.
    pub fn add(&mut self, child: PartBuilder) {
        self.children.push(child);
    }

    pub fn add_all(&mut self, children: impl IntoIterator<Item = PartBuilder>) {
        self.children.extend(children);
    }

    pub fn set_preamble(&mut self, preamble: impl Into<Bytes>) -> Result<()> {
        if self.preamble.is_some() {
            return Err(Error::invalid_state("preamble already set"));
        }
        self.preamble = Some(preamble.into());
        Ok(())
    }

    pub fn set_epilogue(&mut self, epilogue: impl Into<Bytes>) -> Result<()> {
        if self.epilogue.is_some() {
            return Err(Error::invalid_state("epilogue already set"));
        }
        self.epilogue = Some(epilogue.into());
        Ok(())
    }

    /// Record the delimiter. It is not carried into the built [`Multipart`].
    pub fn set_boundary(&mut self, boundary: impl Into<String>) {
        self.boundary = Some(boundary.into());
    }

    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Builds every child in order.
    pub fn build(self) -> Result<Multipart> {
        trace!(
            boundary = self.boundary.as_deref().unwrap_or(""),
            children = self.children.len(),
            "building multipart"
        );
        let children = self
            .children
            .into_iter()
            .map(PartBuilder::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Multipart::new(self.preamble, self.epilogue, children))
    }
}
