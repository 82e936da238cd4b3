/*
 * tree_builder.rs
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

//! Stack machine that turns the tokenizer's event stream into a message tree.

use std::io::Read;

use bytes::Bytes;
use tracing::{debug, trace};

use super::body::Message;
use super::builder::{BodyBuilder, MessageBuilder, MessageBuilderFactory, MultipartBuilder, PartBuilder};
use super::header::HeaderBuilder;
use crate::error::{Error, Result};
use crate::mime::{BodyDescriptor, MimeHandler, RawField};

/// A builder in progress.
#[derive(Debug)]
enum Frame {
    Message(MessageBuilder),
    Header(HeaderBuilder),
    Multipart(MultipartBuilder),
    BodyPart(PartBuilder),
}

impl Frame {
    fn kind(&self) -> &'static str {
        match self {
            Frame::Message(_) => "message",
            Frame::Header(_) => "header",
            Frame::Multipart(_) => "multipart",
            Frame::BodyPart(_) => "body part",
        }
    }
}

/// [`MimeHandler`] that assembles parse events into a [`Message`].
///
/// Events must be properly nested. Anything else (an end without its start, a field outside a
/// header, events after the root message ended) fails with [`Error::Malformed`].
pub struct TreeBuilder<'f> {
    factory: &'f dyn MessageBuilderFactory,
    stack: Vec<Frame>,
    root: Option<MessageBuilder>,
}

impl<'f> TreeBuilder<'f> {
    pub fn new(factory: &'f dyn MessageBuilderFactory) -> Self {
        Self {
            factory,
            stack: Vec::new(),
            root: None,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Build the tree once the root message has ended.
    pub fn finish(self) -> Result<Message> {
        if let Some(top) = self.stack.last() {
            return Err(Error::malformed(format!(
                "input ended inside {} ({} unclosed)",
                top.kind(),
                self.stack.len()
            )));
        }
        let root = self.root.ok_or_else(|| Error::malformed("no message in input"))?;
        root.build()
    }

    fn pop(&mut self, expected: &str) -> Result<Frame> {
        self.stack
            .pop()
            .ok_or_else(|| Error::malformed(format!("end of {} without start", expected)))
    }

    fn unexpected(event: &str, top: Option<&Frame>) -> Error {
        let state = top.map(Frame::kind).unwrap_or("empty stack");
        debug!(event, state, "event out of sequence");
        Error::malformed(format!("unexpected {} in {}", event, state))
    }

    /// Attach a body to the part builder on top of the stack.
    fn attach_body(&mut self, body: BodyBuilder) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Message(message)) => message.set_body(body),
            Some(Frame::BodyPart(part)) => part.set_body(body),
            top => Err(Self::unexpected("body", top.map(|f| &*f))),
        }
    }

    fn top_multipart(&mut self, event: &str) -> Result<&mut MultipartBuilder> {
        match self.stack.last_mut() {
            Some(Frame::Multipart(multipart)) => Ok(multipart),
            top => Err(Self::unexpected(event, top.map(|f| &*f))),
        }
    }

    fn expect_part_on_top(&self, event: &str) -> Result<()> {
        match self.stack.last() {
            Some(Frame::Message(_)) | Some(Frame::BodyPart(_)) => Ok(()),
            top => Err(Self::unexpected(event, top)),
        }
    }
}

impl MimeHandler for TreeBuilder<'_> {
    fn start_message(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            if self.root.is_some() {
                return Err(Self::unexpected("message start after end of root message", None));
            }
        } else {
            self.expect_part_on_top("nested message")?;
        }
        trace!(depth = self.stack.len(), "start message");
        self.stack.push(Frame::Message(self.factory.create_message_builder()));
        Ok(())
    }

    fn end_message(&mut self) -> Result<()> {
        let message = match self.pop("message")? {
            Frame::Message(message) => message,
            other => return Err(Self::unexpected("end of message", Some(&other))),
        };
        if self.stack.is_empty() {
            self.root = Some(message);
            Ok(())
        } else {
            self.attach_body(BodyBuilder::Message(Box::new(message)))
        }
    }

    fn start_header(&mut self) -> Result<()> {
        self.expect_part_on_top("header")?;
        self.stack.push(Frame::Header(self.factory.create_header_builder()));
        Ok(())
    }

    fn field(&mut self, field: &RawField) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Header(header)) => header.add_raw(field.name(), field.raw()),
            top => Err(Self::unexpected("header field", top.map(|f| &*f))),
        }
    }

    fn end_header(&mut self) -> Result<()> {
        let header = match self.pop("header")? {
            Frame::Header(header) => header,
            other => return Err(Self::unexpected("end of header", Some(&other))),
        };
        match self.stack.last_mut() {
            Some(Frame::Message(message)) => message.set_header(header),
            Some(Frame::BodyPart(part)) => part.set_header(header),
            top => Err(Self::unexpected("end of header", top.map(|f| &*f))),
        }
    }

    fn start_multipart(&mut self, descriptor: &BodyDescriptor) -> Result<()> {
        self.expect_part_on_top("multipart")?;
        let mut multipart = self.factory.create_multipart_builder();
        if let Some(boundary) = &descriptor.boundary {
            multipart.set_boundary(boundary.clone());
        }
        trace!(depth = self.stack.len(), mime_type = %descriptor.mime_type, "start multipart");
        self.stack.push(Frame::Multipart(multipart));
        Ok(())
    }

    fn preamble(&mut self, data: &[u8]) -> Result<()> {
        self.top_multipart("preamble")?.set_preamble(Bytes::copy_from_slice(data))
    }

    fn start_body_part(&mut self) -> Result<()> {
        self.top_multipart("body part")?;
        self.stack.push(Frame::BodyPart(self.factory.create_part_builder()));
        Ok(())
    }

    fn end_body_part(&mut self) -> Result<()> {
        let part = match self.pop("body part")? {
            Frame::BodyPart(part) => part,
            other => return Err(Self::unexpected("end of body part", Some(&other))),
        };
        self.top_multipart("end of body part")?.add(part);
        Ok(())
    }

    fn epilogue(&mut self, data: &[u8]) -> Result<()> {
        self.top_multipart("epilogue")?.set_epilogue(Bytes::copy_from_slice(data))
    }

    fn end_multipart(&mut self) -> Result<()> {
        let multipart = match self.pop("multipart")? {
            Frame::Multipart(multipart) => multipart,
            other => return Err(Self::unexpected("end of multipart", Some(&other))),
        };
        self.attach_body(BodyBuilder::Multipart(multipart))
    }

    fn body(&mut self, descriptor: &BodyDescriptor, raw: &mut dyn Read) -> Result<()> {
        self.expect_part_on_top("body")?;
        let mut builder = self.factory.create_content_body_builder();
        builder.raw(raw)?;
        trace!(mime_type = %descriptor.mime_type, "body stored");
        self.attach_body(BodyBuilder::Content(builder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Body, InMemoryBuilderFactory};

    fn field(builder: &mut TreeBuilder<'_>, name: &str, value: &str) {
        builder
            .field(&RawField::new(name, format!("{}: {}", name, value)))
            .unwrap();
    }

    fn leaf(builder: &mut TreeBuilder<'_>, text: &str) {
        builder
            .body(&BodyDescriptor::default(), &mut text.as_bytes())
            .unwrap();
    }

    #[test]
    fn builds_multipart_from_events() {
        let factory = InMemoryBuilderFactory;
        let mut b = TreeBuilder::new(&factory);
        b.start_message().unwrap();
        b.start_header().unwrap();
        field(&mut b, "Content-Type", "multipart/mixed; boundary=x");
        b.end_header().unwrap();
        b.start_multipart(&BodyDescriptor {
            mime_type: "multipart/mixed".into(),
            boundary: Some("x".into()),
            ..BodyDescriptor::default()
        })
        .unwrap();
        b.preamble(b"pre").unwrap();
        for text in ["one", "two"] {
            b.start_body_part().unwrap();
            b.start_header().unwrap();
            b.end_header().unwrap();
            leaf(&mut b, text);
            b.end_body_part().unwrap();
        }
        b.end_multipart().unwrap();
        b.end_message().unwrap();
        assert_eq!(b.depth(), 0);

        let message = b.finish().unwrap();
        let multipart = message.body().and_then(Body::as_multipart).unwrap();
        assert_eq!(multipart.size(), 2);
        assert_eq!(multipart.preamble(), Some(&b"pre"[..]));
        assert_eq!(multipart.epilogue(), None);
        let second = multipart.children()[1].body().and_then(Body::as_content).unwrap();
        assert_eq!(second.length(), 3);
    }

    #[test]
    fn nested_message_becomes_message_body() {
        let factory = InMemoryBuilderFactory;
        let mut b = TreeBuilder::new(&factory);
        b.start_message().unwrap();
        b.start_header().unwrap();
        field(&mut b, "Content-Type", "message/rfc822");
        b.end_header().unwrap();
        b.start_message().unwrap();
        b.start_header().unwrap();
        field(&mut b, "Subject", "inner");
        b.end_header().unwrap();
        leaf(&mut b, "hi");
        b.end_message().unwrap();
        b.end_message().unwrap();

        let message = b.finish().unwrap();
        let inner = message.body().and_then(Body::as_message).unwrap();
        assert_eq!(inner.header().unwrap().value("subject").as_deref(), Some("inner"));
    }

    #[test]
    fn mismatched_end_is_malformed() {
        let factory = InMemoryBuilderFactory;
        let mut b = TreeBuilder::new(&factory);
        b.start_message().unwrap();
        b.start_header().unwrap();
        assert!(b.end_multipart().unwrap_err().is_malformed());
    }

    #[test]
    fn end_without_start_is_malformed() {
        let factory = InMemoryBuilderFactory;
        let mut b = TreeBuilder::new(&factory);
        assert!(b.end_message().unwrap_err().is_malformed());
    }

    #[test]
    fn field_outside_header_is_malformed() {
        let factory = InMemoryBuilderFactory;
        let mut b = TreeBuilder::new(&factory);
        b.start_message().unwrap();
        let err = b.field(&RawField::new("Subject", "Subject: x")).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn truncated_event_stream_fails_to_finish() {
        let factory = InMemoryBuilderFactory;
        let mut b = TreeBuilder::new(&factory);
        b.start_message().unwrap();
        b.start_header().unwrap();
        b.end_header().unwrap();
        assert!(b.finish().unwrap_err().is_malformed());

        let empty = TreeBuilder::new(&factory);
        assert!(empty.finish().unwrap_err().is_malformed());
    }

    #[test]
    fn second_root_message_is_malformed() {
        let factory = InMemoryBuilderFactory;
        let mut b = TreeBuilder::new(&factory);
        b.start_message().unwrap();
        b.end_message().unwrap();
        assert!(b.start_message().unwrap_err().is_malformed());
    }
}
