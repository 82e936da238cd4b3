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

//! Pull-model MIME and RFC 5322 tokenizer: a [`MimeParser`] reads a byte stream and reports
//! structural events to a [`MimeHandler`], handing each leaf body over as a reader.

mod content_type;
mod handler;
mod parameter;
mod parser;
mod quoted_printable;
mod transfer_encoding;
mod utils;

pub use content_type::{parse_content_type, parse_parameter_list, ContentType};
pub use handler::{BodyDescriptor, MimeHandler, MimeLocator, MimeParseError, RawField};
pub use parameter::Parameter;
pub use parser::MimeParser;
pub use quoted_printable::QuotedPrintableReader;
pub use transfer_encoding::TransferEncoding;
pub use utils::{is_boundary_char, is_token, is_token_char, is_valid_boundary};
