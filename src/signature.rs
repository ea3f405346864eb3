//! Content signatures and sibling identity.
//!
//! A [`Signature`] hashes the canonical, tag-like rendering of everything about a [`Node`] that
//! [`render`](`crate::render`) would apply to the external tree, in a fixed field order with all maps and sets sorted:
//!
//! ```text
//! <name key="value" … className="a b" id="x" style="key=\"value\" …" onclick={source}>text</name>
//! ```
//!
//! Children are not part of it, so changes to a sibling list never cause the parent to be re-applied.

use crate::{document::Document, node::Node};
use core::{
	fmt::{self, Write},
	hash::Hasher,
};
use rustc_hash::FxHasher;

/// Hash of a [`Node`]'s render-relevant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(u64);
impl Signature {
	#[must_use]
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

/// Identifies a [`Node`] among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	/// The node's explicit id.
	Id(String),
	/// The node has no id and is identified by content.
	/// Structurally identical siblings are indistinguishable.
	Signature(Signature),
}

impl<D: Document> Node<D> {
	#[must_use]
	pub fn signature(&self) -> Signature {
		let mut hasher = HashWriter(FxHasher::default());
		// Writing into a hasher can't fail.
		let _ = self.write_canonical(&mut hasher);
		Signature(hasher.0.finish())
	}

	/// The text that [`Node::signature`] hashes.
	#[must_use]
	pub fn canonical(&self) -> String {
		let mut canonical = String::new();
		let _ = self.write_canonical(&mut canonical);
		canonical
	}

	#[must_use]
	pub fn key(&self) -> Key {
		match &self.id {
			Some(id) => Key::Id(id.clone()),
			None => Key::Signature(self.signature()),
		}
	}

	fn write_canonical(&self, out: &mut impl Write) -> fmt::Result {
		write!(out, "<{}", self.name)?;
		for (name, value) in &self.attrs {
			write!(out, " {}=\"", name)?;
			write_escaped(out, value)?;
			out.write_char('"')?;
		}
		if !self.classes.is_empty() {
			out.write_str(" className=\"")?;
			for (i, class) in self.classes.iter().enumerate() {
				if i > 0 {
					out.write_char(' ')?;
				}
				write_escaped(out, class)?;
			}
			out.write_char('"')?;
		}
		if let Some(id) = &self.id {
			out.write_str(" id=\"")?;
			write_escaped(out, id)?;
			out.write_char('"')?;
		}
		if !self.styles.is_empty() {
			out.write_str(" style=\"")?;
			for (i, (property, value)) in self.styles.iter().enumerate() {
				if i > 0 {
					out.write_char(' ')?;
				}
				write_escaped(out, property)?;
				out.write_str("=\\\"")?;
				write_escaped(out, value)?;
				out.write_str("\\\"")?;
			}
			out.write_char('"')?;
		}
		for (name, handler) in &self.events {
			write!(out, " {}={{", name)?;
			write_escaped(out, handler.source())?;
			out.write_char('}')?;
		}
		out.write_char('>')?;
		if let Some(text) = &self.text {
			write_escaped(out, text)?;
		}
		write!(out, "</{}>", self.name)
	}
}

fn write_escaped(out: &mut impl Write, value: &str) -> fmt::Result {
	let mut rest = value;
	while let Some(i) = rest.find(|c: char| matches!(c, '"' | '\\' | '<' | '{' | '}')) {
		out.write_str(&rest[..i])?;
		out.write_char('\\')?;
		let special = rest[i..].chars().next().unwrap_or_default();
		out.write_char(special)?;
		rest = &rest[i + special.len_utf8()..];
	}
	out.write_str(rest)
}

struct HashWriter(FxHasher);
impl Write for HashWriter {
	fn write_str(&mut self, s: &str) -> fmt::Result {
		self.0.write(s.as_bytes());
		Ok(())
	}
}
