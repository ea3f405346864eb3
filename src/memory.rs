//! A headless [`Document`] that keeps its tree in memory.
//!
//! Every successful mutation is recorded as a [`Mutation`], which makes this backend useful for
//! rendering outside of a browser (see [`MemoryDocument::to_html`]) as well as for observing exactly what a pass changed.

use crate::{document::Document, node::Handler};
use core::fmt::{self, Debug, Formatter, Write};
use std::collections::BTreeMap;
use thiserror::Error;

/// Handle to a node in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Passed to handlers by [`MemoryDocument::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEvent {
	pub name: String,
	pub target: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
	#[error("unknown node {0:?}")]
	UnknownNode(NodeId),
	#[error("{child:?} is not a child of {parent:?}")]
	NotAChild { parent: NodeId, child: NodeId },
	#[error("{0:?} is not an element")]
	NotAnElement(NodeId),
	#[error("{0:?} is not a text node")]
	NotText(NodeId),
	#[error("inserting {child:?} into {parent:?} would create a cycle")]
	Cycle { parent: NodeId, child: NodeId },
}

/// A successful change to a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
	CreateElement { node: NodeId, name: String },
	CreateText { node: NodeId },
	InsertBefore { parent: NodeId, child: NodeId, reference: Option<NodeId> },
	RemoveChild { parent: NodeId, child: NodeId },
	SetAttribute { element: NodeId, name: String },
	SetId { element: NodeId },
	SetClassName { element: NodeId },
	SetStyle { element: NodeId, property: String },
	SetEventHandler { element: NodeId, name: String },
	SetTextContent { text: NodeId },
}
impl Mutation {
	/// Whether this mutation changes which nodes exist or where they are, as opposed to their content.
	#[must_use]
	pub fn is_structural(&self) -> bool {
		matches!(
			self,
			Self::CreateElement { .. } | Self::CreateText { .. } | Self::InsertBefore { .. } | Self::RemoveChild { .. }
		)
	}
}

enum Data {
	Element {
		name: String,
		id: Option<String>,
		attributes: BTreeMap<String, String>,
		class_name: Option<String>,
		styles: BTreeMap<String, String>,
		handlers: BTreeMap<String, Handler<MemoryEvent>>,
	},
	Text(String),
}

struct Slot {
	data: Data,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

/// An in-memory [`Document`] rooted at a `body` element.
///
/// Nodes are never freed: a removed node keeps its slot (and stays valid as a handle) for the lifetime of the document,
/// so [`node_count`](`MemoryDocument::node_count`) only grows. The mutation log also grows until it is drained with
/// [`take_mutations`](`MemoryDocument::take_mutations`). Long-running renderers should drain it after each pass
/// and replace the document from time to time.
pub struct MemoryDocument {
	nodes: Vec<Slot>,
	body: NodeId,
	mutations: Vec<Mutation>,
}

impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocument {
	/// Creates a document containing only an empty `body` element, which isn't recorded as a mutation.
	#[must_use]
	pub fn new() -> Self {
		let mut document = Self {
			nodes: Vec::new(),
			body: NodeId(0),
			mutations: Vec::new(),
		};
		document.body = document.allocate(Data::Element {
			name: "body".to_owned(),
			id: None,
			attributes: BTreeMap::new(),
			class_name: None,
			styles: BTreeMap::new(),
			handlers: BTreeMap::new(),
		});
		document
	}

	#[must_use]
	pub fn body(&self) -> NodeId {
		self.body
	}

	#[must_use]
	pub fn mutations(&self) -> &[Mutation] {
		&self.mutations
	}

	pub fn take_mutations(&mut self) -> Vec<Mutation> {
		std::mem::take(&mut self.mutations)
	}

	/// The number of nodes ever created, including detached ones.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		self.slot(node).map_or(&[][..], |slot| slot.children.as_slice())
	}

	/// The element children of `node`, skipping text nodes.
	#[must_use]
	pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
		self.children(node).iter().copied().filter(|&child| self.name(child).is_some()).collect()
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.slot(node).and_then(|slot| slot.parent)
	}

	/// The tag name, for elements.
	#[must_use]
	pub fn name(&self, node: NodeId) -> Option<&str> {
		match self.slot(node).map(|slot| &slot.data) {
			Some(Data::Element { name, .. }) => Some(name.as_str()),
			_ => None,
		}
	}

	#[must_use]
	pub fn element_id(&self, element: NodeId) -> Option<&str> {
		match self.slot(element).map(|slot| &slot.data) {
			Some(Data::Element { id, .. }) => id.as_deref(),
			_ => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, element: NodeId, name: &str) -> Option<&str> {
		match self.slot(element).map(|slot| &slot.data) {
			Some(Data::Element { attributes, .. }) => attributes.get(name).map(String::as_str),
			_ => None,
		}
	}

	#[must_use]
	pub fn class_name(&self, element: NodeId) -> Option<&str> {
		match self.slot(element).map(|slot| &slot.data) {
			Some(Data::Element { class_name, .. }) => class_name.as_deref(),
			_ => None,
		}
	}

	#[must_use]
	pub fn style(&self, element: NodeId, property: &str) -> Option<&str> {
		match self.slot(element).map(|slot| &slot.data) {
			Some(Data::Element { styles, .. }) => styles.get(property).map(String::as_str),
			_ => None,
		}
	}

	/// The data of a text node, or the concatenated text of an element's descendants.
	#[must_use]
	pub fn text(&self, node: NodeId) -> String {
		let mut text = String::new();
		self.collect_text(node, &mut text);
		text
	}

	fn collect_text(&self, node: NodeId, text: &mut String) {
		if let Some(slot) = self.slot(node) {
			match &slot.data {
				Data::Text(data) => text.push_str(data),
				Data::Element { .. } => {
					for &child in &slot.children {
						self.collect_text(child, text);
					}
				}
			}
		}
	}

	/// Calls the handler assigned to `target`'s `name` property, if there is one.
	///
	/// Returns whether a handler was called.
	pub fn dispatch(&self, target: NodeId, name: &str) -> bool {
		let handler = match self.slot(target).map(|slot| &slot.data) {
			Some(Data::Element { handlers, .. }) => handlers.get(name),
			_ => None,
		};
		match handler {
			Some(handler) => {
				handler.call(MemoryEvent { name: name.to_owned(), target });
				true
			}
			None => false,
		}
	}

	/// Serialises `node` and its descendants as HTML. Event handlers are omitted.
	#[must_use]
	pub fn to_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		// Writing into a `String` can't fail.
		let _ = self.write_html(node, &mut html);
		html
	}

	fn write_html(&self, node: NodeId, out: &mut String) -> fmt::Result {
		let slot = match self.slot(node) {
			Some(slot) => slot,
			None => return Ok(()),
		};
		match &slot.data {
			Data::Text(data) => write_escaped(out, data, false),
			Data::Element {
				name,
				id,
				attributes,
				class_name,
				styles,
				handlers: _,
			} => {
				write!(out, "<{}", name)?;
				if let Some(id) = id {
					out.push_str(" id=\"");
					write_escaped(out, id, true)?;
					out.push('"');
				}
				for (name, value) in attributes {
					write!(out, " {}=\"", name)?;
					write_escaped(out, value, true)?;
					out.push('"');
				}
				if let Some(class_name) = class_name {
					out.push_str(" class=\"");
					write_escaped(out, class_name, true)?;
					out.push('"');
				}
				if !styles.is_empty() {
					out.push_str(" style=\"");
					for (property, value) in styles {
						write_escaped(out, property, true)?;
						out.push_str(": ");
						write_escaped(out, value, true)?;
						out.push(';');
					}
					out.push('"');
				}
				out.push('>');
				for &child in &slot.children {
					self.write_html(child, out)?;
				}
				write!(out, "</{}>", name)
			}
		}
	}

	fn allocate(&mut self, data: Data) -> NodeId {
		self.nodes.push(Slot {
			data,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.nodes.len() - 1)
	}

	fn slot(&self, node: NodeId) -> Option<&Slot> {
		self.nodes.get(node.0)
	}

	fn slot_mut(&mut self, node: NodeId) -> Result<&mut Slot, MemoryError> {
		self.nodes.get_mut(node.0).ok_or(MemoryError::UnknownNode(node))
	}

	fn element_mut(&mut self, element: NodeId) -> Result<ElementMut<'_>, MemoryError> {
		match &mut self.slot_mut(element)?.data {
			Data::Element {
				id,
				attributes,
				class_name,
				styles,
				handlers,
				..
			} => Ok(ElementMut {
				id,
				attributes,
				class_name,
				styles,
				handlers,
			}),
			Data::Text(_) => Err(MemoryError::NotAnElement(element)),
		}
	}

	fn detach(&mut self, child: NodeId) -> Result<(), MemoryError> {
		if let Some(parent) = self.slot_mut(child)?.parent.take() {
			let siblings = &mut self.slot_mut(parent)?.children;
			siblings.retain(|&sibling| sibling != child);
		}
		Ok(())
	}

	fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.parent(node) {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}
}

struct ElementMut<'a> {
	id: &'a mut Option<String>,
	attributes: &'a mut BTreeMap<String, String>,
	class_name: &'a mut Option<String>,
	styles: &'a mut BTreeMap<String, String>,
	handlers: &'a mut BTreeMap<String, Handler<MemoryEvent>>,
}

impl Document for MemoryDocument {
	type Handle = NodeId;
	type Event = MemoryEvent;
	type Error = MemoryError;

	fn create_element(&mut self, name: &str) -> Result<NodeId, MemoryError> {
		let node = self.allocate(Data::Element {
			name: name.to_owned(),
			id: None,
			attributes: BTreeMap::new(),
			class_name: None,
			styles: BTreeMap::new(),
			handlers: BTreeMap::new(),
		});
		self.mutations.push(Mutation::CreateElement { node, name: name.to_owned() });
		Ok(node)
	}

	fn create_text_node(&mut self, data: &str) -> Result<NodeId, MemoryError> {
		let node = self.allocate(Data::Text(data.to_owned()));
		self.mutations.push(Mutation::CreateText { node });
		Ok(node)
	}

	fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), MemoryError> {
		self.insert_before(parent, child, None)
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) -> Result<(), MemoryError> {
		let (parent, child) = (*parent, *child);
		match self.slot(parent).map(|slot| &slot.data) {
			Some(Data::Element { .. }) => (),
			Some(Data::Text(_)) => return Err(MemoryError::NotAnElement(parent)),
			None => return Err(MemoryError::UnknownNode(parent)),
		}
		self.slot_mut(child)?;
		if self.is_ancestor_or_self(child, parent) {
			return Err(MemoryError::Cycle { parent, child });
		}
		if let Some(&reference) = reference {
			if self.parent(reference) != Some(parent) {
				return Err(MemoryError::NotAChild { parent, child: reference });
			}
			if reference == child {
				// Already in place.
				self.mutations.push(Mutation::InsertBefore {
					parent,
					child,
					reference: Some(reference),
				});
				return Ok(());
			}
		}

		self.detach(child)?;
		let siblings = &mut self.slot_mut(parent)?.children;
		let index = match reference {
			Some(reference) => siblings.iter().position(|sibling| sibling == reference).unwrap_or(siblings.len()),
			None => siblings.len(),
		};
		siblings.insert(index, child);
		self.slot_mut(child)?.parent = Some(parent);

		self.mutations.push(Mutation::InsertBefore {
			parent,
			child,
			reference: reference.copied(),
		});
		Ok(())
	}

	fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), MemoryError> {
		let (parent, child) = (*parent, *child);
		if self.parent(child) != Some(parent) {
			return Err(MemoryError::NotAChild { parent, child });
		}
		self.detach(child)?;
		self.mutations.push(Mutation::RemoveChild { parent, child });
		Ok(())
	}

	fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) -> Result<(), MemoryError> {
		self.element_mut(*element)?.attributes.insert(name.to_owned(), value.to_owned());
		self.mutations.push(Mutation::SetAttribute {
			element: *element,
			name: name.to_owned(),
		});
		Ok(())
	}

	fn set_id(&mut self, element: &NodeId, id: &str) -> Result<(), MemoryError> {
		*self.element_mut(*element)?.id = Some(id.to_owned());
		self.mutations.push(Mutation::SetId { element: *element });
		Ok(())
	}

	fn set_class_name(&mut self, element: &NodeId, class_name: &str) -> Result<(), MemoryError> {
		*self.element_mut(*element)?.class_name = Some(class_name.to_owned());
		self.mutations.push(Mutation::SetClassName { element: *element });
		Ok(())
	}

	fn set_style(&mut self, element: &NodeId, property: &str, value: &str) -> Result<(), MemoryError> {
		self.element_mut(*element)?.styles.insert(property.to_owned(), value.to_owned());
		self.mutations.push(Mutation::SetStyle {
			element: *element,
			property: property.to_owned(),
		});
		Ok(())
	}

	fn set_event_handler(&mut self, element: &NodeId, name: &str, handler: &Handler<MemoryEvent>) -> Result<(), MemoryError> {
		self.element_mut(*element)?.handlers.insert(name.to_owned(), handler.clone());
		self.mutations.push(Mutation::SetEventHandler {
			element: *element,
			name: name.to_owned(),
		});
		Ok(())
	}

	fn set_text_content(&mut self, text: &NodeId, data: &str) -> Result<(), MemoryError> {
		match &mut self.slot_mut(*text)?.data {
			Data::Text(current) => {
				data.clone_into(current);
			}
			Data::Element { .. } => return Err(MemoryError::NotText(*text)),
		}
		self.mutations.push(Mutation::SetTextContent { text: *text });
		Ok(())
	}
}

impl Debug for MemoryDocument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDocument")
			.field("body", &self.to_html(self.body))
			.field("nodes", &self.nodes.len())
			.field("mutations", &self.mutations.len())
			.finish()
	}
}

fn write_escaped(out: &mut String, value: &str, attribute: bool) -> fmt::Result {
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' if attribute => out.push_str("&quot;"),
			c => out.write_char(c)?,
		}
	}
	Ok(())
}
