use crate::{
	document::Document,
	node::{Kind, Live, Node},
	signature::{Key, Signature},
};
use core::mem;
use hashbrown::{hash_map::Entry, HashMap};
use tracing::{error, instrument, trace, trace_span, warn};

/// Owns a [`Document`] and the tree currently rendered into one of its containers.
///
/// # Correct Use
///
/// The reconciler assumes it is the only writer of the container's child nodes (aside from their own content,
/// which it never reads). Nodes it placed there that are moved or removed by other code will be left alone,
/// but the next [`update`](`Reconciler::update`) may then misplace new nodes relative to them.
#[derive(Debug)]
pub struct Reconciler<D: Document> {
	document: D,
	container: D::Handle,
	tree: Node<D>,
}
impl<D: Document> Reconciler<D> {
	#[must_use]
	pub fn new(mut document: D, container: D::Handle) -> Self {
		let tree = render(&mut document, Node::root(container.clone()), None);
		Self { document, container, tree }
	}

	/// Brings the container in line with `next`, which should be a [`Node::root`].
	///
	/// The container itself is never changed. Any other node is rendered as the container's only child instead.
	#[instrument(skip_all, fields(children = next.children.len()))]
	pub fn update(&mut self, next: Node<D>) {
		let next = if next.is_root() {
			next
		} else {
			warn!("Expected a root node but got <{}>. Rendering it as the container's only child.", next.name);
			Node::root(self.container.clone()).child(next)
		};
		let previous = mem::replace(&mut self.tree, Node::root(self.container.clone()));
		self.tree = update(&mut self.document, Some(previous), next);
	}

	/// Renders `children` into the container, replacing what the previous call rendered there.
	pub fn render(&mut self, children: impl IntoIterator<Item = Node<D>>) {
		let next = Node::root(self.container.clone()).children(children);
		self.update(next);
	}

	#[must_use]
	pub fn tree(&self) -> &Node<D> {
		&self.tree
	}

	#[must_use]
	pub fn container(&self) -> &D::Handle {
		&self.container
	}

	#[must_use]
	pub fn document(&self) -> &D {
		&self.document
	}

	pub fn document_mut(&mut self) -> &mut D {
		&mut self.document
	}

	#[must_use]
	pub fn into_document(self) -> D {
		self.document
	}
}

/// Binds `node` to live nodes in `document`, taking over `previous`'s binding if it has one and creating new nodes otherwise.
///
/// Attributes, classes, styles, event handlers and text are applied only to new elements and
/// where the [`Signature`](`crate::Signature`) changed. Nothing is ever unset.
///
/// `previous`'s binding is only taken over if it has the same tag name (and is a root iff `node` is one).
/// Otherwise it stays with `previous` and `node` is bound to newly created nodes.
///
/// Children are not touched; see [`update`].
pub fn render<D: Document>(document: &mut D, mut node: Node<D>, previous: Option<&mut Node<D>>) -> Node<D> {
	let previous = previous
		.filter(|previous| reusable(previous, &node))
		.and_then(|previous| previous.live.take());

	if let Kind::Root(container) = &node.kind {
		let signature = node.signature();
		node.live = Some(match previous {
			Some(live) => Live { signature, ..live },
			None => Live {
				element: container.clone(),
				text: None,
				signature,
			},
		});
		return node;
	}

	let signature = node.signature();
	let live = match previous {
		Some(live) if live.signature == signature => {
			trace!("Unchanged <{}>.", node.name);
			live
		}
		Some(live) => {
			let span = trace_span!("Updating element", tag = %node.name);
			let _enter = span.enter();
			apply(document, &node, &live);
			Live { signature, ..live }
		}
		None => {
			let span = trace_span!("Creating element", tag = %node.name);
			let _enter = span.enter();
			let live = match create(document, &node.name, signature) {
				Some(live) => live,
				None => return node,
			};
			apply(document, &node, &live);
			live
		}
	};
	node.live = Some(live);
	node
}

/// Reconciles `new` against `old` (if any) recursively and returns `new`, now bound to live nodes.
///
/// `old` must be the return value of a previous call (or of [`render`] for a root without children).
/// Keep the returned tree around as `old` for the next pass.
///
/// If `new`'s tag name differs from `old`'s, nothing of `old` is reused and `new` is created from scratch.
/// `old`'s element is left where it is, since only its parent can remove it.
pub fn update<D: Document>(document: &mut D, old: Option<Node<D>>, new: Node<D>) -> Node<D> {
	let old = old.filter(|old| {
		let same = reusable(old, &new);
		if !same {
			trace!("<{}> can't become <{}>. Recreating.", old.name, new.name);
		}
		same
	});
	let (mut new, old_children) = match old {
		Some(mut old) => (render(document, new, Some(&mut old)), old.children),
		None => (render(document, new, None), Vec::new()),
	};

	let parent = match &new.live {
		Some(live) => live.element.clone(),
		None => return new,
	};

	if !old_children.is_empty() || !new.children.is_empty() {
		let new_children = mem::take(&mut new.children);
		new.children = reconcile_children(document, &parent, old_children, new_children);
	}
	new
}

/// Updates `parent`'s children from `old_children` to `new_children` and returns the latter, bound.
///
/// Children are paired by [`Key`]. Matched children keep their live nodes and are only moved if they appear
/// before a child that was already found in order. New children are inserted and unmatched old ones removed.
///
/// If multiple old children share a key, only the last of them can be matched and the others are removed.
/// A matched child whose tag name changed is removed and recreated.
#[instrument(skip_all, fields(old = old_children.len(), new = new_children.len()))]
pub fn reconcile_children<D: Document>(document: &mut D, parent: &D::Handle, old_children: Vec<Node<D>>, new_children: Vec<Node<D>>) -> Vec<Node<D>> {
	// Positions of the old children, for use as insertion references.
	let anchors: Vec<Option<D::Handle>> = old_children.iter().map(|child| child.handle().cloned()).collect();

	let mut by_key = HashMap::<Key, usize>::with_capacity(old_children.len());
	let mut discarded = Vec::new();
	let mut slots = Vec::with_capacity(old_children.len());
	for (i, child) in old_children.into_iter().enumerate() {
		if child.is_bound() {
			match by_key.entry(child.key()) {
				Entry::Occupied(mut occupied) => {
					warn!("Duplicate sibling key {:?} (<{}>). Only the last of these can be reused.", occupied.key(), child.name);
					discarded.push(occupied.insert(i));
				}
				Entry::Vacant(vacant) => {
					vacant.insert(i);
				}
			}
		}
		slots.push(Some(child));
	}

	let mut last_matched: Option<usize> = None;
	let mut children = Vec::with_capacity(new_children.len());
	for child in new_children {
		let mut matched = by_key.remove(&child.key());
		if let Some(i) = matched {
			if !slots[i].as_ref().map_or(false, |old| reusable(old, &child)) {
				trace!("Key {:?} changed its tag to <{}>. Recreating.", child.key(), child.name);
				discarded.push(i);
				matched = None;
			}
		}
		let previous = matched.and_then(|i| slots[i].take());
		let child = update(document, previous, child);

		if let Some(handle) = child.handle() {
			let anchor = anchors[last_matched.map_or(0, |i| i + 1)..].iter().flatten().next();
			match matched {
				Some(i) if last_matched.map_or(false, |last| i < last) => {
					let span = trace_span!("Moving", tag = %child.name, from = i);
					let _enter = span.enter();
					if let Err(error) = document.insert_before(parent, handle, anchor) {
						error!("Failed to move <{}>: {:?}", child.name, error);
					}
				}
				Some(i) => last_matched = Some(i),
				None => {
					let span = trace_span!("Inserting", tag = %child.name);
					let _enter = span.enter();
					if let Err(error) = document.insert_before(parent, handle, anchor) {
						error!("Failed to insert <{}>: {:?}", child.name, error);
					}
				}
			}
		}
		children.push(child);
	}

	let mut removed: Vec<usize> = by_key.into_iter().map(|(_, i)| i).chain(discarded).collect();
	removed.sort_unstable();
	for i in removed {
		if let Some(child) = slots[i].take() {
			let span = trace_span!("Removing", tag = %child.name);
			let _enter = span.enter();
			if let Some(handle) = child.handle() {
				if let Err(error) = document.remove_child(parent, handle) {
					error!("Failed to remove <{}>: {:?}", child.name, error);
				}
			}
		}
	}

	children
}

/// Whether `new` may take over `old`'s live nodes.
fn reusable<D: Document>(old: &Node<D>, new: &Node<D>) -> bool {
	old.name == new.name && old.is_root() == new.is_root()
}

fn create<D: Document>(document: &mut D, name: &str, signature: Signature) -> Option<Live<D::Handle>> {
	let element = match document.create_element(name) {
		Ok(element) => element,
		Err(error) => {
			error!("Failed to create <{}>: {:?}", name, error);
			return None;
		}
	};

	let text = match document.create_text_node("") {
		Ok(text) => match document.append_child(&element, &text) {
			Ok(()) => Some(text),
			Err(error) => {
				error!("Failed to append text node to <{}>: {:?}", name, error);
				None
			}
		},
		Err(error) => {
			error!("Failed to create text node for <{}>: {:?}", name, error);
			None
		}
	};

	Some(Live { element, text, signature })
}

fn apply<D: Document>(document: &mut D, node: &Node<D>, live: &Live<D::Handle>) {
	let element = &live.element;

	if cfg!(feature = "dangerous-logging") {
		trace!(canonical = %node.canonical(), "Applying");
	} else {
		trace!(
			attributes = node.attrs.len(),
			classes = node.classes.len(),
			styles = node.styles.len(),
			events = node.events.len(),
			"Applying"
		);
	}

	if let Some(id) = &node.id {
		if let Err(error) = document.set_id(element, id) {
			error!("Failed to set id on <{}>: {:?}", node.name, error);
		}
	}

	for (name, value) in &node.attrs {
		if let Err(error) = document.set_attribute(element, name, value) {
			error!("Failed to set attribute {:?} on <{}>: {:?}", name, node.name, error);
		}
	}

	if !node.classes.is_empty() {
		if let Err(error) = document.set_class_name(element, &node.class_name()) {
			error!("Failed to set class name on <{}>: {:?}", node.name, error);
		}
	}

	for (property, value) in &node.styles {
		if let Err(error) = document.set_style(element, property, value) {
			error!("Failed to set style {:?} on <{}>: {:?}", property, node.name, error);
		}
	}

	for (name, handler) in &node.events {
		if let Err(error) = document.set_event_handler(element, name, handler) {
			error!("Failed to set event handler {:?} on <{}>: {:?}", name, node.name, error);
		}
	}

	match &live.text {
		Some(text) => {
			if let Err(error) = document.set_text_content(text, node.text.as_deref().unwrap_or_default()) {
				error!("Failed to set text of <{}>: {:?}", node.name, error);
			}
		}
		None => {
			if node.text.is_some() {
				warn!("<{}> has no text node. Its text content is not rendered.", node.name);
			}
		}
	}
}
