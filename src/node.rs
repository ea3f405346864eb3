//! Per-render tree descriptions.

use crate::{document::Document, signature::Signature};
use core::fmt::{self, Debug, Formatter};
use std::{
	borrow::Cow,
	collections::{BTreeMap, BTreeSet},
	rc::Rc,
};

/// An event handler together with the source text it is identified by.
///
/// Two handlers with the same source text compare equal for change detection,
/// even if they capture different values.
pub struct Handler<E> {
	source: Cow<'static, str>,
	callback: Rc<dyn Fn(E)>,
}
impl<E> Handler<E> {
	pub fn new(source: impl Into<Cow<'static, str>>, callback: impl 'static + Fn(E)) -> Self {
		Self {
			source: source.into(),
			callback: Rc::new(callback),
		}
	}

	#[must_use]
	pub fn source(&self) -> &str {
		&self.source
	}

	#[must_use]
	pub fn callback(&self) -> Rc<dyn Fn(E)> {
		Rc::clone(&self.callback)
	}

	pub fn call(&self, event: E) {
		(self.callback)(event);
	}
}
impl<E> Clone for Handler<E> {
	fn clone(&self) -> Self {
		Self {
			source: self.source.clone(),
			callback: Rc::clone(&self.callback),
		}
	}
}
impl<E> Debug for Handler<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Handler").field(&self.source).finish()
	}
}

/// Creates a [`Handler`] from a closure, using the closure's tokens as its source text.
///
/// ```
/// use cambium_dom::{handler, memory::MemoryDocument, Node};
///
/// let a = Node::<MemoryDocument>::new("button").on("onclick", handler!(|_| ()));
/// let b = Node::<MemoryDocument>::new("button").on("onclick", handler!(|_| ()));
/// assert_eq!(a.signature(), b.signature());
/// ```
#[macro_export]
macro_rules! handler {
	($($closure:tt)+) => {
		$crate::Handler::new(::core::stringify!($($closure)+), $($closure)+)
	};
}

/// Whether a [`Node`] renders itself or stands in for a container owned by the caller.
#[derive(Debug, Clone)]
pub enum Kind<H> {
	/// Binds to the given persistent container and never applies any content to it.
	Root(H),
	Element,
}

/// The live external nodes a [`Node`] is bound to, and the [`Signature`] they were last brought up to date with.
#[derive(Debug)]
pub(crate) struct Live<H> {
	pub(crate) element: H,
	/// The text node holding this element's own text content. Roots don't have one.
	pub(crate) text: Option<H>,
	pub(crate) signature: Signature,
}

/// The description of one element for a single render pass.
///
/// Nodes are built fresh for each pass and handed to [`update`](`crate::update`),
/// which binds them to live nodes in a [`Document`].
///
/// Cloning a `Node` yields an unbound copy of its description.
pub struct Node<D: Document> {
	pub(crate) kind: Kind<D::Handle>,
	pub(crate) name: Cow<'static, str>,
	pub(crate) id: Option<String>,
	pub(crate) attrs: BTreeMap<String, String>,
	pub(crate) classes: BTreeSet<String>,
	pub(crate) styles: BTreeMap<String, String>,
	pub(crate) events: BTreeMap<String, Handler<D::Event>>,
	pub(crate) text: Option<String>,
	pub(crate) children: Vec<Node<D>>,
	pub(crate) live: Option<Live<D::Handle>>,
}

impl<D: Document> Node<D> {
	#[must_use]
	pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
		Self::with_kind(Kind::Element, name.into())
	}

	/// A root node rendering its children into `container`, which the reconciler never creates, alters or removes.
	#[must_use]
	pub fn root(container: D::Handle) -> Self {
		Self::with_kind(Kind::Root(container), Cow::Borrowed("#root"))
	}

	fn with_kind(kind: Kind<D::Handle>, name: Cow<'static, str>) -> Self {
		Self {
			kind,
			name,
			id: None,
			attrs: BTreeMap::new(),
			classes: BTreeSet::new(),
			styles: BTreeMap::new(),
			events: BTreeMap::new(),
			text: None,
			children: Vec::new(),
			live: None,
		}
	}

	/// Sets the element id, which doubles as this node's identity among its siblings.
	#[must_use]
	pub fn id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attrs.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn class(mut self, class: impl Into<String>) -> Self {
		self.classes.insert(class.into());
		self
	}

	#[must_use]
	pub fn classes<I: IntoIterator>(mut self, classes: I) -> Self
	where
		I::Item: Into<String>,
	{
		self.classes.extend(classes.into_iter().map(Into::into));
		self
	}

	#[must_use]
	pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
		self.styles.insert(property.into(), value.into());
		self
	}

	/// Assigns `handler` to the element property `name`, e.g. `onclick`.
	#[must_use]
	pub fn on(mut self, name: impl Into<String>, handler: Handler<D::Event>) -> Self {
		self.events.insert(name.into(), handler);
		self
	}

	#[must_use]
	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	#[must_use]
	pub fn child(mut self, child: Self) -> Self {
		self.children.push(child);
		self
	}

	#[must_use]
	pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
		self.children.extend(children);
		self
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub fn kind(&self) -> &Kind<D::Handle> {
		&self.kind
	}

	#[must_use]
	pub fn is_root(&self) -> bool {
		matches!(self.kind, Kind::Root(_))
	}

	#[must_use]
	pub fn element_id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
		self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn class_names(&self) -> impl Iterator<Item = &str> {
		self.classes.iter().map(String::as_str)
	}

	pub fn style_properties(&self) -> impl Iterator<Item = (&str, &str)> {
		self.styles.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn event_handlers(&self) -> impl Iterator<Item = (&str, &Handler<D::Event>)> {
		self.events.iter().map(|(k, v)| (k.as_str(), v))
	}

	#[must_use]
	pub fn text_content(&self) -> Option<&str> {
		self.text.as_deref()
	}

	#[must_use]
	pub fn child_nodes(&self) -> &[Self] {
		&self.children
	}

	/// The live element this node is bound to, once rendered.
	#[must_use]
	pub fn handle(&self) -> Option<&D::Handle> {
		self.live.as_ref().map(|live| &live.element)
	}

	/// The live text node carrying [`text_content`](`Node::text_content`), once rendered.
	#[must_use]
	pub fn text_handle(&self) -> Option<&D::Handle> {
		self.live.as_ref().and_then(|live| live.text.as_ref())
	}

	#[must_use]
	pub fn is_bound(&self) -> bool {
		self.live.is_some()
	}

	/// The sorted, space-joined class list.
	#[must_use]
	pub fn class_name(&self) -> String {
		let mut class_name = String::new();
		for class in &self.classes {
			if !class_name.is_empty() {
				class_name.push(' ');
			}
			class_name.push_str(class);
		}
		class_name
	}
}

impl<D: Document> Clone for Node<D> {
	fn clone(&self) -> Self {
		Self {
			kind: self.kind.clone(),
			name: self.name.clone(),
			id: self.id.clone(),
			attrs: self.attrs.clone(),
			classes: self.classes.clone(),
			styles: self.styles.clone(),
			events: self.events.clone(),
			text: self.text.clone(),
			children: self.children.clone(),
			live: None,
		}
	}
}

impl<D: Document> Debug for Node<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("kind", &self.kind)
			.field("name", &self.name)
			.field("id", &self.id)
			.field("attrs", &self.attrs)
			.field("classes", &self.classes)
			.field("styles", &self.styles)
			.field("events", &self.events)
			.field("text", &self.text)
			.field("children", &self.children)
			.field("live", &self.live)
			.finish()
	}
}
