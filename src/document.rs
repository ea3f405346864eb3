//! The capability set the reconciler needs from an external tree.

use crate::node::Handler;
use core::fmt::Debug;

/// A mutable tree that [`Node`](`crate::Node`) descriptions can be rendered into.
///
/// Implemented by [`MemoryDocument`](`crate::memory::MemoryDocument`) and
/// [`WebDocument`](`crate::web::WebDocument`).
///
/// Every mutation is fallible. The reconciler logs failures and carries on with the rest of the pass,
/// so implementations should leave the tree unchanged when they return an error.
pub trait Document {
	/// A reference to a live node in this tree.
	///
	/// Cloning a handle must not clone the node it refers to.
	type Handle: Clone + Debug;

	/// The value passed to event handlers.
	type Event;

	type Error: Debug;

	fn create_element(&mut self, name: &str) -> Result<Self::Handle, Self::Error>;
	fn create_text_node(&mut self, data: &str) -> Result<Self::Handle, Self::Error>;

	fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle) -> Result<(), Self::Error>;

	/// Inserts (or moves) `child` into `parent` directly before `reference`, or at the end if there is no `reference`.
	fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, reference: Option<&Self::Handle>) -> Result<(), Self::Error>;

	fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle) -> Result<(), Self::Error>;

	fn set_attribute(&mut self, element: &Self::Handle, name: &str, value: &str) -> Result<(), Self::Error>;
	fn set_id(&mut self, element: &Self::Handle, id: &str) -> Result<(), Self::Error>;
	fn set_class_name(&mut self, element: &Self::Handle, class_name: &str) -> Result<(), Self::Error>;
	fn set_style(&mut self, element: &Self::Handle, property: &str, value: &str) -> Result<(), Self::Error>;

	/// Assigns `handler` as the element's `name` property (for example `onclick`), replacing any previous one.
	fn set_event_handler(&mut self, element: &Self::Handle, name: &str, handler: &Handler<Self::Event>) -> Result<(), Self::Error>;

	fn set_text_content(&mut self, text: &Self::Handle, data: &str) -> Result<(), Self::Error>;
}
