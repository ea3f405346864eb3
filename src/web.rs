//! Browser bindings: a [`Document`] over the page's DOM and a [`Channel`] over [`WebSocket`].
//!
//! These compile on every target, but calling into them outside of a browser will panic inside `web-sys`.

use crate::{
	channel::{Channel, Incoming},
	document::Document,
	node::Handler,
};
use js_sys::{Reflect, Uint8Array};
use tracing::{error, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{BinaryType, CloseEvent, Element, Event, MessageEvent, Node, WebSocket};

/// A [`Document`] that renders into a [`web_sys::Document`].
///
/// Handles are [`web_sys::Node`]s. Event handlers are assigned as `on…` properties,
/// so each element has at most one handler per event name.
#[derive(Debug, Clone)]
pub struct WebDocument {
	document: web_sys::Document,
}
impl WebDocument {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}

	/// The current window's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	/// `document.body`, which is where applications usually mount their root.
	#[must_use]
	pub fn body(&self) -> Option<Node> {
		self.document.body().map(Into::into)
	}

	#[must_use]
	pub fn inner(&self) -> &web_sys::Document {
		&self.document
	}
}

fn element(node: &Node) -> Result<&Element, JsValue> {
	node.dyn_ref::<Element>().ok_or_else(|| JsValue::from_str("Expected an element."))
}

impl Document for WebDocument {
	type Handle = Node;
	type Event = Event;
	type Error = JsValue;

	fn create_element(&mut self, name: &str) -> Result<Node, JsValue> {
		self.document.create_element(name).map(Into::into)
	}

	fn create_text_node(&mut self, data: &str) -> Result<Node, JsValue> {
		Ok(self.document.create_text_node(data).into())
	}

	fn append_child(&mut self, parent: &Node, child: &Node) -> Result<(), JsValue> {
		parent.append_child(child).map(drop)
	}

	fn insert_before(&mut self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<(), JsValue> {
		parent.insert_before(child, reference).map(drop)
	}

	fn remove_child(&mut self, parent: &Node, child: &Node) -> Result<(), JsValue> {
		parent.remove_child(child).map(drop)
	}

	fn set_attribute(&mut self, node: &Node, name: &str, value: &str) -> Result<(), JsValue> {
		element(node)?.set_attribute(name, value)
	}

	fn set_id(&mut self, node: &Node, id: &str) -> Result<(), JsValue> {
		element(node)?.set_id(id);
		Ok(())
	}

	fn set_class_name(&mut self, node: &Node, class_name: &str) -> Result<(), JsValue> {
		element(node)?.set_class_name(class_name);
		Ok(())
	}

	/// Assigns `element.style[property]`, so `property` is expected in camelCase (`backgroundColor`).
	fn set_style(&mut self, node: &Node, property: &str, value: &str) -> Result<(), JsValue> {
		let style = Reflect::get(element(node)?, &JsValue::from_str("style"))?;
		Reflect::set(&style, &JsValue::from_str(property), &JsValue::from_str(value)).map(drop)
	}

	fn set_event_handler(&mut self, node: &Node, name: &str, handler: &Handler<Event>) -> Result<(), JsValue> {
		let callback = handler.callback();
		let closure = Closure::wrap(Box::new(move |event: Event| callback(event)) as Box<dyn Fn(Event)>);
		// The previous handler's closure is released by the JS garbage collector once it's replaced here.
		Reflect::set(element(node)?, &JsValue::from_str(name), &closure.into_js_value()).map(drop)
	}

	fn set_text_content(&mut self, text: &Node, data: &str) -> Result<(), JsValue> {
		text.set_text_content(Some(data));
		Ok(())
	}
}

impl Channel for WebSocket {
	type Error = JsValue;

	fn send_text(&mut self, text: &str) -> Result<(), JsValue> {
		self.send_with_str(text)
	}

	fn send_binary(&mut self, data: &[u8]) -> Result<(), JsValue> {
		self.send_with_array_buffer_view(&Uint8Array::from(data))
	}

	fn close(&mut self) -> Result<(), JsValue> {
		WebSocket::close(self)
	}
}

/// Calls `handler` with each message `socket` receives. Binary messages are read as [`ArrayBuffer`](`js_sys::ArrayBuffer`)s.
///
/// Replaces any previous `onmessage` handler.
pub fn on_message(socket: &WebSocket, mut handler: impl 'static + FnMut(Incoming)) {
	socket.set_binary_type(BinaryType::Arraybuffer);
	let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
		let data = event.data();
		if let Some(text) = data.as_string() {
			handler(Incoming::Text(text));
		} else if data.is_instance_of::<js_sys::ArrayBuffer>() {
			handler(Incoming::Binary(Uint8Array::new(&data).to_vec()));
		} else {
			warn!("Ignoring message of unexpected type: {:?}", data);
		}
	}) as Box<dyn FnMut(MessageEvent)>);
	socket.set_onmessage(Some(closure.as_ref().unchecked_ref()));
	closure.forget();
}

/// Alerts `notice` and reloads the page once `socket` closes, so that the page never continues with stale state.
pub fn reload_on_close(socket: &WebSocket, notice: &str) {
	let notice = notice.to_owned();
	let closure = Closure::wrap(Box::new(move |event: CloseEvent| {
		trace!(code = event.code(), "Socket closed");
		let window = match web_sys::window() {
			Some(window) => window,
			None => {
				error!("No window to reload.");
				return;
			}
		};
		if let Err(error) = window.alert_with_message(&notice) {
			error!("Failed to show alert: {:?}", error);
		}
		if let Err(error) = window.location().reload() {
			error!("Failed to reload: {:?}", error);
		}
	}) as Box<dyn FnMut(CloseEvent)>);
	socket.set_onclose(Some(closure.as_ref().unchecked_ref()));
	closure.forget();
}
