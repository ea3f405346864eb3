//! Client for a document store mirrored over a [`Channel`].
//!
//! The client keeps every document in memory, keyed by its `_id`.
//! Local changes are applied immediately and then forwarded to the server:
//!
//! ```json
//! {"type": "change", "id": "id_0", "doc": {"_id": "id_0", …}}
//! {"type": "delete", "id": "id_0"}
//! ```
//!
//! The server pushes the full document set once (`{"type": "history", "history": {id: doc, …}}`),
//! then deletions in the same format as above and updates as any other message carrying `id` and `doc`.

use crate::{
	channel::{send_json, Channel, Offline},
	error::{ProtocolError, ProtocolResult},
};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, trace, warn};

/// Observes a [`Database`]'s documents changing.
///
/// Hooks run for local and remote changes alike.
pub trait DatabaseHooks {
	/// Called after a `history` message replaced all documents.
	fn on_load(&mut self, _documents: &HashMap<String, Value>) {}

	fn on_update(&mut self, _document: &Value) {}

	/// Called before a document is removed. `document` is [`None`] if there was no document with this id.
	fn on_delete(&mut self, _id: &str, _document: Option<&Value>) {}
}
impl DatabaseHooks for () {}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Outgoing<'a> {
	Change { id: &'a str, doc: &'a Value },
	Delete { id: &'a str },
}

#[derive(Deserialize)]
struct Message {
	#[serde(rename = "type", default)]
	kind: String,
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	doc: Option<Value>,
	#[serde(default)]
	history: Option<Map<String, Value>>,
}

#[derive(Debug)]
pub struct Database<C, H = ()> {
	documents: HashMap<String, Value>,
	channel: C,
	hooks: H,
	id_counter: u64,
}

impl<H: DatabaseHooks> Database<Offline, H> {
	/// A database that starts out with `documents` and never syncs.
	pub fn offline(documents: impl IntoIterator<Item = (String, Value)>, hooks: H) -> Self {
		Self {
			documents: documents.into_iter().collect(),
			channel: Offline,
			hooks,
			id_counter: 0,
		}
	}
}

impl<C: Channel, H: DatabaseHooks> Database<C, H> {
	/// An empty database syncing through `channel`. Documents arrive with the server's `history` message.
	pub fn new(channel: C, hooks: H) -> Self {
		Self {
			documents: HashMap::new(),
			channel,
			hooks,
			id_counter: 0,
		}
	}

	pub fn items(&self) -> impl Iterator<Item = &Value> {
		self.documents.values()
	}

	#[must_use]
	pub fn get(&self, id: &str) -> Option<&Value> {
		self.documents.get(id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.documents.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}

	#[must_use]
	pub fn hooks(&self) -> &H {
		&self.hooks
	}

	pub fn hooks_mut(&mut self) -> &mut H {
		&mut self.hooks
	}

	#[must_use]
	pub fn channel(&self) -> &C {
		&self.channel
	}

	/// The first `id_<n>` that isn't taken yet.
	pub fn next_id(&mut self) -> String {
		loop {
			let id = format!("id_{}", self.id_counter);
			self.id_counter += 1;
			if !self.documents.contains_key(&id) {
				return id;
			}
		}
	}

	/// Stores `document` under its `_id`, assigning one first if it has none, and forwards it to the server.
	///
	/// Returns the document's id.
	#[instrument(skip(self, document))]
	pub fn update_doc(&mut self, mut document: Value) -> ProtocolResult<String> {
		let existing = match &document {
			Value::Object(object) => object.get("_id").and_then(Value::as_str).filter(|id| !id.is_empty()).map(str::to_owned),
			_ => return Err(ProtocolError::NotAnObject),
		};
		let id = match existing {
			Some(id) => id,
			None => {
				let id = self.next_id();
				if let Value::Object(object) = &mut document {
					object.insert("_id".to_owned(), Value::String(id.clone()));
				}
				id
			}
		};
		trace!(%id, "Updating document");

		self.documents.insert(id.clone(), document);
		let stored = &self.documents[&id];
		self.hooks.on_update(stored);
		send_json(&mut self.channel, &Outgoing::Change { id: &id, doc: stored })?;
		Ok(id)
	}

	/// Removes the document `id` and forwards the deletion to the server, even if there was no such document.
	#[instrument(skip(self))]
	pub fn delete_doc(&mut self, id: &str) -> ProtocolResult<Option<Value>> {
		self.hooks.on_delete(id, self.documents.get(id));
		let removed = self.documents.remove(id);
		send_json(&mut self.channel, &Outgoing::Delete { id })?;
		Ok(removed)
	}

	/// Applies a message pushed by the server.
	#[instrument(skip_all)]
	pub fn handle_message(&mut self, text: &str) -> ProtocolResult<()> {
		let message: Message = serde_json::from_str(text)?;
		match message.kind.as_str() {
			"history" => {
				let history = message.history.ok_or_else(|| unexpected(&message.kind, "missing `history`"))?;
				self.documents = history.into_iter().collect();
				info!(count = self.documents.len(), "Loaded documents");
				self.hooks.on_load(&self.documents);
			}
			"delete" => {
				let id = message.id.ok_or_else(|| unexpected(&message.kind, "missing `id`"))?;
				if !self.documents.contains_key(&id) {
					warn!(%id, "Server deleted an unknown document");
				}
				self.hooks.on_delete(&id, self.documents.get(&id));
				self.documents.remove(&id);
			}
			_ => {
				let id = message.id.ok_or_else(|| unexpected(&message.kind, "missing `id`"))?;
				let doc = message.doc.ok_or_else(|| unexpected(&message.kind, "missing `doc`"))?;
				trace!(%id, "Server updated document");
				self.documents.insert(id.clone(), doc);
				self.hooks.on_update(&self.documents[&id]);
			}
		}
		Ok(())
	}
}

fn unexpected(kind: &str, reason: &'static str) -> ProtocolError {
	ProtocolError::Unexpected {
		kind: kind.to_owned(),
		reason,
	}
}
