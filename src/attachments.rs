//! Chunked file uploads over a [`Channel`], one file at a time.
//!
//! ```text
//! client: {"type": "start-upload", "filename": …, "size": …}
//! server: {"type": "upload-started", "id": …}
//! client: <chunk>
//! server: {"type": "got-chunk", "id": …, "size": <bytes received so far>}
//! client: <chunk>
//! …
//! server: {"type": "upload-finished", "id": …, "path": …}
//! ```
//!
//! The first chunk is sent right after the metadata (even if it's empty). Every further chunk waits for the previous one to be acknowledged.

use crate::{
	channel::{send_binary, send_json, Channel},
	error::{ProtocolError, ProtocolResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{borrow::Cow, collections::VecDeque};
use tracing::{debug, info, instrument, trace, warn};

/// 256 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 18;

/// A file that can be read in slices.
pub trait UploadFile {
	fn name(&self) -> &str;
	fn size(&self) -> u64;

	/// The bytes in `start..end`. `end` is never past [`size`](`UploadFile::size`).
	fn slice(&self, start: u64, end: u64) -> Cow<'_, [u8]>;
}

/// An [`UploadFile`] held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
	pub name: String,
	pub data: Vec<u8>,
}
impl MemoryFile {
	pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
		Self {
			name: name.into(),
			data: data.into(),
		}
	}
}
impl UploadFile for MemoryFile {
	fn name(&self) -> &str {
		&self.name
	}

	fn size(&self) -> u64 {
		self.data.len() as u64
	}

	fn slice(&self, start: u64, end: u64) -> Cow<'_, [u8]> {
		let len = self.data.len();
		let start = usize::try_from(start).map_or(len, |start| start.min(len));
		let end = usize::try_from(end).map_or(len, |end| end.min(len)).max(start);
		Cow::Borrowed(&self.data[start..end])
	}
}

/// What the server reported for a completed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Uploaded {
	pub id: Option<Value>,
	pub path: Option<String>,
}

pub type OnSuccess<F> = Box<dyn FnMut(&Uploaded, &F)>;
/// Receives the number of bytes the server has received so far.
pub type OnProgress<F> = Box<dyn FnMut(u64, &F)>;

struct Pending<F> {
	file: F,
	on_success: Option<OnSuccess<F>>,
	on_progress: Option<OnProgress<F>>,
}

struct Current<F> {
	pending: Pending<F>,
	id: Option<Value>,
	offset: u64,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Outgoing<'a> {
	StartUpload { filename: &'a str, size: u64 },
}

#[derive(Deserialize)]
struct Message {
	#[serde(rename = "type", default)]
	kind: String,
	#[serde(default)]
	id: Option<Value>,
	#[serde(default)]
	size: Option<u64>,
	#[serde(default)]
	path: Option<String>,
}

pub struct UploadQueue<C, F> {
	channel: C,
	chunk_size: usize,
	queue: VecDeque<Pending<F>>,
	current: Option<Current<F>>,
}

impl<C: Channel, F: UploadFile> UploadQueue<C, F> {
	pub fn new(channel: C) -> Self {
		Self::with_chunk_size(channel, DEFAULT_CHUNK_SIZE)
	}

	/// # Panics
	///
	/// Iff `chunk_size` is zero.
	pub fn with_chunk_size(channel: C, chunk_size: usize) -> Self {
		assert!(chunk_size > 0, "Upload chunk size must be positive");
		Self {
			channel,
			chunk_size,
			queue: VecDeque::new(),
			current: None,
		}
	}

	#[must_use]
	pub fn chunk_size(&self) -> usize {
		self.chunk_size
	}

	#[must_use]
	pub fn channel(&self) -> &C {
		&self.channel
	}

	/// Whether no upload is in progress.
	#[must_use]
	pub fn is_idle(&self) -> bool {
		self.current.is_none()
	}

	/// The number of files waiting behind the current upload.
	#[must_use]
	pub fn queued(&self) -> usize {
		self.queue.len()
	}

	/// The file being uploaded and how many of its bytes were sent so far.
	#[must_use]
	pub fn current(&self) -> Option<(&F, u64)> {
		self.current.as_ref().map(|current| (&current.pending.file, current.offset))
	}

	/// Queues `file`, starting its upload immediately if no other one is in progress.
	///
	/// If the upload can't be started, the error is returned and the file is kept at the front of the queue.
	/// It is retried when the next file is put.
	#[instrument(skip_all, fields(size = file.size()))]
	pub fn put_file(&mut self, file: F, on_success: Option<OnSuccess<F>>, on_progress: Option<OnProgress<F>>) -> ProtocolResult<()> {
		self.queue.push_back(Pending { file, on_success, on_progress });
		if self.current.is_none() {
			self.start_next_upload()?;
		}
		Ok(())
	}

	fn start_next_upload(&mut self) -> ProtocolResult<()> {
		let pending = match self.queue.pop_front() {
			Some(pending) => pending,
			None => {
				trace!("Upload queue drained");
				return Ok(());
			}
		};

		let size = pending.file.size();
		if cfg!(feature = "dangerous-logging") {
			debug!(name = pending.file.name(), size, "Starting upload");
		} else {
			debug!(size, "Starting upload");
		}
		let started = send_json(
			&mut self.channel,
			&Outgoing::StartUpload {
				filename: pending.file.name(),
				size,
			},
		);
		if let Err(error) = started {
			warn!(size, "Failed to start upload. The file stays queued.");
			self.queue.push_front(pending);
			return Err(error);
		}
		self.current = Some(Current { pending, id: None, offset: 0 });
		self.send_next_chunk()
	}

	fn send_next_chunk(&mut self) -> ProtocolResult<()> {
		let current = match &mut self.current {
			Some(current) => current,
			None => return Ok(()),
		};
		let file = &current.pending.file;
		let remaining = file.size().saturating_sub(current.offset);
		let len = remaining.min(self.chunk_size as u64);
		let chunk = file.slice(current.offset, current.offset + len);
		send_binary(&mut self.channel, &chunk)?;
		current.offset += len;
		Ok(())
	}

	/// Advances the current upload according to a message from the server.
	#[instrument(skip_all)]
	pub fn handle_message(&mut self, text: &str) -> ProtocolResult<()> {
		let message: Message = serde_json::from_str(text)?;
		match message.kind.as_str() {
			"upload-started" => {
				let current = self.current.as_mut().ok_or_else(|| no_upload(&message.kind))?;
				debug!(id = ?message.id, "Upload started");
				current.id = message.id;
				Ok(())
			}
			"got-chunk" => {
				let current = self.current.as_mut().ok_or_else(|| no_upload(&message.kind))?;
				let received = message.size.unwrap_or(current.offset);
				trace!(received, "Chunk acknowledged");
				if let Some(on_progress) = &mut current.pending.on_progress {
					on_progress(received, &current.pending.file);
				}
				if current.offset < current.pending.file.size() {
					self.send_next_chunk()
				} else {
					trace!("Upload fully sent. Waiting for it to finish.");
					Ok(())
				}
			}
			"upload-finished" => {
				let current = self.current.take().ok_or_else(|| no_upload(&message.kind))?;
				let uploaded = Uploaded {
					id: message.id.or(current.id),
					path: message.path,
				};
				info!(id = ?uploaded.id, "Upload finished");
				let Pending { file, on_success, .. } = current.pending;
				if let Some(mut on_success) = on_success {
					on_success(&uploaded, &file);
				}
				self.start_next_upload()
			}
			_ => {
				warn!(kind = %message.kind, "Ignoring unknown upload message");
				Ok(())
			}
		}
	}
}

fn no_upload(kind: &str) -> ProtocolError {
	ProtocolError::Unexpected {
		kind: kind.to_owned(),
		reason: "no upload in progress",
	}
}
