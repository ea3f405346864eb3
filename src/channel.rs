//! Duplex message channels for the protocol clients.
//!
//! Clients only ever send through a [`Channel`]. Whoever owns the underlying connection feeds incoming
//! messages back by calling the client's `handle_message`.

use crate::error::{ProtocolError, ProtocolResult};
use core::{convert::Infallible, fmt::Debug};
use serde::Serialize;
use tracing::trace;

pub trait Channel {
	type Error: Debug;

	fn send_text(&mut self, text: &str) -> Result<(), Self::Error>;
	fn send_binary(&mut self, data: &[u8]) -> Result<(), Self::Error>;
	fn close(&mut self) -> Result<(), Self::Error>;
}

/// A message received from the other end of a [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
	Text(String),
	Binary(Vec<u8>),
}

/// Discards everything sent through it, for clients working without a connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;
impl Channel for Offline {
	type Error = Infallible;

	fn send_text(&mut self, _: &str) -> Result<(), Infallible> {
		Ok(())
	}

	fn send_binary(&mut self, _: &[u8]) -> Result<(), Infallible> {
		Ok(())
	}

	fn close(&mut self) -> Result<(), Infallible> {
		Ok(())
	}
}

/// Keeps everything sent through it.
#[derive(Debug, Clone, Default)]
pub struct Recording {
	pub sent: Vec<Incoming>,
	pub closed: bool,
}
impl Recording {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// The text messages sent so far, parsed as JSON.
	pub fn json(&self) -> Result<Vec<serde_json::Value>, serde_json::Error> {
		self.sent
			.iter()
			.filter_map(|message| match message {
				Incoming::Text(text) => Some(serde_json::from_str(text)),
				Incoming::Binary(_) => None,
			})
			.collect()
	}

	#[must_use]
	pub fn binary(&self) -> Vec<&[u8]> {
		self.sent
			.iter()
			.filter_map(|message| match message {
				Incoming::Binary(data) => Some(data.as_slice()),
				Incoming::Text(_) => None,
			})
			.collect()
	}
}
impl Channel for Recording {
	type Error = Infallible;

	fn send_text(&mut self, text: &str) -> Result<(), Infallible> {
		self.sent.push(Incoming::Text(text.to_owned()));
		Ok(())
	}

	fn send_binary(&mut self, data: &[u8]) -> Result<(), Infallible> {
		self.sent.push(Incoming::Binary(data.to_vec()));
		Ok(())
	}

	fn close(&mut self) -> Result<(), Infallible> {
		self.closed = true;
		Ok(())
	}
}

pub(crate) fn send_json<C: Channel>(channel: &mut C, message: &impl Serialize) -> ProtocolResult<()> {
	let text = serde_json::to_string(message)?;
	if cfg!(feature = "dangerous-logging") {
		trace!(%text, "Sending");
	}
	channel.send_text(&text).map_err(channel_error)
}

pub(crate) fn send_binary<C: Channel>(channel: &mut C, data: &[u8]) -> ProtocolResult<()> {
	trace!(len = data.len(), "Sending binary");
	channel.send_binary(data).map_err(channel_error)
}

pub(crate) fn channel_error(error: impl Debug) -> ProtocolError {
	ProtocolError::Channel(format!("{:?}", error))
}
