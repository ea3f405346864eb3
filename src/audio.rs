//! Streaming of captured audio as 8 kHz 16-bit PCM frames over a [`Channel`].
//!
//! Opening the microphone is up to the embedding application, which passes each captured block of
//! samples to [`AudioStream::push_block`]. Every block becomes one binary frame.
//!
//! ```text
//! client: {"type": "session-start", "timestamp": <seconds>}
//! server: {"type": "session-confirm", "session_id": …}
//! client: <frame>
//! server: {"type": "confirm-payload", "buf_idx": <frames received so far>}
//! ```
//!
//! Stopping releases the session right away, but the channel stays open until every sent frame was confirmed.

use crate::{
	channel::{channel_error, send_binary, send_json, Channel},
	error::ProtocolResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

pub const TARGET_SAMPLE_RATE: u32 = 8000;

/// Linearly resamples blocks of `f32` samples in `-1.0..=1.0` to [`TARGET_SAMPLE_RATE`] 16-bit PCM.
#[derive(Debug, Clone)]
pub struct Downsampler {
	source_rate: f64,
	block_frames: Option<usize>,
}
impl Downsampler {
	#[must_use]
	pub fn new(source_rate: u32) -> Self {
		Self {
			source_rate: f64::from(source_rate),
			block_frames: None,
		}
	}

	/// The number of output samples per block, fixed by the first non-empty block.
	#[must_use]
	pub fn block_frames(&self) -> Option<usize> {
		self.block_frames
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
	pub fn downsample(&mut self, input: &[f32]) -> Vec<i16> {
		let last = match input.len().checked_sub(1) {
			Some(last) => last,
			None => return Vec::new(),
		};
		let ratio = self.source_rate / f64::from(TARGET_SAMPLE_RATE);
		let frames = *self.block_frames.get_or_insert_with(|| (input.len() as f64 / ratio).ceil() as usize);

		(0..frames)
			.map(|i| {
				let position = i as f64 * ratio;
				let a = (position.floor() as usize).min(last);
				let b = (position.ceil() as usize).min(last);
				let w_b = position.fract();
				let sample = f64::from(input[a]) * (1.0 - w_b) + f64::from(input[b]) * w_b;
				(sample * 32768.0).round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
			})
			.collect()
	}
}

/// Little-endian PCM bytes.
#[must_use]
pub fn encode_frame(samples: &[i16]) -> Vec<u8> {
	samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Outgoing {
	SessionStart { timestamp: f64 },
}

#[derive(Deserialize)]
struct Message {
	#[serde(rename = "type", default)]
	kind: String,
	#[serde(default)]
	buf_idx: Option<u64>,
	#[serde(default)]
	session_id: Option<Value>,
}

/// Where an [`AudioStream`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	Idle,
	Streaming,
	/// Stopped, but waiting for frames to be confirmed before closing the channel.
	Draining,
	Closed,
}

pub struct AudioStream<C> {
	channel: C,
	downsampler: Downsampler,
	state: State,
	session_id: Option<Value>,
	sent: u64,
	confirmed: u64,
}

impl<C: Channel> AudioStream<C> {
	pub fn new(channel: C, source_rate: u32) -> Self {
		Self {
			channel,
			downsampler: Downsampler::new(source_rate),
			state: State::Idle,
			session_id: None,
			sent: 0,
			confirmed: 0,
		}
	}

	#[must_use]
	pub fn state(&self) -> State {
		self.state
	}

	#[must_use]
	pub fn session_id(&self) -> Option<&Value> {
		self.session_id.as_ref()
	}

	/// Frames sent and frames confirmed by the server.
	#[must_use]
	pub fn counts(&self) -> (u64, u64) {
		(self.sent, self.confirmed)
	}

	#[must_use]
	pub fn channel(&self) -> &C {
		&self.channel
	}

	/// Announces a new session, started at `timestamp` seconds since the Unix epoch.
	#[instrument(skip(self))]
	pub fn start(&mut self, timestamp: f64) -> ProtocolResult<()> {
		send_json(&mut self.channel, &Outgoing::SessionStart { timestamp })?;
		self.state = State::Streaming;
		info!("Audio session started");
		Ok(())
	}

	/// Resamples and sends one captured block. Ignored unless streaming, and for empty blocks.
	pub fn push_block(&mut self, input: &[f32]) -> ProtocolResult<()> {
		if self.state != State::Streaming {
			trace!(state = ?self.state, "Dropping audio block");
			return Ok(());
		}
		if input.is_empty() {
			trace!("Skipping empty audio block");
			return Ok(());
		}
		let frame = encode_frame(&self.downsampler.downsample(input));
		send_binary(&mut self.channel, &frame)?;
		self.sent += 1;
		Ok(())
	}

	/// Ends the session. The channel is closed once the server has confirmed every frame sent so far.
	#[instrument(skip(self))]
	pub fn stop(&mut self) -> ProtocolResult<()> {
		self.session_id = None;
		match self.state {
			State::Streaming | State::Idle => {
				self.state = State::Draining;
				self.finish_if_drained()
			}
			State::Draining | State::Closed => Ok(()),
		}
	}

	/// Start time of frame `index`, in seconds since the session started.
	#[allow(clippy::cast_precision_loss)]
	#[must_use]
	pub fn block_time(&self, index: u64) -> f64 {
		let frames = self.downsampler.block_frames().unwrap_or_default() as f64;
		index as f64 * frames / f64::from(TARGET_SAMPLE_RATE)
	}

	#[instrument(skip_all)]
	pub fn handle_message(&mut self, text: &str) -> ProtocolResult<()> {
		let message: Message = serde_json::from_str(text)?;
		match message.kind.as_str() {
			"confirm-payload" => {
				self.confirmed = message.buf_idx.unwrap_or(self.confirmed);
				trace!(sent = self.sent, confirmed = self.confirmed, "Frames confirmed");
				self.finish_if_drained()
			}
			"session-confirm" => {
				debug!(session_id = ?message.session_id, "Session confirmed");
				if self.state == State::Streaming {
					self.session_id = message.session_id;
				}
				Ok(())
			}
			_ => {
				warn!(kind = %message.kind, "Ignoring unknown audio message");
				Ok(())
			}
		}
	}

	fn finish_if_drained(&mut self) -> ProtocolResult<()> {
		if self.state != State::Draining || self.confirmed < self.sent {
			return Ok(());
		}
		self.sent = 0;
		self.confirmed = 0;
		self.state = State::Closed;
		info!("Audio stream drained. Closing channel.");
		self.channel.close().map_err(channel_error)
	}
}
