use thiserror::Error;

/// Errors of the upload, audio and sync clients.
#[derive(Debug, Error)]
pub enum ProtocolError {
	#[error("malformed message: {0}")]
	Json(#[from] serde_json::Error),

	#[error("channel error: {0}")]
	Channel(String),

	#[error("unexpected {kind:?} message: {reason}")]
	Unexpected { kind: String, reason: &'static str },

	#[error("documents must be JSON objects")]
	NotAnObject,
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
