//! # Errors
//!
//! The common error type for all keywarp components.

use thiserror::Error;

use crate::keys::Key;

/// Everything that can go wrong inside the event pipeline and its X11
/// backend.
///
/// `#[non_exhaustive]` so a new variant does not break dependents.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum KeywarpError {
	/// A key name with no X key code in the tables. Indicates a broken
	/// keymap and is treated as fatal.
	#[error("key {0:?} is not mapped to an X key code")]
	MissingKeyCode(Key),
	/// An X server request failed. Fatal; the daemon cannot continue
	/// without its output channel.
	#[error("X server request failed: {0}")]
	X(String),
	/// An XKB request failed, usually while switching the layout group.
	#[error("XKB request failed: {0}")]
	Xkb(String),
	/// An input device could not be opened or read.
	#[error("input device error: {0}")]
	Input(String),
}

impl From<std::io::Error> for KeywarpError {
	fn from(err: std::io::Error) -> Self {
		KeywarpError::Input(err.to_string())
	}
}
