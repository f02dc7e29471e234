//! # `keywarp-common`
//!
//! Types shared by every crate of the keywarp keyboard remapping daemon:
//! the symbolic [`Key`] names, the immutable [`Keymap`] lookup tables, the
//! runtime [`Settings`] derived from the command line, and the common
//! [`KeywarpError`] type.

#![deny(clippy::all, clippy::perf, clippy::complexity, clippy::style)]

pub mod errors;
pub mod keymap;
pub mod keys;
pub mod settings;

pub use errors::KeywarpError;
pub use keymap::Keymap;
pub use keys::{Key, KeyCode};
pub use settings::Settings;
