//! Status bar IPC for the keywarp daemon.
//!
//! The daemon reports three boolean indicators to an external status bar:
//! `numlock`, `capslock` and `alternative`. Each change goes out as a D-Bus
//! signal (broadcast, or to a configured destination) and, optionally, as a
//! `name:on`/`name:off` line written to an xmobar named pipe. The bar can
//! ask for a full re-send of all indicators by emitting an empty
//! `request_flush_all` signal on the daemon's own path.
//!
//! Emission is fire-and-forget: a dead session bus or a missing pipe reader
//! degrades to warnings, never into event pipeline failures.

use std::path::PathBuf;

use futures_util::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use zbus::{Connection, MatchRule, MessageStream};

mod error;
pub use error::NotifyError;

/// One status bar indicator with its new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
	NumLock(bool),
	CapsLock(bool),
	Alternative(bool),
}

impl Indicator {
	/// The D-Bus signal member name for this indicator.
	#[must_use]
	pub fn member(&self) -> &'static str {
		match self {
			Indicator::NumLock(_) => "numlock",
			Indicator::CapsLock(_) => "capslock",
			Indicator::Alternative(_) => "alternative",
		}
	}

	#[must_use]
	pub fn value(&self) -> bool {
		match *self {
			Indicator::NumLock(v) | Indicator::CapsLock(v) | Indicator::Alternative(v) => v,
		}
	}

	/// The line format understood by the xmobar pipe reader.
	#[must_use]
	pub fn line(&self) -> String {
		let state = if self.value() { "on" } else { "off" };
		format!("{}:{}", self.member(), state)
	}
}

/// Where on the bus the indicator signals go and where flush requests are
/// expected.
#[derive(Debug, Clone)]
pub struct BusConfig {
	/// Unicast destination for indicator signals; `None` broadcasts.
	pub destination: Option<String>,
	pub path: String,
	pub interface: String,
	/// Path and interface the daemon listens on for `request_flush_all`.
	pub flush_path: String,
	pub flush_interface: String,
}

impl Default for BusConfig {
	fn default() -> Self {
		BusConfig {
			destination: None,
			path: "/org/keywarp/indicators".into(),
			interface: "org.keywarp.Indicators".into(),
			flush_path: "/org/keywarp/daemon".into(),
			flush_interface: "org.keywarp.Daemon".into(),
		}
	}
}

/// A handle for pushing indicator updates to the status bar.
#[derive(Clone)]
pub struct StatusNotifier {
	conn: Option<Connection>,
	bus: BusConfig,
	pipe: Option<PathBuf>,
}

impl StatusNotifier {
	/// Connect to the session bus. A missing bus is not fatal; the
	/// notifier then only serves the pipe (if any).
	pub async fn new(bus: BusConfig, pipe: Option<PathBuf>) -> Self {
		let conn = match Connection::session().await {
			Ok(conn) => {
				info!("connected to the session bus");
				Some(conn)
			}
			Err(e) => {
				warn!(error = %e, "no session bus; status bar signals disabled");
				None
			}
		};
		StatusNotifier { conn, bus, pipe }
	}

	/// The underlying bus connection, when one exists.
	#[must_use]
	pub fn connection(&self) -> Option<&Connection> {
		self.conn.as_ref()
	}

	#[must_use]
	pub fn bus(&self) -> &BusConfig {
		&self.bus
	}

	/// Emit one indicator over every configured transport.
	pub async fn send(&self, indicator: Indicator) -> Result<(), NotifyError> {
		debug!(?indicator, "notifying the status bar");
		if let Some(conn) = &self.conn {
			conn.emit_signal(
				self.bus.destination.as_deref(),
				self.bus.path.as_str(),
				self.bus.interface.as_str(),
				indicator.member(),
				&(indicator.value(),),
			)
			.await?;
		}
		if let Some(path) = &self.pipe {
			let mut line = indicator.line();
			line.push('\n');
			let mut pipe = tokio::fs::OpenOptions::new()
				.write(true)
				.append(true)
				.open(path)
				.await?;
			pipe.write_all(line.as_bytes()).await?;
		}
		Ok(())
	}
}

/// A stream yielding one item per `request_flush_all` signal received on
/// the daemon's bus path.
///
/// Signals carrying a body are ignored; the protocol defines the request as
/// empty.
pub async fn flush_request_stream(
	conn: &Connection,
	bus: &BusConfig,
) -> Result<impl Stream<Item = ()>, NotifyError> {
	debug!("creating flush request filtering rule");
	let rule = MatchRule::builder()
		.msg_type(zbus::message::Type::Signal)
		.path(bus.flush_path.as_str())?
		.interface(bus.flush_interface.as_str())?
		.member("request_flush_all")?
		.build();
	debug!(?rule, "listening for flush requests");
	let stream = MessageStream::for_match_rule(rule, conn, None).await?;
	let stream = stream.filter_map(|message| async move {
		let message = message.ok()?;
		if message.body().signature().to_string().is_empty() {
			Some(())
		} else {
			debug!("ignoring request_flush_all with a non-empty body");
			None
		}
	});
	Ok(Box::pin(stream))
}
