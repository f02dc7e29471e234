//! Runtime behaviour flags, fixed at startup from the command line.

/// Which optional behaviours of the daemon are enabled for this run.
///
/// There is no configuration file; these come straight from CLI flags and
/// never change while the daemon is running.
#[derive(Debug, Clone)]
pub struct Settings {
	/// Log at `debug` instead of `info` by default.
	pub verbose: bool,
	/// Keep Caps Lock a real Caps Lock key instead of remapping taps to
	/// Escape. Implies `reset_by_escape_on_capslock = false`.
	pub real_capslock: bool,
	/// Allow the both-Alts chord to toggle Alternative mode.
	pub alternative_mode: bool,
	/// Make Caps Lock act as left Control and Enter as right Control when
	/// chorded with other keys.
	pub additional_controls: bool,
	/// A lone Caps Lock tap (acting as Escape) also resets Caps Lock mode,
	/// Alternative mode and the keyboard layout group.
	pub reset_by_escape_on_capslock: bool,
	/// Reset modes and layout group when the focused X window changes.
	pub reset_by_window_focus_event: bool,
}

impl Settings {
	/// Normalize flag interactions: a real Caps Lock key cannot double as
	/// a reset trigger.
	#[must_use]
	pub fn normalized(mut self) -> Self {
		if self.real_capslock {
			self.reset_by_escape_on_capslock = false;
		}
		self
	}
}

impl Default for Settings {
	fn default() -> Self {
		Settings {
			verbose: false,
			real_capslock: false,
			alternative_mode: true,
			additional_controls: true,
			reset_by_escape_on_capslock: true,
			reset_by_window_focus_event: true,
		}
	}
}
