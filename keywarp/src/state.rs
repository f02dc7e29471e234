//! The single mutable state record of the daemon.
//!
//! Everything the interpreter knows between two events lives here, guarded
//! by one mutex owned by `main`. Invariants, maintained by the interpreter:
//!
//! 1. `pressed` mirrors the physical keyboard minus keys the interpreter
//!    consumed (duplicates never reach it).
//! 2. At most one of the Caps Lock / Enter additional-control substates is
//!    active at a time.
//! 3. `enter_pressed_with_mods` being set implies Enter is held and the
//!    captured set contains only modifier keys.
//! 4. A pending mode change is re-examined after every event until the
//!    keyboard is idle.

use std::collections::BTreeSet;

use keywarp_common::Key;

/// Last observed keyboard LED state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Leds {
    pub caps_lock: bool,
    pub num_lock: bool,
}

/// Substates of the multi-key features.
#[derive(Debug, Clone, Default)]
pub struct ComboState {
    /// The FN media overlay is active: FN is held and at least one media
    /// key has been triggered under it.
    pub apple_media_pressed: bool,
    /// Caps Lock has been upgraded to left Control for the current hold.
    pub caps_lock_used_with_combos: bool,
    /// Enter has been upgraded to right Control for the current hold.
    pub enter_used_with_combos: bool,
    /// Keys already down when Caps Lock was pressed; their releases are not
    /// part of a Caps Lock combo.
    pub pressed_before_caps_lock: BTreeSet<Key>,
    /// Same, for Enter.
    pub pressed_before_enter: BTreeSet<Key>,
    /// Enter went down while exactly these modifiers were held, and nothing
    /// else has happened since.
    pub enter_pressed_with_mods: Option<BTreeSet<Key>>,
    /// Deferred Caps Lock mode toggle target.
    pub caps_lock_mode_change: Option<bool>,
    /// Deferred Alternative mode toggle target.
    pub alternative_mode_change: Option<bool>,
    /// A keyboard layout group reset is pending.
    pub reset_kbd_layout: bool,
}

/// The daemon state record.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Keys currently held down, as observed from evdev.
    pub pressed: BTreeSet<Key>,
    /// Whether Alternative mode is on.
    pub alternative: bool,
    pub leds: Leds,
    pub combo: ComboState,
}

impl State {
    #[must_use]
    pub fn new(leds: Leds) -> Self {
        State { leds, ..State::default() }
    }
}
