//! Deferred mode changes.
//!
//! Caps Lock mode, Alternative mode and the keyboard layout group must not
//! change while keys are physically held; the release events would be
//! interpreted under a different mode than the presses. Each `turn_*`
//! request applies immediately when the keyboard is idle and is otherwise
//! parked in the state; the matching `handle_*` runs after every event and
//! applies the parked change at the first idle moment.
//!
//! `target: Some(on)` is the idempotent form (a request that is already
//! satisfied just clears the parked slot); `target: None` is the
//! unconditional toggle used by the chords.

use keywarp_common::{Key, KeywarpError};
use keywarp_notify::Indicator;
use tracing::{debug, trace};

use crate::events::Processor;
use crate::xorg::Backend;

impl<B: Backend> Processor<B> {
    pub(crate) fn turn_caps_lock(&mut self, target: Option<bool>) -> Result<(), KeywarpError> {
        if let Some(want) = target {
            if self.state.leds.caps_lock == want {
                trace!(want, "caps lock mode is already there");
                self.state.combo.caps_lock_mode_change = None;
                return Ok(());
            }
        }
        let want = target.unwrap_or(!self.state.leds.caps_lock);
        if self.state.pressed.is_empty() {
            debug!(want, "changing caps lock mode now");
            self.change_caps_lock()?;
            self.state.combo.caps_lock_mode_change = None;
        } else {
            debug!(want, "deferring the caps lock mode change until the keyboard is idle");
            self.state.combo.caps_lock_mode_change = Some(want);
        }
        Ok(())
    }

    pub(crate) fn handle_caps_lock_mode_change(&mut self) -> Result<(), KeywarpError> {
        let Some(want) = self.state.combo.caps_lock_mode_change else {
            return Ok(());
        };
        if self.state.leds.caps_lock == want {
            self.state.combo.caps_lock_mode_change = None;
        } else if self.state.pressed.is_empty() {
            debug!(want, "keyboard is idle, applying the deferred caps lock mode change");
            self.change_caps_lock()?;
            self.state.combo.caps_lock_mode_change = None;
        }
        Ok(())
    }

    /// Tap the hardware Caps Lock key, flip the tracked LED and tell the
    /// status bar.
    pub(crate) fn change_caps_lock(&mut self) -> Result<(), KeywarpError> {
        let code = self
            .keymap
            .real_key_code(Key::CapsLock)
            .ok_or(KeywarpError::MissingKeyCode(Key::RealCapsLock))?;
        self.backend.press_release_key(code)?;
        self.state.leds.caps_lock = !self.state.leds.caps_lock;
        self.notify(Indicator::CapsLock(self.state.leds.caps_lock));
        Ok(())
    }

    pub(crate) fn turn_alternative(&mut self, target: Option<bool>) -> Result<(), KeywarpError> {
        if let Some(want) = target {
            if self.state.alternative == want {
                trace!(want, "alternative mode is already there");
                self.state.combo.alternative_mode_change = None;
                return Ok(());
            }
        }
        let want = target.unwrap_or(!self.state.alternative);
        if self.state.pressed.is_empty() {
            debug!(want, "changing alternative mode now");
            self.change_alternative(want);
            self.state.combo.alternative_mode_change = None;
        } else {
            debug!(want, "deferring the alternative mode change until the keyboard is idle");
            self.state.combo.alternative_mode_change = Some(want);
        }
        Ok(())
    }

    pub(crate) fn handle_alternative_mode_change(&mut self) -> Result<(), KeywarpError> {
        let Some(want) = self.state.combo.alternative_mode_change else {
            return Ok(());
        };
        if self.state.alternative == want {
            self.state.combo.alternative_mode_change = None;
        } else if self.state.pressed.is_empty() {
            debug!(want, "keyboard is idle, applying the deferred alternative mode change");
            self.change_alternative(want);
            self.state.combo.alternative_mode_change = None;
        }
        Ok(())
    }

    fn change_alternative(&mut self, on: bool) {
        self.state.alternative = on;
        self.notify(Indicator::Alternative(on));
    }

    pub(crate) fn turn_reset_layout(&mut self) -> Result<(), KeywarpError> {
        if self.state.pressed.is_empty() {
            self.reset_layout_now()?;
            self.state.combo.reset_kbd_layout = false;
        } else {
            debug!("deferring the layout group reset until the keyboard is idle");
            self.state.combo.reset_kbd_layout = true;
        }
        Ok(())
    }

    pub(crate) fn handle_reset_kbd_layout(&mut self) -> Result<(), KeywarpError> {
        if self.state.combo.reset_kbd_layout && self.state.pressed.is_empty() {
            self.reset_layout_now()?;
            self.state.combo.reset_kbd_layout = false;
        }
        Ok(())
    }

    fn reset_layout_now(&mut self) -> Result<(), KeywarpError> {
        let group = self.backend.keyboard_layout()?;
        if group != 0 {
            debug!(group, "resetting the keyboard layout group");
            self.backend.reset_keyboard_layout()?;
        }
        Ok(())
    }
}
