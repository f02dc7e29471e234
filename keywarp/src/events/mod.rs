//! The per-event decision tree.
//!
//! One [`Processor`] owns the daemon state, the keymap and the X backend.
//! [`Processor::handle_raw`] consumes one decoded evdev record under the
//! state lock: duplicates are dropped, the pressed set is updated, the
//! classifier below picks the first matching rule, and the deferred-mode
//! handlers get a chance to run. The classifier is the only writer of the
//! state during event processing.
//!
//! Rule order matters and is load-bearing: an in-flight Enter-with-mods
//! sequence intercepts everything, chords beat the FN overlay, the overlay
//! beats the additional-control rules, and the plain trigger is last.

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use keywarp_common::{Key, KeyCode, Keymap, KeywarpError, Settings};
use keywarp_notify::Indicator;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::state::State;
use crate::xorg::Backend;

pub struct Processor<B: Backend> {
    pub(crate) keymap: Keymap,
    pub(crate) settings: Settings,
    pub(crate) state: State,
    pub(crate) backend: B,
    indicators: mpsc::UnboundedSender<Indicator>,
}

impl<B: Backend> Processor<B> {
    pub fn new(
        keymap: Keymap,
        settings: Settings,
        state: State,
        backend: B,
        indicators: mpsc::UnboundedSender<Indicator>,
    ) -> Self {
        Processor { keymap, settings, state, backend, indicators }
    }

    /// Decode and process one raw evdev key record.
    pub fn handle_raw(&mut self, evdev_code: u16, is_pressed: bool) -> Result<(), KeywarpError> {
        match self.keymap.alias_of(evdev_code) {
            Some((key, code)) => self.handle_event(key, code, is_pressed),
            None => {
                trace!(evdev_code, "dropping unknown evdev code");
                Ok(())
            }
        }
    }

    /// One full turn of the interpreter: duplicate suppression, pressed-set
    /// update, the classifier, then the deferred-mode post-steps.
    pub(crate) fn handle_event(
        &mut self,
        key: Key,
        code: KeyCode,
        is_pressed: bool,
    ) -> Result<(), KeywarpError> {
        let was_pressed = self.state.pressed.contains(&key);
        if was_pressed == is_pressed {
            trace!(?key, is_pressed, "dropping duplicate event");
            return Ok(());
        }
        if is_pressed {
            self.state.pressed.insert(key);
        } else {
            self.state.pressed.remove(&key);
        }

        self.classify(key, code, is_pressed)?;

        self.handle_reset_kbd_layout()?;
        self.handle_caps_lock_mode_change()?;
        self.handle_alternative_mode_change()?;
        Ok(())
    }

    /// Pick the first matching rule for the event. A `continue` replays the
    /// same event against the updated state; at most two passes happen.
    fn classify(&mut self, key: Key, code: KeyCode, is_pressed: bool) -> Result<(), KeywarpError> {
        // Set when the in-flight Enter-with-mods sequence has absorbed this
        // event and the replay must fall through to the ordinary rules.
        let mut enter_mods_handled = false;
        loop {
            let other_pressed: BTreeSet<Key> = self
                .state
                .pressed
                .iter()
                .copied()
                .filter(|k| *k != key)
                .collect();

            // An Enter-with-modifiers sequence is in flight and some other
            // key changed.
            if !enter_mods_handled && key != Key::Enter {
                if let Some(mods) = self.state.combo.enter_pressed_with_mods.clone() {
                    if !is_pressed && mods.contains(&key) {
                        // A captured modifier went up before Enter did: the
                        // user meant mods+Enter. Fire Enter now, then
                        // replay the release itself.
                        debug!(?key, "modifier released before enter, firing the combo");
                        let enter = self.code_of(Key::Enter)?;
                        self.backend.press_release_key(enter)?;
                        self.state.combo.enter_pressed_with_mods = None;
                        self.state.pressed.remove(&Key::Enter);
                        continue;
                    }
                    if is_pressed && self.keymap.all_modifier_keys().contains(&key) {
                        let mut mods = mods;
                        mods.insert(key);
                        trace!(?key, "another modifier joined the pending enter combo");
                        self.state.combo.enter_pressed_with_mods = Some(mods);
                        enter_mods_handled = true;
                        continue;
                    }
                    // Anything else: Enter stops being a pending combo and
                    // falls back to its additional-control role.
                    self.state.combo.enter_pressed_with_mods = None;
                    continue;
                }
            }

            // Both Alts alone toggle Alternative mode.
            if self.settings.alternative_mode
                && matches!(key, Key::AltLeft | Key::AltRight)
                && self.state.pressed == BTreeSet::from([Key::AltLeft, Key::AltRight])
            {
                debug!("both alts pressed, toggling alternative mode");
                let left = self.code_of(Key::AltLeft)?;
                let right = self.code_of(Key::AltRight)?;
                self.backend.release_key(left)?;
                self.backend.release_key(right)?;
                self.state.pressed.remove(&Key::AltLeft);
                self.state.pressed.remove(&Key::AltRight);
                return self.turn_alternative(None);
            }

            // FN tapped alone acts as Insert; releasing it also tears down
            // the media overlay.
            if key == Key::Fn {
                if is_pressed {
                    return Ok(());
                }
                if self.state.combo.apple_media_pressed {
                    debug!("fn released, releasing still-held media keys");
                    self.release_media_keys()?;
                    self.state.combo.apple_media_pressed = false;
                    return Ok(());
                }
                debug!("fn tapped alone, acting as insert");
                let insert = self.code_of(self.keymap.as_name(Key::Fn))?;
                return self.backend.press_release_key(insert);
            }

            // A media key while FN is held triggers its media function.
            if self.state.pressed.contains(&Key::Fn) && self.keymap.is_media(key) {
                self.state.combo.apple_media_pressed = true;
                return self.smart_trigger(key, code, is_pressed);
            }

            // Both Controls, or their additional-control stand-ins, toggle
            // Caps Lock mode.
            let controls = BTreeSet::from([Key::ControlLeft, Key::ControlRight]);
            if controls.contains(&key) && self.state.pressed == controls {
                debug!("both controls pressed, toggling caps lock mode");
                let left = self.code_of(Key::ControlLeft)?;
                let right = self.code_of(Key::ControlRight)?;
                self.backend.release_key(left)?;
                self.backend.release_key(right)?;
                self.state.pressed.remove(&Key::ControlLeft);
                self.state.pressed.remove(&Key::ControlRight);
                return self.turn_caps_lock(None);
            }
            let stand_ins = BTreeSet::from([Key::CapsLock, Key::Enter]);
            if self.settings.additional_controls
                && stand_ins.contains(&key)
                && self.state.pressed == stand_ins
            {
                debug!("caps lock and enter pressed, toggling caps lock mode");
                // Neither key was pressed at X unless it had already been
                // upgraded to its Control role; only release what is down.
                if self.state.combo.caps_lock_used_with_combos {
                    let left = self.code_of(Key::ControlLeft)?;
                    self.backend.release_key(left)?;
                }
                if self.state.combo.enter_used_with_combos {
                    let right = self.code_of(Key::ControlRight)?;
                    self.backend.release_key(right)?;
                }
                self.state.pressed.remove(&Key::CapsLock);
                self.state.pressed.remove(&Key::Enter);
                self.clear_additional_control_state();
                return self.turn_caps_lock(None);
            }

            // Enter pressed while only modifiers are held: hold judgment
            // until we see whether it is mods+Enter or Enter-as-Control.
            if self.settings.additional_controls && key == Key::Enter {
                if is_pressed
                    && !other_pressed.is_empty()
                    && other_pressed.is_subset(self.keymap.all_modifier_keys())
                {
                    debug!(mods = ?other_pressed, "enter pressed with modifiers only");
                    self.state.combo.enter_pressed_with_mods = Some(other_pressed);
                    return Ok(());
                }
                if !is_pressed && self.state.combo.enter_pressed_with_mods.is_some() {
                    debug!("enter released while pending, firing mods+enter");
                    self.state.combo.enter_pressed_with_mods = None;
                    let enter = self.code_of(Key::Enter)?;
                    return self.backend.press_release_key(enter);
                }
            }

            // A lone Caps Lock or Enter: Control inside combos, Escape or
            // Enter when tapped by itself.
            if self.settings.additional_controls
                && matches!(key, Key::CapsLock | Key::Enter)
                && !(key == Key::Enter && self.state.combo.enter_pressed_with_mods.is_some())
            {
                return self.additional_control(key, is_pressed, other_pressed);
            }

            // Some other key while Caps Lock or Enter is held: the held key
            // becomes a Control for the duration of the combo. Suspended
            // while an Enter-with-mods sequence is pending.
            if self.settings.additional_controls
                && self.state.combo.enter_pressed_with_mods.is_none()
                && (self.state.pressed.contains(&Key::CapsLock)
                    || self.state.pressed.contains(&Key::Enter))
            {
                return self.additional_control_combo(key, code, is_pressed);
            }

            // Caps Lock remapped to Escape when additional controls are
            // off.
            if key == Key::CapsLock && !self.settings.real_capslock {
                let escape = self.code_of(self.keymap.as_name(Key::CapsLock))?;
                if is_pressed {
                    self.backend.press_key(escape)?;
                } else {
                    self.backend.release_key(escape)?;
                    if self.settings.reset_by_escape_on_capslock {
                        self.reset_all()?;
                    }
                }
                return Ok(());
            }

            return self.smart_trigger(key, code, is_pressed);
        }
    }

    /// A Caps Lock or Enter event in its additional-control role.
    fn additional_control(
        &mut self,
        key: Key,
        is_pressed: bool,
        other_pressed: BTreeSet<Key>,
    ) -> Result<(), KeywarpError> {
        if is_pressed {
            // Nothing goes to X yet; remember what was already held so
            // those releases are not mistaken for combo parts.
            trace!(?key, snapshot = ?other_pressed, "additional control pressed");
            match key {
                Key::CapsLock => self.state.combo.pressed_before_caps_lock = other_pressed,
                _ => self.state.combo.pressed_before_enter = other_pressed,
            }
            return Ok(());
        }
        match key {
            Key::CapsLock => {
                self.state.combo.pressed_before_caps_lock.clear();
                if self.state.combo.caps_lock_used_with_combos {
                    debug!("caps lock released after a combo, releasing left control");
                    self.state.combo.caps_lock_used_with_combos = false;
                    let control = self.code_of(Key::ControlLeft)?;
                    return self.backend.release_key(control);
                }
                if self.settings.real_capslock {
                    debug!("caps lock tapped alone, toggling caps lock");
                    self.change_caps_lock()?;
                } else {
                    debug!("caps lock tapped alone, acting as escape");
                    let escape = self.code_of(self.keymap.as_name(Key::CapsLock))?;
                    self.backend.press_release_key(escape)?;
                }
                if self.settings.reset_by_escape_on_capslock {
                    self.reset_all()?;
                }
                Ok(())
            }
            _ => {
                self.state.combo.pressed_before_enter.clear();
                if self.state.combo.enter_used_with_combos {
                    debug!("enter released after a combo, releasing right control");
                    self.state.combo.enter_used_with_combos = false;
                    let control = self.code_of(Key::ControlRight)?;
                    return self.backend.release_key(control);
                }
                debug!("enter tapped alone");
                let enter = self.code_of(Key::Enter)?;
                self.backend.press_release_key(enter)
            }
        }
    }

    /// A key event while Caps Lock or Enter is held as a pending Control.
    fn additional_control_combo(
        &mut self,
        key: Key,
        code: KeyCode,
        is_pressed: bool,
    ) -> Result<(), KeywarpError> {
        // At most one of the two can be held here; a simultaneous pair is
        // consumed by the chord rule before ever reaching this point.
        let caps_held = self.state.pressed.contains(&Key::CapsLock);
        let (control, upgraded) = if caps_held {
            (Key::ControlLeft, self.state.combo.caps_lock_used_with_combos)
        } else {
            (Key::ControlRight, self.state.combo.enter_used_with_combos)
        };

        let pressed_before = if caps_held {
            &mut self.state.combo.pressed_before_caps_lock
        } else {
            &mut self.state.combo.pressed_before_enter
        };
        if !is_pressed && pressed_before.contains(&key) {
            // Held since before the control went down, so not part of the
            // combo; release it plainly.
            pressed_before.remove(&key);
            return self.smart_trigger(key, code, is_pressed);
        }

        if !upgraded {
            debug!(held = ?control, "upgrading the held key to a control");
            let control_code = self.code_of(control)?;
            self.backend.press_key(control_code)?;
            if caps_held {
                self.state.combo.caps_lock_used_with_combos = true;
            } else {
                self.state.combo.enter_used_with_combos = true;
            }
        }
        self.smart_trigger(key, code, is_pressed)
    }

    /// Press or release `key`, remapped through the Alternative layer when
    /// the mode is on.
    fn smart_trigger(&mut self, key: Key, code: KeyCode, is_pressed: bool) -> Result<(), KeywarpError> {
        let code = match self.alternative_for(key) {
            Some((target, alternative_code)) => {
                trace!(?key, as_key = ?target, "triggering the alternative remap");
                alternative_code
            }
            None => code,
        };
        if is_pressed {
            self.backend.press_key(code)
        } else {
            self.backend.release_key(code)
        }
    }

    fn alternative_for(&self, key: Key) -> Option<(Key, KeyCode)> {
        if self.settings.alternative_mode && self.state.alternative {
            self.keymap.alternative(key)
        } else {
            None
        }
    }

    /// Release every held media key at X and drop it from the pressed set;
    /// their physical releases will arrive later and be discarded as
    /// duplicates.
    fn release_media_keys(&mut self) -> Result<(), KeywarpError> {
        let media: Vec<Key> = self
            .state
            .pressed
            .iter()
            .copied()
            .filter(|k| self.keymap.is_media(*k))
            .collect();
        for key in media {
            let code = self
                .keymap
                .media_code(key)
                .ok_or(KeywarpError::MissingKeyCode(key))?;
            self.backend.release_key(code)?;
            self.state.pressed.remove(&key);
        }
        Ok(())
    }

    /// Release everything held at X (in `Key` order), forget it all, and
    /// request Caps Lock off, Alternative off and a layout reset.
    pub(crate) fn reset_all(&mut self) -> Result<(), KeywarpError> {
        debug!("resetting held keys, modes and the layout group");
        let held: Vec<Key> = self.state.pressed.iter().copied().collect();
        for key in held {
            let code = self.code_of(key)?;
            self.backend.release_key(code)?;
        }
        self.state.pressed.clear();
        self.state.combo.apple_media_pressed = false;
        self.state.combo.enter_pressed_with_mods = None;
        self.clear_additional_control_state();
        self.reset_modes()
    }

    /// Request Caps Lock off, Alternative off and a layout reset, each
    /// applied now or once the keyboard is idle.
    pub fn reset_modes(&mut self) -> Result<(), KeywarpError> {
        self.turn_caps_lock(Some(false))?;
        self.turn_alternative(Some(false))?;
        self.turn_reset_layout()
    }

    /// Re-read the LEDs and re-emit all indicators; used at startup and
    /// when the status bar asks for a flush.
    pub fn flush_indicators(&mut self) -> Result<(), KeywarpError> {
        let leds = self.backend.leds()?;
        self.state.leds = leds;
        self.notify(Indicator::NumLock(leds.num_lock));
        self.notify(Indicator::CapsLock(leds.caps_lock));
        self.notify(Indicator::Alternative(self.state.alternative));
        Ok(())
    }

    pub(crate) fn clear_additional_control_state(&mut self) {
        self.state.combo.caps_lock_used_with_combos = false;
        self.state.combo.enter_used_with_combos = false;
        self.state.combo.pressed_before_caps_lock.clear();
        self.state.combo.pressed_before_enter.clear();
    }

    pub(crate) fn code_of(&self, key: Key) -> Result<KeyCode, KeywarpError> {
        self.keymap
            .key_code(key)
            .ok_or(KeywarpError::MissingKeyCode(key))
    }

    /// Queue an indicator update for the status bar. Never blocks and
    /// never fails the event path.
    pub(crate) fn notify(&self, indicator: Indicator) {
        if self.indicators.send(indicator).is_err() {
            warn!(?indicator, "status bar channel closed, dropping indicator update");
        }
    }
}
