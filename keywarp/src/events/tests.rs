use keywarp_common::{Key, KeyCode, Keymap, KeywarpError, Settings};
use keywarp_notify::Indicator;
use tokio::sync::mpsc;

use super::Processor;
use crate::state::{Leds, State};
use crate::xorg::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XCall {
    Press(KeyCode),
    Release(KeyCode),
    LayoutReset,
}

/// Records every X call instead of talking to a display.
#[derive(Default)]
struct FakeX {
    calls: Vec<XCall>,
    leds: Leds,
    layout: u8,
}

impl Backend for FakeX {
    fn press_key(&mut self, code: KeyCode) -> Result<(), KeywarpError> {
        self.calls.push(XCall::Press(code));
        Ok(())
    }

    fn release_key(&mut self, code: KeyCode) -> Result<(), KeywarpError> {
        self.calls.push(XCall::Release(code));
        Ok(())
    }

    fn leds(&mut self) -> Result<Leds, KeywarpError> {
        Ok(self.leds)
    }

    fn keyboard_layout(&mut self) -> Result<u8, KeywarpError> {
        Ok(self.layout)
    }

    fn reset_keyboard_layout(&mut self) -> Result<(), KeywarpError> {
        self.layout = 0;
        self.calls.push(XCall::LayoutReset);
        Ok(())
    }
}

struct Fixture {
    processor: Processor<FakeX>,
    indicators: mpsc::UnboundedReceiver<Indicator>,
}

fn fixture_with(settings: Settings, leds: Leds) -> Fixture {
    let settings = settings.normalized();
    let keymap = Keymap::new(&settings);
    let (tx, rx) = mpsc::unbounded_channel();
    let backend = FakeX { leds, ..FakeX::default() };
    let processor = Processor::new(keymap, settings, State::new(leds), backend, tx);
    Fixture { processor, indicators: rx }
}

fn fixture() -> Fixture {
    fixture_with(Settings::default(), Leds::default())
}

impl Fixture {
    fn code(&self, key: Key) -> KeyCode {
        self.processor.keymap.key_code(key).expect("key must have an X code")
    }

    fn feed(&mut self, key: Key, is_pressed: bool) {
        let code = self.code(key);
        self.processor
            .handle_event(key, code, is_pressed)
            .expect("event must be handled");
    }

    fn press(&mut self, key: Key) {
        self.feed(key, true);
    }

    fn release(&mut self, key: Key) {
        self.feed(key, false);
    }

    fn tap(&mut self, key: Key) {
        self.press(key);
        self.release(key);
    }

    /// Drain recorded X calls.
    fn calls(&mut self) -> Vec<XCall> {
        std::mem::take(&mut self.processor.backend.calls)
    }

    /// Drain queued indicator updates.
    fn sent(&mut self) -> Vec<Indicator> {
        let mut out = Vec::new();
        while let Ok(indicator) = self.indicators.try_recv() {
            out.push(indicator);
        }
        out
    }

    fn press_of(&self, key: Key) -> XCall {
        XCall::Press(self.code(key))
    }

    fn release_of(&self, key: Key) -> XCall {
        XCall::Release(self.code(key))
    }

    fn tap_of(&self, key: Key) -> [XCall; 2] {
        [self.press_of(key), self.release_of(key)]
    }
}

#[test]
fn plain_key_press_release() {
    let mut fx = fixture();
    fx.tap(Key::KeyA);
    assert_eq!(fx.calls(), vec![fx.press_of(Key::KeyA), fx.release_of(Key::KeyA)]);
    assert!(fx.processor.state.pressed.is_empty());
}

#[test]
fn duplicate_events_are_dropped() {
    let mut fx = fixture();
    fx.press(Key::KeyA);
    fx.press(Key::KeyA);
    assert_eq!(fx.calls(), vec![fx.press_of(Key::KeyA)], "second press must be a no-op");
    fx.release(Key::KeyA);
    fx.release(Key::KeyA);
    assert_eq!(fx.calls(), vec![fx.release_of(Key::KeyA)], "second release must be a no-op");
}

#[test]
fn unknown_evdev_codes_are_dropped() {
    let mut fx = fixture();
    fx.processor.handle_raw(0, true).unwrap();
    fx.processor.handle_raw(0x2ff, true).unwrap();
    assert_eq!(fx.calls(), vec![]);
    assert!(fx.processor.state.pressed.is_empty());
}

#[test]
fn raw_records_decode_through_the_keymap() {
    let mut fx = fixture();
    // KEY_A
    fx.processor.handle_raw(30, true).unwrap();
    fx.processor.handle_raw(30, false).unwrap();
    assert_eq!(fx.calls(), vec![fx.press_of(Key::KeyA), fx.release_of(Key::KeyA)]);
}

// A lone Caps Lock tap acts as Escape and leaves the state untouched.
#[test]
fn caps_lock_tap_acts_as_escape() {
    let mut fx = fixture();
    fx.tap(Key::CapsLock);
    assert_eq!(fx.calls(), fx.tap_of(Key::Escape).to_vec());
    assert!(fx.processor.state.pressed.is_empty());
    assert!(!fx.processor.state.combo.caps_lock_used_with_combos);
    assert!(!fx.processor.state.alternative);
}

// Caps Lock chorded with a letter becomes left Control.
#[test]
fn caps_lock_combo_upgrades_to_left_control() {
    let mut fx = fixture();
    fx.press(Key::CapsLock);
    fx.press(Key::KeyA);
    assert!(fx.processor.state.combo.caps_lock_used_with_combos);
    fx.release(Key::KeyA);
    fx.release(Key::CapsLock);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ControlLeft),
            fx.press_of(Key::KeyA),
            fx.release_of(Key::KeyA),
            fx.release_of(Key::ControlLeft),
        ]
    );
    assert!(!fx.processor.state.combo.caps_lock_used_with_combos);
    assert!(fx.processor.state.pressed.is_empty());
}

// Keys held before Caps Lock went down are not part of the combo; their
// release must not upgrade anything.
#[test]
fn keys_held_before_caps_lock_are_not_combo_parts() {
    let mut fx = fixture();
    fx.press(Key::KeyA);
    fx.press(Key::CapsLock);
    fx.release(Key::KeyA);
    assert_eq!(
        fx.calls(),
        vec![fx.press_of(Key::KeyA), fx.release_of(Key::KeyA)],
        "no control press for a pre-held key's release"
    );
    assert!(!fx.processor.state.combo.caps_lock_used_with_combos);
    // A fresh key after that does start the combo.
    fx.press(Key::KeyB);
    fx.release(Key::KeyB);
    fx.release(Key::CapsLock);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ControlLeft),
            fx.press_of(Key::KeyB),
            fx.release_of(Key::KeyB),
            fx.release_of(Key::ControlLeft),
        ]
    );
}

// Shift+Enter released in order stays mods+Enter; Enter is
// never upgraded to a control.
#[test]
fn enter_with_modifiers_fires_the_combo_on_enter_release() {
    let mut fx = fixture();
    fx.press(Key::ShiftLeft);
    fx.press(Key::Enter);
    assert_eq!(fx.calls(), vec![fx.press_of(Key::ShiftLeft)], "enter must stay silent");
    assert!(fx.processor.state.combo.enter_pressed_with_mods.is_some());
    fx.release(Key::Enter);
    fx.release(Key::ShiftLeft);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::Enter),
            fx.release_of(Key::Enter),
            fx.release_of(Key::ShiftLeft),
        ]
    );
    assert!(fx.processor.state.combo.enter_pressed_with_mods.is_none());
    assert!(fx.processor.state.pressed.is_empty());
}

// The modifier going up first still produces mods+Enter, with the release
// replayed afterwards.
#[test]
fn modifier_released_before_enter_still_fires_the_combo() {
    let mut fx = fixture();
    fx.press(Key::ShiftLeft);
    fx.press(Key::Enter);
    fx.release(Key::ShiftLeft);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ShiftLeft),
            fx.press_of(Key::Enter),
            fx.release_of(Key::Enter),
            fx.release_of(Key::ShiftLeft),
        ]
    );
    // Enter was consumed; its physical release is a duplicate now.
    fx.release(Key::Enter);
    assert_eq!(fx.calls(), vec![]);
    assert!(fx.processor.state.pressed.is_empty());
}

// A second modifier can join the pending combo without disturbing it.
#[test]
fn another_modifier_can_join_a_pending_enter_combo() {
    let mut fx = fixture();
    fx.press(Key::ShiftLeft);
    fx.press(Key::Enter);
    fx.press(Key::ShiftRight);
    assert_eq!(
        fx.processor.state.combo.enter_pressed_with_mods,
        Some([Key::ShiftLeft, Key::ShiftRight].into_iter().collect()),
    );
    fx.release(Key::Enter);
    fx.release(Key::ShiftLeft);
    fx.release(Key::ShiftRight);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ShiftLeft),
            fx.press_of(Key::ShiftRight),
            fx.press_of(Key::Enter),
            fx.release_of(Key::Enter),
            fx.release_of(Key::ShiftLeft),
            fx.release_of(Key::ShiftRight),
        ]
    );
}

// A non-modifier key downgrades pending Enter to its control role.
#[test]
fn ordinary_key_downgrades_pending_enter_to_a_control() {
    let mut fx = fixture();
    fx.press(Key::ShiftLeft);
    fx.press(Key::Enter);
    fx.press(Key::KeyA);
    assert!(fx.processor.state.combo.enter_pressed_with_mods.is_none());
    assert!(fx.processor.state.combo.enter_used_with_combos);
    fx.release(Key::KeyA);
    fx.release(Key::Enter);
    fx.release(Key::ShiftLeft);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ShiftLeft),
            fx.press_of(Key::ControlRight),
            fx.press_of(Key::KeyA),
            fx.release_of(Key::KeyA),
            fx.release_of(Key::ControlRight),
            fx.release_of(Key::ShiftLeft),
        ]
    );
}

// Enter chorded with a letter becomes right Control.
#[test]
fn enter_combo_upgrades_to_right_control() {
    let mut fx = fixture();
    fx.press(Key::Enter);
    fx.press(Key::KeyX);
    fx.release(Key::KeyX);
    fx.release(Key::Enter);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ControlRight),
            fx.press_of(Key::KeyX),
            fx.release_of(Key::KeyX),
            fx.release_of(Key::ControlRight),
        ]
    );
    assert!(fx.processor.state.pressed.is_empty());
}

#[test]
fn enter_tapped_alone_is_just_enter() {
    let mut fx = fixture();
    fx.tap(Key::Enter);
    assert_eq!(fx.calls(), fx.tap_of(Key::Enter).to_vec());
}

// Both Alts toggle Alternative mode and leave no Alt key
// hanging at X.
#[test]
fn both_alts_toggle_alternative_mode() {
    let mut fx = fixture();
    fx.press(Key::AltLeft);
    fx.press(Key::AltRight);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::AltLeft),
            fx.release_of(Key::AltLeft),
            fx.release_of(Key::AltRight),
        ]
    );
    assert!(fx.processor.state.alternative);
    assert_eq!(fx.sent(), vec![Indicator::Alternative(true)]);
    // The physical releases are duplicates by now.
    fx.release(Key::AltRight);
    fx.release(Key::AltLeft);
    assert_eq!(fx.calls(), vec![]);
    assert!(fx.processor.state.pressed.is_empty());

    // Toggling again turns the mode back off.
    fx.press(Key::AltLeft);
    fx.press(Key::AltRight);
    fx.release(Key::AltRight);
    fx.release(Key::AltLeft);
    assert!(!fx.processor.state.alternative);
    assert_eq!(fx.sent(), vec![Indicator::Alternative(false)]);
}

#[test]
fn alternative_mode_remaps_the_navigation_cluster() {
    let mut fx = fixture();
    fx.press(Key::AltLeft);
    fx.press(Key::AltRight);
    fx.calls();
    fx.sent();

    fx.tap(Key::KeyH);
    assert_eq!(fx.calls(), fx.tap_of(Key::Left).to_vec());
    fx.tap(Key::KeyJ);
    assert_eq!(fx.calls(), fx.tap_of(Key::Down).to_vec());
    // Unmapped keys are unaffected.
    fx.tap(Key::KeyA);
    assert_eq!(fx.calls(), fx.tap_of(Key::KeyA).to_vec());
}

#[test]
fn alternative_remap_applies_inside_control_combos() {
    let mut fx = fixture();
    fx.press(Key::AltLeft);
    fx.press(Key::AltRight);
    fx.calls();
    fx.sent();

    fx.press(Key::CapsLock);
    fx.press(Key::KeyH);
    fx.release(Key::KeyH);
    fx.release(Key::CapsLock);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ControlLeft),
            fx.press_of(Key::Left),
            fx.release_of(Key::Left),
            fx.release_of(Key::ControlLeft),
        ]
    );
}

// Both Controls toggle Caps Lock mode; both controls get
// released at X first.
#[test]
fn both_controls_toggle_caps_lock_mode() {
    let mut fx = fixture();
    fx.press(Key::ControlLeft);
    fx.press(Key::ControlRight);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ControlLeft),
            fx.release_of(Key::ControlLeft),
            fx.release_of(Key::ControlRight),
            fx.press_of(Key::RealCapsLock),
            fx.release_of(Key::RealCapsLock),
        ]
    );
    assert!(fx.processor.state.leds.caps_lock);
    assert_eq!(fx.sent(), vec![Indicator::CapsLock(true)]);
    fx.release(Key::ControlRight);
    fx.release(Key::ControlLeft);
    assert_eq!(fx.calls(), vec![]);
}

// The additional-control stand-ins chord too, without spurious releases
// for keys that never reached X.
#[test]
fn caps_lock_and_enter_chord_toggles_caps_lock_mode() {
    let mut fx = fixture();
    fx.press(Key::CapsLock);
    fx.press(Key::Enter);
    assert_eq!(
        fx.calls(),
        vec![fx.press_of(Key::RealCapsLock), fx.release_of(Key::RealCapsLock)],
        "only the caps lock toggle itself may reach X"
    );
    assert!(fx.processor.state.leds.caps_lock);
    assert!(fx.processor.state.pressed.is_empty());
    fx.release(Key::Enter);
    fx.release(Key::CapsLock);
    assert_eq!(fx.calls(), vec![]);
}

// An upgraded stand-in was really pressed at X, so the chord must release
// it before toggling.
#[test]
fn caps_enter_chord_releases_an_upgraded_control() {
    let mut fx = fixture();
    fx.press(Key::CapsLock);
    fx.press(Key::KeyA);
    fx.release(Key::KeyA);
    fx.press(Key::Enter);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::ControlLeft),
            fx.press_of(Key::KeyA),
            fx.release_of(Key::KeyA),
            fx.release_of(Key::ControlLeft),
            fx.press_of(Key::RealCapsLock),
            fx.release_of(Key::RealCapsLock),
        ]
    );
    assert!(!fx.processor.state.combo.caps_lock_used_with_combos);
    assert!(fx.processor.state.pressed.is_empty());
}

// A lone FN tap acts as Insert.
#[test]
fn fn_tapped_alone_acts_as_insert() {
    let mut fx = fixture();
    fx.tap(Key::Fn);
    assert_eq!(fx.calls(), fx.tap_of(Key::Insert).to_vec());
}

// FN+media triggers the media key, never Insert.
#[test]
fn fn_with_a_media_key_triggers_the_media_function() {
    let mut fx = fixture();
    fx.press(Key::Fn);
    fx.press(Key::PlayPause);
    fx.release(Key::PlayPause);
    fx.release(Key::Fn);
    assert_eq!(fx.calls(), fx.tap_of(Key::PlayPause).to_vec());
    assert!(!fx.processor.state.combo.apple_media_pressed);
    assert!(fx.processor.state.pressed.is_empty());
}

// Releasing FN while media keys are still held releases them at X; their
// later physical releases are duplicates.
#[test]
fn fn_release_tears_down_held_media_keys() {
    let mut fx = fixture();
    fx.press(Key::Fn);
    fx.press(Key::PlayPause);
    fx.release(Key::Fn);
    assert_eq!(
        fx.calls(),
        vec![fx.press_of(Key::PlayPause), fx.release_of(Key::PlayPause)]
    );
    assert!(!fx.processor.state.combo.apple_media_pressed);
    fx.release(Key::PlayPause);
    assert_eq!(fx.calls(), vec![]);
    assert!(fx.processor.state.pressed.is_empty());
}

#[test]
fn media_keys_without_fn_pass_through() {
    let mut fx = fixture();
    fx.tap(Key::PlayPause);
    assert_eq!(fx.calls(), fx.tap_of(Key::PlayPause).to_vec());
}

// A Caps Lock tap also resets: held keys are released in a deterministic
// order and a pending layout group is cleared.
#[test]
fn caps_lock_tap_resets_held_keys_and_layout() {
    let mut fx = fixture();
    fx.processor.backend.layout = 2;
    fx.press(Key::KeyS);
    fx.press(Key::KeyA);
    fx.press(Key::CapsLock);
    fx.release(Key::CapsLock);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::KeyS),
            fx.press_of(Key::KeyA),
            fx.press_of(Key::Escape),
            fx.release_of(Key::Escape),
            // Key-order: KeyA sorts before KeyS.
            fx.release_of(Key::KeyA),
            fx.release_of(Key::KeyS),
            XCall::LayoutReset,
        ]
    );
    assert!(fx.processor.state.pressed.is_empty());
    // The physical releases of A and S were consumed by the reset.
    fx.release(Key::KeyA);
    fx.release(Key::KeyS);
    assert_eq!(fx.calls(), vec![]);
}

#[test]
fn caps_lock_tap_does_not_reset_when_disabled() {
    let settings = Settings {
        reset_by_escape_on_capslock: false,
        ..Settings::default()
    };
    let mut fx = fixture_with(settings, Leds::default());
    fx.processor.backend.layout = 2;
    fx.press(Key::KeyA);
    fx.tap(Key::CapsLock);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::KeyA),
            fx.press_of(Key::Escape),
            fx.release_of(Key::Escape),
        ]
    );
    assert!(fx.processor.state.pressed.contains(&Key::KeyA));
}

// With --real-capslock the tap toggles actual Caps Lock and keeps the
// tracked LED and the status bar in sync.
#[test]
fn real_caps_lock_tap_toggles_the_led() {
    let settings = Settings { real_capslock: true, ..Settings::default() };
    let mut fx = fixture_with(settings, Leds::default());
    fx.tap(Key::CapsLock);
    assert_eq!(fx.calls(), fx.tap_of(Key::RealCapsLock).to_vec());
    assert!(fx.processor.state.leds.caps_lock);
    assert_eq!(fx.sent(), vec![Indicator::CapsLock(true)]);
    // Toggling twice returns the LED to its initial state.
    fx.tap(Key::CapsLock);
    assert!(!fx.processor.state.leds.caps_lock);
    assert_eq!(fx.sent(), vec![Indicator::CapsLock(false)]);
}

// Without additional controls Caps Lock is a plain Escape key and Enter a
// plain Enter key.
#[test]
fn no_additional_controls_leaves_caps_and_enter_plain() {
    let settings = Settings {
        additional_controls: false,
        ..Settings::default()
    };
    let mut fx = fixture_with(settings, Leds::default());
    fx.press(Key::CapsLock);
    fx.press(Key::KeyA);
    fx.release(Key::KeyA);
    fx.release(Key::CapsLock);
    assert_eq!(
        fx.calls(),
        vec![
            fx.press_of(Key::Escape),
            fx.press_of(Key::KeyA),
            fx.release_of(Key::KeyA),
            fx.release_of(Key::Escape),
        ],
        "no control upgrade may happen"
    );
    fx.tap(Key::Enter);
    assert_eq!(fx.calls(), fx.tap_of(Key::Enter).to_vec());
}

// Mode changes requested while keys are held are deferred until the
// keyboard is idle.
#[test]
fn mode_resets_are_deferred_until_idle() {
    let mut fx = fixture_with(Settings::default(), Leds { caps_lock: true, num_lock: false });
    fx.processor.state.alternative = true;
    fx.processor.backend.layout = 1;

    fx.press(Key::Tab);
    fx.calls();
    fx.processor.reset_modes().unwrap();
    assert_eq!(fx.calls(), vec![], "nothing may be applied while tab is held");
    assert_eq!(fx.processor.state.combo.caps_lock_mode_change, Some(false));
    assert_eq!(fx.processor.state.combo.alternative_mode_change, Some(false));
    assert!(fx.processor.state.combo.reset_kbd_layout);
    assert!(fx.processor.state.alternative, "alternative must still be on");

    fx.release(Key::Tab);
    assert_eq!(
        fx.calls(),
        vec![
            fx.release_of(Key::Tab),
            XCall::LayoutReset,
            fx.press_of(Key::RealCapsLock),
            fx.release_of(Key::RealCapsLock),
        ]
    );
    assert!(!fx.processor.state.leds.caps_lock);
    assert!(!fx.processor.state.alternative);
    assert!(fx.processor.state.combo.caps_lock_mode_change.is_none());
    assert!(fx.processor.state.combo.alternative_mode_change.is_none());
    assert!(!fx.processor.state.combo.reset_kbd_layout);
    assert_eq!(
        fx.sent(),
        vec![Indicator::CapsLock(false), Indicator::Alternative(false)]
    );
}

// A request that is already satisfied clears instead of queueing.
#[test]
fn satisfied_mode_requests_do_not_queue() {
    let mut fx = fixture();
    fx.press(Key::Tab);
    fx.processor.reset_modes().unwrap();
    assert!(fx.processor.state.combo.caps_lock_mode_change.is_none());
    assert!(fx.processor.state.combo.alternative_mode_change.is_none());
    // The layout reset has no "already" form until the keyboard is idle;
    // it then finds group 0 and does nothing.
    assert!(fx.processor.state.combo.reset_kbd_layout);
    fx.release(Key::Tab);
    assert_eq!(fx.calls(), vec![fx.press_of(Key::Tab), fx.release_of(Key::Tab)]);
    assert!(!fx.processor.state.combo.reset_kbd_layout);
}

#[test]
fn flush_reemits_all_indicators_from_the_server_leds() {
    let mut fx = fixture();
    fx.processor.backend.leds = Leds { caps_lock: true, num_lock: true };
    fx.processor.state.alternative = true;
    fx.processor.flush_indicators().unwrap();
    assert_eq!(
        fx.sent(),
        vec![
            Indicator::NumLock(true),
            Indicator::CapsLock(true),
            Indicator::Alternative(true),
        ]
    );
    assert_eq!(fx.processor.state.leds, Leds { caps_lock: true, num_lock: true });
}

// Invariant: the additional-control substates never overlap.
#[test]
fn additional_control_substates_are_exclusive() {
    let mut fx = fixture();
    fx.press(Key::ShiftLeft);
    fx.press(Key::CapsLock);
    assert!(!fx.processor.state.combo.pressed_before_caps_lock.is_empty());
    assert!(fx.processor.state.combo.pressed_before_enter.is_empty());
    fx.release(Key::CapsLock);
    assert!(fx.processor.state.combo.pressed_before_caps_lock.is_empty());
    fx.calls();
    fx.sent();

    fx.press(Key::KeyA);
    fx.press(Key::Enter);
    assert!(fx.processor.state.combo.pressed_before_caps_lock.is_empty());
    assert!(!fx.processor.state.combo.pressed_before_enter.is_empty());
    fx.release(Key::Enter);
    assert!(fx.processor.state.combo.pressed_before_enter.is_empty());
}
