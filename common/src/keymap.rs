//! The immutable lookup tables the event interpreter consults on every key
//! event.
//!
//! A [`Keymap`] is built once at startup from the [`Settings`] and never
//! mutated. It answers the questions the interpreter asks: which [`Key`] an
//! evdev code decodes to, which X key code a key is emitted as, what a key
//! becomes under Alternative mode, whether it belongs to the FN media
//! overlay, what it acts "as" when tapped alone, and which keys count as a
//! given modifier for combo purposes.

use std::collections::{BTreeSet, HashMap};

use crate::keys::{
	Key, KeyCode, ALTERNATIVE_TABLE, DECODE_TABLE, MEDIA_KEYS, MODIFIERS, REAL_CAPS_LOCK_CODE,
};
use crate::settings::Settings;

pub struct Keymap {
	by_evdev: HashMap<u16, Key>,
	x_codes: HashMap<Key, KeyCode>,
	alternative: HashMap<Key, Key>,
	media: BTreeSet<Key>,
	extra: HashMap<Key, BTreeSet<Key>>,
	modifiers: BTreeSet<Key>,
	real_capslock: bool,
}

impl Keymap {
	#[must_use]
	pub fn new(settings: &Settings) -> Self {
		let mut by_evdev = HashMap::new();
		let mut x_codes = HashMap::new();
		for (key, evdev, x) in DECODE_TABLE {
			by_evdev.insert(evdev, key);
			x_codes.insert(key, x);
		}
		x_codes.insert(Key::RealCapsLock, REAL_CAPS_LOCK_CODE);

		let alternative = if settings.alternative_mode {
			ALTERNATIVE_TABLE.into_iter().collect()
		} else {
			HashMap::new()
		};

		// Keys bound to a modifier by the additional-controls layer count
		// as that modifier when deciding whether a combo is modifiers-only.
		let mut extra: HashMap<Key, BTreeSet<Key>> = HashMap::new();
		if settings.additional_controls {
			extra.insert(Key::ControlLeft, BTreeSet::from([Key::CapsLock]));
			extra.insert(Key::ControlRight, BTreeSet::from([Key::Enter]));
		}

		let mut modifiers: BTreeSet<Key> = MODIFIERS.into_iter().collect();
		for extras in extra.values() {
			modifiers.extend(extras.iter().copied());
		}

		Keymap {
			by_evdev,
			x_codes,
			alternative,
			media: MEDIA_KEYS.into_iter().collect(),
			extra,
			modifiers,
			real_capslock: settings.real_capslock,
		}
	}

	/// Decode a raw evdev key code into a key name and its X key code.
	#[must_use]
	pub fn alias_of(&self, evdev_code: u16) -> Option<(Key, KeyCode)> {
		let key = *self.by_evdev.get(&evdev_code)?;
		let code = self.key_code(key)?;
		Some((key, code))
	}

	/// The X key code this key is emitted as.
	#[must_use]
	pub fn key_code(&self, key: Key) -> Option<KeyCode> {
		self.x_codes.get(&key).copied()
	}

	/// The X key code of the hardware key behind `key`, before the
	/// daemon's own remap. Only Caps Lock differs from [`Self::key_code`].
	#[must_use]
	pub fn real_key_code(&self, key: Key) -> Option<KeyCode> {
		match key {
			Key::CapsLock => Some(REAL_CAPS_LOCK_CODE),
			other => self.key_code(other),
		}
	}

	/// What `key` becomes while Alternative mode is on, if anything.
	#[must_use]
	pub fn alternative(&self, key: Key) -> Option<(Key, KeyCode)> {
		let target = *self.alternative.get(&key)?;
		let code = self.key_code(target)?;
		Some((target, code))
	}

	/// Whether `key` belongs to the FN media overlay.
	#[must_use]
	pub fn is_media(&self, key: Key) -> bool {
		self.media.contains(&key)
	}

	/// The X key code emitted for a media key under the FN overlay.
	#[must_use]
	pub fn media_code(&self, key: Key) -> Option<KeyCode> {
		if self.is_media(key) {
			self.key_code(key)
		} else {
			None
		}
	}

	/// The key name `key` acts as when tapped alone; used both for the
	/// emitted code on the tap paths and for log lines.
	#[must_use]
	pub fn as_name(&self, key: Key) -> Key {
		match key {
			Key::CapsLock if !self.real_capslock => Key::Escape,
			Key::Fn => Key::Insert,
			other => other,
		}
	}

	/// Keys bound to `key` by an upper layer, which therefore count as
	/// `key` when computing the set of held modifiers.
	#[must_use]
	pub fn extra_keys(&self, key: Key) -> BTreeSet<Key> {
		self.extra.get(&key).cloned().unwrap_or_default()
	}

	/// The eight named modifiers plus every extra key aliased to one.
	#[must_use]
	pub fn all_modifier_keys(&self) -> &BTreeSet<Key> {
		&self.modifiers
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_known_evdev_codes() {
		let map = Keymap::new(&Settings::default());
		assert_eq!(map.alias_of(58), Some((Key::CapsLock, 66)));
		assert_eq!(map.alias_of(28), Some((Key::Enter, 36)));
		assert_eq!(map.alias_of(30), Some((Key::KeyA, 38)));
		assert_eq!(map.alias_of(464), Some((Key::Fn, 118)));
		// Unknown codes decode to nothing and are dropped upstream.
		assert_eq!(map.alias_of(0), None);
		assert_eq!(map.alias_of(0x2ff), None);
	}

	#[test]
	fn every_decodable_key_has_an_x_code() {
		let map = Keymap::new(&Settings::default());
		for (key, evdev, _) in DECODE_TABLE {
			assert!(map.alias_of(evdev).is_some(), "{key:?} must decode");
			assert!(map.key_code(key).is_some(), "{key:?} must have an X code");
		}
		assert_eq!(map.key_code(Key::RealCapsLock), Some(REAL_CAPS_LOCK_CODE));
	}

	#[test]
	fn caps_lock_acts_as_escape_unless_real() {
		let map = Keymap::new(&Settings::default());
		assert_eq!(map.as_name(Key::CapsLock), Key::Escape);
		assert_eq!(map.real_key_code(Key::CapsLock), Some(REAL_CAPS_LOCK_CODE));

		let real = Settings { real_capslock: true, ..Settings::default() }.normalized();
		let map = Keymap::new(&real);
		assert_eq!(map.as_name(Key::CapsLock), Key::CapsLock);
	}

	#[test]
	fn fn_acts_as_insert() {
		let map = Keymap::new(&Settings::default());
		assert_eq!(map.as_name(Key::Fn), Key::Insert);
		assert_eq!(map.key_code(Key::Fn), map.key_code(Key::Insert));
	}

	#[test]
	fn alternative_layer_maps_navigation_cluster() {
		let map = Keymap::new(&Settings::default());
		assert_eq!(map.alternative(Key::KeyH), Some((Key::Left, 113)));
		assert_eq!(map.alternative(Key::KeyJ), Some((Key::Down, 116)));
		assert_eq!(map.alternative(Key::KeyK), Some((Key::Up, 111)));
		assert_eq!(map.alternative(Key::KeyL), Some((Key::Right, 114)));
		assert_eq!(map.alternative(Key::KeyA), None);

		let off = Settings { alternative_mode: false, ..Settings::default() };
		assert_eq!(Keymap::new(&off).alternative(Key::KeyH), None);
	}

	#[test]
	fn additional_controls_extend_the_modifier_set() {
		let map = Keymap::new(&Settings::default());
		assert_eq!(map.extra_keys(Key::ControlLeft), BTreeSet::from([Key::CapsLock]));
		assert_eq!(map.extra_keys(Key::ControlRight), BTreeSet::from([Key::Enter]));
		assert!(map.all_modifier_keys().contains(&Key::CapsLock));
		assert!(map.all_modifier_keys().contains(&Key::Enter));
		assert!(map.all_modifier_keys().contains(&Key::ShiftLeft));
		assert!(!map.all_modifier_keys().contains(&Key::KeyA));

		let off = Settings { additional_controls: false, ..Settings::default() };
		let map = Keymap::new(&off);
		assert!(map.extra_keys(Key::ControlLeft).is_empty());
		assert!(!map.all_modifier_keys().contains(&Key::CapsLock));
	}

	#[test]
	fn media_keys_are_recognized() {
		let map = Keymap::new(&Settings::default());
		assert!(map.is_media(Key::PlayPause));
		assert_eq!(map.media_code(Key::PlayPause), Some(172));
		assert_eq!(map.media_code(Key::KeyA), None);
	}
}
