//! Symbolic key names and the static evdev/X key code tables.
//!
//! X key codes follow the Xorg evdev convention: X code = kernel code + 8.
//! Two keys break the pattern. [`Key::RealCapsLock`] is never produced by
//! decoding; it names the hardware Caps Lock X code the daemon taps to
//! toggle the Caps Lock LED. [`Key::Fn`] (kernel code 464) has no X code in
//! the 8-bit range at all and borrows the code of [`Key::Insert`], the key
//! it acts as when tapped alone.

/// An X11 key code as accepted by the XTest extension.
pub type KeyCode = u8;

/// Every key the daemon recognizes.
///
/// The derived [`Ord`] follows declaration order; it is the deterministic
/// order in which held keys are released when the daemon resets itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
	Escape,
	Num1,
	Num2,
	Num3,
	Num4,
	Num5,
	Num6,
	Num7,
	Num8,
	Num9,
	Num0,
	Minus,
	Equal,
	Backspace,
	Tab,
	KeyQ,
	KeyW,
	KeyE,
	KeyR,
	KeyT,
	KeyY,
	KeyU,
	KeyI,
	KeyO,
	KeyP,
	LeftBracket,
	RightBracket,
	Enter,
	ControlLeft,
	KeyA,
	KeyS,
	KeyD,
	KeyF,
	KeyG,
	KeyH,
	KeyJ,
	KeyK,
	KeyL,
	Semicolon,
	Apostrophe,
	Grave,
	ShiftLeft,
	Backslash,
	KeyZ,
	KeyX,
	KeyC,
	KeyV,
	KeyB,
	KeyN,
	KeyM,
	Comma,
	Dot,
	Slash,
	ShiftRight,
	AltLeft,
	Space,
	CapsLock,
	RealCapsLock,
	F1,
	F2,
	F3,
	F4,
	F5,
	F6,
	F7,
	F8,
	F9,
	F10,
	F11,
	F12,
	NumLock,
	ScrollLock,
	ControlRight,
	AltRight,
	Home,
	Up,
	PageUp,
	Left,
	Right,
	End,
	Down,
	PageDown,
	Insert,
	Delete,
	SuperLeft,
	SuperRight,
	Fn,
	Mute,
	VolumeDown,
	VolumeUp,
	Eject,
	NextSong,
	PlayPause,
	PreviousSong,
	StopCd,
	BrightnessDown,
	BrightnessUp,
}

/// The eight named modifier keys.
pub const MODIFIERS: [Key; 8] = [
	Key::ControlLeft,
	Key::ControlRight,
	Key::ShiftLeft,
	Key::ShiftRight,
	Key::AltLeft,
	Key::AltRight,
	Key::SuperLeft,
	Key::SuperRight,
];

/// `(key, kernel code, X code)` for every key that can be decoded from an
/// evdev record. [`Key::RealCapsLock`] is deliberately absent.
pub const DECODE_TABLE: [(Key, u16, KeyCode); 96] = [
	(Key::Escape, 1, 9),
	(Key::Num1, 2, 10),
	(Key::Num2, 3, 11),
	(Key::Num3, 4, 12),
	(Key::Num4, 5, 13),
	(Key::Num5, 6, 14),
	(Key::Num6, 7, 15),
	(Key::Num7, 8, 16),
	(Key::Num8, 9, 17),
	(Key::Num9, 10, 18),
	(Key::Num0, 11, 19),
	(Key::Minus, 12, 20),
	(Key::Equal, 13, 21),
	(Key::Backspace, 14, 22),
	(Key::Tab, 15, 23),
	(Key::KeyQ, 16, 24),
	(Key::KeyW, 17, 25),
	(Key::KeyE, 18, 26),
	(Key::KeyR, 19, 27),
	(Key::KeyT, 20, 28),
	(Key::KeyY, 21, 29),
	(Key::KeyU, 22, 30),
	(Key::KeyI, 23, 31),
	(Key::KeyO, 24, 32),
	(Key::KeyP, 25, 33),
	(Key::LeftBracket, 26, 34),
	(Key::RightBracket, 27, 35),
	(Key::Enter, 28, 36),
	(Key::ControlLeft, 29, 37),
	(Key::KeyA, 30, 38),
	(Key::KeyS, 31, 39),
	(Key::KeyD, 32, 40),
	(Key::KeyF, 33, 41),
	(Key::KeyG, 34, 42),
	(Key::KeyH, 35, 43),
	(Key::KeyJ, 36, 44),
	(Key::KeyK, 37, 45),
	(Key::KeyL, 38, 46),
	(Key::Semicolon, 39, 47),
	(Key::Apostrophe, 40, 48),
	(Key::Grave, 41, 49),
	(Key::ShiftLeft, 42, 50),
	(Key::Backslash, 43, 51),
	(Key::KeyZ, 44, 52),
	(Key::KeyX, 45, 53),
	(Key::KeyC, 46, 54),
	(Key::KeyV, 47, 55),
	(Key::KeyB, 48, 56),
	(Key::KeyN, 49, 57),
	(Key::KeyM, 50, 58),
	(Key::Comma, 51, 59),
	(Key::Dot, 52, 60),
	(Key::Slash, 53, 61),
	(Key::ShiftRight, 54, 62),
	(Key::AltLeft, 56, 64),
	(Key::Space, 57, 65),
	(Key::CapsLock, 58, 66),
	(Key::F1, 59, 67),
	(Key::F2, 60, 68),
	(Key::F3, 61, 69),
	(Key::F4, 62, 70),
	(Key::F5, 63, 71),
	(Key::F6, 64, 72),
	(Key::F7, 65, 73),
	(Key::F8, 66, 74),
	(Key::F9, 67, 75),
	(Key::F10, 68, 76),
	(Key::NumLock, 69, 77),
	(Key::ScrollLock, 70, 78),
	(Key::F11, 87, 95),
	(Key::F12, 88, 96),
	(Key::ControlRight, 97, 105),
	(Key::AltRight, 100, 108),
	(Key::Home, 102, 110),
	(Key::Up, 103, 111),
	(Key::PageUp, 104, 112),
	(Key::Left, 105, 113),
	(Key::Right, 106, 114),
	(Key::End, 107, 115),
	(Key::Down, 108, 116),
	(Key::PageDown, 109, 117),
	(Key::Insert, 110, 118),
	(Key::Delete, 111, 119),
	(Key::Mute, 113, 121),
	(Key::VolumeDown, 114, 122),
	(Key::VolumeUp, 115, 123),
	(Key::SuperLeft, 125, 133),
	(Key::SuperRight, 126, 134),
	(Key::Eject, 161, 169),
	(Key::NextSong, 163, 171),
	(Key::PlayPause, 164, 172),
	(Key::PreviousSong, 165, 173),
	(Key::StopCd, 166, 174),
	(Key::BrightnessDown, 224, 232),
	(Key::BrightnessUp, 225, 233),
	// KEY_FN, only emitted by Apple-style keyboards; acts as Insert.
	(Key::Fn, 464, 118),
];

/// The X key code of the hardware Caps Lock key.
pub const REAL_CAPS_LOCK_CODE: KeyCode = 66;

/// Media keys covered by the FN overlay.
pub const MEDIA_KEYS: [Key; 10] = [
	Key::Mute,
	Key::VolumeDown,
	Key::VolumeUp,
	Key::Eject,
	Key::NextSong,
	Key::PlayPause,
	Key::PreviousSong,
	Key::StopCd,
	Key::BrightnessDown,
	Key::BrightnessUp,
];

/// The Alternative-mode layer: `(key, what it becomes while the mode is on)`.
pub const ALTERNATIVE_TABLE: [(Key, Key); 10] = [
	(Key::KeyH, Key::Left),
	(Key::KeyJ, Key::Down),
	(Key::KeyK, Key::Up),
	(Key::KeyL, Key::Right),
	(Key::KeyU, Key::Home),
	(Key::KeyI, Key::End),
	(Key::KeyO, Key::PageUp),
	(Key::KeyP, Key::PageDown),
	(Key::KeyB, Key::Backspace),
	(Key::KeyD, Key::Delete),
];
