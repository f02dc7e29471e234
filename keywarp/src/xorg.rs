//! X11 side effects: synthetic key events through XTest, keyboard LEDs,
//! and the XKB layout group.
//!
//! The interpreter only sees the [`Backend`] trait so tests can record
//! emitted events instead of talking to a real display.

use keywarp_common::{KeyCode, KeywarpError};
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xkb::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::state::Leds;

// Bits of `GetKeyboardControl`'s `led_mask`.
const LED_CAPS_LOCK: u32 = 1 << 0;
const LED_NUM_LOCK: u32 = 1 << 1;

pub(crate) fn x_err(err: impl std::fmt::Display) -> KeywarpError {
    KeywarpError::X(err.to_string())
}

fn xkb_err(err: impl std::fmt::Display) -> KeywarpError {
    KeywarpError::Xkb(err.to_string())
}

/// The X primitives the event interpreter needs.
///
/// All methods are synchronous and are called while holding the state lock:
/// the order of emitted X events must match the order of state changes.
pub trait Backend {
    fn press_key(&mut self, code: KeyCode) -> Result<(), KeywarpError>;
    fn release_key(&mut self, code: KeyCode) -> Result<(), KeywarpError>;
    fn press_release_key(&mut self, code: KeyCode) -> Result<(), KeywarpError> {
        self.press_key(code)?;
        self.release_key(code)
    }
    /// Current LED state as reported by the server.
    fn leds(&mut self) -> Result<Leds, KeywarpError>;
    /// The currently active XKB layout group.
    fn keyboard_layout(&mut self) -> Result<u8, KeywarpError>;
    /// Lock the first XKB layout group.
    fn reset_keyboard_layout(&mut self) -> Result<(), KeywarpError>;
}

/// A live connection to the X server.
pub struct XDisplay {
    conn: RustConnection,
    root: xproto::Window,
}

impl XDisplay {
    /// Connect to the display named by `$DISPLAY` and verify the XTEST and
    /// XKB extensions are usable.
    pub fn connect() -> Result<Self, KeywarpError> {
        let (conn, screen_num) = x11rb::connect(None).map_err(x_err)?;
        let root = conn.setup().roots[screen_num].root;
        let xtest_info = conn
            .extension_information(xtest::X11_EXTENSION_NAME)
            .map_err(x_err)?;
        if xtest_info.is_none() {
            return Err(KeywarpError::X(
                "the X server does not support the XTEST extension".into(),
            ));
        }
        let xkb = conn
            .xkb_use_extension(1, 0)
            .map_err(xkb_err)?
            .reply()
            .map_err(xkb_err)?;
        if !xkb.supported {
            return Err(KeywarpError::Xkb("the X server does not support XKB 1.0".into()));
        }
        debug!("connected to the X server");
        Ok(XDisplay { conn, root })
    }

    fn fake_key_event(&self, code: KeyCode, press: bool) -> Result<(), KeywarpError> {
        let kind = if press {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(kind, code, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .map_err(x_err)?;
        self.conn.flush().map_err(x_err)?;
        Ok(())
    }
}

impl Backend for XDisplay {
    fn press_key(&mut self, code: KeyCode) -> Result<(), KeywarpError> {
        self.fake_key_event(code, true)
    }

    fn release_key(&mut self, code: KeyCode) -> Result<(), KeywarpError> {
        self.fake_key_event(code, false)
    }

    fn leds(&mut self) -> Result<Leds, KeywarpError> {
        let reply = self
            .conn
            .get_keyboard_control()
            .map_err(x_err)?
            .reply()
            .map_err(x_err)?;
        Ok(Leds {
            caps_lock: reply.led_mask & LED_CAPS_LOCK != 0,
            num_lock: reply.led_mask & LED_NUM_LOCK != 0,
        })
    }

    fn keyboard_layout(&mut self) -> Result<u8, KeywarpError> {
        let state = self
            .conn
            .xkb_get_state(xkb::ID::USE_CORE_KBD.into())
            .map_err(xkb_err)?
            .reply()
            .map_err(xkb_err)?;
        Ok(state.group.into())
    }

    fn reset_keyboard_layout(&mut self) -> Result<(), KeywarpError> {
        self.conn
            .xkb_latch_lock_state(
                xkb::ID::USE_CORE_KBD.into(),
                xproto::ModMask::from(0u16),
                xproto::ModMask::from(0u16),
                true,
                xkb::Group::M1,
                xproto::ModMask::from(0u16),
                false,
                0,
            )
            .map_err(xkb_err)?
            .check()
            .map_err(xkb_err)?;
        Ok(())
    }
}

/// Detach physical devices from the X server so it stops processing the
/// keyboards this daemon is shadowing. Failures are warnings; the user may
/// simply not have `xinput` installed.
pub async fn disable_xinput_devices(names: &[String], ids: &[u32]) {
    for name in names {
        xinput_disable(name).await;
    }
    for id in ids {
        xinput_disable(&id.to_string()).await;
    }
}

async fn xinput_disable(device: &str) {
    match tokio::process::Command::new("xinput")
        .args(["disable", device])
        .status()
        .await
    {
        Ok(status) if status.success() => {
            info!(device, "disabled xinput device");
        }
        Ok(status) => {
            warn!(device, %status, "xinput disable failed");
        }
        Err(e) => {
            warn!(device, error = %e, "could not run xinput");
        }
    }
}
