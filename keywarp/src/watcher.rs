//! Reset modes when the focused X window changes.
//!
//! Switching windows with a chorded mode active is disorienting; the daemon
//! turns Caps Lock mode and Alternative mode off and resets the layout
//! group when `_NET_ACTIVE_WINDOW` changes on the root window. The watcher
//! blocks in `wait_for_event` on its own connection and thread, taking the
//! state lock only when a change actually arrives.

use std::sync::{Arc, Mutex};

use keywarp_common::KeywarpError;
use tracing::{debug, error};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ChangeWindowAttributesAux, ConnectionExt as _, EventMask};
use x11rb::protocol::Event;

use crate::events::Processor;
use crate::xorg::{x_err, XDisplay};

pub fn spawn_focus_watcher(processor: Arc<Mutex<Processor<XDisplay>>>) -> Result<(), KeywarpError> {
    let (conn, screen_num) = x11rb::connect(None).map_err(x_err)?;
    let root = conn.setup().roots[screen_num].root;
    let active_window = conn
        .intern_atom(false, b"_NET_ACTIVE_WINDOW")
        .map_err(x_err)?
        .reply()
        .map_err(x_err)?
        .atom;
    conn.change_window_attributes(
        root,
        &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
    )
    .map_err(x_err)?
    .check()
    .map_err(x_err)?;

    std::thread::spawn(move || loop {
        match conn.wait_for_event() {
            Ok(Event::PropertyNotify(event)) if event.atom == active_window => {
                debug!("focused window changed, resetting modes");
                let result = processor.lock().unwrap().reset_modes();
                if let Err(e) = result {
                    error!(error = %e, "could not reset modes after a focus change");
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "X connection lost in the focus watcher");
                break;
            }
        }
    });
    Ok(())
}
