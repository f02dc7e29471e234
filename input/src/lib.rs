//! Input subsystem for the keywarp daemon.
//!
//! Opens evdev character devices and streams their key events into one
//! channel consumed by the event interpreter. Reading happens on dedicated
//! tokio tasks so a blocked device never stalls the interpreter.

pub mod device;

pub use device::Device;

use std::{
    io,
    path::{Path, PathBuf},
};

/// Scan `base` (normally `/dev/input`) for devices that look like
/// keyboards.
///
/// A device counts as a keyboard when it reports `KEY_ENTER` among its
/// supported keys; pointers and switches do not.
pub fn discover_keyboards(base: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(base)? {
        let path = entry?.path();
        let is_event_node = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("event"));
        if !is_event_node {
            continue;
        }
        match evdev::Device::open(&path) {
            Ok(dev) => {
                let is_keyboard = dev
                    .supported_keys()
                    .is_some_and(|keys| keys.contains(evdev::Key::KEY_ENTER));
                if is_keyboard {
                    tracing::info!(
                        path = %path.display(),
                        name = dev.name().unwrap_or("?"),
                        "found keyboard device"
                    );
                    found.push(path);
                }
            }
            // Not being able to open some nodes (joysticks owned by other
            // users, etc.) is normal when scanning.
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping input device")
            }
        }
    }
    found.sort();
    Ok(found)
}
