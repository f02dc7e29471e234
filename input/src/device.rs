use std::{
    ffi::{OsStr, OsString},
    io,
    path::PathBuf,
};

use evdev::InputEventKind;
use tokio::{sync::mpsc, task::JoinHandle};

/// One opened evdev device with a background task pumping its key events
/// into the shared channel.
pub struct Device {
    task: JoinHandle<()>,
    name: OsString,
}

impl Device {
    /// Open `path` and start streaming its key events into `tx`.
    ///
    /// Only `EV_KEY` records are forwarded; synchronization, LED and
    /// miscellaneous records never reach the interpreter.
    pub fn new(path: PathBuf, tx: mpsc::Sender<evdev::InputEvent>) -> io::Result<Self> {
        tracing::debug!(path = %path.display(), "opening input device");

        let dev = match evdev::Device::open(&path) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "could not open input device");
                return Err(e);
            }
        };
        let mut stream = match dev.into_event_stream() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "could not create event stream from input device");
                return Err(e);
            }
        };
        let name = path
            .file_name()
            .expect("input device should have a file name")
            .to_os_string();
        let task = tokio::spawn(async move {
            loop {
                match stream.next_event().await {
                    Ok(event) => {
                        if !matches!(event.kind(), InputEventKind::Key(_)) {
                            continue;
                        }
                        if let Err(e) = tx.send(event).await {
                            tracing::warn!(error = %e, "input event could not be queued");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "failed to read from input device");
                        break;
                    }
                }
            }
        });
        Ok(Self { name, task })
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Stop processing events from this device on drop
        self.task.abort();
    }
}
