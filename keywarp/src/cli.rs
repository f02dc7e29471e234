use std::path::PathBuf;

use clap::Parser;
use keywarp_common::Settings;
use keywarp_notify::BusConfig;

#[derive(Parser, Debug)]
#[command(version, about, author)]
pub struct Args {
    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep Caps Lock a real Caps Lock key instead of remapping taps to
    /// Escape (also disables the reset-by-Escape behaviour)
    #[arg(long)]
    pub real_capslock: bool,

    /// Disable the both-Alts chord that toggles Alternative mode
    #[arg(long)]
    pub no_alternative_mode: bool,

    /// Disable Caps Lock and Enter acting as Control keys inside combos
    #[arg(long)]
    pub no_additional_controls: bool,

    /// Do not reset modes and layout when Caps Lock is tapped as Escape
    #[arg(long)]
    pub disable_reset_by_escape_on_capslock: bool,

    /// Do not reset modes and layout when the focused window changes
    #[arg(long)]
    pub disable_reset_by_window_focus_event: bool,

    /// X input device name to disable at startup via xinput (may repeat)
    #[arg(long, value_name = "NAME")]
    pub disable_xinput_device_name: Vec<String>,

    /// X input device id to disable at startup via xinput (may repeat)
    #[arg(long, value_name = "ID")]
    pub disable_xinput_device_id: Vec<u32>,

    /// Directory scanned for keyboards when no devices are given
    #[arg(long, value_name = "FDPATH", default_value = "/dev/input")]
    pub device_fd_path: PathBuf,

    /// Also write indicator lines to this xmobar named pipe
    #[arg(long, value_name = "FILE")]
    pub xmobar_pipe: Option<PathBuf>,

    /// Send indicator signals to this bus name instead of broadcasting
    #[arg(long, value_name = "NAME")]
    pub bus_name: Option<String>,

    /// Object path for indicator signals
    #[arg(long, value_name = "PATH", default_value = "/org/keywarp/indicators")]
    pub bus_path: String,

    /// Interface for indicator signals
    #[arg(long, value_name = "IFACE", default_value = "org.keywarp.Indicators")]
    pub bus_interface: String,

    /// Object path the daemon listens on for request_flush_all
    #[arg(long, value_name = "PATH", default_value = "/org/keywarp/daemon")]
    pub bus_flush_path: String,

    /// Interface the daemon listens on for request_flush_all
    #[arg(long, value_name = "IFACE", default_value = "org.keywarp.Daemon")]
    pub bus_flush_interface: String,

    /// Input devices to read; scanned from --device-fd-path when omitted
    #[arg(value_name = "DEVICE")]
    pub devices: Vec<PathBuf>,
}

impl Args {
    pub fn settings(&self) -> Settings {
        Settings {
            verbose: self.verbose,
            real_capslock: self.real_capslock,
            alternative_mode: !self.no_alternative_mode,
            additional_controls: !self.no_additional_controls,
            reset_by_escape_on_capslock: !self.disable_reset_by_escape_on_capslock,
            reset_by_window_focus_event: !self.disable_reset_by_window_focus_event,
        }
        .normalized()
    }

    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            destination: self.bus_name.clone(),
            path: self.bus_path.clone(),
            interface: self.bus_interface.clone(),
            flush_path: self.bus_flush_path.clone(),
            flush_interface: self.bus_flush_interface.clone(),
        }
    }
}
