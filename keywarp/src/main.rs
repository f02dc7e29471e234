//! keywarp: a user-space keyboard remapping daemon for X11.
//!
//! Raw key events come in from evdev devices, pass through a stateful
//! classifier, and leave as synthetic XTest events. On the side the daemon
//! keeps a status bar informed over D-Bus and resets modes when the
//! focused window changes.

#![deny(clippy::all, clippy::perf, clippy::complexity, clippy::style, unsafe_code)]

mod cli;
mod events;
mod logging;
mod modes;
mod state;
mod watcher;
mod xorg;

use std::sync::{Arc, Mutex};

use clap::Parser;
use evdev::InputEventKind;
use eyre::WrapErr;
use futures_util::StreamExt;
use keywarp_common::Keymap;
use keywarp_input::Device;
use keywarp_notify::{flush_request_stream, BusConfig, Indicator, StatusNotifier};
use tokio::{
    signal::unix::{signal, SignalKind},
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::events::Processor;
use crate::state::State;
use crate::xorg::{Backend, XDisplay};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Args::parse();
    logging::init(args.verbose);

    let settings = args.settings();
    debug!(?settings, "effective settings");
    let keymap = Keymap::new(&settings);

    let mut display = XDisplay::connect().wrap_err("could not connect to the X server")?;
    let leds = display
        .leds()
        .wrap_err("could not read the keyboard LED state")?;
    info!(caps_lock = leds.caps_lock, num_lock = leds.num_lock, "initial LED state");

    let (indicator_tx, indicator_rx) = mpsc::unbounded_channel();
    let processor = Arc::new(Mutex::new(Processor::new(
        keymap,
        settings.clone(),
        State::new(leds),
        display,
        indicator_tx,
    )));

    let notifier = StatusNotifier::new(args.bus_config(), args.xmobar_pipe.clone()).await;
    tokio::spawn(forward_indicators(notifier.clone(), indicator_rx));
    if let Some(conn) = notifier.connection().cloned() {
        tokio::spawn(listen_for_flush_requests(
            conn,
            notifier.bus().clone(),
            Arc::clone(&processor),
        ));
    }
    // Tell the bar where we start.
    processor
        .lock()
        .unwrap()
        .flush_indicators()
        .wrap_err("could not publish the initial indicator state")?;

    xorg::disable_xinput_devices(&args.disable_xinput_device_name, &args.disable_xinput_device_id)
        .await;

    let device_paths = if args.devices.is_empty() {
        keywarp_input::discover_keyboards(&args.device_fd_path).wrap_err_with(|| {
            format!("could not scan {} for keyboards", args.device_fd_path.display())
        })?
    } else {
        args.devices.clone()
    };
    eyre::ensure!(
        !device_paths.is_empty(),
        "no keyboard input devices found; pass device paths on the command line"
    );

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let mut readers = Vec::with_capacity(device_paths.len());
    for path in device_paths {
        let reader = Device::new(path, event_tx.clone()).wrap_err("could not open input device")?;
        readers.push(reader);
    }
    drop(event_tx);

    if settings.reset_by_window_focus_event {
        watcher::spawn_focus_watcher(Arc::clone(&processor))
            .wrap_err("could not watch window focus changes")?;
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    info!(devices = readers.len(), "keywarp is running");
    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else { break };
                let InputEventKind::Key(key) = event.kind() else { continue };
                // Depressed or released only; repeats are dropped.
                let is_pressed = match event.value() {
                    1 => true,
                    0 => false,
                    _ => continue,
                };
                processor.lock().unwrap().handle_raw(key.code(), is_pressed)?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("termination requested, shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// Drain the indicator channel into the status bar, off the event path.
async fn forward_indicators(
    notifier: StatusNotifier,
    mut rx: mpsc::UnboundedReceiver<Indicator>,
) {
    while let Some(indicator) = rx.recv().await {
        if let Err(e) = notifier.send(indicator).await {
            warn!(error = %e, "failed to notify the status bar");
        }
    }
}

/// Re-emit all indicators whenever the status bar asks for them.
async fn listen_for_flush_requests(
    conn: zbus::Connection,
    bus: BusConfig,
    processor: Arc<Mutex<Processor<XDisplay>>>,
) {
    let mut stream = match flush_request_stream(&conn, &bus).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "could not listen for flush requests");
            return;
        }
    };
    while stream.next().await.is_some() {
        debug!("status bar requested a flush of all indicators");
        let result = processor.lock().unwrap().flush_indicators();
        if let Err(e) = result {
            warn!(error = %e, "could not flush indicators");
        }
    }
}
