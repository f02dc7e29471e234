use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
	#[error("D-Bus connection or signal error")]
	Dbus(#[from] zbus::Error),
	#[error("D-Bus specification defined error")]
	DbusSpec(#[from] zbus::fdo::Error),
	#[error("could not write to the status bar pipe")]
	Pipe(#[from] std::io::Error),
}
