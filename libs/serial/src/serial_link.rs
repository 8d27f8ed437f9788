use std::fmt::{self, Debug, Formatter};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, info};
use serial_core::prelude::*;

use flapper_core::Link;

use crate::errors::SerialError;
use crate::serial_port;

/// How long a read may block before giving up, so readers can notice shutdown requests.
pub const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// How long each control line is held during a hard reset.
const RESET_HOLD: Duration = Duration::from_millis(200);

/// An implementation of [`Link`] that communicates with a controller over serial.
///
/// The port is shared between clones, including those made through [`Link::try_clone`],
/// so one thread can block reading while another writes. Reads time out after
/// [`READ_TIMEOUT`] and report [`io::ErrorKind::TimedOut`].
///
/// # Examples
///
/// ```no_run
/// use flapper_serial::SerialLink;
///
/// # fn main() -> Result<(), flapper_serial::SerialError> {
/// #
/// let link = SerialLink::open("/dev/ttyACM0", 230_400)?;
/// // Can now hand the link to a Display.
/// #
/// # Ok(()) }
/// ```
pub struct SerialLink<P: SerialPort> {
    port: Arc<Mutex<P>>,
}

impl SerialLink<serial::SystemPort> {
    /// Opens and configures the serial device at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Open`] if the device can't be opened, or
    /// [`SerialError::Configuration`] if it can't be configured.
    pub fn open(path: &str, baud_rate: usize) -> Result<Self, SerialError> {
        debug!("Opening {} at {} baud", path, baud_rate);
        let port = serial::open(path).map_err(|source| SerialError::Open {
            path: path.to_owned(),
            source,
        })?;
        SerialLink::try_new(port, baud_rate)
    }
}

impl<P: SerialPort> SerialLink<P> {
    /// Creates a new `SerialLink` over an already opened port, configuring it first.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Configuration`] if the serial port cannot be configured.
    pub fn try_new(mut port: P, baud_rate: usize) -> Result<Self, SerialError> {
        serial_port::configure_port(&mut port, baud_rate, READ_TIMEOUT)?;
        Ok(SerialLink {
            port: Arc::new(Mutex::new(port)),
        })
    }

    /// Runs `f` with exclusive access to the underlying serial port.
    pub fn with_port<T, F: FnOnce(&mut P) -> T>(&self, f: F) -> T {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, P> {
        self.port.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: SerialPort> Clone for SerialLink<P> {
    fn clone(&self) -> Self {
        SerialLink {
            port: Arc::clone(&self.port),
        }
    }
}

impl<P: SerialPort> Debug for SerialLink<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SerialLink")
    }
}

impl<P: SerialPort> Read for SerialLink<P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = self.lock().read(buf);
        if let Err(ref e) = result {
            if e.kind() == io::ErrorKind::TimedOut {
                // Let a waiting writer grab the port before the next read.
                thread::sleep(Duration::from_millis(1));
            }
        }
        result
    }
}

impl<P: SerialPort> Write for SerialLink<P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl<P: SerialPort + Send + 'static> Link for SerialLink<P> {
    fn try_clone(&self) -> io::Result<Box<dyn Link>> {
        Ok(Box::new(self.clone()))
    }

    /// Holds RTS high and pulses DTR low to power-cycle the controller.
    fn hard_reset(&mut self) -> io::Result<()> {
        info!("Resetting controller");
        let mut port = self.lock();
        port.set_rts(true).map_err(to_io)?;
        port.set_dtr(false).map_err(to_io)?;
        thread::sleep(RESET_HOLD);
        port.set_dtr(true).map_err(to_io)?;
        thread::sleep(RESET_HOLD);
        Ok(())
    }
}

fn to_io(error: serial_core::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error)
}
