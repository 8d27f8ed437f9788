use std::time::Duration;

use serial_core::prelude::*;
use serial_core::BaudRate;

use crate::errors::SerialError;

/// Configures the given serial port appropriately for use with a split-flap controller.
///
/// Specifically, the controller expects 8N1 format with no flow control at the given baud rate.
/// Also sets the provided read timeout.
///
/// # Errors
///
/// Returns [`SerialError::Configuration`] if the underlying serial port reports an error.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// #
/// let mut port = serial::open("/dev/ttyACM0")?;
/// flapper_serial::configure_port(&mut port, 230_400, Duration::from_millis(50))?;
/// // Now ready for communication with a controller (8N1 230400 baud).
/// #
/// # Ok(()) }
/// ```
pub fn configure_port<P: SerialPort>(port: &mut P, baud_rate: usize, timeout: Duration) -> Result<(), SerialError> {
    port.reconfigure(&|settings| {
        settings.set_baud_rate(BaudRate::from_speed(baud_rate))?;
        settings.set_char_size(serial_core::Bits8);
        settings.set_parity(serial_core::ParityNone);
        settings.set_stop_bits(serial_core::Stop1);
        settings.set_flow_control(serial_core::FlowNone);
        Ok(())
    })?;
    port.set_timeout(timeout)?;
    Ok(())
}
