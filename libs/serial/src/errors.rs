use thiserror::Error;

/// Errors related to opening and configuring a serial port.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SerialError {
    /// The serial port could not be opened.
    #[error("Failed to open serial port {}", path)]
    Open {
        /// The device path that was requested.
        path: String,

        /// The underlying serial error.
        #[source]
        source: serial_core::Error,
    },

    /// The serial port rejected the requested settings.
    #[error("Failed to configure serial port")]
    Configuration {
        /// The underlying serial error.
        #[from]
        source: serial_core::Error,
    },
}
