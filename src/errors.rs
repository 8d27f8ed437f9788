use std::io;

use thiserror::Error;

use crate::core::ParseStyleError;
use crate::serial::SerialError;

/// Errors related to [`Display`](crate::Display)s.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DisplayError {
    /// The serial link to the display could not be established.
    #[error("Failed to connect to display")]
    Connect {
        /// The underlying serial error.
        #[from]
        source: SerialError,
    },

    /// The display was closed, or its link failed, before the request completed.
    #[error("Display connection is closed")]
    Closed,

    /// A command could not be written to the display.
    #[error("Failed to write to display")]
    Write {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The requested animation style is not one the controller knows.
    #[error("Unknown animation style {:?}", name)]
    UnknownAnimationStyle {
        /// The name that was not recognized.
        name: String,
    },

    /// The link to the display failed or could not be shared between lanes.
    #[error("Display link failed")]
    Link {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl From<ParseStyleError> for DisplayError {
    fn from(error: ParseStyleError) -> Self {
        DisplayError::UnknownAnimationStyle { name: error.name }
    }
}
