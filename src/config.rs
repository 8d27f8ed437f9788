use std::time::Duration;

use crate::core::{Charset, Grid, Tag};

/// Settings for connecting to and driving a display.
///
/// # Examples
///
/// ```
/// use flapper::{DisplayConfig, Tag};
///
/// let config = DisplayConfig {
///     device: "/dev/ttyUSB0".into(),
///     first_tag: Some(Tag(0)),
///     ..DisplayConfig::default()
/// };
/// assert_eq!(230_400, config.baud_rate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Path of the serial device the controller is attached to.
    pub device: String,

    /// Serial baud rate.
    pub baud_rate: usize,

    /// How long to wait for an acknowledgment before resending a command.
    pub retry_timeout: Duration,

    /// Shape of the module grid that text is laid out on.
    pub grid: Grid,

    /// Characters on the flaps, in flap order.
    pub charset: String,

    /// Tag for the first command; a random one is picked if `None`.
    pub first_tag: Option<Tag>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            device: "/dev/ttyACM0".to_owned(),
            baud_rate: 230_400,
            retry_timeout: Duration::from_millis(250),
            grid: Grid::default(),
            charset: Charset::DEFAULT.to_owned(),
            first_tag: None,
        }
    }
}
