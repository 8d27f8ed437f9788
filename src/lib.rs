//! A library for driving split-flap displays over a serial link.
//!
//! Talks to a controller board running the protobuf-over-serial firmware for
//! [scottbez1/splitflap] displays. Provides a [`Display`] handle that shapes text to the
//! module grid, delivers commands reliably (resending until the controller acknowledges
//! them), and keeps a live model of what the display is showing from the status reports
//! the controller sends back.
//!
//! # Examples
//!
//! ```no_run
//! use flapper::{Display, DisplayConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! #
//! let display = Display::open(&DisplayConfig {
//!     device: "/dev/ttyACM0".into(),
//!     ..DisplayConfig::default()
//! })?;
//!
//! // Fetch the module count and current settings.
//! display.init()?;
//!
//! display.set_max_moving(6)?;
//! display.set_anim_style("RANDOM")?;
//! display.set_text("Café au lait")?;
//!
//! // The state updates as the controller reports progress.
//! println!("{:?}: {}", display.text(), display.settings());
//! #
//! # Ok(()) }
//! ```
//!
//! # Sub-crates
//!
//! In addition to the high-level API of [`Display`], several lower-level components are provided
//! that can be combined for more specialized use-cases.
//!
//! - [`flapper-core`] \(re-exported as `core`\) contains the frame codec, protocol messages, state
//!   model, and text shaping, and is useful if you want to implement a custom [`Link`] or otherwise
//!   operate at the level of the raw protocol.
//! - [`flapper-serial`] \(re-exported as `serial`\) contains functions for configuring the serial port,
//!   as well as the implementation of [`SerialLink`].
//! - [`flapper-testing`] contains a simulated controller, useful for testing and debugging
//!   without hardware.
//!
//! [scottbez1/splitflap]: https://github.com/scottbez1/splitflap
//! [`flapper-core`]: https://docs.rs/flapper-core
//! [`flapper-serial`]: https://docs.rs/flapper-serial
//! [`flapper-testing`]: https://docs.rs/flapper-testing
#![doc(html_root_url = "https://docs.rs/flapper/0.1.0")]
#![deny(
    missing_copy_implementations,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![warn(
    missing_docs,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]

pub use flapper_core as core;
pub use flapper_serial as serial;

mod channel;
mod config;
mod dispatch;
mod display;
mod errors;
mod idle;
mod snapshot;

pub use self::config::DisplayConfig;
pub use self::display::Display;
pub use self::errors::DisplayError;
pub use self::idle::{shorten, IdlePolicy, MessageCycler};

pub use crate::core::{AnimationStyle, DisplayState, Grid, Link, ModuleState, ModuleStatus, Settings, Status, Tag};
pub use crate::serial::SerialLink;
