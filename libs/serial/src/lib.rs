//! Tools for communicating with split-flap display controllers over serial.
//!
//! For the basic task of driving a display, you likely want to use the high-level API
//! in the [`flapper`] crate instead.
//!
//! However, you can use [`SerialLink`] directly if you're doing custom lower-level
//! communication, or the [`configure_port`] function to configure a serial port you
//! opened yourself.
//!
//! # Examples
//!
//! ```no_run
//! use std::io::Write;
//! use flapper_core::{Message, Tag};
//! use flapper_serial::SerialLink;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! #
//! let mut link = SerialLink::open("/dev/ttyACM0", 230_400)?;
//! link.write_all(&Message::RequestState.to_frame(Tag(0)))?;
//! #
//! # Ok(()) }
//! ```
//!
//! [`flapper`]: https://docs.rs/flapper
#![doc(html_root_url = "https://docs.rs/flapper-serial/0.1.0")]
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

mod errors;
mod serial_link;
mod serial_port;

pub use self::errors::SerialError;
pub use self::serial_link::{SerialLink, READ_TIMEOUT};
pub use self::serial_port::configure_port;
