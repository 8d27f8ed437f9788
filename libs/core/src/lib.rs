//! Core types for describing communication with split-flap display controllers.
//!
//! For the basic task of driving a display, you likely want to use the high-level API
//! in the [`flapper`] crate instead.
//!
//! However, `flapper_core` is useful for crates that want to interact with the controller
//! protocol at a lower level than the `flapper` crate, or who want to provide their own
//! [`Link`] implementations for use by `flapper`.
//!
//! Frames on the wire are a protobuf message followed by its CRC32, byte-stuffed so that
//! `0x00` only ever appears as the terminator (see [`frame`]). Text is shaped to the
//! module grid by [`text::prepare`] before being mapped onto flap indices with a [`Charset`].
//!
//! # Examples
//!
//! ```
//! use flapper_core::{text, Charset, Grid, Message, Tag};
//!
//! # fn main() -> Result<(), flapper_core::frame::FrameError> {
//! #
//! let charset = Charset::default();
//! let shaped = text::prepare("hello", Grid::new(12, 2), &charset);
//! let command = Message::SetText(charset.flap_indices(&shaped, 24));
//!
//! // The frame is what gets written to the serial port.
//! let frame = command.to_frame(Tag(0));
//! assert_eq!(Some(&0x00), frame.last());
//!
//! let (tag, decoded) = Message::from_host_frame(&frame)?;
//! assert_eq!((Tag(0), command), (tag, decoded));
//! #
//! # Ok(()) }
//! ```
//!
//! [`flapper`]: https://docs.rs/flapper
#![doc(html_root_url = "https://docs.rs/flapper-core/0.1.0")]
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

mod charset;
pub mod frame;
mod link;
mod message;
mod proto;
mod status;
pub mod text;

pub use self::charset::Charset;
pub use self::frame::FrameError;
pub use self::link::Link;
pub use self::message::{Message, Tag};
pub use self::status::{AnimationStyle, DisplayState, ModuleState, ModuleStatus, ParseStyleError, Settings, Status};
pub use self::text::Grid;
