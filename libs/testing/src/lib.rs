//! Tools for testing and debugging split-flap display communications.
//!
//! For the basic task of driving a display, you likely want to use the high-level API
//! in the [`flapper`] crate instead.
//!
//! This crate isn't directly related to controlling real hardware, but provides some helpful
//! diagnostic tools. [`VirtualDisplay`] is a mock implementation of a display controller that
//! speaks the same wire protocol, and [`VirtualLink`] connects it to anything that expects a
//! [`Link`](flapper_core::Link).
//!
//! # Examples
//!
//! ```
//! use std::io::Write;
//! use flapper_core::{Message, Tag};
//! use flapper_testing::{Behavior, VirtualDisplay, VirtualLink};
//!
//! # fn main() -> std::io::Result<()> {
//! #
//! // A controller that loses the first frame it is sent.
//! let mut link = VirtualLink::new(VirtualDisplay::with_behavior(24, Behavior::DropFirst(1)));
//! let frame = Message::SetText(vec![8, 9]).to_frame(Tag(0));
//! link.write_all(&frame)?;
//! link.write_all(&frame)?;
//!
//! // Both copies arrived, but only the second one took effect.
//! assert_eq!(2, link.display().frames().len());
//! assert_eq!(&[8, 9], &link.display().flaps()[..2]);
//! #
//! # Ok(()) }
//! ```
//!
//! [`flapper`]: https://docs.rs/flapper
#![doc(html_root_url = "https://docs.rs/flapper-testing/0.1.0")]
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

mod virtual_display;
mod virtual_link;

pub use self::virtual_display::{Behavior, VirtualDisplay};
pub use self::virtual_link::VirtualLink;
