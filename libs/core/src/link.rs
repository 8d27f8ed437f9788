use std::fmt::{self, Debug, Formatter};
use std::io::{self, Read, Write};

/// A bidirectional byte stream connected to a display controller.
///
/// Typically `SerialLink` from [`flapper-serial`] or `VirtualLink` from [`flapper-testing`]
/// are sufficient, and you do not need to implement this yourself.
///
/// Reads should time out periodically (with [`io::ErrorKind::TimedOut`] or
/// [`io::ErrorKind::WouldBlock`]) rather than block forever, so that a reader can
/// notice when it is asked to stop. Reaching end of stream or any other read error
/// is taken to mean the link is gone for good.
///
/// # Examples
///
/// ```
/// use std::io::{self, Cursor, Read, Write};
/// use flapper_core::Link;
///
/// #[derive(Debug, Clone, Default)]
/// struct Loopback {
///     buffer: Cursor<Vec<u8>>,
/// }
///
/// impl Read for Loopback {
///     fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
///         self.buffer.read(buf)
///     }
/// }
///
/// impl Write for Loopback {
///     fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
///         self.buffer.get_mut().extend_from_slice(buf);
///         Ok(buf.len())
///     }
///
///     fn flush(&mut self) -> io::Result<()> {
///         Ok(())
///     }
/// }
///
/// impl Link for Loopback {
///     fn try_clone(&self) -> io::Result<Box<dyn Link>> {
///         Ok(Box::new(self.clone()))
///     }
/// }
/// ```
///
/// [`flapper-serial`]: https://docs.rs/flapper-serial
/// [`flapper-testing`]: https://docs.rs/flapper-testing
pub trait Link: Read + Write + Send {
    /// Returns a second handle to the same stream, so that one thread can read while another writes.
    fn try_clone(&self) -> io::Result<Box<dyn Link>>;

    /// Power-cycles the attached controller, if the link supports it.
    ///
    /// The default implementation reports [`io::ErrorKind::Unsupported`].
    fn hard_reset(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "link cannot reset the controller"))
    }
}

impl Debug for dyn Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<Link>")
    }
}
