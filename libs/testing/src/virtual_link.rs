use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use flapper_core::frame::DELIMITER;
use flapper_core::Link;

use crate::VirtualDisplay;

/// How long a read waits for data before reporting a timeout.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// A [`Link`] connected to a [`VirtualDisplay`] instead of real hardware.
///
/// Bytes written are split into frames and handed to the virtual display; whatever it
/// sends back becomes available for reading. Clones share the same display and the same
/// stream, so a test can keep one to inspect the display or inject extra bytes after
/// handing another to a `Display`.
///
/// # Examples
///
/// ```
/// use std::io::{BufRead, BufReader, Write};
/// use flapper_core::{Message, Tag};
/// use flapper_testing::{VirtualDisplay, VirtualLink};
///
/// # fn main() -> std::io::Result<()> {
/// #
/// let mut link = VirtualLink::new(VirtualDisplay::new(2));
/// link.write_all(&Message::RequestState.to_frame(Tag(9)))?;
///
/// let mut frame = Vec::new();
/// let _ = BufReader::new(link.clone()).read_until(0, &mut frame)?;
/// let reply = Message::from_device_frame(&frame).unwrap();
/// assert!(matches!(reply, Message::StatusReport(_)));
/// #
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct VirtualLink {
    shared: Arc<Shared>,
    to_host: Sender<Vec<u8>>,
    from_display: Receiver<Vec<u8>>,
    unread: Vec<u8>,
    unwritten: Vec<u8>,
}

#[derive(Debug)]
struct Shared {
    display: Mutex<VirtualDisplay>,
    fail_reads: AtomicBool,
    disconnected: AtomicBool,
    resets: Mutex<usize>,
}

impl VirtualLink {
    /// Creates a new `VirtualLink` connected to `display`.
    pub fn new(display: VirtualDisplay) -> Self {
        let (to_host, from_display) = crossbeam_channel::unbounded();
        VirtualLink {
            shared: Arc::new(Shared {
                display: Mutex::new(display),
                fail_reads: AtomicBool::new(false),
                disconnected: AtomicBool::new(false),
                resets: Mutex::new(0),
            }),
            to_host,
            from_display,
            unread: Vec::new(),
            unwritten: Vec::new(),
        }
    }

    /// Returns exclusive access to the connected display.
    pub fn display(&self) -> MutexGuard<'_, VirtualDisplay> {
        self.shared.display.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues raw bytes to be read by the host, as if sent by the controller.
    pub fn inject(&self, bytes: Vec<u8>) {
        let _ = self.to_host.send(bytes);
    }

    /// Makes every subsequent read fail with an I/O error.
    pub fn fail_reads(&self) {
        self.shared.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Makes every subsequent read report end of stream.
    pub fn disconnect(&self) {
        self.shared.disconnected.store(true, Ordering::SeqCst);
    }

    /// Returns the number of times the controller has been reset through this link.
    pub fn reset_count(&self) -> usize {
        *self.shared.resets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for VirtualLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "Virtual read failure"));
        }
        if self.shared.disconnected.load(Ordering::SeqCst) {
            return Ok(0);
        }

        if self.unread.is_empty() {
            match self.from_display.recv_timeout(READ_TIMEOUT) {
                Ok(bytes) => self.unread = bytes,
                Err(RecvTimeoutError::Timeout) => return Err(io::ErrorKind::TimedOut.into()),
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }

        let count = buf.len().min(self.unread.len());
        buf[..count].copy_from_slice(&self.unread[..count]);
        let _ = self.unread.drain(..count);
        Ok(count)
    }
}

impl Write for VirtualLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.unwritten.extend_from_slice(buf);
        while let Some(end) = self.unwritten.iter().position(|&b| b == DELIMITER) {
            let frame: Vec<u8> = self.unwritten.drain(..=end).collect();
            let responses = self.display().process_frame(&frame);
            for response in responses {
                let _ = self.to_host.send(response);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Link for VirtualLink {
    fn try_clone(&self) -> io::Result<Box<dyn Link>> {
        Ok(Box::new(VirtualLink {
            unread: Vec::new(),
            unwritten: Vec::new(),
            ..self.clone()
        }))
    }

    fn hard_reset(&mut self) -> io::Result<()> {
        *self.shared.resets.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
