use std::io::{self, Cursor, Read, Write};
use std::time::Duration;

use serial_core::{PortSettings, SerialDevice};

#[allow(dead_code)] // Tests use different subsets of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialFailure {
    None,
    WriteSettings,
    Read,
    ControlLines,
}

/// A change to one of the modem control lines.
#[allow(dead_code)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Line {
    Rts(bool),
    Dtr(bool),
}

/// Mock serial port implementation that reads data from a vector and records
/// everything written and every control line change. Used to verify `SerialLink`.
///
/// Replies set with `with_replies` only become readable once something is written,
/// like a controller answering a request.
#[derive(Debug, Clone)]
pub struct MockSerialPort {
    failure: SerialFailure,
    data: Cursor<Vec<u8>>,
    replies: Option<Vec<u8>>,
    written: Vec<u8>,
    lines: Vec<Line>,
    timeout: Duration,
    settings: PortSettings,
}

#[allow(dead_code)] // Not used by all tests.
impl MockSerialPort {
    pub fn new(data: Vec<u8>, failure: SerialFailure) -> Self {
        MockSerialPort {
            failure,
            data: Cursor::new(data),
            replies: None,
            written: Vec::new(),
            lines: Vec::new(),
            timeout: Duration::from_secs(0),
            // Initialize settings to some weird defaults to verify we set them correctly later.
            settings: PortSettings {
                baud_rate: serial_core::BaudRate::Baud110,
                char_size: serial_core::CharSize::Bits7,
                parity: serial_core::Parity::ParityEven,
                stop_bits: serial_core::StopBits::Stop2,
                flow_control: serial_core::FlowControl::FlowSoftware,
            },
        }
    }

    pub fn with_replies(mut self, replies: Vec<u8>) -> Self {
        self.replies = Some(replies);
        self
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn done(&self) {
        assert_eq!(self.data.position(), self.data.get_ref().len() as u64);
    }

    fn control(&mut self, line: Line) -> serial_core::Result<()> {
        match self.failure {
            SerialFailure::ControlLines => Err(serial_core::Error::new(
                serial_core::ErrorKind::NoDevice,
                "Dummy control line error",
            )),
            _ => {
                self.lines.push(line);
                Ok(())
            }
        }
    }
}

impl Read for MockSerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.failure {
            SerialFailure::Read => Err(io::Error::new(io::ErrorKind::Other, "Dummy I/O error")),
            _ if self.data.position() == self.data.get_ref().len() as u64 => Err(io::ErrorKind::TimedOut.into()),
            _ => self.data.read(buf),
        }
    }
}

impl Write for MockSerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        if let Some(replies) = self.replies.take() {
            self.data.get_mut().extend(replies);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialDevice for MockSerialPort {
    type Settings = PortSettings;

    fn read_settings(&self) -> serial_core::Result<Self::Settings> {
        Ok(self.settings)
    }

    fn write_settings(&mut self, settings: &Self::Settings) -> serial_core::Result<()> {
        match self.failure {
            SerialFailure::WriteSettings => Err(serial_core::Error::new(
                serial_core::ErrorKind::NoDevice,
                "Dummy serial error",
            )),
            _ => {
                self.settings = *settings;
                Ok(())
            }
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> serial_core::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> serial_core::Result<()> {
        self.control(Line::Rts(level))
    }

    fn set_dtr(&mut self, level: bool) -> serial_core::Result<()> {
        self.control(Line::Dtr(level))
    }

    fn read_cts(&mut self) -> serial_core::Result<bool> {
        unimplemented!();
    }

    fn read_dsr(&mut self) -> serial_core::Result<bool> {
        unimplemented!();
    }

    fn read_ri(&mut self) -> serial_core::Result<bool> {
        unimplemented!();
    }

    fn read_cd(&mut self) -> serial_core::Result<bool> {
        unimplemented!();
    }
}
