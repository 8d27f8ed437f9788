use log::{debug, warn};

use flapper_core::{Message, ModuleStatus, Settings, Status, Tag};

/// How a [`VirtualDisplay`] responds to the commands it receives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Behavior {
    /// Apply every command, report status, then acknowledge.
    Normal,
    /// Ignore the given number of frames entirely (as if lost on the wire), then behave normally.
    DropFirst(usize),
    /// Never respond to anything.
    Silent,
}

/// Mock implementation of a split-flap display controller.
///
/// Decodes frames sent by the host, applies the commands they carry to a simulated
/// set of modules, and produces the frames a real controller would send back: a fresh
/// `StatusReport` followed by an `Ack` for the command's tag, so the new state is already
/// known by the time the command completes. Every frame it receives is recorded so tests
/// can inspect exactly what went over the wire.
///
/// Messages are logged using the [`log`] crate for debugging purposes.
///
/// # Examples
///
/// ```
/// use flapper_core::{Message, Tag};
/// use flapper_testing::VirtualDisplay;
///
/// let mut display = VirtualDisplay::new(4);
/// let responses = display.process_frame(&Message::SetText(vec![1, 2, 3, 4]).to_frame(Tag(5)));
/// assert_eq!(2, responses.len());
/// assert_eq!(Message::Ack(Tag(5)), Message::from_device_frame(&responses[1]).unwrap());
/// assert_eq!(vec![1, 2, 3, 4], display.flaps());
/// ```
///
/// [`log`]: https://crates.io/crates/log
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualDisplay {
    modules: Vec<ModuleStatus>,
    settings: Settings,
    behavior: Behavior,
    dropped: usize,
    received: Vec<(Tag, Message)>,
    frames: Vec<Vec<u8>>,
}

impl VirtualDisplay {
    /// Creates a new `VirtualDisplay` with the given number of modules, all showing flap 0.
    pub fn new(modules: usize) -> Self {
        VirtualDisplay::with_behavior(modules, Behavior::Normal)
    }

    /// Creates a new `VirtualDisplay` that responds according to `behavior`.
    pub fn with_behavior(modules: usize, behavior: Behavior) -> Self {
        VirtualDisplay {
            modules: vec![ModuleStatus::at_flap(0); modules],
            settings: Settings::default(),
            behavior,
            dropped: 0,
            received: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Changes how the display responds from now on.
    pub fn set_behavior(&mut self, behavior: Behavior) {
        self.behavior = behavior;
        self.dropped = 0;
    }

    /// Returns the flap index each module is showing.
    pub fn flaps(&self) -> Vec<u32> {
        self.modules.iter().map(|module| module.flap_index).collect()
    }

    /// Returns the settings most recently applied.
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Returns the status this display would report.
    pub fn status(&self) -> Status {
        Status {
            modules: self.modules.clone(),
            settings: self.settings,
        }
    }

    /// Returns every message successfully decoded so far, with its tag, in arrival order.
    pub fn received(&self) -> &[(Tag, Message)] {
        &self.received
    }

    /// Returns every raw frame received so far, including ones that were dropped or failed to decode.
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Encodes the current status as a frame, as if sent unprompted.
    pub fn status_frame(&self) -> Vec<u8> {
        Message::StatusReport(self.status()).to_frame(Tag(0))
    }

    /// Handles one frame sent by the host, returning the frames to send back.
    pub fn process_frame(&mut self, frame: &[u8]) -> Vec<Vec<u8>> {
        self.frames.push(frame.to_vec());

        let (tag, message) = match Message::from_host_frame(frame) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Vdisplay discarding frame: {}", e);
                return Vec::new();
            }
        };
        debug!("Vdisplay got [{}] {}", tag, message);
        self.received.push((tag, message.clone()));

        match self.behavior {
            Behavior::Silent => return Vec::new(),
            Behavior::DropFirst(count) if self.dropped < count => {
                self.dropped += 1;
                debug!("Vdisplay dropping [{}] ({} of {})", tag, self.dropped, count);
                return Vec::new();
            }
            _ => {}
        }

        match message {
            Message::SetText(flaps) => {
                for (module, flap) in self.modules.iter_mut().zip(flaps) {
                    module.flap_index = flap;
                }
            }
            Message::SetConfig(settings) => self.settings = settings,
            _ => {}
        }

        vec![self.status_frame(), Message::Ack(tag).to_frame(tag)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapper_core::AnimationStyle;
    use test_case::test_case;

    fn responses(display: &mut VirtualDisplay, message: Message, tag: Tag) -> Vec<Message> {
        display
            .process_frame(&message.to_frame(tag))
            .iter()
            .map(|frame| Message::from_device_frame(frame).unwrap())
            .collect()
    }

    #[test]
    fn normal_behavior() {
        let mut display = VirtualDisplay::new(3);

        let reply = responses(&mut display, Message::RequestState, Tag(1));
        assert_eq!(vec![Message::StatusReport(display.status()), Message::Ack(Tag(1))], reply);

        let _ = responses(&mut display, Message::SetText(vec![5, 6, 7, 8]), Tag(2));
        assert_eq!(vec![5, 6, 7], display.flaps());

        let settings = Settings {
            max_moving: 2,
            animation_style: AnimationStyle::RightToLeft,
            ..Settings::default()
        };
        let reply = responses(&mut display, Message::SetConfig(settings), Tag(3));
        assert_eq!(settings, display.settings());
        assert_eq!(Message::StatusReport(display.status()), reply[0]);

        assert_eq!(3, display.received().len());
        assert_eq!(3, display.frames().len());
    }

    #[test]
    fn short_text_leaves_remaining_modules() {
        let mut display = VirtualDisplay::new(3);
        let _ = responses(&mut display, Message::SetText(vec![1, 1, 1]), Tag(0));
        let _ = responses(&mut display, Message::SetText(vec![2]), Tag(1));
        assert_eq!(vec![2, 1, 1], display.flaps());
    }

    #[test_case(Behavior::Silent, 5, 0 ; "silent")]
    #[test_case(Behavior::DropFirst(2), 5, 3 ; "drop first")]
    #[test_case(Behavior::Normal, 5, 5 ; "normal")]
    fn acknowledged_count(behavior: Behavior, sent: u32, acked: usize) {
        let mut display = VirtualDisplay::with_behavior(2, behavior);
        let count = (0..sent)
            .filter(|&n| !display.process_frame(&Message::RequestState.to_frame(Tag(n))).is_empty())
            .count();
        assert_eq!(acked, count);
        assert_eq!(sent as usize, display.received().len());
    }

    #[test]
    fn corrupt_frame_recorded_but_ignored() {
        let mut display = VirtualDisplay::new(1);
        assert!(display.process_frame(&[0x02, 0x01, 0x00]).is_empty());
        assert_eq!(1, display.frames().len());
        assert!(display.received().is_empty());
    }
}
