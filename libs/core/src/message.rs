use std::fmt::{self, Display, Formatter};

use derive_more::{Display, LowerHex, UpperHex};
use prost::Message as _;

use crate::frame::{self, FrameError};
use crate::proto::{self, from_display, to_display};
use crate::{AnimationStyle, ModuleState, ModuleStatus, Settings, Status};

/// High-level representation of a message exchanged with the display controller.
///
/// Ascribes meaning to the protobuf payload of a frame and is freely convertible
/// to and from one (with `Unknown` standing in for payloads this library does not
/// understand). Host-to-controller variants are `SetText`, `SetConfig`, and
/// `RequestState`; the rest flow from the controller to the host.
///
/// # Examples
///
/// ```
/// use flapper_core::{Message, Tag};
///
/// # fn main() -> Result<(), flapper_core::frame::FrameError> {
/// #
/// let frame = Message::RequestState.to_frame(Tag(7));
/// let (tag, message) = Message::from_host_frame(&frame)?;
/// assert_eq!(Tag(7), tag);
/// assert_eq!(Message::RequestState, message);
/// #
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Message {
    /// Complete status of every module plus the active settings.
    ///
    /// Sent by the controller whenever something changes and in response to `RequestState`.
    StatusReport(Status),

    /// A diagnostic line from the controller firmware.
    Log(String),

    /// Acknowledges receipt of the host message carrying the given tag.
    Ack(Tag),

    /// Moves each module to the given flap index, in module order.
    ///
    /// An `Ack` is expected.
    SetText(Vec<u32>),

    /// Replaces the controller's animation settings.
    ///
    /// An `Ack` is expected.
    SetConfig(Settings),

    /// Asks the controller to send a `StatusReport`.
    ///
    /// An `Ack` is expected, followed by the report.
    RequestState,

    /// A well-formed payload that does not correspond to any known message.
    Unknown,
}

/// Pairs an outbound message with its acknowledgment.
///
/// Tags count from 0 to 254 and then wrap around, so a value is reused only after
/// [`Tag::COUNT`] further messages have been acknowledged.
///
/// # Examples
///
/// ```
/// use flapper_core::Tag;
///
/// assert_eq!(Tag(1), Tag(0).next());
/// assert_eq!(Tag(0), Tag(254).next());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, LowerHex, UpperHex)]
pub struct Tag(pub u32);

impl Tag {
    /// The number of distinct tags before the sequence repeats.
    pub const COUNT: u32 = 255;

    /// Creates a tag from an arbitrary counter value, wrapping it into range.
    pub fn new(counter: u32) -> Self {
        Tag(counter % Tag::COUNT)
    }

    /// Returns the tag that follows this one.
    pub fn next(self) -> Self {
        Tag::new(self.0 % Tag::COUNT + 1)
    }
}

impl Message {
    /// Serializes the message and wraps it in a frame ready for the wire.
    ///
    /// Host-to-controller messages carry `tag` so the controller can acknowledge them;
    /// controller-to-host messages ignore it (an `Ack` carries its own).
    pub fn to_frame(&self, tag: Tag) -> Vec<u8> {
        let payload = match *self {
            Message::StatusReport(ref status) => from_display_bytes(from_display::Payload::Status(status.into())),
            Message::Log(ref line) => from_display_bytes(from_display::Payload::Log(proto::Log { msg: line.clone() })),
            Message::Ack(Tag(nonce)) => from_display_bytes(from_display::Payload::Ack(proto::Ack { nonce })),
            Message::SetText(ref flaps) => {
                let modules = flaps
                    .iter()
                    .map(|&param| proto::ModuleCommand {
                        action: proto::ModuleCommand::GO_TO_FLAP,
                        param,
                    })
                    .collect();
                to_display_bytes(tag, Some(to_display::Payload::Command(proto::Command { modules })))
            }
            Message::SetConfig(ref settings) => to_display_bytes(
                tag,
                Some(to_display::Payload::Config(proto::Config {
                    settings: Some(settings.into()),
                })),
            ),
            Message::RequestState => to_display_bytes(tag, Some(to_display::Payload::RequestState(proto::RequestState {}))),
            Message::Unknown => to_display_bytes(tag, None),
        };
        frame::encode(&payload)
    }

    /// Decodes a frame sent by the controller.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] if the frame is damaged or its payload isn't a valid message.
    pub fn from_device_frame(frame: &[u8]) -> Result<Self, FrameError> {
        let payload = frame::decode(frame)?;
        let envelope = proto::FromDisplay::decode(payload.as_slice())?;
        let message = match envelope.payload {
            Some(from_display::Payload::Status(status)) => Message::StatusReport(status.into()),
            Some(from_display::Payload::Log(log)) => Message::Log(log.msg),
            Some(from_display::Payload::Ack(ack)) => Message::Ack(Tag(ack.nonce)),
            None => Message::Unknown,
        };
        Ok(message)
    }

    /// Decodes a frame sent by the host, returning the tag it carries along with the message.
    ///
    /// This is the controller's side of the conversation, used to simulate one.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] if the frame is damaged or its payload isn't a valid message.
    pub fn from_host_frame(frame: &[u8]) -> Result<(Tag, Self), FrameError> {
        let payload = frame::decode(frame)?;
        let envelope = proto::ToDisplay::decode(payload.as_slice())?;
        let message = match envelope.payload {
            Some(to_display::Payload::Command(command)) => {
                Message::SetText(command.modules.iter().map(|module| module.param).collect())
            }
            Some(to_display::Payload::Config(config)) => {
                Message::SetConfig(config.settings.map(Settings::from).unwrap_or_default())
            }
            Some(to_display::Payload::RequestState(_)) => Message::RequestState,
            None => Message::Unknown,
        };
        Ok((Tag(envelope.nonce), message))
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Message::StatusReport(ref status) => {
                write!(f, "StatusReport [{} modules] [{}]", status.modules.len(), status.settings)
            }
            Message::Log(ref line) => write!(f, "Log {:?}", line),
            Message::Ack(tag) => write!(f, "Ack [{}]", tag),
            Message::SetText(ref flaps) => write!(f, "SetText {:?}", flaps),
            Message::SetConfig(ref settings) => write!(f, "SetConfig [{}]", settings),
            Message::RequestState => write!(f, "RequestState"),
            Message::Unknown => write!(f, "Unknown"),
        }
    }
}

fn to_display_bytes(tag: Tag, payload: Option<to_display::Payload>) -> Vec<u8> {
    proto::ToDisplay { nonce: tag.0, payload }.encode_to_vec()
}

fn from_display_bytes(payload: from_display::Payload) -> Vec<u8> {
    proto::FromDisplay { payload: Some(payload) }.encode_to_vec()
}

impl From<proto::Settings> for Settings {
    fn from(settings: proto::Settings) -> Self {
        Settings {
            force_full_rotation: settings.force_full_rotation,
            max_moving: settings.max_moving,
            start_delay_millis: settings.start_delay_millis,
            animation_style: AnimationStyle::from_wire(settings.animation_style),
        }
    }
}

impl<'a> From<&'a Settings> for proto::Settings {
    fn from(settings: &'a Settings) -> Self {
        proto::Settings {
            force_full_rotation: settings.force_full_rotation,
            max_moving: settings.max_moving,
            start_delay_millis: settings.start_delay_millis,
            animation_style: settings.animation_style.to_wire(),
        }
    }
}

impl From<proto::DisplayStatus> for Status {
    fn from(status: proto::DisplayStatus) -> Self {
        Status {
            modules: status
                .modules
                .iter()
                .map(|module| ModuleStatus {
                    flap_index: module.flap_index,
                    moving: module.moving,
                    home_state: module.home_state,
                    state: ModuleState::from_wire(module.state),
                    missed_home: module.count_missed_home,
                    unexpected_home: module.count_unexpected_home,
                })
                .collect(),
            settings: status.settings.map(Settings::from).unwrap_or_default(),
        }
    }
}

impl<'a> From<&'a Status> for proto::DisplayStatus {
    fn from(status: &'a Status) -> Self {
        proto::DisplayStatus {
            modules: status
                .modules
                .iter()
                .map(|module| proto::ModuleStatus {
                    state: module.state.to_wire(),
                    flap_index: module.flap_index,
                    moving: module.moving,
                    home_state: module.home_state,
                    count_unexpected_home: module.unexpected_home,
                    count_missed_home: module.missed_home,
                })
                .collect(),
            settings: Some((&status.settings).into()),
        }
    }
}
