use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::Charset;

/// Error returned when parsing an unrecognized [`AnimationStyle`] name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown animation style {:?}", name)]
pub struct ParseStyleError {
    /// The name that was not recognized.
    pub name: String,
}

/// The order in which modules start moving when several have to change.
///
/// Has no visible effect unless a start delay or a limit on concurrently
/// moving modules is also configured.
///
/// # Examples
///
/// ```
/// use flapper_core::AnimationStyle;
///
/// let style: AnimationStyle = "LEFT_TO_RIGHT".parse().unwrap();
/// assert_eq!(AnimationStyle::LeftToRight, style);
/// assert!("SIDEWAYS".parse::<AnimationStyle>().is_err());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnimationStyle {
    /// All modules start together (subject to the start delay).
    Simultaneous,
    /// Modules start from the leftmost one.
    LeftToRight,
    /// Modules start from the rightmost one.
    RightToLeft,
    /// Modules start in random order.
    Random,
    /// A value reported by the firmware that this library does not know.
    Other(i32),
}

impl AnimationStyle {
    /// Styles that can be selected by name.
    pub const NAMED: [AnimationStyle; 4] = [
        AnimationStyle::Simultaneous,
        AnimationStyle::LeftToRight,
        AnimationStyle::RightToLeft,
        AnimationStyle::Random,
    ];

    /// Returns the enumerator name used by the wire protocol.
    pub fn name(&self) -> Option<&'static str> {
        match *self {
            AnimationStyle::Simultaneous => Some("SIMULTANEOUS"),
            AnimationStyle::LeftToRight => Some("LEFT_TO_RIGHT"),
            AnimationStyle::RightToLeft => Some("RIGHT_TO_LEFT"),
            AnimationStyle::Random => Some("RANDOM"),
            AnimationStyle::Other(_) => None,
        }
    }

    /// Converts from the integer carried on the wire.
    pub fn from_wire(value: i32) -> Self {
        match value {
            0 => AnimationStyle::Simultaneous,
            1 => AnimationStyle::LeftToRight,
            2 => AnimationStyle::RightToLeft,
            3 => AnimationStyle::Random,
            other => AnimationStyle::Other(other),
        }
    }

    /// Converts to the integer carried on the wire.
    pub fn to_wire(self) -> i32 {
        match self {
            AnimationStyle::Simultaneous => 0,
            AnimationStyle::LeftToRight => 1,
            AnimationStyle::RightToLeft => 2,
            AnimationStyle::Random => 3,
            AnimationStyle::Other(value) => value,
        }
    }
}

impl FromStr for AnimationStyle {
    type Err = ParseStyleError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        AnimationStyle::NAMED
            .iter()
            .copied()
            .find(|style| style.name() == Some(name))
            .ok_or_else(|| ParseStyleError { name: name.to_owned() })
    }
}

impl Display for AnimationStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "UNKNOWN({})", self.to_wire()),
        }
    }
}

/// Animation settings applied by the controller to every text change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Settings {
    /// Modules whose character is unchanged still go through a full rotation.
    pub force_full_rotation: bool,

    /// The maximum number of modules allowed to move at once (0 means unlimited).
    pub max_moving: u32,

    /// Delay between starting one module and the next, in milliseconds.
    pub start_delay_millis: u32,

    /// The order in which modules are started.
    pub animation_style: AnimationStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            force_full_rotation: false,
            max_moving: 0,
            start_delay_millis: 0,
            animation_style: AnimationStyle::Simultaneous,
        }
    }
}

impl Display for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fullrotation: {} maxmoving: {} startdelay: {} animstyle: {}",
            self.force_full_rotation, self.max_moving, self.start_delay_millis, self.animation_style
        )
    }
}

/// Health of a single module as reported by the controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// Operating normally.
    Normal,
    /// Searching for the home position.
    LookForHome,
    /// The home sensor is not behaving as expected.
    SensorError,
    /// The module gave up and stopped.
    Panic,
    /// The module has been disabled.
    Disabled,
    /// A value reported by the firmware that this library does not know.
    Other(i32),
}

impl ModuleState {
    /// Converts from the integer carried on the wire.
    pub fn from_wire(value: i32) -> Self {
        match value {
            0 => ModuleState::Normal,
            1 => ModuleState::LookForHome,
            2 => ModuleState::SensorError,
            3 => ModuleState::Panic,
            4 => ModuleState::Disabled,
            other => ModuleState::Other(other),
        }
    }

    /// Converts to the integer carried on the wire.
    pub fn to_wire(self) -> i32 {
        match self {
            ModuleState::Normal => 0,
            ModuleState::LookForHome => 1,
            ModuleState::SensorError => 2,
            ModuleState::Panic => 3,
            ModuleState::Disabled => 4,
            ModuleState::Other(value) => value,
        }
    }
}

/// The reported condition of one module of the display.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ModuleStatus {
    /// The flap currently facing the viewer.
    pub flap_index: u32,

    /// Whether the module is currently turning.
    pub moving: bool,

    /// Whether the home sensor is currently triggered.
    pub home_state: bool,

    /// The module's health.
    pub state: ModuleState,

    /// How many times the home position was expected but not seen.
    pub missed_home: u32,

    /// How many times the home position was seen where it wasn't expected.
    pub unexpected_home: u32,
}

impl ModuleStatus {
    /// Creates the status of a healthy, idle module showing the given flap.
    pub fn at_flap(flap_index: u32) -> Self {
        ModuleStatus {
            flap_index,
            moving: false,
            home_state: false,
            state: ModuleState::Normal,
            missed_home: 0,
            unexpected_home: 0,
        }
    }
}

/// A complete status report: every module plus the current settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Status {
    /// Per-module status, in display order.
    pub modules: Vec<ModuleStatus>,

    /// The settings the controller is currently using.
    pub settings: Settings,
}

/// Point-in-time model of the display, derived from the latest [`Status`].
///
/// Values of this type are immutable; a new one is built for every status
/// report and swapped in whole.
///
/// # Examples
///
/// ```
/// use flapper_core::{Charset, DisplayState, ModuleStatus, Status};
///
/// let status = Status {
///     modules: vec![ModuleStatus::at_flap(8), ModuleStatus::at_flap(9)],
///     ..Status::default()
/// };
/// let state = DisplayState::new(status, &Charset::default());
/// assert_eq!("hi", state.text());
/// assert_eq!(Some(2), state.module_count());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DisplayState {
    status: Status,
    text: String,
    reported: bool,
}

impl DisplayState {
    /// Builds the state for a status report, deriving the text currently shown.
    pub fn new(status: Status, charset: &Charset) -> Self {
        let text = status
            .modules
            .iter()
            .map(|module| charset.flap(module.flap_index).unwrap_or(UNKNOWN_FLAP))
            .collect();
        DisplayState {
            status,
            text,
            reported: true,
        }
    }

    /// The full status snapshot.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// The settings the controller last reported.
    pub fn settings(&self) -> &Settings {
        &self.status.settings
    }

    /// The text currently shown, one character per module in module order.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The number of modules, or `None` if no status has been reported yet.
    pub fn module_count(&self) -> Option<usize> {
        if self.reported {
            Some(self.status.modules.len())
        } else {
            None
        }
    }
}

/// Shown in place of flap indices outside the character set.
const UNKNOWN_FLAP: char = '?';

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_names_roundtrip() {
        for style in AnimationStyle::NAMED.iter() {
            let name = style.name().unwrap();
            assert_eq!(*style, name.parse().unwrap());
            assert_eq!(*style, AnimationStyle::from_wire(style.to_wire()));
        }
    }

    #[test]
    fn unknown_style_rejected() {
        let error = "left_to_right".parse::<AnimationStyle>().unwrap_err();
        assert_eq!("left_to_right", error.name);
    }

    #[test]
    fn unknown_wire_values_preserved() {
        assert_eq!(AnimationStyle::Other(9), AnimationStyle::from_wire(9));
        assert_eq!(9, AnimationStyle::Other(9).to_wire());
        assert_eq!(ModuleState::Other(-1), ModuleState::from_wire(-1));
        assert_eq!("UNKNOWN(9)", AnimationStyle::Other(9).to_string());
    }

    #[test]
    fn text_derived_in_module_order() {
        let charset = Charset::new("abc");
        let status = Status {
            modules: vec![ModuleStatus::at_flap(0), ModuleStatus::at_flap(1), ModuleStatus::at_flap(2)],
            settings: Settings::default(),
        };
        let state = DisplayState::new(status, &charset);
        assert_eq!("abc", state.text());
        assert_eq!(Some(3), state.module_count());
    }

    #[test]
    fn out_of_range_flap_marked() {
        let status = Status {
            modules: vec![ModuleStatus::at_flap(1), ModuleStatus::at_flap(200)],
            settings: Settings::default(),
        };
        let state = DisplayState::new(status, &Charset::default());
        assert_eq!("a?", state.text());
    }

    #[test]
    fn default_state_unreported() {
        let state = DisplayState::default();
        assert_eq!(None, state.module_count());
        assert_eq!("", state.text());
        assert_eq!(&Settings::default(), state.settings());
    }
}
