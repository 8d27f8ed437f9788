//! Protobuf messages exchanged with the controller firmware.
//!
//! Written out by hand with `prost` derives; field numbers must stay in sync with
//! the firmware's schema.

/// Host to controller envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ToDisplay {
    /// Echoed back in the matching [`Ack`].
    #[prost(uint32, tag = "1")]
    pub nonce: u32,
    #[prost(oneof = "to_display::Payload", tags = "2, 3, 4")]
    pub payload: Option<to_display::Payload>,
}

pub mod to_display {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        Command(super::Command),
        #[prost(message, tag = "3")]
        Config(super::Config),
        #[prost(message, tag = "4")]
        RequestState(super::RequestState),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Command {
    #[prost(message, repeated, tag = "1")]
    pub modules: Vec<ModuleCommand>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct ModuleCommand {
    #[prost(int32, tag = "1")]
    pub action: i32,
    #[prost(uint32, tag = "2")]
    pub param: u32,
}

impl ModuleCommand {
    pub const NO_OP: i32 = 0;
    pub const GO_TO_FLAP: i32 = 1;
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Config {
    #[prost(message, optional, tag = "1")]
    pub settings: Option<Settings>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct RequestState {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Settings {
    #[prost(bool, tag = "1")]
    pub force_full_rotation: bool,
    #[prost(uint32, tag = "2")]
    pub max_moving: u32,
    #[prost(uint32, tag = "3")]
    pub start_delay_millis: u32,
    #[prost(int32, tag = "4")]
    pub animation_style: i32,
}

/// Controller to host envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FromDisplay {
    #[prost(oneof = "from_display::Payload", tags = "1, 2, 3")]
    pub payload: Option<from_display::Payload>,
}

pub mod from_display {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "1")]
        Status(super::DisplayStatus),
        #[prost(message, tag = "2")]
        Log(super::Log),
        #[prost(message, tag = "3")]
        Ack(super::Ack),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DisplayStatus {
    #[prost(message, repeated, tag = "1")]
    pub modules: Vec<ModuleStatus>,
    #[prost(message, optional, tag = "2")]
    pub settings: Option<Settings>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct ModuleStatus {
    #[prost(int32, tag = "1")]
    pub state: i32,
    #[prost(uint32, tag = "2")]
    pub flap_index: u32,
    #[prost(bool, tag = "3")]
    pub moving: bool,
    #[prost(bool, tag = "4")]
    pub home_state: bool,
    #[prost(uint32, tag = "5")]
    pub count_unexpected_home: u32,
    #[prost(uint32, tag = "6")]
    pub count_missed_home: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Log {
    #[prost(string, tag = "1")]
    pub msg: String,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Ack {
    #[prost(uint32, tag = "1")]
    pub nonce: u32,
}
