//! ZCL command identifiers

/// ZCL global (profile-wide) commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GlobalCommand {
    ReadAttributes = 0x00,
    ReadAttributesResponse = 0x01,
    WriteAttributes = 0x02,
    WriteAttributesResponse = 0x04,
    ConfigureReporting = 0x06,
    ConfigureReportingResponse = 0x07,
    ReportAttributes = 0x0A,
    DefaultResponse = 0x0B,
}

impl GlobalCommand {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(GlobalCommand::ReadAttributes),
            0x01 => Some(GlobalCommand::ReadAttributesResponse),
            0x02 => Some(GlobalCommand::WriteAttributes),
            0x04 => Some(GlobalCommand::WriteAttributesResponse),
            0x06 => Some(GlobalCommand::ConfigureReporting),
            0x07 => Some(GlobalCommand::ConfigureReportingResponse),
            0x0A => Some(GlobalCommand::ReportAttributes),
            0x0B => Some(GlobalCommand::DefaultResponse),
            _ => None,
        }
    }
}

/// ZCL On/Off cluster commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OnOffCommand {
    Off = 0x00,
    On = 0x01,
    OnWithTimedOff = 0x42,
}

/// AlertMe General cluster (0x00F0)
pub mod general {
    pub const HEARTBEAT: u8 = 0xFB;
    pub const STOP_POLLING: u8 = 0xFD;
}

/// AlertMe Button cluster (0x00F3)
pub mod button {
    pub const RELEASED: u8 = 0x00;
    pub const PRESSED: u8 = 0x01;
}

/// AlertMe Join cluster (0x00F6)
pub mod join {
    pub const HELLO_REQUEST: u8 = 0xFC;
    pub const HELLO_RESPONSE: u8 = 0xFE;
}

/// Poll Control cluster (0x0020)
pub mod poll_control {
    /// Server to client
    pub const CHECK_IN: u8 = 0x00;
    /// Client to server
    pub const CHECK_IN_RESPONSE: u8 = 0x00;
}
