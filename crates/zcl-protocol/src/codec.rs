//! Payload codec for the clusters this driver models
//!
//! Decoders are pure functions over the ZCL payload (header already
//! stripped). Byte offsets below are payload offsets.

use crate::attributes::{
    AttributeRecord, AttributeValue, ReadAttributeRecord, ReportingConfig, StatusResponse,
};
use crate::commands::{self, GlobalCommand, OnOffCommand};
use crate::types::{clusters, DecodeError, InboundFrame};
use bytes::BufMut;

/// Heartbeat flag bits (payload byte 0)
pub mod heartbeat_flags {
    pub const VOLTAGE: u8 = 0x01;
    pub const TEMPERATURE: u8 = 0x02;
    pub const LQI: u8 = 0x08;
}

/// Linear battery discharge curve between a minimum and nominal voltage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryCurve {
    pub nominal_voltage: f64,
    pub min_voltage: f64,
}

impl BatteryCurve {
    /// Two-cell button battery
    pub const BUTTON: Self = Self {
        nominal_voltage: 3.0,
        min_voltage: 2.1,
    };

    /// Remaining charge in percent, rounded and clamped to 0..=100
    #[must_use]
    pub fn percent(&self, volts: f64) -> u8 {
        let span = self.nominal_voltage - self.min_voltage;
        let pct = (100.0 / span * (volts - self.min_voltage)).round();
        if pct.is_nan() {
            return 0;
        }
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Decoded heartbeat fields; each is present only if its flag bit was set
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Heartbeat {
    pub voltage: Option<f64>,
    pub temperature: Option<f64>,
    pub lqi: Option<u8>,
}

impl Heartbeat {
    /// Decode a heartbeat payload (General cluster, command 0xFB)
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        DecodeError::ensure_len(payload, 1)?;
        let flags = payload[0];
        let mut heartbeat = Heartbeat::default();

        if flags & heartbeat_flags::VOLTAGE != 0 {
            DecodeError::ensure_len(payload, 7)?;
            let millivolts = u16::from(payload[6]) * 256 + u16::from(payload[5]);
            heartbeat.voltage = Some(f64::from(millivolts) / 1000.0);
        }

        if flags & heartbeat_flags::TEMPERATURE != 0 {
            DecodeError::ensure_len(payload, 9)?;
            // 12-bit fixed point: byte 8 holds the high bits, the high nibble
            // of byte 7 the low integer bits, its low nibble the sixteenths.
            let whole = f64::from(payload[8]) * 16.0 + f64::from((payload[7] & 0xF0) >> 4);
            let fraction = f64::from(payload[7] & 0x0F) * 0.0625;
            heartbeat.temperature = Some(whole + fraction);
        }

        if flags & heartbeat_flags::LQI != 0 {
            DecodeError::ensure_len(payload, 11)?;
            heartbeat.lqi = Some(normalize_lqi(i8::from_le_bytes([payload[10]]))?);
        }

        Ok(heartbeat)
    }
}

/// Recover the 0..=255 LQI reading from a byte delivered as signed
pub fn normalize_lqi(raw: i8) -> Result<u8, DecodeError> {
    let mut lqi = i16::from(raw);
    if lqi < 0 {
        lqi += 256;
    }
    u8::try_from(lqi).map_err(|_| DecodeError::InvalidValue(format!("LQI {raw} out of range")))
}

/// Signal quality in percent for an LQI reading
#[must_use]
pub fn signal_percent(lqi: u8) -> u8 {
    (f64::from(lqi) * 100.0 / 255.0).round() as u8
}

/// Hello response (Join cluster, command 0xFE)
#[derive(Debug, Clone, PartialEq)]
pub struct HelloResponse {
    pub node_id: u16,
    pub manufacturer_id: u16,
    pub device_type: u16,
    pub app_release: u8,
    pub app_major: u8,
    pub app_minor: u8,
    pub hw_major: u8,
    pub hw_minor: u8,
}

impl HelloResponse {
    pub const MIN_LEN: usize = 18;

    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        DecodeError::ensure_len(payload, Self::MIN_LEN)?;
        Ok(Self {
            node_id: u16::from(payload[1]) * 256 + u16::from(payload[0]),
            manufacturer_id: u16::from(payload[11]) * 256 + u16::from(payload[10]),
            device_type: u16::from(payload[13]) * 256 + u16::from(payload[12]),
            app_release: payload[14],
            app_major: payload[15] >> 4,
            app_minor: payload[15] & 0x0F,
            hw_major: payload[17],
            hw_minor: payload[16],
        })
    }

    /// `major + minor / 10`
    #[must_use]
    pub fn app_version(&self) -> f64 {
        f64::from(self.app_major) + f64::from(self.app_minor) / 10.0
    }

    /// `major + minor / 10`
    #[must_use]
    pub fn hw_version(&self) -> f64 {
        f64::from(self.hw_major) + f64::from(self.hw_minor) / 10.0
    }

    /// Composite `major.minor.release`
    #[must_use]
    pub fn app_version_string(&self) -> String {
        format!("{}.{}.{}", self.app_major, self.app_minor, self.app_release)
    }

    #[must_use]
    pub fn hw_version_string(&self) -> String {
        format!("{}.{}", self.hw_major, self.hw_minor)
    }
}

/// Button cluster command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Pressed,
    Released,
}

impl ButtonAction {
    #[must_use]
    pub fn from_command(command_id: u8) -> Option<Self> {
        match command_id {
            commands::button::PRESSED => Some(ButtonAction::Pressed),
            commands::button::RELEASED => Some(ButtonAction::Released),
            _ => None,
        }
    }
}

/// Result of decoding a recognized frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Heartbeat(Heartbeat),
    Button(ButtonAction),
    Hello(HelloResponse),
    CheckIn,
    Report(Vec<AttributeRecord>),
    ReadResponse(Vec<ReadAttributeRecord>),
    ConfigureReportingResponse(StatusResponse),
    WriteAttributesResponse(StatusResponse),
    DefaultResponse { command_id: u8, status: u8 },
}

/// Decode the payload of any frame this driver understands
pub fn decode(frame: &InboundFrame) -> Result<Decoded, DecodeError> {
    let unsupported = || DecodeError::UnsupportedCommand {
        cluster: frame.cluster_id,
        command: frame.command_id,
    };
    let payload = frame.payload.as_slice();

    if !frame.is_cluster_specific() {
        let command = GlobalCommand::from_u8(frame.command_id).ok_or_else(unsupported)?;
        return match command {
            GlobalCommand::ReportAttributes => {
                AttributeRecord::parse_report(payload).map(Decoded::Report)
            }
            GlobalCommand::ReadAttributesResponse => {
                ReadAttributeRecord::parse_response(payload).map(Decoded::ReadResponse)
            }
            GlobalCommand::ConfigureReportingResponse => {
                StatusResponse::parse_configure_reporting(payload)
                    .map(Decoded::ConfigureReportingResponse)
            }
            GlobalCommand::WriteAttributesResponse => {
                StatusResponse::parse_write_attributes(payload)
                    .map(Decoded::WriteAttributesResponse)
            }
            GlobalCommand::DefaultResponse => {
                DecodeError::ensure_len(payload, 2)?;
                Ok(Decoded::DefaultResponse {
                    command_id: payload[0],
                    status: payload[1],
                })
            }
            _ => Err(unsupported()),
        };
    }

    match (frame.cluster_id, frame.command_id) {
        (clusters::ALERTME_GENERAL, commands::general::HEARTBEAT) => {
            Heartbeat::decode(payload).map(Decoded::Heartbeat)
        }
        (clusters::ALERTME_BUTTON, command) => ButtonAction::from_command(command)
            .map(Decoded::Button)
            .ok_or_else(unsupported),
        (clusters::ALERTME_JOIN, commands::join::HELLO_RESPONSE) => {
            HelloResponse::decode(payload).map(Decoded::Hello)
        }
        (clusters::POLL_CONTROL, commands::poll_control::CHECK_IN) => Ok(Decoded::CheckIn),
        _ => Err(unsupported()),
    }
}

/// Outbound payloads, encoded with [`encode`]
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    /// General cluster: slow the heartbeat down
    StopPolling,
    /// Join cluster: ask the device to identify itself
    HelloRequest,
    OnOff(OnOffCommand),
    /// On/Off cluster 0x42; times are in tenths of a second
    OnWithTimedOff { on_time: u16, off_wait_time: u16 },
    CheckInResponse {
        start_fast_polling: bool,
        fast_poll_timeout: u16,
    },
    ReadAttributes(Vec<u16>),
    WriteAttributes(Vec<(u16, AttributeValue)>),
    ConfigureReporting(Vec<ReportingConfig>),
}

impl OutboundPayload {
    /// ZCL command id carried in the header
    #[must_use]
    pub fn command_id(&self) -> u8 {
        match self {
            OutboundPayload::StopPolling => commands::general::STOP_POLLING,
            OutboundPayload::HelloRequest => commands::join::HELLO_REQUEST,
            OutboundPayload::OnOff(cmd) => *cmd as u8,
            OutboundPayload::OnWithTimedOff { .. } => OnOffCommand::OnWithTimedOff as u8,
            OutboundPayload::CheckInResponse { .. } => commands::poll_control::CHECK_IN_RESPONSE,
            OutboundPayload::ReadAttributes(_) => GlobalCommand::ReadAttributes as u8,
            OutboundPayload::WriteAttributes(_) => GlobalCommand::WriteAttributes as u8,
            OutboundPayload::ConfigureReporting(_) => GlobalCommand::ConfigureReporting as u8,
        }
    }

    #[must_use]
    pub fn is_cluster_specific(&self) -> bool {
        !matches!(
            self,
            OutboundPayload::ReadAttributes(_)
                | OutboundPayload::WriteAttributes(_)
                | OutboundPayload::ConfigureReporting(_)
        )
    }
}

/// Encode an outbound payload into bytes
#[must_use]
pub fn encode(payload: &OutboundPayload) -> Vec<u8> {
    let mut out = Vec::new();
    match payload {
        OutboundPayload::StopPolling
        | OutboundPayload::HelloRequest
        | OutboundPayload::OnOff(_) => {}
        OutboundPayload::OnWithTimedOff {
            on_time,
            off_wait_time,
        } => {
            out.put_u8(0x00); // on/off control: accept regardless of state
            out.put_u16_le(*on_time);
            out.put_u16_le(*off_wait_time);
        }
        OutboundPayload::CheckInResponse {
            start_fast_polling,
            fast_poll_timeout,
        } => {
            out.put_u8(u8::from(*start_fast_polling));
            out.put_u16_le(*fast_poll_timeout);
        }
        OutboundPayload::ReadAttributes(ids) => {
            for id in ids {
                out.put_u16_le(*id);
            }
        }
        OutboundPayload::WriteAttributes(records) => {
            for (id, value) in records {
                out.put_u16_le(*id);
                out.put_u8(value.data_type() as u8);
                value.write(&mut out);
            }
        }
        OutboundPayload::ConfigureReporting(configs) => {
            for cfg in configs {
                cfg.write(&mut out);
            }
        }
    }
    out
}
