//! Zigbee Cluster Library wire layer
//!
//! This crate implements the ZCL framing and payload formats used by
//! battery-powered buttons and irrigation controllers, including the
//! manufacturer-specific clusters they speak alongside Home Automation.

pub mod attributes;
pub mod codec;
pub mod commands;
pub mod frame;
pub mod types;

pub use attributes::{
    AttributeRecord, AttributeValue, DataType, ReadAttributeRecord, ReportingConfig,
    StatusResponse,
};
pub use codec::{
    decode, encode, BatteryCurve, ButtonAction, Decoded, Heartbeat, HelloResponse,
    OutboundPayload,
};
pub use commands::{GlobalCommand, OnOffCommand};
pub use frame::ZclHeader;
pub use types::*;
