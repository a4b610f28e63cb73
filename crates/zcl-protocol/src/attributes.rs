//! ZCL attribute data types and record parsing

use crate::types::DecodeError;
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// ZCL data types understood by this driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    Boolean = 0x10,
    Bitmap8 = 0x18,
    Uint8 = 0x20,
    Uint16 = 0x21,
    Uint32 = 0x23,
    Int8 = 0x28,
    Int16 = 0x29,
    Enum8 = 0x30,
    String = 0x42,
}

impl DataType {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0x10 => Ok(DataType::Boolean),
            0x18 => Ok(DataType::Bitmap8),
            0x20 => Ok(DataType::Uint8),
            0x21 => Ok(DataType::Uint16),
            0x23 => Ok(DataType::Uint32),
            0x28 => Ok(DataType::Int8),
            0x29 => Ok(DataType::Int16),
            0x30 => Ok(DataType::Enum8),
            0x42 => Ok(DataType::String),
            v => Err(DecodeError::UnknownDataType(v)),
        }
    }

    /// Analog types carry a reportable-change field in Configure Reporting
    #[must_use]
    pub fn is_analog(&self) -> bool {
        matches!(
            self,
            DataType::Uint8
                | DataType::Uint16
                | DataType::Uint32
                | DataType::Int8
                | DataType::Int16
        )
    }
}

/// A decoded attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Bool(bool),
    Bitmap8(u8),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Int8(i8),
    Int16(i16),
    Enum8(u8),
    String(String),
}

impl AttributeValue {
    /// Read a value of type `data_type`, returning it and the bytes consumed
    pub fn read(data_type: DataType, data: &[u8]) -> Result<(Self, usize), DecodeError> {
        let value = match data_type {
            DataType::Boolean => {
                DecodeError::ensure_len(data, 1)?;
                (AttributeValue::Bool(data[0] != 0), 1)
            }
            DataType::Bitmap8 => {
                DecodeError::ensure_len(data, 1)?;
                (AttributeValue::Bitmap8(data[0]), 1)
            }
            DataType::Uint8 => {
                DecodeError::ensure_len(data, 1)?;
                (AttributeValue::Uint8(data[0]), 1)
            }
            DataType::Enum8 => {
                DecodeError::ensure_len(data, 1)?;
                (AttributeValue::Enum8(data[0]), 1)
            }
            DataType::Int8 => {
                DecodeError::ensure_len(data, 1)?;
                (AttributeValue::Int8(i8::from_le_bytes([data[0]])), 1)
            }
            DataType::Uint16 => {
                DecodeError::ensure_len(data, 2)?;
                (AttributeValue::Uint16(u16::from_le_bytes([data[0], data[1]])), 2)
            }
            DataType::Int16 => {
                DecodeError::ensure_len(data, 2)?;
                (AttributeValue::Int16(i16::from_le_bytes([data[0], data[1]])), 2)
            }
            DataType::Uint32 => {
                DecodeError::ensure_len(data, 4)?;
                (
                    AttributeValue::Uint32(u32::from_le_bytes([data[0], data[1], data[2], data[3]])),
                    4,
                )
            }
            DataType::String => {
                DecodeError::ensure_len(data, 1)?;
                let len = data[0] as usize;
                DecodeError::ensure_len(data, 1 + len)?;
                let text = String::from_utf8_lossy(&data[1..=len]).into_owned();
                (AttributeValue::String(text), 1 + len)
            }
        };
        Ok(value)
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeValue::Bool(_) => DataType::Boolean,
            AttributeValue::Bitmap8(_) => DataType::Bitmap8,
            AttributeValue::Uint8(_) => DataType::Uint8,
            AttributeValue::Uint16(_) => DataType::Uint16,
            AttributeValue::Uint32(_) => DataType::Uint32,
            AttributeValue::Int8(_) => DataType::Int8,
            AttributeValue::Int16(_) => DataType::Int16,
            AttributeValue::Enum8(_) => DataType::Enum8,
            AttributeValue::String(_) => DataType::String,
        }
    }

    /// Write the value bytes (without the type tag)
    pub fn write(&self, out: &mut impl BufMut) {
        match self {
            AttributeValue::Bool(v) => out.put_u8(u8::from(*v)),
            AttributeValue::Bitmap8(v) | AttributeValue::Uint8(v) | AttributeValue::Enum8(v) => {
                out.put_u8(*v);
            }
            AttributeValue::Int8(v) => out.put_i8(*v),
            AttributeValue::Uint16(v) => out.put_u16_le(*v),
            AttributeValue::Int16(v) => out.put_i16_le(*v),
            AttributeValue::Uint32(v) => out.put_u32_le(*v),
            AttributeValue::String(s) => {
                // ZCL character strings are length-prefixed and capped at 254 bytes
                let bytes = &s.as_bytes()[..s.len().min(254)];
                out.put_u8(bytes.len() as u8);
                out.put_slice(bytes);
            }
        }
    }

    /// Numeric view of integer values
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Bool(v) => Some(i64::from(*v)),
            AttributeValue::Bitmap8(v) | AttributeValue::Uint8(v) | AttributeValue::Enum8(v) => {
                Some(i64::from(*v))
            }
            AttributeValue::Uint16(v) => Some(i64::from(*v)),
            AttributeValue::Uint32(v) => Some(i64::from(*v)),
            AttributeValue::Int8(v) => Some(i64::from(*v)),
            AttributeValue::Int16(v) => Some(i64::from(*v)),
            AttributeValue::String(_) => None,
        }
    }
}

/// One record of a Report Attributes command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub attribute_id: u16,
    pub value: AttributeValue,
}

impl AttributeRecord {
    /// Parse Report Attributes payload: `[attr u16 | type u8 | value]*`
    pub fn parse_report(payload: &[u8]) -> Result<Vec<Self>, DecodeError> {
        DecodeError::ensure_len(payload, 4)?;
        let mut records = Vec::new();
        let mut idx = 0;

        while idx < payload.len() {
            let rest = &payload[idx..];
            DecodeError::ensure_len(rest, 3)?;
            let attribute_id = u16::from_le_bytes([rest[0], rest[1]]);
            let data_type = DataType::from_u8(rest[2])?;
            let (value, used) = AttributeValue::read(data_type, &rest[3..])?;
            records.push(Self {
                attribute_id,
                value,
            });
            idx += 3 + used;
        }

        Ok(records)
    }
}

/// One record of a Read Attributes Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAttributeRecord {
    pub attribute_id: u16,
    pub status: u8,
    /// Present only when `status` is success
    pub value: Option<AttributeValue>,
}

impl ReadAttributeRecord {
    /// Parse Read Attributes Response payload: `[attr u16 | status u8 | (type u8 | value)?]*`
    pub fn parse_response(payload: &[u8]) -> Result<Vec<Self>, DecodeError> {
        DecodeError::ensure_len(payload, 3)?;
        let mut records = Vec::new();
        let mut idx = 0;

        while idx < payload.len() {
            let rest = &payload[idx..];
            DecodeError::ensure_len(rest, 3)?;
            let attribute_id = u16::from_le_bytes([rest[0], rest[1]]);
            let status = rest[2];
            if status != 0 {
                records.push(Self {
                    attribute_id,
                    status,
                    value: None,
                });
                idx += 3;
                continue;
            }
            DecodeError::ensure_len(rest, 4)?;
            let data_type = DataType::from_u8(rest[3])?;
            let (value, used) = AttributeValue::read(data_type, &rest[4..])?;
            records.push(Self {
                attribute_id,
                status,
                value: Some(value),
            });
            idx += 4 + used;
        }

        Ok(records)
    }
}

/// Status records from Configure Reporting / Write Attributes responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// `(status, attribute)` pairs; a lone success byte has no attribute
    pub statuses: Vec<(u8, Option<u16>)>,
}

impl StatusResponse {
    /// Configure Reporting Response: single status, or `[status u8 | direction u8 | attr u16]*`
    pub fn parse_configure_reporting(payload: &[u8]) -> Result<Self, DecodeError> {
        Self::parse_records(payload, 4, 2)
    }

    /// Write Attributes Response: single status, or `[status u8 | attr u16]*`
    pub fn parse_write_attributes(payload: &[u8]) -> Result<Self, DecodeError> {
        Self::parse_records(payload, 3, 1)
    }

    fn parse_records(
        payload: &[u8],
        record_len: usize,
        attr_offset: usize,
    ) -> Result<Self, DecodeError> {
        DecodeError::ensure_len(payload, 1)?;
        if payload.len() == 1 {
            return Ok(Self {
                statuses: vec![(payload[0], None)],
            });
        }
        if payload.len() % record_len != 0 {
            return Err(DecodeError::InvalidValue(format!(
                "status response of {} bytes is not a multiple of {record_len}",
                payload.len()
            )));
        }
        let statuses = payload
            .chunks_exact(record_len)
            .map(|rec| {
                let attr = u16::from_le_bytes([rec[attr_offset], rec[attr_offset + 1]]);
                (rec[0], Some(attr))
            })
            .collect();
        Ok(Self { statuses })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.statuses.iter().all(|(status, _)| *status == 0)
    }
}

/// One attribute entry of a Configure Reporting request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingConfig {
    pub attribute_id: u16,
    pub data_type: DataType,
    pub min_interval: u16,
    pub max_interval: u16,
    /// Only encoded for analog data types
    pub reportable_change: Option<AttributeValue>,
}

impl ReportingConfig {
    pub fn write(&self, out: &mut impl BufMut) {
        out.put_u8(0x00); // direction: attribute is reported
        out.put_u16_le(self.attribute_id);
        out.put_u8(self.data_type as u8);
        out.put_u16_le(self.min_interval);
        out.put_u16_le(self.max_interval);
        if self.data_type.is_analog() {
            match &self.reportable_change {
                Some(change) => change.write(out),
                None => AttributeValue::zero(self.data_type).write(out),
            }
        }
    }
}

impl AttributeValue {
    fn zero(data_type: DataType) -> Self {
        match data_type {
            DataType::Boolean => AttributeValue::Bool(false),
            DataType::Bitmap8 => AttributeValue::Bitmap8(0),
            DataType::Uint8 => AttributeValue::Uint8(0),
            DataType::Uint16 => AttributeValue::Uint16(0),
            DataType::Uint32 => AttributeValue::Uint32(0),
            DataType::Int8 => AttributeValue::Int8(0),
            DataType::Int16 => AttributeValue::Int16(0),
            DataType::Enum8 => AttributeValue::Enum8(0),
            DataType::String => AttributeValue::String(String::new()),
        }
    }
}
