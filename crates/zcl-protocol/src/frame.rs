//! ZCL frame header and ASDU conversion

use crate::types::{frame_control, DecodeError, InboundFrame, OutboundCommand};
use bytes::BufMut;

/// Minimum header size: `frame_control(1)` + `seq(1)` + `command(1)`
pub const MIN_HEADER_SIZE: usize = 3;

/// ZCL frame header
///
/// Frame format:
/// ```text
/// [Frame Control: 1 byte]
/// [Manufacturer Code: 2 bytes LE] (only if frame control bit 2 is set)
/// [Transaction Sequence: 1 byte]
/// [Command ID: 1 byte]
/// [Payload: variable]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZclHeader {
    pub frame_control: u8,
    pub manufacturer_code: Option<u16>,
    pub sequence: u8,
    pub command_id: u8,
}

impl ZclHeader {
    /// Parse a header, returning it together with the remaining payload
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        DecodeError::ensure_len(data, MIN_HEADER_SIZE)?;

        let frame_control = data[0];
        let mut idx = 1;

        let manufacturer_code = if (frame_control & frame_control::MANUFACTURER_SPECIFIC) != 0 {
            DecodeError::ensure_len(data, MIN_HEADER_SIZE + 2)?;
            let code = u16::from_le_bytes([data[idx], data[idx + 1]]);
            idx += 2;
            Some(code)
        } else {
            None
        };

        let sequence = data[idx];
        let command_id = data[idx + 1];
        idx += 2;

        Ok((
            Self {
                frame_control,
                manufacturer_code,
                sequence,
                command_id,
            },
            &data[idx..],
        ))
    }

    /// Serialize the header into `out`
    pub fn write(&self, out: &mut impl BufMut) {
        let mut frame_control = self.frame_control;
        if self.manufacturer_code.is_some() {
            frame_control |= frame_control::MANUFACTURER_SPECIFIC;
        }
        out.put_u8(frame_control);
        if let Some(code) = self.manufacturer_code {
            out.put_u16_le(code);
        }
        out.put_u8(self.sequence);
        out.put_u8(self.command_id);
    }
}

impl InboundFrame {
    /// Build an inbound frame from APS addressing plus the raw ASDU
    pub fn from_asdu(
        profile_id: u16,
        cluster_id: u16,
        endpoint: u8,
        asdu: &[u8],
    ) -> Result<Self, DecodeError> {
        let (header, payload) = ZclHeader::parse(asdu)?;
        tracing::trace!(
            "ZCL frame: cluster=0x{:04X} cmd=0x{:02X} fc=0x{:02X} seq={} mfr={:?} len={}",
            cluster_id,
            header.command_id,
            header.frame_control,
            header.sequence,
            header.manufacturer_code,
            payload.len()
        );
        Ok(Self {
            cluster_id,
            command_id: header.command_id,
            profile_id,
            endpoint,
            flags: header.frame_control,
            payload: payload.to_vec(),
        })
    }
}

impl OutboundCommand {
    /// Frame control byte for this command (client to server)
    #[must_use]
    pub fn frame_control(&self) -> u8 {
        let mut fc = 0u8;
        if self.cluster_specific {
            fc |= frame_control::CLUSTER_SPECIFIC;
        }
        if self.disable_default_response {
            fc |= frame_control::DISABLE_DEFAULT_RESPONSE;
        }
        fc
    }

    /// Serialize to an ASDU using the given transaction sequence number
    #[must_use]
    pub fn to_asdu(&self, sequence: u8) -> Vec<u8> {
        let mut data = Vec::with_capacity(MIN_HEADER_SIZE + self.payload.len());
        ZclHeader {
            frame_control: self.frame_control(),
            manufacturer_code: None,
            sequence,
            command_id: self.command_id,
        }
        .write(&mut data);
        data.extend_from_slice(&self.payload);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{clusters, endpoints, profiles};

    #[test]
    fn test_parse_plain_header() {
        let (header, payload) = ZclHeader::parse(&[0x19, 0x42, 0xFB, 0xAA, 0xBB]).unwrap();
        assert_eq!(header.frame_control, 0x19);
        assert_eq!(header.manufacturer_code, None);
        assert_eq!(header.sequence, 0x42);
        assert_eq!(header.command_id, 0xFB);
        assert_eq!(payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_parse_manufacturer_header() {
        let (header, payload) = ZclHeader::parse(&[0x1D, 0x39, 0x10, 0x07, 0x0A, 0x01]).unwrap();
        assert_eq!(header.manufacturer_code, Some(0x1039));
        assert_eq!(header.sequence, 0x07);
        assert_eq!(header.command_id, 0x0A);
        assert_eq!(payload, &[0x01]);
    }

    #[test]
    fn test_header_too_short() {
        assert!(matches!(
            ZclHeader::parse(&[0x01, 0x02]),
            Err(DecodeError::TooShort { needed: 3, actual: 2 })
        ));
        // Manufacturer bit set but code missing
        assert!(matches!(
            ZclHeader::parse(&[0x05, 0x01, 0x02]),
            Err(DecodeError::TooShort { .. })
        ));
    }

    #[test]
    fn test_inbound_from_asdu() {
        let frame = InboundFrame::from_asdu(
            profiles::ALERTME,
            clusters::ALERTME_BUTTON,
            endpoints::ALERTME,
            &[0x09, 0x11, 0x01, 0x00, 0x01],
        )
        .unwrap();
        assert!(frame.is_cluster_specific());
        assert_eq!(frame.command_id, 0x01);
        assert_eq!(frame.payload, vec![0x00, 0x01]);
    }

    #[test]
    fn test_stop_polling_asdu() {
        let cmd = OutboundCommand::cluster_command(
            profiles::ALERTME,
            endpoints::ALERTME,
            clusters::ALERTME_GENERAL,
            0xFD,
            Vec::new(),
        );
        assert_eq!(cmd.to_asdu(0x00), vec![0x11, 0x00, 0xFD]);
    }

    #[test]
    fn test_global_command_keeps_default_response() {
        let cmd = OutboundCommand::global_command(
            profiles::HOME_AUTOMATION,
            1,
            clusters::POWER_CONFIG,
            0x06,
            vec![0x00],
        );
        assert_eq!(cmd.to_asdu(5), vec![0x00, 0x05, 0x06, 0x00]);
    }
}
