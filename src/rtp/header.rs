//! RTP header building and parsing.
//!
//! Implements the fixed 12-byte RFC 3550 header this crate transmits:
//! version 2, no padding, no extension, no CSRC list, marker clear.

/// Fixed RTP header length in bytes.
pub const RTP_HEADER_LEN: usize = 12;

/// Dynamic payload type used for L16 audio.
pub const L16_PAYLOAD_TYPE: u8 = 96;

/// RTP header fields for one outbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// Payload type (0-127), marker bit clear
    pub payload_type: u8,
    /// Sequence number (wraps at 65535)
    pub sequence: u16,
    /// Timestamp
    pub timestamp: u32,
    /// Synchronization source identifier
    pub ssrc: u32,
}

impl RtpHeader {
    /// Encode the header into the first 12 bytes of `buffer`.
    ///
    /// # Returns
    /// Number of bytes written (always `RTP_HEADER_LEN`), or 0 if the
    /// buffer is too small.
    pub fn encode(&self, buffer: &mut [u8]) -> usize {
        if buffer.len() < RTP_HEADER_LEN {
            return 0;
        }

        // V=2, P=0, X=0, CC=0
        buffer[0] = 0x80;
        // M=0, PT
        buffer[1] = self.payload_type & 0x7F;
        buffer[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buffer[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buffer[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        RTP_HEADER_LEN
    }

    /// Parse a fixed 12-byte header. Returns `None` on short input or a
    /// version other than 2.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < RTP_HEADER_LEN {
            return None;
        }

        let version = (data[0] >> 6) & 0x03;
        if version != 2 {
            return None;
        }

        Some(RtpHeader {
            payload_type: data[1] & 0x7F,
            sequence: u16::from_be_bytes([data[2], data[3]]),
            timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ssrc: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }
}
