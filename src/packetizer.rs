//! Packetizer: turns one accumulated byte span into one outbound datagram.
//!
//! Two framings are supported. `Plain` passes the span through untouched
//! for receivers that expect raw host-order linear PCM. `RtpL16` prepends a
//! 12-byte RTP header and converts the payload to network byte order,
//! advancing the sequence number and timestamp across flushes.

use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::buncher::BUNCH_CAPACITY;
use crate::rtp::header::{RtpHeader, L16_PAYLOAD_TYPE, RTP_HEADER_LEN};
use crate::rtp::l16;

/// Framing mode with its per-flow protocol state.
///
/// Selected once at flow construction and never re-inferred: the presence
/// of an SSRC in the flow parameters picks `RtpL16`, its absence picks
/// `Plain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Raw accumulated bytes, native byte order, no header.
    Plain,
    /// RTP-framed L16: dynamic payload type 96, network byte order payload.
    RtpL16 {
        /// Caller-supplied synchronization source, constant for the flow
        ssrc: u32,
        /// Sequence number, wraps modulo 2^16
        sequence: u16,
        /// Timestamp in payload bytes, wraps modulo 2^32
        timestamp: u32,
    },
}

impl Framing {
    /// Pass-through framing.
    pub fn plain() -> Self {
        Framing::Plain
    }

    /// RTP/L16 framing for the given SSRC, with sequence number and
    /// timestamp seeded from process-random values. Never zero-seeded, so
    /// a restarted flow to the same receiver does not collide with its
    /// predecessor's counters.
    pub fn rtp_l16(ssrc: u32) -> Self {
        Framing::RtpL16 {
            ssrc,
            sequence: (random_seed() as u16).max(1),
            timestamp: random_seed().max(1),
        }
    }
}

/// Process-random seed for RTP counters.
fn random_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0x12345678)
        ^ process::id()
}

/// Builds outbound datagrams from accumulated spans.
///
/// Owns the framing state and a scratch buffer sized for the largest
/// possible framed datagram, reused across flushes so the frame path never
/// allocates.
pub struct Packetizer {
    framing: Framing,
    /// Pre-allocated packet buffer (header + payload)
    packet_buffer: Box<[u8]>,
}

impl Packetizer {
    /// Create a packetizer for the given framing mode.
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            packet_buffer: vec![0u8; RTP_HEADER_LEN + BUNCH_CAPACITY].into_boxed_slice(),
        }
    }

    /// Serialize one accumulated span into one datagram.
    ///
    /// In `Plain` mode the span is returned byte-for-byte. In `RtpL16`
    /// mode the returned slice is the 12-byte header followed by the
    /// network-order payload, and the sequence number (+1) and timestamp
    /// (+span length in bytes) are advanced for the next flush. Counters
    /// advance only here; they are never reset for the flow's lifetime.
    pub fn frame<'a>(&'a mut self, span: &'a [u8]) -> &'a [u8] {
        match &mut self.framing {
            Framing::Plain => span,
            Framing::RtpL16 {
                ssrc,
                sequence,
                timestamp,
            } => {
                let header = RtpHeader {
                    payload_type: L16_PAYLOAD_TYPE,
                    sequence: *sequence,
                    timestamp: *timestamp,
                    ssrc: *ssrc,
                };
                let header_len = header.encode(&mut self.packet_buffer);
                debug_assert_eq!(header_len, RTP_HEADER_LEN);

                l16::copy_to_network_order(span, &mut self.packet_buffer[RTP_HEADER_LEN..]);

                *sequence = sequence.wrapping_add(1);
                *timestamp = timestamp.wrapping_add(span.len() as u32);

                &self.packet_buffer[..RTP_HEADER_LEN + span.len()]
            }
        }
    }

    /// Current framing state (for diagnostics and tests).
    pub fn framing(&self) -> &Framing {
        &self.framing
    }
}
