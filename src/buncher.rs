//! Frame buncher: accumulates successive audio frames before transmission.
//!
//! The media tap delivers one frame per ~20ms read interval. Sending a
//! datagram per frame wastes per-packet overhead, so frames are bunched
//! into a fixed buffer and flushed either when the buffer passes the
//! half-capacity mark or when a configured frame count is reached.

use std::fmt;

/// Recommended per-read buffer size of the host media engine. A single
/// frame never exceeds this.
pub const READ_BUFFER_SIZE: usize = 8192;

/// Accumulation buffer capacity: double the per-read size, so after any
/// sub-threshold append there is still headroom for one more maximum-size
/// frame before the next flush check.
pub const BUNCH_CAPACITY: usize = 2 * READ_BUFFER_SIZE;

/// Upper bound on frames bunched per packet. At a 20ms frame cadence this
/// caps added latency at 200ms and keeps the worst-case datagram well under
/// common MTUs for telephony sample rates.
pub const MAX_FRAMES_PER_PACKET: u32 = 10;

/// Buncher error type.
#[derive(Debug, PartialEq, Eq)]
pub enum BunchError {
    /// An appended frame did not fit in the remaining buffer space.
    /// Carries the frame length and the space that was available.
    Overflow { frame_len: usize, remaining: usize },
}

impl fmt::Display for BunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BunchError::Overflow { frame_len, remaining } => write!(
                f,
                "frame of {} bytes exceeds remaining buffer space of {} bytes",
                frame_len, remaining
            ),
        }
    }
}

impl std::error::Error for BunchError {}

/// Accumulates audio frames into a pre-allocated buffer and decides flush
/// timing.
///
/// The buffer is allocated once at flow creation and reused for the flow's
/// lifetime; `append` never allocates. One buncher serves exactly one
/// outbound flow, invoked from the host's serialized media callback.
pub struct FrameBuncher {
    /// Accumulation buffer, fixed at `BUNCH_CAPACITY`.
    buffer: Box<[u8]>,
    /// Next free byte offset. Invariant: `write_offset <= BUNCH_CAPACITY`.
    write_offset: usize,
    /// Frames appended since the last reset.
    frame_count: u32,
    /// Count-based flush threshold (1..=MAX_FRAMES_PER_PACKET).
    frames_per_packet: u32,
}

impl FrameBuncher {
    /// Create a buncher with the given count-based flush threshold.
    ///
    /// The threshold is expected to be validated by the flow configuration
    /// (1..=`MAX_FRAMES_PER_PACKET`).
    pub fn new(frames_per_packet: u32) -> Self {
        debug_assert!(frames_per_packet >= 1 && frames_per_packet <= MAX_FRAMES_PER_PACKET);
        Self {
            buffer: vec![0u8; BUNCH_CAPACITY].into_boxed_slice(),
            write_offset: 0,
            frame_count: 0,
            frames_per_packet,
        }
    }

    /// Append one audio frame to the buffer.
    ///
    /// Returns `Ok(true)` when the append made a flush due (half-capacity
    /// or frame-count threshold reached), `Ok(false)` when the frame was
    /// simply retained.
    ///
    /// The tap is expected to deliver frames no larger than
    /// `READ_BUFFER_SIZE`, so a frame always fits; a frame that does not is
    /// a contract violation from the caller. Rather than corrupt adjacent
    /// memory, only the fitting prefix is copied and
    /// `BunchError::Overflow` is returned. The caller should flush: the
    /// buffer is full past the half-capacity mark.
    pub fn append(&mut self, frame: &[u8]) -> Result<bool, BunchError> {
        let remaining = BUNCH_CAPACITY - self.write_offset;
        if frame.len() > remaining {
            debug_assert!(
                false,
                "oversized frame: {} bytes with {} remaining",
                frame.len(),
                remaining
            );
            self.buffer[self.write_offset..].copy_from_slice(&frame[..remaining]);
            self.write_offset = BUNCH_CAPACITY;
            self.frame_count += 1;
            return Err(BunchError::Overflow {
                frame_len: frame.len(),
                remaining,
            });
        }

        self.buffer[self.write_offset..self.write_offset + frame.len()].copy_from_slice(frame);
        self.write_offset += frame.len();
        self.frame_count += 1;

        Ok(self.flush_due())
    }

    /// Whether the accumulated content should be flushed now.
    ///
    /// Size test: less than the recommended read size left means the next
    /// maximum-size frame might not fit. Count test: bounds the end-to-end
    /// bunching latency.
    pub fn flush_due(&self) -> bool {
        self.write_offset >= BUNCH_CAPACITY / 2 || self.frame_count >= self.frames_per_packet
    }

    /// The accumulated bytes since the last reset.
    pub fn filled(&self) -> &[u8] {
        &self.buffer[..self.write_offset]
    }

    /// Clear the accumulation state. Offset and count are reset together;
    /// the flow invokes this from its single flush point only.
    pub fn reset(&mut self) {
        self.write_offset = 0;
        self.frame_count = 0;
    }

    /// True when nothing has been appended since the last reset.
    pub fn is_empty(&self) -> bool {
        self.write_offset == 0
    }

    /// Current write offset (bytes accumulated).
    pub fn write_offset(&self) -> usize {
        self.write_offset
    }

    /// Frames appended since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_below_thresholds() {
        let mut buncher = FrameBuncher::new(MAX_FRAMES_PER_PACKET);

        // 5 frames of 320 bytes: well under half capacity and under 10 frames.
        for i in 1..=5u32 {
            let frame = vec![i as u8; 320];
            let due = buncher.append(&frame).unwrap();
            assert!(!due, "no flush expected on frame {}", i);
        }

        assert_eq!(buncher.write_offset(), 5 * 320);
        assert_eq!(buncher.frame_count(), 5);
        assert_eq!(buncher.filled().len(), 5 * 320);
        assert_eq!(buncher.filled()[0], 1);
        assert_eq!(buncher.filled()[4 * 320], 5);
    }

    #[test]
    fn test_size_threshold_triggers_flush() {
        let mut buncher = FrameBuncher::new(MAX_FRAMES_PER_PACKET);

        // One byte short of half capacity: retained.
        let frame = vec![0u8; BUNCH_CAPACITY / 2 - 1];
        assert!(!buncher.append(&frame).unwrap());

        // One more byte lands exactly on the boundary: flush due.
        assert!(buncher.append(&[0u8]).unwrap());

        buncher.reset();
        assert_eq!(buncher.write_offset(), 0);
        assert_eq!(buncher.frame_count(), 0);
        assert!(buncher.is_empty());
    }

    #[test]
    fn test_count_threshold_triggers_flush() {
        let mut buncher = FrameBuncher::new(3);

        assert!(!buncher.append(&[1, 2]).unwrap());
        assert!(!buncher.append(&[3, 4]).unwrap());
        assert!(buncher.append(&[5, 6]).unwrap());
        assert_eq!(buncher.filled(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_single_frame_per_packet() {
        let mut buncher = FrameBuncher::new(1);

        for _ in 0..4 {
            assert!(buncher.append(&[0u8; 160]).unwrap());
            buncher.reset();
        }
    }

    #[test]
    fn test_max_frames_boundary() {
        let mut buncher = FrameBuncher::new(MAX_FRAMES_PER_PACKET);

        // Tiny frames never trip the size test; the 10th append flushes.
        for i in 1..=9u32 {
            assert!(!buncher.append(&[0u8; 4]).unwrap(), "frame {}", i);
        }
        assert!(buncher.append(&[0u8; 4]).unwrap());
        assert_eq!(buncher.frame_count(), 10);
    }

    #[test]
    fn test_frame_at_capacity_boundary() {
        let mut buncher = FrameBuncher::new(MAX_FRAMES_PER_PACKET);

        // A maximum-size frame on a half-full buffer lands exactly at
        // capacity without overflowing.
        assert!(buncher.append(&vec![0u8; READ_BUFFER_SIZE]).unwrap());
        assert!(buncher.append(&vec![0u8; READ_BUFFER_SIZE]).unwrap());
        assert_eq!(buncher.write_offset(), BUNCH_CAPACITY);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_overflow_truncates() {
        let mut buncher = FrameBuncher::new(MAX_FRAMES_PER_PACKET);

        buncher.append(&vec![1u8; BUNCH_CAPACITY - 4]).unwrap();
        let err = buncher.append(&vec![2u8; 8]).unwrap_err();
        assert_eq!(
            err,
            BunchError::Overflow {
                frame_len: 8,
                remaining: 4
            }
        );
        // Fitting prefix copied, offset clamped to capacity.
        assert_eq!(buncher.write_offset(), BUNCH_CAPACITY);
        assert_eq!(buncher.filled()[BUNCH_CAPACITY - 1], 2);
        assert!(buncher.flush_due());
    }
}
