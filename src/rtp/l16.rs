//! L16 byte-order conversion.
//!
//! RTP L16 payloads carry 16-bit signed linear PCM in network (big-endian)
//! byte order. The media tap delivers samples in host order, so the payload
//! copy converts sample by sample. Expressing the conversion through
//! `from_ne_bytes`/`to_be_bytes` makes the same code a byte swap on
//! little-endian hosts and a plain copy on big-endian hosts, with no
//! conditional compilation.

/// Copy `src` into `dst`, converting host-order 16-bit samples to network
/// byte order.
///
/// `dst` must be at least `src.len()` bytes. The span is expected to hold
/// whole samples; a trailing odd byte is copied verbatim rather than
/// dropped.
pub fn copy_to_network_order(src: &[u8], dst: &mut [u8]) {
    debug_assert!(src.len() % 2 == 0, "L16 span of {} bytes is not sample-aligned", src.len());
    debug_assert!(dst.len() >= src.len());

    let pairs = src.len() / 2;
    for i in 0..pairs {
        let sample = i16::from_ne_bytes([src[i * 2], src[i * 2 + 1]]);
        let be = sample.to_be_bytes();
        dst[i * 2] = be[0];
        dst[i * 2 + 1] = be[1];
    }

    if src.len() % 2 == 1 {
        dst[src.len() - 1] = src[src.len() - 1];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_endian = "little")]
    fn test_little_endian_host_swaps() {
        // Two samples 0x0201 and 0x0403 in host (LE) order.
        let src = [0x01, 0x02, 0x03, 0x04];
        let mut dst = [0u8; 4];
        copy_to_network_order(&src, &mut dst);
        assert_eq!(dst, [0x02, 0x01, 0x04, 0x03]);
    }

    #[test]
    #[cfg(target_endian = "big")]
    fn test_big_endian_host_copies() {
        // Big-endian hosts are already in network order.
        let src = [0x01, 0x02, 0x03, 0x04];
        let mut dst = [0u8; 4];
        copy_to_network_order(&src, &mut dst);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_network_order_value() {
        // Independent of host order, the sample value -2 must serialize as
        // big-endian FF FE.
        let sample: i16 = -2;
        let src = sample.to_ne_bytes();
        let mut dst = [0u8; 2];
        copy_to_network_order(&src, &mut dst);
        assert_eq!(dst, [0xFF, 0xFE]);
    }

    #[test]
    fn test_empty_span() {
        let mut dst = [0u8; 0];
        copy_to_network_order(&[], &mut dst);
    }
}
