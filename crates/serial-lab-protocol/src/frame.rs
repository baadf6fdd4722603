use bytes::{BufMut, Bytes, BytesMut};
use serial_lab_abstract::LinkConfig;
use serial_lab_abstract::wire::FRAME_OVERHEAD;

use crate::checksum::frame_checksum;
use crate::error::FrameError;

/// Number of bytes a frame carrying `payload_len` bytes occupies on the wire.
pub fn wire_size(payload_len: usize) -> usize {
    payload_len + FRAME_OVERHEAD
}

/// Encode a payload into a delimited, checksummed frame.
///
/// Wire format:
/// ```text
/// ┌───────┬────────┬─────────────────┬──────────┬─────┐
/// │ START │ LENGTH │ PAYLOAD         │ CHECKSUM │ END │
/// │ (1B)  │ (1B)   │ (LENGTH bytes)  │ (1B)     │ (1B)│
/// └───────┴────────┴─────────────────┴──────────┴─────┘
/// ```
///
/// Payload bytes are not escaped, so a payload may contain the sentinel
/// values. Oversized payloads are refused rather than truncated.
pub fn encode_frame(config: &LinkConfig, payload: &[u8]) -> Result<Bytes, FrameError> {
    let max = usize::from(config.max_payload);
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }
    // max_payload is a u8, so this cannot truncate.
    let length = payload.len() as u8;

    let mut dst = BytesMut::with_capacity(wire_size(payload.len()));
    dst.put_u8(config.start_byte);
    dst.put_u8(length);
    dst.put_slice(payload);
    dst.put_u8(frame_checksum(config.checksum, length, payload));
    dst.put_u8(config.end_byte);
    Ok(dst.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_lab_abstract::wire::{ACK, ETX, STX};
    use serial_lab_abstract::{ChecksumKind, Pacing};

    fn config(max_payload: u8, checksum: ChecksumKind) -> LinkConfig {
        LinkConfig {
            max_payload,
            timeout_ticks: 100,
            max_attempts: 3,
            start_byte: STX,
            end_byte: ETX,
            ack_byte: ACK,
            nack_byte: None,
            checksum,
            tx_pacing: Pacing::Burst,
            rx_pacing: Pacing::Burst,
        }
    }

    #[test]
    fn test_encode_layout() {
        let frame = encode_frame(&config(255, ChecksumKind::Xor), &[0x10, 0x20, 0x30]).unwrap();
        assert_eq!(frame.as_ref(), &[STX, 3, 0x10, 0x20, 0x30, 0x03, ETX]);
        assert_eq!(frame.len(), wire_size(3));
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode_frame(&config(255, ChecksumKind::Xor), &[]).unwrap();
        assert_eq!(frame.as_ref(), &[STX, 0, 0, ETX]);
    }

    #[test]
    fn test_encode_additive_checksum() {
        let frame = encode_frame(&config(255, ChecksumKind::Additive), b"ABC").unwrap();
        let expected = 3u8.wrapping_add(b'A').wrapping_add(b'B').wrapping_add(b'C');
        assert_eq!(frame[5], expected);
    }

    #[test]
    fn test_encode_at_limit() {
        let payload = vec![0xEE; 10];
        let frame = encode_frame(&config(10, ChecksumKind::Xor), &payload).unwrap();
        assert_eq!(frame.len(), 14);
    }

    #[test]
    fn test_encode_refuses_oversized_payload() {
        let payload = vec![0u8; 11];
        let err = encode_frame(&config(10, ChecksumKind::Xor), &payload).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLarge { size: 11, max: 10 });

        let huge = vec![0u8; 300];
        assert!(encode_frame(&config(255, ChecksumKind::Xor), &huge).is_err());
    }

    #[test]
    fn test_encode_custom_sentinels() {
        let mut cfg = config(255, ChecksumKind::Xor);
        cfg.start_byte = 0x7E;
        cfg.end_byte = 0x7F;
        let frame = encode_frame(&cfg, b"x").unwrap();
        assert_eq!(frame.first(), Some(&0x7E));
        assert_eq!(frame.last(), Some(&0x7F));
    }
}
