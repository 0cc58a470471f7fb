//! Frame type combining header and payload.
//!
//! A `Frame` is the transport-layer packet: a 24-byte little-endian header
//! followed by `payload_size` bytes of msg-type-specific body. This is a
//! pure data holder; see `crate::payloads` for turning the raw bytes into a
//! typed message.

use bytes::{BufMut, Bytes};

use crate::{crc16::crc16, errors::DecodeError, header::FrameHeader, msg_type::MsgType};

/// Maximum payload size, bounded by the header's 16-bit `payload_size`
/// field.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Complete protocol frame.
///
/// # Invariants
///
/// `payload.len()` always matches `header.payload_size()` and never exceeds
/// [`MAX_PAYLOAD_SIZE`]; both are enforced by [`Frame::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Raw payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame, computing `payload_size` and `crc16` from `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::EncodeError::PayloadTooLarge`] if `payload`
    /// exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn new(
        mut header: FrameHeader,
        payload: impl Into<Bytes>,
    ) -> Result<Self, crate::errors::EncodeError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(crate::errors::EncodeError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let payload_len = payload.len() as u16;
        header.set_payload_size(payload_len);
        header.set_crc16(crc16(&payload));

        Ok(Self { header, payload })
    }

    /// Message type of this frame.
    #[must_use]
    pub fn msg_type(&self) -> MsgType {
        self.header.msg_type()
    }

    /// Write `[header][payload]` into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Encode into a freshly allocated `Vec<u8>`.
    #[must_use]
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FrameHeader::SIZE + self.payload.len());
        self.encode(&mut buf);
        buf
    }

    /// Parse a frame from wire bytes, verifying structural size and CRC-16.
    ///
    /// Every failure here is a dropped-frame condition, never fatal: callers
    /// should treat any `Err` as a no-op plus a stats bump, not propagate it
    /// upward.
    ///
    /// # Errors
    ///
    /// [`DecodeError::FrameTooShort`] if shorter than the header,
    /// [`DecodeError::FrameTruncated`] if the declared payload doesn't fit,
    /// [`DecodeError::CrcMismatch`] if the payload's CRC-16 disagrees with
    /// the header, [`DecodeError::UnknownMsgType`] for an unrecognized tag.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        if bytes.len() < total_size {
            return Err(DecodeError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        }

        let payload = Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..total_size]);
        let computed = crc16(&payload);
        let expected = header.crc16();
        if computed != expected {
            return Err(DecodeError::CrcMismatch { expected, actual: computed });
        }

        Ok(Self { header: *header, payload })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_frame() -> impl Strategy<Value = Frame> {
        (1u8..=0x0A, any::<u32>(), any::<u32>(), any::<u64>(), prop::collection::vec(any::<u8>(), 0..512))
            .prop_map(|(mt, sender, seq, ts, payload)| {
                #[allow(clippy::expect_used)]
                let msg_type = MsgType::from_u8(mt).expect("1..=0x0A covers the closed set");
                let header = FrameHeader::new(msg_type, sender, seq, ts);
                #[allow(clippy::expect_used)]
                Frame::new(header, payload).expect("payload under 512 bytes is always within bound")
            })
    }

    proptest! {
        #[test]
        fn frame_round_trip(frame in arbitrary_frame()) {
            let wire = frame.encode_to_vec();
            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame.payload, parsed.payload);
            prop_assert_eq!(frame.header.sender_id(), parsed.header.sender_id());
        }

        #[test]
        fn bit_flip_in_payload_is_detected(frame in arbitrary_frame(), byte in 0usize..512, bit in 0u8..8) {
            prop_assume!(!frame.payload.is_empty());
            let mut wire = frame.encode_to_vec();
            let idx = FrameHeader::SIZE + (byte % frame.payload.len());
            wire[idx] ^= 1 << bit;
            let is_crc_mismatch = matches!(Frame::decode(&wire), Err(DecodeError::CrcMismatch { .. }));
            prop_assert!(is_crc_mismatch);
        }
    }

    #[test]
    fn reject_truncated_frame() {
        let header = FrameHeader::new(MsgType::Heartbeat, 1, 0, 0);
        #[allow(clippy::expect_used)]
        let frame = Frame::new(header, vec![0u8; 100]).expect("100 bytes is within bound");
        let wire = frame.encode_to_vec();
        let result = Frame::decode(&wire[..FrameHeader::SIZE + 10]);
        assert!(matches!(result, Err(DecodeError::FrameTruncated { .. })));
    }

    #[test]
    fn reject_oversized_payload() {
        let header = FrameHeader::new(MsgType::Heartbeat, 1, 0, 0);
        let result = Frame::new(header, vec![0u8; MAX_PAYLOAD_SIZE + 1]);
        assert!(matches!(
            result,
            Err(crate::errors::EncodeError::PayloadTooLarge { .. })
        ));
    }
}
