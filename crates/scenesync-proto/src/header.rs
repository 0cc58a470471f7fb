//! Frame header implementation with zero-copy parsing.
//!
//! `FrameHeader` is a fixed 24-byte structure serialized as raw binary
//! (little-endian). Routing decisions (which session, which peer) read only
//! this struct; the payload is decoded separately once a caller has decided
//! it wants to.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{errors::DecodeError, msg_type::MsgType};

/// Fixed 24-byte frame header (little-endian).
///
/// `#[repr(C, packed)]` plus the `zerocopy` traits lets this be cast
/// directly from untrusted wire bytes: every 24-byte pattern is a valid
/// `FrameHeader`, so the cast itself can never be undefined behavior. Field
/// values still need validating (`msg_type` against the closed enum,
/// `payload_size` against the buffer) after the cast.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    msg_type: u8,
    reserved_flags: u8,
    payload_size: [u8; 2],
    sender_id: [u8; 4],
    sequence: [u8; 4],
    timestamp_ms: [u8; 8],
    crc16: [u8; 2],
    reserved_tail: [u8; 2],
}

impl FrameHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 24;

    /// Construct a header for `msg_type`, leaving payload size/CRC at zero
    /// (set them with [`Self::set_payload_size`] / [`Self::set_crc16`] once
    /// the payload is known).
    #[must_use]
    pub fn new(msg_type: MsgType, sender_id: u32, sequence: u32, timestamp_ms: u64) -> Self {
        Self {
            msg_type: msg_type.to_u8(),
            reserved_flags: 0,
            payload_size: 0u16.to_le_bytes(),
            sender_id: sender_id.to_le_bytes(),
            sequence: sequence.to_le_bytes(),
            timestamp_ms: timestamp_ms.to_le_bytes(),
            crc16: 0u16.to_le_bytes(),
            reserved_tail: [0; 2],
        }
    }

    /// Parse a header from the front of `bytes` (zero-copy).
    ///
    /// Only structural validation happens here: that the buffer is long
    /// enough and that `msg_type` is a recognized tag. Payload-size-vs-buffer
    /// and CRC checks happen in [`crate::frame::Frame::decode`], which has
    /// the rest of the buffer available.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::FrameTooShort`] if `bytes` is shorter than
    /// [`Self::SIZE`], or [`DecodeError::UnknownMsgType`] if the `msg_type`
    /// byte is outside the closed set.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self, DecodeError> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| DecodeError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;
        MsgType::from_u8(header.msg_type)?;
        Ok(header)
    }

    /// Serialize to a fixed byte array.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Message type tag. Validated at construction/parse time, so this never
    /// fails on a header obtained through this module.
    #[must_use]
    pub fn msg_type(&self) -> MsgType {
        #[allow(clippy::expect_used)]
        MsgType::from_u8(self.msg_type).expect("msg_type validated at construction")
    }

    /// Reserved flags byte, currently used only to tag the fixed-point width
    /// (see `crate::fixed_point`).
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.reserved_flags
    }

    /// Declared payload length in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u16 {
        u16::from_le_bytes(self.payload_size)
    }

    /// Originating peer's participant id.
    #[must_use]
    pub fn sender_id(&self) -> u32 {
        u32::from_le_bytes(self.sender_id)
    }

    /// Sender-local monotonic sequence number.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        u32::from_le_bytes(self.sequence)
    }

    /// Sender wall-clock timestamp in milliseconds.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        u64::from_le_bytes(self.timestamp_ms)
    }

    /// CRC-16 computed over the payload only.
    #[must_use]
    pub fn crc16(&self) -> u16 {
        u16::from_le_bytes(self.crc16)
    }

    /// Set the reserved flags byte.
    pub fn set_flags(&mut self, flags: u8) {
        self.reserved_flags = flags;
    }

    /// Set the declared payload length.
    pub fn set_payload_size(&mut self, size: u16) {
        self.payload_size = size.to_le_bytes();
    }

    /// Set the payload CRC-16.
    pub fn set_crc16(&mut self, crc: u16) {
        self.crc16 = crc.to_le_bytes();
    }
}

// Manual Debug: packed fields can't be referenced directly without a copy.
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("msg_type", &self.msg_type)
            .field("payload_size", &self.payload_size())
            .field("sender_id", &self.sender_id())
            .field("sequence", &self.sequence())
            .field("timestamp_ms", &self.timestamp_ms())
            .field("crc16", &format!("{:#06x}", self.crc16()))
            .finish()
    }
}

// Manual PartialEq: can't derive on a packed repr.
impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}
