//! Wire-level error types.
//!
//! Every variant here corresponds to a frame or field that gets dropped by
//! the caller -- never retried, never fatal. See `scenesync_core::stats` for
//! the counters these map to once a frame reaches the causal engine.

use thiserror::Error;

/// Errors produced while decoding frames or payloads off the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer shorter than the fixed header size.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Declared payload size disagrees with the remaining buffer.
    #[error("frame truncated: header claims {expected} payload bytes, only {actual} available")]
    FrameTruncated {
        /// Payload bytes the header claims.
        expected: usize,
        /// Payload bytes actually present.
        actual: usize,
    },

    /// CRC-16 mismatch over the payload.
    #[error("crc mismatch: header claims {expected:#06x}, computed {actual:#06x}")]
    CrcMismatch {
        /// CRC carried in the header.
        expected: u16,
        /// CRC computed from the payload bytes.
        actual: u16,
    },

    /// `msg_type` byte does not correspond to a known message type.
    #[error("unknown message type {0:#04x}")]
    UnknownMsgType(u8),

    /// `kind` byte inside an Operation payload does not correspond to a
    /// known operation kind.
    #[error("unknown operation kind {0:#04x}")]
    UnknownOpKind(u8),

    /// A length-prefixed field (name, blob, ...) exceeds its bound.
    #[error("field {field} length {actual} exceeds bound {max}")]
    FieldTooLong {
        /// Name of the offending field, for diagnostics.
        field: &'static str,
        /// Length the frame declared.
        actual: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// Fixed-point width tag in the header's flags byte is not one this
    /// version understands.
    #[error("unsupported fixed-point width tag {0:#04x}")]
    UnsupportedFixedPointWidth(u8),

    /// Payload shorter than the fixed-size body a `msg_type`/`kind` requires.
    #[error("payload too short for {what}: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// What was being decoded, for diagnostics.
        what: &'static str,
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

/// Errors produced while encoding a `Frame`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Payload exceeds the maximum frame payload size (`u16::MAX` bytes, the
    /// header's `payload_size` field width).
    #[error("payload too large: {size} bytes exceeds max {max}")]
    PayloadTooLarge {
        /// Size of the payload that was rejected.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },
}

/// Convenience alias for decode results.
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;
