//! Wire protocol: frame header, CRC-16, fixed-point vector packing, and the
//! typed messages carried over it.
//!
//! Frame headers are raw binary for O(1) routing; payloads are
//! msg-type-specific fixed binary layouts rather than a self-describing
//! format, since every shape is closed and known ahead of time. See
//! [`payloads::Message`] for the typed view and [`frame::Frame`] for the
//! wire-level view.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod crc16;
pub mod errors;
pub mod fixed_point;
pub mod frame;
pub mod header;
pub mod msg_type;
pub mod op_kind;
pub mod payloads;
pub mod role;

pub use errors::{DecodeError, EncodeError};
pub use fixed_point::{FixedPointWidth, Vec3};
pub use frame::Frame;
pub use header::FrameHeader;
pub use msg_type::MsgType;
pub use op_kind::OpKind;
pub use payloads::{FrameEncodeError, Message, Operation};
pub use role::RoleTag;

/// Protocol identification magic, carried out-of-band (e.g. the first bytes
/// exchanged on a new connection) to validate framing before decoding: "HCOL"
/// in ASCII.
pub const PROTOCOL_MAGIC: u32 = 0x4843_4F4C;

/// Current protocol version, `major << 16 | minor`.
pub const PROTOCOL_VERSION: u32 = 1 << 16;
