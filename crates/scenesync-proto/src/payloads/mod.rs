//! Typed protocol messages.
//!
//! Frame headers carry raw routing fields; payload bytes are
//! msg-type-specific fixed binary layouts. The `Message` enum here covers
//! all ten wire message types and knows how to turn itself into a
//! [`crate::frame::Frame`] and back.
//!
//! # Invariants
//!
//! Each variant maps to exactly one [`MsgType`] (enforced by the exhaustive
//! match in [`Message::msg_type`]).

pub mod chat;
pub mod op;
pub mod presence;
pub mod session;

use bytes::{Bytes, BytesMut};

use crate::{
    errors::DecodeError,
    frame::Frame,
    header::FrameHeader,
    msg_type::MsgType,
    payloads::{
        chat::ChatMessage,
        op::{OpBody, OpHeader},
        presence::{PresenceUpdate, SelectionUpdate},
        session::{Heartbeat, PermissionChange, SessionInfo, SyncRequest, UserJoin, UserLeave},
    },
};

/// Number of vector-clock lanes carried with every operation, mirroring
/// `scenesync_core::ids::MAX_USERS`. Duplicated here rather than imported
/// since this crate has no dependency on `scenesync-core` -- the wire
/// format is the lower layer.
pub const MAX_USERS: usize = 32;

/// A decoded operation: header, kind-dependent body, and the sender's
/// vector-clock snapshot at submission time (the causal context a receiver
/// needs to decide readiness).
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Kind and target.
    pub header: OpHeader,
    /// Kind-dependent payload.
    pub body: OpBody,
    /// Sender's vector clock at the moment this op was submitted, one
    /// sequence number per participant slot.
    pub context: [u32; MAX_USERS],
}

fn encode_context(dst: &mut impl bytes::BufMut, context: &[u32; MAX_USERS]) {
    for lane in context {
        dst.put_u32_le(*lane);
    }
}

fn decode_context(bytes: &[u8]) -> Result<([u32; MAX_USERS], &[u8]), DecodeError> {
    let needed = MAX_USERS * 4;
    if bytes.len() < needed {
        return Err(DecodeError::PayloadTooShort { what: "Operation.context", expected: needed, actual: bytes.len() });
    }
    let mut context = [0u32; MAX_USERS];
    for (i, lane) in context.iter_mut().enumerate() {
        let offset = i * 4;
        *lane = u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]);
    }
    Ok((context, &bytes[needed..]))
}

/// Every typed message this protocol version understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `0x01`
    UserJoin(UserJoin),
    /// `0x02`
    UserLeave(UserLeave),
    /// `0x03`
    Operation(Operation),
    /// `0x04`
    PresenceUpdate(PresenceUpdate),
    /// `0x05`
    SelectionUpdate(SelectionUpdate),
    /// `0x06`
    ChatMessage(ChatMessage),
    /// `0x07`
    Heartbeat(Heartbeat),
    /// `0x08`
    SyncRequest(SyncRequest),
    /// `0x09`
    SessionInfo(SessionInfo),
    /// `0x0A`
    PermissionChange(PermissionChange),
}

impl Message {
    /// The wire message type this variant carries.
    #[must_use]
    pub const fn msg_type(&self) -> MsgType {
        match self {
            Self::UserJoin(_) => MsgType::UserJoin,
            Self::UserLeave(_) => MsgType::UserLeave,
            Self::Operation(_) => MsgType::Operation,
            Self::PresenceUpdate(_) => MsgType::PresenceUpdate,
            Self::SelectionUpdate(_) => MsgType::SelectionUpdate,
            Self::ChatMessage(_) => MsgType::ChatMessage,
            Self::Heartbeat(_) => MsgType::Heartbeat,
            Self::SyncRequest(_) => MsgType::SyncRequest,
            Self::SessionInfo(_) => MsgType::SessionInfo,
            Self::PermissionChange(_) => MsgType::PermissionChange,
        }
    }

    /// Encode the payload bytes (not the frame header).
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] variant (reused here as the bounds-checked
    /// encode error) if a length-prefixed field exceeds its bound.
    pub fn encode_payload(&self) -> Result<Bytes, DecodeError> {
        let mut buf = BytesMut::new();
        match self {
            Self::UserJoin(inner) => inner.encode(&mut buf)?,
            Self::UserLeave(inner) => inner.encode(&mut buf),
            Self::Operation(inner) => {
                inner.header.encode(&mut buf);
                encode_context(&mut buf, &inner.context);
                inner.body.encode(&mut buf)?;
            },
            Self::PresenceUpdate(inner) => inner.encode(&mut buf)?,
            Self::SelectionUpdate(inner) => inner.encode(&mut buf)?,
            Self::ChatMessage(inner) => inner.encode(&mut buf)?,
            Self::Heartbeat(inner) => inner.encode(&mut buf),
            Self::SyncRequest(inner) => inner.encode(&mut buf),
            Self::SessionInfo(inner) => inner.encode(&mut buf)?,
            Self::PermissionChange(inner) => inner.encode(&mut buf),
        }
        Ok(buf.freeze())
    }

    /// Decode a payload given the `msg_type` that named it.
    ///
    /// For `Operation`, the `OpHeader`'s kind further selects the `OpBody`
    /// shape.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`] the underlying payload decoder reports.
    pub fn decode_payload(msg_type: MsgType, bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(match msg_type {
            MsgType::UserJoin => Self::UserJoin(UserJoin::decode(bytes)?),
            MsgType::UserLeave => Self::UserLeave(UserLeave::decode(bytes)?),
            MsgType::Operation => {
                let (header, rest) = OpHeader::decode(bytes)?;
                let (context, rest) = decode_context(rest)?;
                let body = OpBody::decode(header.kind, rest)?;
                Self::Operation(Operation { header, body, context })
            },
            MsgType::PresenceUpdate => Self::PresenceUpdate(PresenceUpdate::decode(bytes)?),
            MsgType::SelectionUpdate => Self::SelectionUpdate(SelectionUpdate::decode(bytes)?),
            MsgType::ChatMessage => Self::ChatMessage(ChatMessage::decode(bytes)?),
            MsgType::Heartbeat => Self::Heartbeat(Heartbeat::decode(bytes)?),
            MsgType::SyncRequest => Self::SyncRequest(SyncRequest::decode(bytes)?),
            MsgType::SessionInfo => Self::SessionInfo(SessionInfo::decode(bytes)?),
            MsgType::PermissionChange => Self::PermissionChange(PermissionChange::decode(bytes)?),
        })
    }

    /// Wrap this message in a frame with the given routing fields.
    ///
    /// # Errors
    ///
    /// A [`DecodeError`] from encoding an over-bound field, or
    /// [`crate::errors::EncodeError`] if the encoded payload exceeds the
    /// frame's maximum size.
    pub fn into_frame(
        self,
        sender_id: u32,
        sequence: u32,
        timestamp_ms: u64,
    ) -> Result<Frame, FrameEncodeError> {
        let msg_type = self.msg_type();
        let payload = self.encode_payload()?;
        let header = FrameHeader::new(msg_type, sender_id, sequence, timestamp_ms);
        Ok(Frame::new(header, payload)?)
    }

    /// Recover the typed message from a decoded frame.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`] the payload decoder reports for this frame's
    /// `msg_type`.
    pub fn from_frame(frame: &Frame) -> Result<Self, DecodeError> {
        Self::decode_payload(frame.msg_type(), &frame.payload)
    }
}

/// Either bound violation this crate can hit while building a frame from a
/// [`Message`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum FrameEncodeError {
    /// A length-prefixed field exceeded its bound.
    #[error(transparent)]
    Field(#[from] DecodeError),
    /// The encoded payload exceeded the frame's maximum size.
    #[error(transparent)]
    Frame(#[from] crate::errors::EncodeError),
}
