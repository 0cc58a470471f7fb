//! Operation payload: `OpHeader` + kind-dependent `OpBody`.

use bytes::{BufMut, Bytes};

use crate::{
    errors::DecodeError,
    fixed_point::{self, Vec3},
    op_kind::OpKind,
};

/// Maximum length of an opaque passthrough body (Delete, Rename, material
/// assignment, component attach/detach, script edit, terrain/light/camera/
/// animation/physics parameter edits).
pub const MAX_OPAQUE_BODY: usize = 256;

/// Maximum length of a `SetProperty` value blob.
pub const MAX_PROPERTY_VALUE: usize = 255;

/// Maximum length of a `CreateObject` name.
pub const MAX_NAME_LEN: usize = 63;

/// Fixed prefix preceding every `OpBody`: the kind and the target object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpHeader {
    /// Kind of mutation this operation performs.
    pub kind: OpKind,
    /// Target object id; 0 for `CreateObject`, where the target field below
    /// instead names the parent.
    pub object_id: u32,
}

impl OpHeader {
    /// Wire size of the header alone.
    pub const SIZE: usize = 5;

    /// Encode into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.kind.to_u8());
        dst.put_u32_le(self.object_id);
    }

    /// Decode from the front of `bytes`, returning the header and the rest.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] if fewer than [`Self::SIZE`] bytes
    /// remain, [`DecodeError::UnknownOpKind`] if the kind byte is invalid.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        if bytes.len() < Self::SIZE {
            return Err(DecodeError::PayloadTooShort {
                what: "OpHeader",
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        let kind = OpKind::from_u8(bytes[0])?;
        let object_id = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        Ok((Self { kind, object_id }, &bytes[Self::SIZE..]))
    }
}

/// Kind-dependent operation body.
#[derive(Debug, Clone, PartialEq)]
pub enum OpBody {
    /// Move/Rotate/Scale: 6 fixed-point lanes, `old` then `new`.
    Vector {
        /// Value before the edit.
        old: Vec3,
        /// Value after the edit.
        new: Vec3,
    },
    /// A hashed property name, identifying which property this sets.
    SetProperty {
        /// FNV-style hash of the property's dotted path.
        property_hash: u32,
        /// Serialized new value.
        value: Bytes,
    },
    /// Create a new object under `parent_id`.
    CreateObject {
        /// Requested name (may be rewritten by the transformer on
        /// collision).
        name: String,
        /// Parent object id.
        parent_id: u32,
    },
    /// Everything else: passed through verbatim by the wire layer, given
    /// meaning only by the application-level `EditorStore`.
    Opaque(Bytes),
}

impl OpBody {
    /// Encode into `dst`. Does not write the `OpHeader`.
    ///
    /// # Errors
    ///
    /// [`crate::errors::EncodeError`] equivalents are represented as
    /// `DecodeError::FieldTooLong` here since this crate treats
    /// over-bound application data as a caller bug caught at the boundary,
    /// not a wire condition.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), DecodeError> {
        match self {
            Self::Vector { old, new } => {
                for lane in fixed_point::pack_vec3_pair(*old, *new) {
                    dst.put_i16_le(lane);
                }
                Ok(())
            },
            Self::SetProperty { property_hash, value } => {
                if value.len() > MAX_PROPERTY_VALUE {
                    return Err(DecodeError::FieldTooLong {
                        field: "SetProperty.value",
                        actual: value.len(),
                        max: MAX_PROPERTY_VALUE,
                    });
                }
                dst.put_u32_le(*property_hash);
                #[allow(clippy::cast_possible_truncation)]
                dst.put_u8(value.len() as u8);
                dst.put_slice(value);
                Ok(())
            },
            Self::CreateObject { name, parent_id } => {
                let name_bytes = name.as_bytes();
                if name_bytes.len() > MAX_NAME_LEN {
                    return Err(DecodeError::FieldTooLong {
                        field: "CreateObject.name",
                        actual: name_bytes.len(),
                        max: MAX_NAME_LEN,
                    });
                }
                #[allow(clippy::cast_possible_truncation)]
                dst.put_u8(name_bytes.len() as u8);
                dst.put_slice(name_bytes);
                dst.put_u32_le(*parent_id);
                Ok(())
            },
            Self::Opaque(body) => {
                if body.len() > MAX_OPAQUE_BODY {
                    return Err(DecodeError::FieldTooLong {
                        field: "Opaque body",
                        actual: body.len(),
                        max: MAX_OPAQUE_BODY,
                    });
                }
                dst.put_slice(body);
                Ok(())
            },
        }
    }

    /// Decode a body for `kind` from `bytes` (the remainder after
    /// `OpHeader`).
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] if the fixed-size portion for `kind`
    /// doesn't fit, [`DecodeError::FieldTooLong`] if a length-prefixed field
    /// declares more than its bound.
    pub fn decode(kind: OpKind, bytes: &[u8]) -> Result<Self, DecodeError> {
        if kind.is_vector_kind() {
            if bytes.len() < 12 {
                return Err(DecodeError::PayloadTooShort {
                    what: "OpBody::Vector",
                    expected: 12,
                    actual: bytes.len(),
                });
            }
            let mut lanes = [0i16; 6];
            for (i, lane) in lanes.iter_mut().enumerate() {
                *lane = i16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
            }
            let (old, new) = fixed_point::unpack_vec3_pair(lanes);
            return Ok(Self::Vector { old, new });
        }

        match kind {
            OpKind::SetProperty => {
                if bytes.len() < 5 {
                    return Err(DecodeError::PayloadTooShort {
                        what: "OpBody::SetProperty",
                        expected: 5,
                        actual: bytes.len(),
                    });
                }
                let property_hash = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let value_size = bytes[4] as usize;
                let rest = &bytes[5..];
                if rest.len() < value_size {
                    return Err(DecodeError::PayloadTooShort {
                        what: "OpBody::SetProperty.value",
                        expected: value_size,
                        actual: rest.len(),
                    });
                }
                Ok(Self::SetProperty {
                    property_hash,
                    value: Bytes::copy_from_slice(&rest[..value_size]),
                })
            },
            OpKind::CreateObject => {
                if bytes.is_empty() {
                    return Err(DecodeError::PayloadTooShort {
                        what: "OpBody::CreateObject",
                        expected: 1,
                        actual: 0,
                    });
                }
                let name_len = bytes[0] as usize;
                if name_len > MAX_NAME_LEN {
                    return Err(DecodeError::FieldTooLong {
                        field: "CreateObject.name",
                        actual: name_len,
                        max: MAX_NAME_LEN,
                    });
                }
                let rest = &bytes[1..];
                if rest.len() < name_len + 4 {
                    return Err(DecodeError::PayloadTooShort {
                        what: "OpBody::CreateObject",
                        expected: name_len + 4,
                        actual: rest.len(),
                    });
                }
                let name = String::from_utf8_lossy(&rest[..name_len]).into_owned();
                let parent_bytes = &rest[name_len..name_len + 4];
                let parent_id =
                    u32::from_le_bytes([parent_bytes[0], parent_bytes[1], parent_bytes[2], parent_bytes[3]]);
                Ok(Self::CreateObject { name, parent_id })
            },
            _ => {
                if bytes.len() > MAX_OPAQUE_BODY {
                    return Err(DecodeError::FieldTooLong {
                        field: "Opaque body",
                        actual: bytes.len(),
                        max: MAX_OPAQUE_BODY,
                    });
                }
                Ok(Self::Opaque(Bytes::copy_from_slice(bytes)))
            },
        }
    }
}
