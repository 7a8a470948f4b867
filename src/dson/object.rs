//! [`DsonObject`]: a decoded Dson value tree (spec §4.8), grounded on
//! `examples/original_source/include/thread_highways/dson/detail/obj_view.h`'s
//! `IObjView` (type/size/key accessors) generalized from a non-owning
//! view over a buffer into an owned value, since this port decodes
//! fully into memory rather than keeping a zero-copy cursor into the
//! original wire buffer.

use super::header::{DsonHeader, HEADER_SIZE};
use super::types::TypeId;
use crate::error::Exception;

/// The payload half of a [`DsonObject`]: which registered type it is,
/// and its value.
#[derive(Debug, Clone, PartialEq)]
pub enum DsonValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    VecI8(Vec<i8>),
    VecU8(Vec<u8>),
    VecI16(Vec<i16>),
    VecU16(Vec<u16>),
    VecI32(Vec<i32>),
    VecU32(Vec<u32>),
    VecI64(Vec<i64>),
    VecU64(Vec<u64>),
    VecF64(Vec<f64>),
    Bytes(Vec<u8>),
    Container(Vec<DsonObject>),
}

impl DsonValue {
    fn type_id(&self) -> TypeId {
        match self {
            Self::Bool(_) => TypeId::Bool,
            Self::I8(_) => TypeId::I8,
            Self::U8(_) => TypeId::U8,
            Self::I16(_) => TypeId::I16,
            Self::U16(_) => TypeId::U16,
            Self::I32(_) => TypeId::I32,
            Self::U32(_) => TypeId::U32,
            Self::I64(_) => TypeId::I64,
            Self::U64(_) => TypeId::U64,
            Self::F64(_) => TypeId::F64,
            Self::Str(_) => TypeId::Str,
            Self::VecI8(_) => TypeId::VecI8,
            Self::VecU8(_) => TypeId::VecU8,
            Self::VecI16(_) => TypeId::VecI16,
            Self::VecU16(_) => TypeId::VecU16,
            Self::VecI32(_) => TypeId::VecI32,
            Self::VecU32(_) => TypeId::VecU32,
            Self::VecI64(_) => TypeId::VecI64,
            Self::VecU64(_) => TypeId::VecU64,
            Self::VecF64(_) => TypeId::VecF64,
            Self::Bytes(_) => TypeId::BytesOwned,
            Self::Container(_) => TypeId::Container,
        }
    }

    fn encode_payload(&self, out: &mut Vec<u8>) {
        match self {
            Self::Bool(v) => out.push(*v as u8),
            Self::I8(v) => out.push(*v as u8),
            Self::U8(v) => out.push(*v),
            Self::I16(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U16(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::I32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::I64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::F64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::Str(s) => out.extend_from_slice(s.as_bytes()),
            Self::VecI8(v) => out.extend(v.iter().map(|x| *x as u8)),
            Self::VecU8(v) => out.extend_from_slice(v),
            Self::VecI16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes())),
            Self::VecU16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes())),
            Self::VecI32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes())),
            Self::VecU32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes())),
            Self::VecI64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes())),
            Self::VecU64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes())),
            Self::VecF64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_ne_bytes())),
            Self::Bytes(v) => out.extend_from_slice(v),
            Self::Container(children) => {
                for child in children {
                    child.encode_into(out);
                }
            }
        }
    }

    fn decode_payload(type_id: TypeId, payload: &[u8]) -> Result<Self, Exception> {
        fn chunks<T>(payload: &[u8], width: usize, f: impl Fn(&[u8]) -> T) -> Vec<T> {
            payload.chunks_exact(width).map(f).collect()
        }
        Ok(match type_id {
            TypeId::NoType => return Err(crate::exception!("cannot decode NoType payload")),
            TypeId::Container => {
                let mut children = Vec::new();
                let mut offset = 0;
                while offset < payload.len() {
                    let (child, consumed) = DsonObject::decode_at(&payload[offset..])?;
                    offset += consumed;
                    children.push(child);
                }
                Self::Container(children)
            }
            TypeId::Bool => Self::Bool(payload.first().copied().unwrap_or(0) != 0),
            TypeId::I8 => Self::I8(payload.first().copied().unwrap_or(0) as i8),
            TypeId::U8 => Self::U8(payload.first().copied().unwrap_or(0)),
            TypeId::I16 => Self::I16(i16::from_ne_bytes(payload[0..2].try_into().unwrap())),
            TypeId::U16 => Self::U16(u16::from_ne_bytes(payload[0..2].try_into().unwrap())),
            TypeId::I32 => Self::I32(i32::from_ne_bytes(payload[0..4].try_into().unwrap())),
            TypeId::U32 => Self::U32(u32::from_ne_bytes(payload[0..4].try_into().unwrap())),
            TypeId::I64 => Self::I64(i64::from_ne_bytes(payload[0..8].try_into().unwrap())),
            TypeId::U64 => Self::U64(u64::from_ne_bytes(payload[0..8].try_into().unwrap())),
            TypeId::F64 => Self::F64(f64::from_ne_bytes(payload[0..8].try_into().unwrap())),
            TypeId::Str => Self::Str(
                String::from_utf8(payload.to_vec())
                    .map_err(|e| crate::exception!(format!("dson string payload not utf8: {e}")))?,
            ),
            TypeId::VecI8 => Self::VecI8(payload.iter().map(|b| *b as i8).collect()),
            TypeId::VecU8 => Self::VecU8(payload.to_vec()),
            TypeId::VecI16 => Self::VecI16(chunks(payload, 2, |c| i16::from_ne_bytes(c.try_into().unwrap()))),
            TypeId::VecU16 => Self::VecU16(chunks(payload, 2, |c| u16::from_ne_bytes(c.try_into().unwrap()))),
            TypeId::VecI32 => Self::VecI32(chunks(payload, 4, |c| i32::from_ne_bytes(c.try_into().unwrap()))),
            TypeId::VecU32 => Self::VecU32(chunks(payload, 4, |c| u32::from_ne_bytes(c.try_into().unwrap()))),
            TypeId::VecI64 => Self::VecI64(chunks(payload, 8, |c| i64::from_ne_bytes(c.try_into().unwrap()))),
            TypeId::VecU64 => Self::VecU64(chunks(payload, 8, |c| u64::from_ne_bytes(c.try_into().unwrap()))),
            TypeId::VecF64 => Self::VecF64(chunks(payload, 8, |c| f64::from_ne_bytes(c.try_into().unwrap()))),
            TypeId::BytesView | TypeId::BytesOwned => Self::Bytes(payload.to_vec()),
        })
    }
}

/// A keyed Dson value: the unit [`DsonValue::Container`] nests to build
/// a tree. Keys within a container need not be unique (spec §4.8); a
/// container lookup returns the first match.
#[derive(Debug, Clone, PartialEq)]
pub struct DsonObject {
    pub key: i32,
    pub value: DsonValue,
}

impl DsonObject {
    pub fn new(key: i32, value: DsonValue) -> Self {
        Self { key, value }
    }

    pub fn container(key: i32, children: Vec<DsonObject>) -> Self {
        Self::new(key, DsonValue::Container(children))
    }

    /// First child with a matching key, preserving insertion order.
    pub fn find(&self, key: i32) -> Option<&DsonObject> {
        match &self.value {
            DsonValue::Container(children) => children.iter().find(|c| c.key == key),
            _ => None,
        }
    }

    pub fn children(&self) -> &[DsonObject] {
        match &self.value {
            DsonValue::Container(children) => children,
            _ => &[],
        }
    }

    fn payload_size(&self) -> usize {
        match &self.value {
            DsonValue::Container(children) => children.iter().map(|c| c.all_size()).sum(),
            _ => {
                let mut buf = Vec::new();
                self.value.encode_payload(&mut buf);
                buf.len()
            }
        }
    }

    pub fn all_size(&self) -> usize {
        HEADER_SIZE + self.payload_size()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.all_size());
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let payload_size = self.payload_size();
        let header = DsonHeader::new(self.key, payload_size as i32, self.value.type_id().as_i32());
        out.extend_from_slice(&header.to_bytes());
        self.value.encode_payload(out);
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Exception> {
        let (object, consumed) = Self::decode_at(bytes)?;
        if consumed != bytes.len() {
            tracing::debug!(consumed, total = bytes.len(), "decode consumed fewer bytes than given");
        }
        Ok(object)
    }

    fn decode_at(bytes: &[u8]) -> Result<(Self, usize), Exception> {
        let header = DsonHeader::from_bytes(bytes)?;
        if !header.validate() {
            return Err(crate::exception!(format!(
                "malformed dson header: size={} type={}",
                header.data_size, header.data_type
            )));
        }
        let data_size = header.data_size as usize;
        let end = HEADER_SIZE + data_size;
        if bytes.len() < end {
            return Err(crate::exception!(format!(
                "dson payload truncated: need {end} bytes, have {}",
                bytes.len()
            )));
        }
        let type_id = TypeId::from_i32(header.data_type)
            .ok_or_else(|| crate::exception!(format!("unregistered dson type id {}", header.data_type)))?;
        let value = DsonValue::decode_payload(type_id, &bytes[HEADER_SIZE..end])?;
        Ok((DsonObject::new(header.key, value), end))
    }
}
