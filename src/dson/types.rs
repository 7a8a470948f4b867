//! The fixed type-id registry (spec §4.8), grounded on
//! `examples/original_source/include/thread_highways/dson/detail/types_map.h`,
//! whose comment explains the motive: a signed id sent over the wire for
//! interop with other languages, filled in as a registry rather than an
//! enum so user code could extend it — this port keeps the registry
//! closed and fixed, since the crate has no plugin surface for custom
//! Dson types (spec's Non-goals).

use super::header::DsonHeader;

/// A type id from the fixed registry (spec §4.8). Values outside
/// `0..=23` never round-trip through [`TypeId::from_i32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TypeId {
    NoType = 0,
    Container = 1,
    Bool = 2,
    I8 = 3,
    U8 = 4,
    I16 = 5,
    U16 = 6,
    I32 = 7,
    U32 = 8,
    I64 = 9,
    U64 = 10,
    F64 = 11,
    Str = 12,
    VecI8 = 13,
    VecU8 = 14,
    VecI16 = 15,
    VecU16 = 16,
    VecI32 = 17,
    VecU32 = 18,
    VecI64 = 19,
    VecU64 = 20,
    VecF64 = 21,
    BytesView = 22,
    BytesOwned = 23,
}

pub const LAST_TYPE_ID: i32 = 23;

impl TypeId {
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::NoType,
            1 => Self::Container,
            2 => Self::Bool,
            3 => Self::I8,
            4 => Self::U8,
            5 => Self::I16,
            6 => Self::U16,
            7 => Self::I32,
            8 => Self::U32,
            9 => Self::I64,
            10 => Self::U64,
            11 => Self::F64,
            12 => Self::Str,
            13 => Self::VecI8,
            14 => Self::VecU8,
            15 => Self::VecI16,
            16 => Self::VecU16,
            17 => Self::VecI32,
            18 => Self::VecU32,
            19 => Self::VecI64,
            20 => Self::VecU64,
            21 => Self::VecF64,
            22 => Self::BytesView,
            23 => Self::BytesOwned,
            _ => return None,
        })
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_numeric_scalar(self) -> bool {
        matches!(self.as_i32(), 2..=11)
    }
}

/// `data_size >= 0` and `data_type` is a registered, non-zero id.
pub fn is_ok_header(header: &DsonHeader) -> bool {
    if header.data_size < 0 {
        return false;
    }
    header.data_type > 0 && header.data_type <= LAST_TYPE_ID
}

/// `is_ok_header` plus `data_type == Container`.
pub fn is_dson_header(header: &DsonHeader) -> bool {
    header.data_size >= 0 && header.data_type == TypeId::Container.as_i32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_registered_id() {
        for id in 0..=LAST_TYPE_ID {
            let ty = TypeId::from_i32(id).unwrap();
            assert_eq!(ty.as_i32(), id);
        }
        assert!(TypeId::from_i32(LAST_TYPE_ID + 1).is_none());
        assert!(TypeId::from_i32(-1).is_none());
    }

    #[test]
    fn is_ok_header_rejects_negative_size_and_unregistered_type() {
        assert!(!is_ok_header(&DsonHeader {
            key: 0,
            data_size: -1,
            data_type: TypeId::Bool.as_i32()
        }));
        assert!(!is_ok_header(&DsonHeader {
            key: 0,
            data_size: 0,
            data_type: 0
        }));
        assert!(!is_ok_header(&DsonHeader {
            key: 0,
            data_size: 0,
            data_type: LAST_TYPE_ID + 1
        }));
        assert!(is_ok_header(&DsonHeader {
            key: 0,
            data_size: 4,
            data_type: TypeId::I32.as_i32()
        }));
    }
}
