//! Linking traits that tie native value types to the bit-level domains the
//! codecs work in.

use num_traits::{PrimInt, WrappingAdd, WrappingSub};

use crate::types::PhysicalType;

/// A fixed-width native type with a little-endian wire form. Implemented by
/// the four numeric types the plain codec packs contiguously.
pub trait FixedWidth: Copy {
    const SIZE: usize;
    const PHYSICAL: PhysicalType;

    fn write_le(self, out: &mut Vec<u8>);

    /// Reads one value from the first `SIZE` bytes of `bytes`. The caller
    /// guarantees the slice is long enough.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($native:ty, $physical:expr) => {
        impl FixedWidth for $native {
            const SIZE: usize = std::mem::size_of::<$native>();
            const PHYSICAL: PhysicalType = $physical;

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$native>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$native>()]);
                Self::from_le_bytes(buf)
            }
        }
    };
}

impl_fixed_width!(i32, PhysicalType::Int32);
impl_fixed_width!(i64, PhysicalType::Int64);
impl_fixed_width!(f32, PhysicalType::Float);
impl_fixed_width!(f64, PhysicalType::Double);

/// An integer type that delta-codes through a 64-bit wrapping domain. Only
/// Int32 and Int64 pages may be delta-bit-packed, so these are the only
/// implementations.
pub trait DeltaInt: PrimInt + WrappingAdd + WrappingSub {
    const PHYSICAL: PhysicalType;

    fn as_i64(self) -> i64;

    /// Inverse of [`DeltaInt::as_i64`]; truncates to the native width.
    fn from_i64(v: i64) -> Self;
}

impl DeltaInt for i32 {
    const PHYSICAL: PhysicalType = PhysicalType::Int32;

    fn as_i64(self) -> i64 {
        self as i64
    }

    fn from_i64(v: i64) -> Self {
        v as i32
    }
}

impl DeltaInt for i64 {
    const PHYSICAL: PhysicalType = PhysicalType::Int64;

    fn as_i64(self) -> i64 {
        self
    }

    fn from_i64(v: i64) -> Self {
        v
    }
}

/// A value that can be produced from the u64 bit-unpacking domain.
///
/// Unpacking writes only the low `bit_width` bits, so truncating to the
/// native width is lossless.
pub trait BitPackable: Copy {
    fn from_u64(v: u64) -> Self;
}

macro_rules! impl_bit_packable {
    ($native:ty) => {
        impl BitPackable for $native {
            fn from_u64(v: u64) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$native>()];
                buf.copy_from_slice(&v.to_le_bytes()[..std::mem::size_of::<$native>()]);
                Self::from_le_bytes(buf)
            }
        }
    };
}

impl_bit_packable!(u8);
impl_bit_packable!(u16);
impl_bit_packable!(u32);
impl_bit_packable!(u64);
impl_bit_packable!(i8);
impl_bit_packable!(i16);
impl_bit_packable!(i32);
impl_bit_packable!(i64);

impl BitPackable for bool {
    fn from_u64(v: u64) -> Self {
        v != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_roundtrip() {
        let mut buf = Vec::new();
        (-1234567890i64).write_le(&mut buf);
        0.5f64.write_le(&mut buf);
        assert_eq!(buf.len(), 16);
        assert_eq!(i64::read_le(&buf), -1234567890);
        assert_eq!(f64::read_le(&buf[8..]), 0.5);
    }

    #[test]
    fn test_delta_int_widening() {
        assert_eq!((-1i32).as_i64(), -1i64);
        assert_eq!(i32::from_i64(-1), -1i32);
        assert_eq!(i32::from_i64(i32::MIN as i64), i32::MIN);
    }

    #[test]
    fn test_bit_packable_truncates() {
        assert_eq!(u8::from_u64(0x1FF), 0xFF);
        assert_eq!(i32::from_u64(0xFFFF_FFFF), -1);
        assert!(bool::from_u64(1));
        assert!(!bool::from_u64(0));
    }
}
