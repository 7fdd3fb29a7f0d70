//! Shared low-level helpers for moving between typed slices and raw bytes.
//!
//! The conversions encapsulate the only pointer casts in the crate behind
//! `bytemuck`'s checked Pod casts.

use crate::error::LontarError;

/// Reinterprets a byte slice as a slice of a primitive type, zero-copy.
///
/// Fails when the length is not a multiple of the element size or the slice
/// is misaligned for `T`.
pub fn bytes_to_typed_slice<T: bytemuck::Pod>(bytes: &[u8]) -> Result<&[T], LontarError> {
    bytemuck::try_cast_slice(bytes)
        .map_err(|e| LontarError::InvalidArgument(format!("failed to cast byte slice: {e}")))
}

/// Copies a slice of primitive values into a new byte vector in native byte
/// order.
pub fn typed_slice_to_bytes<T: bytemuck::Pod>(data: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(data).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_slice_roundtrip() {
        let original: Vec<i32> = vec![1, -2, 1_000_000];
        let bytes = typed_slice_to_bytes(&original);
        let typed = bytes_to_typed_slice::<i32>(&bytes).unwrap();
        assert_eq!(typed, original.as_slice());
    }

    #[test]
    fn test_cast_length_mismatch_is_error() {
        let bytes: Vec<u8> = vec![0, 1, 2, 3, 4];
        assert!(matches!(
            bytes_to_typed_slice::<i32>(&bytes),
            Err(LontarError::InvalidArgument(_))
        ));
    }
}
