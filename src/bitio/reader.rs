//! The bit-level reader behind every decoder.

use crate::bitio::{zigzag_decode, BITPACK_MASKS, MAX_VLQ_BYTE_LEN};
use crate::error::LontarError;
use crate::traits::BitPackable;

/// Parses the framing written by [`crate::bitio::BitWriter`] out of a
/// borrowed page slice. Never reads past the slice: underflow surfaces as
/// `EndOfData`.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    /// Bit position within the current byte, 0..8.
    bit_offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Reads `num_bits`, zero-extended to 64 bits.
    pub fn get_value(&mut self, num_bits: usize) -> Result<u64, LontarError> {
        debug_assert!(num_bits <= 64);
        let remaining = (self.data.len() - self.byte_offset) * 8 - self.bit_offset;
        if num_bits > remaining {
            return Err(LontarError::EndOfData);
        }

        let mut v = 0u64;
        let mut read = 0;
        while read < num_bits {
            let byte = self.data[self.byte_offset] as u64;
            let take = (8 - self.bit_offset).min(num_bits - read);
            let chunk = (byte >> self.bit_offset) & BITPACK_MASKS[take];
            v |= chunk << read;
            read += take;
            self.bit_offset += take;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }
        Ok(v)
    }

    /// Reads up to `out.len()` values of `num_bits` each, stopping early at
    /// end of data. Returns the count read; tolerance here lets the hybrid
    /// codec handle writers that truncate a final padded run.
    pub fn get_batch<T: BitPackable>(&mut self, out: &mut [T], num_bits: usize) -> usize {
        for (i, slot) in out.iter_mut().enumerate() {
            match self.get_value(num_bits) {
                Ok(v) => *slot = T::from_u64(v),
                Err(_) => return i,
            }
        }
        out.len()
    }

    /// Reads an unsigned little-endian base-128 varint. Byte-aligns the
    /// cursor first, mirroring the writer.
    pub fn get_vlq_int(&mut self) -> Result<u64, LontarError> {
        self.align();
        let mut v = 0u64;
        let mut shift = 0;
        loop {
            if shift >= MAX_VLQ_BYTE_LEN * 7 {
                return Err(LontarError::InvalidArgument(
                    "VLQ run exceeds ten bytes".to_string(),
                ));
            }
            let byte = self.next_byte()?;
            v |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(v);
            }
            shift += 7;
        }
    }

    /// Reads a VLQ and reverses the zig-zag mapping.
    pub fn get_zigzag_vlq_int(&mut self) -> Result<i64, LontarError> {
        Ok(zigzag_decode(self.get_vlq_int()?))
    }

    /// Byte-aligns the cursor, then reads `num_bytes` little-endian,
    /// zero-extended to 64 bits.
    pub fn get_aligned(&mut self, num_bytes: usize) -> Result<u64, LontarError> {
        debug_assert!(num_bytes <= 8);
        self.align();
        if self.byte_offset + num_bytes > self.data.len() {
            return Err(LontarError::EndOfData);
        }
        let mut buf = [0u8; 8];
        buf[..num_bytes].copy_from_slice(&self.data[self.byte_offset..self.byte_offset + num_bytes]);
        self.byte_offset += num_bytes;
        Ok(u64::from_le_bytes(buf))
    }

    fn align(&mut self) {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }
    }

    fn next_byte(&mut self) -> Result<u8, LontarError> {
        let byte = *self
            .data
            .get(self.byte_offset)
            .ok_or(LontarError::EndOfData)?;
        self.byte_offset += 1;
        Ok(byte)
    }
}
