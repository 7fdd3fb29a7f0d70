//! The bit-level writer behind every encoder.

use crate::bitio::{ceil, zigzag_encode, BITPACK_MASKS};
use crate::error::LontarError;

/// Writes variable-bit-width integers into an owned buffer, little-endian,
/// LSB first within each byte, with a hard byte capacity.
///
/// Bits accumulate in a 64-bit staging word and spill to the buffer eight
/// bytes at a time; [`BitWriter::flush`] commits the trailing partial byte,
/// zero-padded. A full buffer surfaces as `BufferFull` rather than silent
/// truncation.
#[derive(Debug)]
pub struct BitWriter {
    buffer: Vec<u8>,
    max_bytes: usize,
    /// Bits staged but not yet spilled to `buffer`.
    buffered_values: u64,
    bit_offset: usize,
}

impl BitWriter {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_bytes,
            buffered_values: 0,
            bit_offset: 0,
        }
    }

    /// Appends the low `num_bits` of `v`.
    pub fn put_value(&mut self, v: u64, num_bits: usize) -> Result<(), LontarError> {
        debug_assert!(num_bits <= 64);
        let needed = self.buffer.len() + ceil(self.bit_offset + num_bits, 8);
        if needed > self.max_bytes {
            return Err(LontarError::BufferFull {
                needed,
                capacity: self.max_bytes,
            });
        }

        let v = v & BITPACK_MASKS[num_bits];
        self.buffered_values |= v << self.bit_offset;
        self.bit_offset += num_bits;
        if self.bit_offset >= 64 {
            self.buffer
                .extend_from_slice(&self.buffered_values.to_le_bytes());
            self.bit_offset -= 64;
            self.buffered_values = if self.bit_offset == 0 {
                0
            } else {
                // Bits of `v` that did not fit in the spilled word.
                v >> (num_bits - self.bit_offset)
            };
        }
        Ok(())
    }

    /// Writes `v` as an unsigned little-endian base-128 varint. Byte-aligns
    /// the cursor first; every framing field in the page formats sits on a
    /// byte boundary already.
    pub fn put_vlq_int(&mut self, mut v: u64) -> Result<(), LontarError> {
        self.flush();
        while v >= 0x80 {
            self.push_byte((v as u8 & 0x7F) | 0x80)?;
            v >>= 7;
        }
        self.push_byte(v as u8)
    }

    /// Zig-zag maps `v`, then writes it as a VLQ.
    pub fn put_zigzag_vlq_int(&mut self, v: i64) -> Result<(), LontarError> {
        self.put_vlq_int(zigzag_encode(v))
    }

    /// Byte-aligns the cursor and writes the low `num_bytes` of `v`
    /// little-endian.
    pub fn put_aligned(&mut self, v: u64, num_bytes: usize) -> Result<(), LontarError> {
        debug_assert!(num_bytes <= 8);
        self.flush();
        for &byte in &v.to_le_bytes()[..num_bytes] {
            self.push_byte(byte)?;
        }
        Ok(())
    }

    /// Byte-aligns the cursor and reserves `num_bytes` zeroed bytes for the
    /// caller to back-patch through [`BitWriter::put_aligned_offset`].
    /// Returns the offset of the reserved span.
    pub fn get_next_byte_offset(&mut self, num_bytes: usize) -> Result<usize, LontarError> {
        self.flush();
        let needed = self.buffer.len() + num_bytes;
        if needed > self.max_bytes {
            return Err(LontarError::BufferFull {
                needed,
                capacity: self.max_bytes,
            });
        }
        let offset = self.buffer.len();
        self.buffer.resize(needed, 0);
        Ok(offset)
    }

    /// Overwrites previously committed bytes at `offset`.
    pub fn put_aligned_offset(&mut self, offset: usize, bytes: &[u8]) -> Result<(), LontarError> {
        if offset + bytes.len() > self.buffer.len() {
            return Err(LontarError::InvalidArgument(format!(
                "back-patch of {} bytes at offset {} exceeds {} committed bytes",
                bytes.len(),
                offset,
                self.buffer.len()
            )));
        }
        self.buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Byte-aligns the cursor, zero-padding the trailing partial byte.
    pub fn flush(&mut self) {
        let remaining = ceil(self.bit_offset, 8);
        self.buffer
            .extend_from_slice(&self.buffered_values.to_le_bytes()[..remaining]);
        self.buffered_values = 0;
        self.bit_offset = 0;
    }

    /// Committed length in bytes, counting staged bits as a padded byte.
    pub fn bytes_written(&self) -> usize {
        self.buffer.len() + ceil(self.bit_offset, 8)
    }

    /// The committed bytes. Call [`BitWriter::flush`] first to include any
    /// staged partial byte.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffered_values = 0;
        self.bit_offset = 0;
    }

    fn push_byte(&mut self, byte: u8) -> Result<(), LontarError> {
        if self.buffer.len() + 1 > self.max_bytes {
            return Err(LontarError::BufferFull {
                needed: self.buffer.len() + 1,
                capacity: self.max_bytes,
            });
        }
        self.buffer.push(byte);
        Ok(())
    }
}
