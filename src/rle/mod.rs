//! RLE / bit-packed hybrid codec for sequences of small non-negative
//! integers, and the page format behind boolean columns.
//!
//! The wire grammar is a stream of runs. A repeated run is a varint header
//! with LSB 0 and the repetition count in the upper bits, followed by one
//! value in `ceil(bit_width / 8)` little-endian bytes. A bit-packed run is a
//! varint header with LSB 1 and the number of 8-value groups in the upper
//! bits, followed by the groups packed LSB first, the last group zero-padded
//! to a full eight values.

use log::debug;

use crate::bitio::{ceil, BitReader, BitWriter};
use crate::error::LontarError;
use crate::traits::BitPackable;

/// Bit-packed runs are sealed before they reach 64 groups so the indicator
/// varint patched in afterwards stays a single byte.
const MAX_GROUPS_PER_BIT_PACKED_RUN: usize = 1 << 6;

//==================================================================================
// 1. Encoder
//==================================================================================

/// Streaming run-length encoder.
///
/// Values are buffered eight at a time; once a value has repeated more than
/// eight times the run switches to repeated form, otherwise full groups are
/// appended to a growing bit-packed run whose group count is back-patched
/// into a reserved indicator byte when the run is sealed.
#[derive(Debug)]
pub struct RleEncoder {
    bit_width: u8,
    writer: BitWriter,
    buffered_values: [u64; 8],
    num_buffered_values: usize,
    current_value: u64,
    repeat_count: usize,
    /// Values already written into the open bit-packed run, excluding
    /// `buffered_values`.
    bit_packed_count: usize,
    indicator_byte_offset: Option<usize>,
}

impl RleEncoder {
    pub fn new(bit_width: u8, max_bytes: usize) -> Self {
        debug_assert!(bit_width <= 64);
        Self {
            bit_width,
            writer: BitWriter::new(max_bytes),
            buffered_values: [0; 8],
            num_buffered_values: 0,
            current_value: 0,
            repeat_count: 0,
            bit_packed_count: 0,
            indicator_byte_offset: None,
        }
    }

    /// Encodes one value, which must fit in `bit_width` bits.
    pub fn put(&mut self, value: u64) -> Result<(), LontarError> {
        if self.current_value == value {
            self.repeat_count += 1;
            if self.repeat_count > 8 {
                // Continuation of a long repeated run, nothing to buffer.
                return Ok(());
            }
        } else {
            if self.repeat_count >= 8 {
                debug_assert_eq!(self.bit_packed_count, 0);
                self.flush_repeated_run()?;
            }
            self.repeat_count = 1;
            self.current_value = value;
        }

        self.buffered_values[self.num_buffered_values] = value;
        self.num_buffered_values += 1;
        if self.num_buffered_values == 8 {
            debug_assert_eq!(self.bit_packed_count % 8, 0);
            self.flush_buffered_values()?;
        }
        Ok(())
    }

    /// Emits any pending run, padding a trailing partial group to eight
    /// values with zeros. Idempotent once the state is drained.
    pub fn flush(&mut self) -> Result<(), LontarError> {
        if self.bit_packed_count == 0 && self.repeat_count == 0 && self.num_buffered_values == 0 {
            return Ok(());
        }
        let all_repeat = self.bit_packed_count == 0
            && (self.repeat_count == self.num_buffered_values || self.num_buffered_values == 0);
        if self.repeat_count > 0 && all_repeat {
            self.flush_repeated_run()?;
        } else {
            while self.num_buffered_values > 0 && self.num_buffered_values < 8 {
                self.buffered_values[self.num_buffered_values] = 0;
                self.num_buffered_values += 1;
            }
            self.bit_packed_count += self.num_buffered_values;
            self.flush_bit_packed_run(true)?;
            self.repeat_count = 0;
        }
        debug!(
            "rle flush: {} bytes at bit width {}",
            self.writer.bytes_written(),
            self.bit_width
        );
        Ok(())
    }

    /// Bytes committed so far; meaningful after [`RleEncoder::flush`].
    pub fn bytes_written(&self) -> usize {
        self.writer.bytes_written()
    }

    pub fn buffer(&self) -> &[u8] {
        self.writer.buffer()
    }

    pub fn clear(&mut self) {
        self.writer.clear();
        self.num_buffered_values = 0;
        self.current_value = 0;
        self.repeat_count = 0;
        self.bit_packed_count = 0;
        self.indicator_byte_offset = None;
    }

    fn flush_repeated_run(&mut self) -> Result<(), LontarError> {
        debug_assert!(self.repeat_count > 0);
        self.writer.put_vlq_int((self.repeat_count << 1) as u64)?;
        self.writer
            .put_aligned(self.current_value, ceil(self.bit_width as usize, 8))?;
        self.num_buffered_values = 0;
        self.repeat_count = 0;
        Ok(())
    }

    fn flush_bit_packed_run(&mut self, seal: bool) -> Result<(), LontarError> {
        if self.indicator_byte_offset.is_none() {
            self.indicator_byte_offset = Some(self.writer.get_next_byte_offset(1)?);
        }
        for i in 0..self.num_buffered_values {
            self.writer
                .put_value(self.buffered_values[i], self.bit_width as usize)?;
        }
        self.num_buffered_values = 0;
        if seal {
            let num_groups = self.bit_packed_count / 8;
            let indicator = ((num_groups << 1) | 1) as u8;
            if let Some(offset) = self.indicator_byte_offset.take() {
                self.writer.put_aligned_offset(offset, &[indicator])?;
            }
            self.bit_packed_count = 0;
        }
        Ok(())
    }

    /// A full group of eight is buffered; decide which run form it joins.
    fn flush_buffered_values(&mut self) -> Result<(), LontarError> {
        if self.repeat_count >= 8 {
            // The group is one repeating value; drop the buffer and let the
            // repeat counter carry it. Seal any open bit-packed run first.
            self.num_buffered_values = 0;
            if self.bit_packed_count > 0 {
                debug_assert_eq!(self.bit_packed_count % 8, 0);
                self.flush_bit_packed_run(true)?;
            }
            return Ok(());
        }

        self.bit_packed_count += self.num_buffered_values;
        let num_groups = self.bit_packed_count / 8;
        if num_groups + 1 >= MAX_GROUPS_PER_BIT_PACKED_RUN {
            self.flush_bit_packed_run(true)?;
        } else {
            self.flush_bit_packed_run(false)?;
        }
        self.repeat_count = 0;
        Ok(())
    }
}

//==================================================================================
// 2. Decoder
//==================================================================================

/// Streaming run-length decoder.
///
/// Materializes one run at a time, serving batched pulls from the current
/// run until it exhausts.
#[derive(Debug)]
pub struct RleDecoder<'a> {
    bit_width: u8,
    reader: BitReader<'a>,
    repeated_left: u64,
    bit_packed_left: u64,
    current_value: u64,
}

impl<'a> RleDecoder<'a> {
    pub fn new(bit_width: u8) -> Self {
        debug_assert!(bit_width <= 64);
        Self {
            bit_width,
            reader: BitReader::new(&[]),
            repeated_left: 0,
            bit_packed_left: 0,
            current_value: 0,
        }
    }

    /// Installs a new run stream and resets all run state.
    pub fn set_data(&mut self, data: &'a [u8]) {
        self.reader = BitReader::new(data);
        self.repeated_left = 0;
        self.bit_packed_left = 0;
        self.current_value = 0;
    }

    /// Decodes up to `out.len()` values. A short count means the run stream
    /// is exhausted.
    pub fn get_batch<T: BitPackable>(&mut self, out: &mut [T]) -> Result<usize, LontarError> {
        let mut read = 0;
        while read < out.len() {
            if self.repeated_left > 0 {
                let count = (out.len() - read).min(self.repeated_left as usize);
                let value = T::from_u64(self.current_value);
                for slot in &mut out[read..read + count] {
                    *slot = value;
                }
                self.repeated_left -= count as u64;
                read += count;
            } else if self.bit_packed_left > 0 {
                let count = (out.len() - read).min(self.bit_packed_left as usize);
                let unpacked = self
                    .reader
                    .get_batch(&mut out[read..read + count], self.bit_width as usize);
                if unpacked == 0 {
                    // Writers may truncate the zero padding of a final group.
                    self.bit_packed_left = 0;
                    continue;
                }
                self.bit_packed_left -= unpacked as u64;
                read += unpacked;
            } else if !self.reload()? {
                break;
            }
        }
        Ok(read)
    }

    /// Reads the next run header. `Ok(false)` means a clean end of stream.
    fn reload(&mut self) -> Result<bool, LontarError> {
        let indicator = match self.reader.get_vlq_int() {
            Ok(v) => v,
            Err(LontarError::EndOfData) => return Ok(false),
            Err(e) => return Err(e),
        };
        // Some writers pad pages with zero bytes; a zero header is padding,
        // not a run.
        if indicator == 0 {
            return Ok(false);
        }
        if indicator & 1 == 1 {
            self.bit_packed_left = (indicator >> 1) * 8;
        } else {
            self.repeated_left = indicator >> 1;
            let value_width = ceil(self.bit_width as usize, 8);
            self.current_value = self.reader.get_aligned(value_width)?;
        }
        Ok(true)
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
