//! Delta binary packed encoding for Int32 and Int64 pages.
//!
//! Page layout:
//!
//! ```text
//! <block size in values> <mini-blocks per block> <value count - 1> <first value>
//! then per block:
//! <min delta> <bit widths, one byte per mini-block> <bit-packed mini-blocks>
//! ```
//!
//! Header fields are VLQ; the first value and min delta are zig-zag VLQ.
//! Each mini-block stores `raw_delta - min_delta` at its own bit width, the
//! last one zero-padded to a full mini-block. The encoder emits one block
//! per page; the decoder also crosses block boundaries, re-reading a block
//! header whenever more deltas are needed.

use std::marker::PhantomData;

use log::debug;

use crate::bitio::{self, BitReader, BitWriter};
use crate::config::CodecConfig;
use crate::encodings::{Decoder, Encoder};
use crate::error::LontarError;
use crate::traits::DeltaInt;
use crate::types::{Encoding, PhysicalType};

//==================================================================================
// 1. Encoder
//==================================================================================

#[derive(Debug)]
pub struct DeltaBitPackEncoder<T: DeltaInt> {
    /// Staged absolute values, widened to the common 64-bit delta domain.
    values: Vec<i64>,
    mini_block_size: usize,
    max_values: usize,
    page: Vec<u8>,
    _native: PhantomData<T>,
}

impl<T: DeltaInt> DeltaBitPackEncoder<T> {
    pub fn try_new(config: &CodecConfig) -> Result<Self, LontarError> {
        config.validate()?;
        Ok(Self {
            values: Vec::new(),
            mini_block_size: config.mini_block_size,
            max_values: config.page_size_bytes / std::mem::size_of::<i64>(),
            page: Vec::new(),
            _native: PhantomData,
        })
    }

    pub(crate) fn has_capacity(&self, additional: usize) -> bool {
        self.values.len() + additional <= self.max_values
    }

    /// Rebuilds the page from the staged values. Deltas are computed into a
    /// scratch buffer, never in place, so repeated calls emit identical
    /// bytes.
    fn build_page(&mut self) -> Result<(), LontarError> {
        let n = self.values.len();
        let num_mini_blocks = if n == 0 {
            0
        } else {
            bitio::ceil(n - 1, self.mini_block_size)
        };
        let block_size = num_mini_blocks * self.mini_block_size;

        // Upper bound: five varints, the width bytes, and 64-bit deltas for
        // every padded slot.
        let cap = 64 + num_mini_blocks + block_size * 8;
        let mut writer = BitWriter::new(cap);

        writer.put_vlq_int(block_size as u64)?;
        writer.put_vlq_int(num_mini_blocks as u64)?;
        writer.put_vlq_int(n.saturating_sub(1) as u64)?;
        writer.put_zigzag_vlq_int(if n == 0 { 0 } else { self.values[0] })?;

        if n > 1 {
            let deltas: Vec<i64> = self
                .values
                .windows(2)
                .map(|pair| pair[1].wrapping_sub(pair[0]))
                .collect();
            let min_delta = match deltas.iter().min() {
                Some(&min) => min,
                None => 0,
            };
            writer.put_zigzag_vlq_int(min_delta)?;

            let widths_offset = writer.get_next_byte_offset(num_mini_blocks)?;
            for (i, mini_block) in deltas.chunks(self.mini_block_size).enumerate() {
                let max_packed = mini_block
                    .iter()
                    .map(|&delta| delta.wrapping_sub(min_delta) as u64)
                    .max()
                    .unwrap_or(0);
                let bit_width = bitio::num_required_bits(max_packed);
                writer.put_aligned_offset(widths_offset + i, &[bit_width])?;

                for &delta in mini_block {
                    writer.put_value(delta.wrapping_sub(min_delta) as u64, bit_width as usize)?;
                }
                for _ in mini_block.len()..self.mini_block_size {
                    writer.put_value(0, bit_width as usize)?;
                }
            }
            debug!(
                "delta page: {n} values in {num_mini_blocks} mini-blocks, min delta {min_delta}"
            );
        }

        writer.flush();
        self.page.clear();
        self.page.extend_from_slice(writer.buffer());
        Ok(())
    }
}

impl<T: DeltaInt> Encoder<T> for DeltaBitPackEncoder<T> {
    fn add(&mut self, values: &[T]) -> Result<usize, LontarError> {
        let room = self.max_values.saturating_sub(self.values.len());
        let accepted = values.len().min(room);
        self.values
            .extend(values[..accepted].iter().map(|v| v.as_i64()));
        Ok(accepted)
    }

    fn encode(&mut self) -> Result<&[u8], LontarError> {
        self.build_page()?;
        Ok(&self.page)
    }

    fn reset(&mut self) {
        self.values.clear();
        self.page.clear();
    }

    fn num_values(&self) -> usize {
        self.values.len()
    }

    fn physical_type(&self) -> PhysicalType {
        T::PHYSICAL
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaBinaryPacked
    }
}

//==================================================================================
// 2. Decoder
//==================================================================================

#[derive(Debug)]
pub struct DeltaBitPackDecoder<'a, T: DeltaInt> {
    reader: BitReader<'a>,
    num_values: usize,
    /// The page's first value has not been served yet.
    first_pending: bool,
    num_mini_blocks: usize,
    values_per_mini_block: usize,
    mini_block_widths: Vec<u8>,
    mini_block_idx: usize,
    values_left_in_mini_block: usize,
    min_delta: i64,
    last_value: i64,
    _native: PhantomData<T>,
}

impl<T: DeltaInt> DeltaBitPackDecoder<'_, T> {
    pub fn new() -> Self {
        Self {
            reader: BitReader::new(&[]),
            num_values: 0,
            first_pending: false,
            num_mini_blocks: 0,
            values_per_mini_block: 0,
            mini_block_widths: Vec::new(),
            mini_block_idx: 0,
            values_left_in_mini_block: 0,
            min_delta: 0,
            last_value: 0,
            _native: PhantomData,
        }
    }

    /// Reads the next block header: min delta, then one width byte per
    /// mini-block.
    fn load_block(&mut self) -> Result<(), LontarError> {
        if self.num_mini_blocks == 0 || self.values_per_mini_block == 0 {
            return Err(LontarError::InvalidArgument(
                "page declares no mini-blocks but more values remain".to_string(),
            ));
        }
        self.min_delta = self.reader.get_zigzag_vlq_int()?;
        self.mini_block_widths.clear();
        for _ in 0..self.num_mini_blocks {
            let width = self.reader.get_aligned(1)? as u8;
            if width > 64 {
                return Err(LontarError::InvalidArgument(format!(
                    "mini-block bit width {width} exceeds 64"
                )));
            }
            self.mini_block_widths.push(width);
        }
        self.mini_block_idx = 0;
        Ok(())
    }

    fn advance_mini_block(&mut self) -> Result<(), LontarError> {
        if self.mini_block_widths.is_empty() {
            self.load_block()?;
        } else {
            self.mini_block_idx += 1;
            if self.mini_block_idx >= self.num_mini_blocks {
                self.load_block()?;
            }
        }
        self.values_left_in_mini_block = self.values_per_mini_block;
        Ok(())
    }
}

impl<T: DeltaInt> Default for DeltaBitPackDecoder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: DeltaInt> Decoder<'a, T> for DeltaBitPackDecoder<'a, T> {
    fn set_data(&mut self, num_values: usize, data: &'a [u8]) -> Result<(), LontarError> {
        self.reader = BitReader::new(data);
        self.num_values = num_values;
        self.mini_block_widths.clear();
        self.mini_block_idx = 0;
        self.values_left_in_mini_block = 0;
        self.num_mini_blocks = 0;
        self.values_per_mini_block = 0;
        self.min_delta = 0;
        self.last_value = 0;
        self.first_pending = false;
        if num_values == 0 {
            return Ok(());
        }

        let block_size = self.reader.get_vlq_int()? as usize;
        self.num_mini_blocks = self.reader.get_vlq_int()? as usize;
        // The count is also in the header; the container's copy wins.
        let _stored_count_minus_one = self.reader.get_vlq_int()?;
        self.last_value = self.reader.get_zigzag_vlq_int()?;
        self.values_per_mini_block = if self.num_mini_blocks == 0 {
            0
        } else {
            block_size / self.num_mini_blocks
        };
        self.first_pending = true;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T]) -> Result<usize, LontarError> {
        let max = buffer.len().min(self.num_values);
        let mut produced = 0;
        while produced < max {
            if self.first_pending {
                buffer[produced] = T::from_i64(self.last_value);
                self.first_pending = false;
                produced += 1;
                continue;
            }
            if self.values_left_in_mini_block == 0 {
                self.advance_mini_block()?;
            }
            let bit_width = self.mini_block_widths[self.mini_block_idx] as usize;
            let packed = self.reader.get_value(bit_width)?;
            let delta = (packed as i64).wrapping_add(self.min_delta);
            self.last_value = self.last_value.wrapping_add(delta);
            buffer[produced] = T::from_i64(self.last_value);
            self.values_left_in_mini_block -= 1;
            produced += 1;
        }
        self.num_values -= produced;
        Ok(produced)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaBinaryPacked
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn encode_page<T: DeltaInt>(values: &[T], config: &CodecConfig) -> Vec<u8> {
        let mut encoder = DeltaBitPackEncoder::<T>::try_new(config).unwrap();
        assert_eq!(encoder.add(values).unwrap(), values.len());
        encoder.encode().unwrap().to_vec()
    }

    fn roundtrip<T: DeltaInt + std::fmt::Debug>(values: &[T]) {
        let page = encode_page(values, &CodecConfig::default());
        let mut decoder = DeltaBitPackDecoder::<T>::new();
        decoder.set_data(values.len(), &page).unwrap();
        let mut out = vec![T::zero(); values.len()];
        assert_eq!(decoder.get(&mut out).unwrap(), values.len());
        assert_eq!(out, values);
        assert_eq!(decoder.values_left(), 0);
    }

    #[test]
    fn test_known_page_bytes() {
        // deltas [-2,-2,-2,1,1,1,1], min delta -2, shifted [0,0,0,3,3,3,3],
        // bit width 2, one padded slot.
        let values: [i64; 8] = [7, 5, 3, 1, 2, 3, 4, 5];
        let page = encode_page(&values, &CodecConfig::default());
        assert_eq!(
            page,
            vec![
                0x08, // block size 8
                0x01, // one mini-block
                0x07, // 7 values after the first
                0x0E, // first value 7, zig-zag
                0x03, // min delta -2, zig-zag
                0x02, // bit width 2
                0xC0, 0x3F, // shifted deltas plus padding
            ]
        );
        roundtrip(&values);
    }

    #[test]
    fn test_all_equal_needs_no_payload() {
        let values = vec![0i64; 100];
        let page = encode_page(&values, &CodecConfig::default());
        // Four header varints, min delta, and 13 zero width bytes.
        assert_eq!(page.len(), 5 + 13);
        assert_eq!(&page[..5], &[0x68, 0x0D, 0x63, 0x00, 0x00]);
        assert!(page[5..].iter().all(|&b| b == 0));
        roundtrip(&values);
    }

    #[test]
    fn test_single_value_is_header_only() {
        let values = [-17i32];
        let page = encode_page(&values, &CodecConfig::default());
        assert_eq!(page, vec![0x00, 0x00, 0x00, 0x21]);
        roundtrip(&values);
    }

    #[test]
    fn test_empty_page() {
        let values: [i64; 0] = [];
        let page = encode_page(&values, &CodecConfig::default());
        assert_eq!(page, vec![0x00, 0x00, 0x00, 0x00]);

        let mut decoder = DeltaBitPackDecoder::<i64>::new();
        decoder.set_data(0, &page).unwrap();
        let mut out = [0i64; 4];
        assert_eq!(decoder.get(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_multiple_mini_blocks() {
        let values: Vec<i32> = (0..100).map(|i| i * i - 50 * i).collect();
        roundtrip(&values);
    }

    #[test]
    fn test_wider_mini_blocks() {
        let config = CodecConfig {
            mini_block_size: 32,
            ..CodecConfig::default()
        };
        let values: Vec<i64> = (0..1000).map(|i| (i % 71) - 35).collect();
        let page = encode_page(&values, &config);
        let mut decoder = DeltaBitPackDecoder::<i64>::new();
        decoder.set_data(values.len(), &page).unwrap();
        let mut out = vec![0i64; values.len()];
        assert_eq!(decoder.get(&mut out).unwrap(), values.len());
        assert_eq!(out, values);
    }

    #[test]
    fn test_extreme_deltas_roundtrip() {
        roundtrip(&[i64::MIN, i64::MAX, 0, i64::MAX, i64::MIN]);
        roundtrip(&[i32::MIN, i32::MAX, -1, 1, 0]);
    }

    #[test]
    fn test_batched_pulls_cross_mini_blocks() {
        let values: Vec<i64> = (0..50).map(|i| i * 3 - 40).collect();
        let page = encode_page(&values, &CodecConfig::default());
        let mut decoder = DeltaBitPackDecoder::<i64>::new();
        decoder.set_data(values.len(), &page).unwrap();

        let mut decoded = Vec::new();
        let mut chunk = vec![0i64; 7];
        loop {
            let read = decoder.get(&mut chunk).unwrap();
            decoded.extend_from_slice(&chunk[..read]);
            if read < chunk.len() {
                break;
            }
        }
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_bit_widths_are_minimal() {
        let mut rng = StdRng::seed_from_u64(0xD317A);
        let values: Vec<i64> = (0..200).map(|_| rng.gen_range(-10_000..10_000)).collect();
        let page = encode_page(&values, &CodecConfig::default());

        let deltas: Vec<i64> = values.windows(2).map(|p| p[1] - p[0]).collect();
        let min_delta = *deltas.iter().min().unwrap();

        let mut reader = BitReader::new(&page);
        reader.get_vlq_int().unwrap();
        let num_mini_blocks = reader.get_vlq_int().unwrap() as usize;
        reader.get_vlq_int().unwrap();
        reader.get_zigzag_vlq_int().unwrap();
        assert_eq!(reader.get_zigzag_vlq_int().unwrap(), min_delta);
        for mini_block in deltas.chunks(8) {
            let stored = reader.get_aligned(1).unwrap() as u8;
            let max_shifted = mini_block.iter().map(|&d| (d - min_delta) as u64).max();
            assert!(stored <= bitio::num_required_bits(max_shifted.unwrap()));
        }
    }

    #[test]
    fn test_encode_is_idempotent() {
        let values: Vec<i64> = vec![3, 9, 2, 2, 40, -7];
        let mut encoder = DeltaBitPackEncoder::<i64>::try_new(&CodecConfig::default()).unwrap();
        encoder.add(&values).unwrap();
        let first = encoder.encode().unwrap().to_vec();
        let second = encoder.encode().unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_then_reuse() {
        let mut encoder = DeltaBitPackEncoder::<i32>::try_new(&CodecConfig::default()).unwrap();
        encoder.add(&[5, 6, 7]).unwrap();
        encoder.encode().unwrap();
        encoder.reset();
        assert_eq!(encoder.num_values(), 0);

        encoder.add(&[-3, -2]).unwrap();
        let page = encoder.encode().unwrap().to_vec();
        let mut decoder = DeltaBitPackDecoder::<i32>::new();
        decoder.set_data(2, &page).unwrap();
        let mut out = [0i32; 2];
        assert_eq!(decoder.get(&mut out).unwrap(), 2);
        assert_eq!(out, [-3, -2]);
    }

    #[test]
    fn test_truncated_page_is_end_of_data() {
        let values: Vec<i64> = (0..64).collect();
        let page = encode_page(&values, &CodecConfig::default());
        let truncated = &page[..page.len() - 2];
        let mut decoder = DeltaBitPackDecoder::<i64>::new();
        decoder.set_data(values.len(), truncated).unwrap();
        let mut out = vec![0i64; values.len()];
        assert!(matches!(decoder.get(&mut out), Err(LontarError::EndOfData)));
    }

    #[test]
    fn test_rejects_unaligned_mini_block_size() {
        let config = CodecConfig {
            mini_block_size: 10,
            ..CodecConfig::default()
        };
        assert!(matches!(
            DeltaBitPackEncoder::<i64>::try_new(&config),
            Err(LontarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_random_sequences_roundtrip() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for len in [2usize, 8, 9, 63, 64, 65, 500] {
            let increasing: Vec<i64> = (0..len as i64).map(|i| i * 97).collect();
            roundtrip(&increasing);
            let decreasing: Vec<i64> = (0..len as i64).map(|i| -i * 13).collect();
            roundtrip(&decreasing);
            let random: Vec<i64> = (0..len).map(|_| rng.gen()).collect();
            roundtrip(&random);
            let random32: Vec<i32> = (0..len).map(|_| rng.gen()).collect();
            roundtrip(&random32);
        }
    }
}
