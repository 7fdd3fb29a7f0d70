//! Delta length byte-array encoding: all string lengths in one
//! delta-bit-packed channel up front, then every string's bytes
//! concatenated with no separators.
//!
//! Page layout: `[lengths region size: u32 LE][lengths region][data region]`.

use crate::config::CodecConfig;
use crate::encodings::{Decoder, DeltaBitPackDecoder, DeltaBitPackEncoder, Encoder};
use crate::error::LontarError;
use crate::types::{ByteArray, Encoding, PhysicalType};

#[derive(Debug)]
pub struct DeltaLengthByteArrayEncoder {
    len_encoder: DeltaBitPackEncoder<i32>,
    data: Vec<u8>,
    max_bytes: usize,
    num_values: usize,
    plain_encoded_len: usize,
    page: Vec<u8>,
}

impl DeltaLengthByteArrayEncoder {
    pub fn try_new(config: &CodecConfig) -> Result<Self, LontarError> {
        Ok(Self {
            len_encoder: DeltaBitPackEncoder::try_new(config)?,
            data: Vec::new(),
            max_bytes: config.page_size_bytes,
            num_values: 0,
            plain_encoded_len: 0,
            page: Vec::new(),
        })
    }

    /// Stages one string. This is the single entry point that counts a
    /// value; batch `add` delegates here.
    pub fn add_value(&mut self, value: &[u8]) -> Result<(), LontarError> {
        if !self.can_stage(value.len()) {
            return Err(LontarError::BufferFull {
                needed: self.data.len() + value.len(),
                capacity: self.max_bytes,
            });
        }
        self.len_encoder.add(&[value.len() as i32])?;
        self.data.extend_from_slice(value);
        self.plain_encoded_len += value.len() + 4;
        self.num_values += 1;
        Ok(())
    }

    /// What the staged values would have cost under plain encoding; lets
    /// callers compare encodings before committing a page.
    pub fn plain_encoded_len(&self) -> usize {
        self.plain_encoded_len
    }

    pub(crate) fn can_stage(&self, value_len: usize) -> bool {
        self.data.len() + value_len <= self.max_bytes && self.len_encoder.has_capacity(1)
    }
}

impl<'v> Encoder<ByteArray<'v>> for DeltaLengthByteArrayEncoder {
    fn add(&mut self, values: &[ByteArray<'v>]) -> Result<usize, LontarError> {
        for (i, value) in values.iter().enumerate() {
            match self.add_value(value.as_bytes()) {
                Ok(()) => {}
                Err(LontarError::BufferFull { .. }) => return Ok(i),
                Err(e) => return Err(e),
            }
        }
        Ok(values.len())
    }

    fn encode(&mut self) -> Result<&[u8], LontarError> {
        let lengths = self.len_encoder.encode()?;
        self.page.clear();
        self.page
            .extend_from_slice(&(lengths.len() as u32).to_le_bytes());
        self.page.extend_from_slice(lengths);
        self.page.extend_from_slice(&self.data);
        Ok(&self.page)
    }

    fn reset(&mut self) {
        self.len_encoder.reset();
        self.data.clear();
        self.num_values = 0;
        self.plain_encoded_len = 0;
        self.page.clear();
    }

    fn num_values(&self) -> usize {
        self.num_values
    }

    fn physical_type(&self) -> PhysicalType {
        PhysicalType::ByteArray
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaLengthByteArray
    }
}

/// Decoder counterpart. Decoded values borrow from the page's data region,
/// so they are valid until the next `set_data`.
#[derive(Debug, Default)]
pub struct DeltaLengthByteArrayDecoder<'a> {
    len_decoder: DeltaBitPackDecoder<'a, i32>,
    data: &'a [u8],
    num_values: usize,
    /// Scratch for batched length pulls.
    lengths: Vec<i32>,
}

impl DeltaLengthByteArrayDecoder<'_> {
    pub fn new() -> Self {
        Self {
            len_decoder: DeltaBitPackDecoder::new(),
            data: &[],
            num_values: 0,
            lengths: Vec::new(),
        }
    }
}

impl<'a> Decoder<'a, ByteArray<'a>> for DeltaLengthByteArrayDecoder<'a> {
    fn set_data(&mut self, num_values: usize, data: &'a [u8]) -> Result<(), LontarError> {
        self.num_values = num_values;
        if num_values == 0 {
            self.data = &[];
            return Ok(());
        }
        if data.len() < 4 {
            return Err(LontarError::EndOfData);
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&data[..4]);
        let lengths_region = u32::from_le_bytes(len_bytes) as usize;
        if data.len() < 4 + lengths_region {
            return Err(LontarError::EndOfData);
        }
        self.len_decoder
            .set_data(num_values, &data[4..4 + lengths_region])?;
        self.data = &data[4 + lengths_region..];
        Ok(())
    }

    fn get(&mut self, buffer: &mut [ByteArray<'a>]) -> Result<usize, LontarError> {
        let max = buffer.len().min(self.num_values);
        self.lengths.clear();
        self.lengths.resize(max, 0);
        if self.len_decoder.get(&mut self.lengths)? < max {
            return Err(LontarError::EndOfData);
        }
        for (slot, &len) in buffer[..max].iter_mut().zip(self.lengths.iter()) {
            if len < 0 {
                return Err(LontarError::InvalidArgument(format!(
                    "negative string length {len}"
                )));
            }
            let len = len as usize;
            if len > self.data.len() {
                return Err(LontarError::EndOfData);
            }
            *slot = ByteArray::Borrowed(&self.data[..len]);
            self.data = &self.data[len..];
        }
        self.num_values -= max;
        Ok(max)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaLengthByteArray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_page(words: &[&str]) -> Vec<u8> {
        let mut encoder = DeltaLengthByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        for word in words {
            encoder.add_value(word.as_bytes()).unwrap();
        }
        encoder.encode().unwrap().to_vec()
    }

    fn decode_page<'p>(page: &'p [u8], count: usize) -> Vec<ByteArray<'p>> {
        let mut decoder = DeltaLengthByteArrayDecoder::new();
        decoder.set_data(count, page).unwrap();
        let mut out = vec![ByteArray::default(); count];
        assert_eq!(decoder.get(&mut out).unwrap(), count);
        out
    }

    #[test]
    fn test_data_region_is_concatenated_strings() {
        let words = ["Hello", "World", "Foobar", "ABCDEF"];
        let page = encode_page(&words);

        let mut region_bytes = [0u8; 4];
        region_bytes.copy_from_slice(&page[..4]);
        let lengths_region = u32::from_le_bytes(region_bytes) as usize;
        assert_eq!(&page[4 + lengths_region..], b"HelloWorldFoobarABCDEF");

        // The lengths region is a delta page of [5, 5, 6, 6].
        let mut len_decoder = DeltaBitPackDecoder::<i32>::new();
        len_decoder
            .set_data(4, &page[4..4 + lengths_region])
            .unwrap();
        let mut lengths = [0i32; 4];
        assert_eq!(len_decoder.get(&mut lengths).unwrap(), 4);
        assert_eq!(lengths, [5, 5, 6, 6]);

        let decoded = decode_page(&page, 4);
        for (value, &word) in decoded.iter().zip(words.iter()) {
            assert!(matches!(value, ByteArray::Borrowed(_)));
            assert_eq!(value.as_bytes(), word.as_bytes());
        }
    }

    #[test]
    fn test_empty_strings_roundtrip() {
        let words = ["", "a", "", "", "bc"];
        let page = encode_page(&words);
        let decoded = decode_page(&page, 5);
        for (value, &word) in decoded.iter().zip(words.iter()) {
            assert_eq!(value.as_bytes(), word.as_bytes());
        }
    }

    #[test]
    fn test_empty_page() {
        let page = encode_page(&[]);
        let mut decoder = DeltaLengthByteArrayDecoder::new();
        decoder.set_data(0, &page).unwrap();
        let mut out: Vec<ByteArray> = Vec::new();
        assert_eq!(decoder.get(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_batched_pulls() {
        let words: Vec<String> = (0..40).map(|i| format!("value-{i:03}")).collect();
        let refs: Vec<&str> = words.iter().map(|s| s.as_str()).collect();
        let page = encode_page(&refs);

        let mut decoder = DeltaLengthByteArrayDecoder::new();
        decoder.set_data(words.len(), &page).unwrap();
        let mut decoded: Vec<Vec<u8>> = Vec::new();
        let mut chunk = vec![ByteArray::default(); 7];
        loop {
            let read = decoder.get(&mut chunk).unwrap();
            decoded.extend(chunk[..read].iter().map(|v| v.as_bytes().to_vec()));
            if read < chunk.len() {
                break;
            }
        }
        assert_eq!(decoded.len(), words.len());
        for (value, word) in decoded.iter().zip(words.iter()) {
            assert_eq!(value, word.as_bytes());
        }
    }

    #[test]
    fn test_plain_encoded_len_tracks_cost() {
        let mut encoder = DeltaLengthByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        encoder.add_value(b"Hello").unwrap();
        encoder.add_value(b"Foobar").unwrap();
        assert_eq!(encoder.plain_encoded_len(), 5 + 4 + 6 + 4);
    }

    #[test]
    fn test_data_region_overrun_is_end_of_data() {
        let page = encode_page(&["Hello", "World"]);
        // Drop the last byte of the data region.
        let truncated = &page[..page.len() - 1];
        let mut decoder = DeltaLengthByteArrayDecoder::new();
        decoder.set_data(2, truncated).unwrap();
        let mut out = vec![ByteArray::default(); 2];
        assert!(matches!(decoder.get(&mut out), Err(LontarError::EndOfData)));
    }

    #[test]
    fn test_encode_is_idempotent() {
        let mut encoder = DeltaLengthByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        encoder.add_value(b"myxa").unwrap();
        encoder.add_value(b"nab").unwrap();
        let first = encoder.encode().unwrap().to_vec();
        let second = encoder.encode().unwrap().to_vec();
        assert_eq!(first, second);
    }
}
