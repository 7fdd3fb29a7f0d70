//! Delta byte-array encoding: shared-prefix compression across successive
//! strings. Each value splits into the length of its common prefix with the
//! previous value and the remaining suffix; prefix lengths travel through a
//! delta-bit-packed channel and suffixes through a delta-length byte-array
//! page.
//!
//! Page layout: `[prefix region size: u32 LE][prefix region][suffix region]`.

use crate::config::CodecConfig;
use crate::encodings::{
    Decoder, DeltaBitPackDecoder, DeltaBitPackEncoder, DeltaLengthByteArrayDecoder,
    DeltaLengthByteArrayEncoder, Encoder,
};
use crate::error::LontarError;
use crate::types::{ByteArray, Encoding, PhysicalType};

#[derive(Debug)]
pub struct DeltaByteArrayEncoder {
    prefix_len_encoder: DeltaBitPackEncoder<i32>,
    suffix_encoder: DeltaLengthByteArrayEncoder,
    last_value: Vec<u8>,
    num_values: usize,
    plain_encoded_len: usize,
    page: Vec<u8>,
}

impl DeltaByteArrayEncoder {
    pub fn try_new(config: &CodecConfig) -> Result<Self, LontarError> {
        Ok(Self {
            prefix_len_encoder: DeltaBitPackEncoder::try_new(config)?,
            suffix_encoder: DeltaLengthByteArrayEncoder::try_new(config)?,
            last_value: Vec::new(),
            num_values: 0,
            plain_encoded_len: 0,
            page: Vec::new(),
        })
    }

    /// Stages one string. The single entry point that counts a value; batch
    /// `add` delegates here.
    pub fn add_value(&mut self, value: &[u8]) -> Result<(), LontarError> {
        let prefix_len = value
            .iter()
            .zip(self.last_value.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = &value[prefix_len..];

        // Both channels must accept together or the page desyncs.
        if !self.prefix_len_encoder.has_capacity(1) || !self.suffix_encoder.can_stage(suffix.len())
        {
            return Err(LontarError::BufferFull {
                needed: suffix.len(),
                capacity: 0,
            });
        }
        self.prefix_len_encoder.add(&[prefix_len as i32])?;
        self.suffix_encoder.add_value(suffix)?;
        self.last_value.clear();
        self.last_value.extend_from_slice(value);
        self.plain_encoded_len += value.len() + 4;
        self.num_values += 1;
        Ok(())
    }

    /// What the staged values would have cost under plain encoding.
    pub fn plain_encoded_len(&self) -> usize {
        self.plain_encoded_len
    }
}

impl<'v> Encoder<ByteArray<'v>> for DeltaByteArrayEncoder {
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
        let prefix_page = self.prefix_len_encoder.encode()?;
        self.page.clear();
        self.page
            .extend_from_slice(&(prefix_page.len() as u32).to_le_bytes());
        self.page.extend_from_slice(prefix_page);
        let suffix_page = self.suffix_encoder.encode()?;
        self.page.extend_from_slice(suffix_page);
        Ok(&self.page)
    }

    fn reset(&mut self) {
        self.prefix_len_encoder.reset();
        self.suffix_encoder.reset();
        self.last_value.clear();
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
        Encoding::DeltaByteArray
    }
}

/// Decoder counterpart. Prefix bytes come from the previously reconstructed
/// string, so every decoded value owns its buffer.
#[derive(Debug, Default)]
pub struct DeltaByteArrayDecoder<'a> {
    prefix_len_decoder: DeltaBitPackDecoder<'a, i32>,
    suffix_decoder: DeltaLengthByteArrayDecoder<'a>,
    last_value: Vec<u8>,
    num_values: usize,
}

impl DeltaByteArrayDecoder<'_> {
    pub fn new() -> Self {
        Self {
            prefix_len_decoder: DeltaBitPackDecoder::new(),
            suffix_decoder: DeltaLengthByteArrayDecoder::new(),
            last_value: Vec::new(),
            num_values: 0,
        }
    }
}

impl<'a> Decoder<'a, ByteArray<'a>> for DeltaByteArrayDecoder<'a> {
    fn set_data(&mut self, num_values: usize, data: &'a [u8]) -> Result<(), LontarError> {
        self.num_values = num_values;
        self.last_value.clear();
        if num_values == 0 {
            return Ok(());
        }
        if data.len() < 4 {
            return Err(LontarError::EndOfData);
        }
        let mut region_bytes = [0u8; 4];
        region_bytes.copy_from_slice(&data[..4]);
        let prefix_region = u32::from_le_bytes(region_bytes) as usize;
        if data.len() < 4 + prefix_region {
            return Err(LontarError::EndOfData);
        }
        self.prefix_len_decoder
            .set_data(num_values, &data[4..4 + prefix_region])?;
        self.suffix_decoder
            .set_data(num_values, &data[4 + prefix_region..])?;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [ByteArray<'a>]) -> Result<usize, LontarError> {
        let max = buffer.len().min(self.num_values);
        for slot in buffer[..max].iter_mut() {
            let mut prefix_len = [0i32; 1];
            if self.prefix_len_decoder.get(&mut prefix_len)? != 1 {
                return Err(LontarError::EndOfData);
            }
            let prefix_len = prefix_len[0];
            if prefix_len < 0 || prefix_len as usize > self.last_value.len() {
                return Err(LontarError::InvalidArgument(format!(
                    "prefix length {prefix_len} exceeds previous value of {} bytes",
                    self.last_value.len()
                )));
            }
            let mut suffix = [ByteArray::default()];
            if self.suffix_decoder.get(&mut suffix)? != 1 {
                return Err(LontarError::EndOfData);
            }
            let suffix = suffix[0].as_bytes();

            let mut value = Vec::with_capacity(prefix_len as usize + suffix.len());
            value.extend_from_slice(&self.last_value[..prefix_len as usize]);
            value.extend_from_slice(suffix);
            self.last_value.clear();
            self.last_value.extend_from_slice(&value);
            *slot = ByteArray::Owned(value);
        }
        self.num_values -= max;
        Ok(max)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::DeltaByteArray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_page(words: &[&str]) -> Vec<u8> {
        let mut encoder = DeltaByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        for word in words {
            encoder.add_value(word.as_bytes()).unwrap();
        }
        encoder.encode().unwrap().to_vec()
    }

    fn assert_decodes_to(page: &[u8], words: &[&str]) {
        let mut decoder = DeltaByteArrayDecoder::new();
        decoder.set_data(words.len(), page).unwrap();
        let mut out = vec![ByteArray::default(); words.len()];
        assert_eq!(decoder.get(&mut out).unwrap(), words.len());
        for (value, &word) in out.iter().zip(words.iter()) {
            assert!(matches!(value, ByteArray::Owned(_)));
            assert_eq!(value.as_bytes(), word.as_bytes());
        }
    }

    #[test]
    fn test_prefix_lengths_and_suffixes() {
        let words = ["myxa", "myxophyta", "myxopod", "nab", "nabbed"];
        let page = encode_page(&words);

        // Prefix channel holds [0, 3, 3, 0, 3].
        let mut region_bytes = [0u8; 4];
        region_bytes.copy_from_slice(&page[..4]);
        let prefix_region = u32::from_le_bytes(region_bytes) as usize;
        let mut prefix_decoder = DeltaBitPackDecoder::<i32>::new();
        prefix_decoder
            .set_data(5, &page[4..4 + prefix_region])
            .unwrap();
        let mut prefix_lens = [0i32; 5];
        assert_eq!(prefix_decoder.get(&mut prefix_lens).unwrap(), 5);
        assert_eq!(prefix_lens, [0, 3, 3, 0, 3]);

        // Suffix channel holds the remainders.
        let mut suffix_decoder = DeltaLengthByteArrayDecoder::new();
        suffix_decoder
            .set_data(5, &page[4 + prefix_region..])
            .unwrap();
        let mut suffixes = vec![ByteArray::default(); 5];
        assert_eq!(suffix_decoder.get(&mut suffixes).unwrap(), 5);
        let expected = ["myxa", "ophyta", "opod", "nab", "bed"];
        for (suffix, &word) in suffixes.iter().zip(expected.iter()) {
            assert_eq!(suffix.as_bytes(), word.as_bytes());
        }

        assert_decodes_to(&page, &words);
    }

    #[test]
    fn test_wikipedia_word_list() {
        let words = [
            "myxa", "myxophyta", "myxopod", "nab", "nabbed", "nabbing", "nabit", "nabk", "nabob",
            "nacarat", "nacelle",
        ];
        let page = encode_page(&words);
        assert_decodes_to(&page, &words);
    }

    #[test]
    fn test_identical_neighbors_share_everything() {
        let words = ["repeat", "repeat", "repeat"];
        let page = encode_page(&words);
        assert_decodes_to(&page, &words);
    }

    #[test]
    fn test_empty_and_disjoint_strings() {
        let words = ["", "abc", "", "xyz", "xy"];
        let page = encode_page(&words);
        assert_decodes_to(&page, &words);
    }

    #[test]
    fn test_decoded_values_outlive_batches() {
        let words = ["alpha", "alphabet", "alphorn"];
        let page = encode_page(&words);

        let mut decoder = DeltaByteArrayDecoder::new();
        decoder.set_data(3, &page).unwrap();
        // One value per pull; each owned result must stay intact after the
        // decoder moves on.
        let mut collected = Vec::new();
        for _ in 0..3 {
            let mut out = [ByteArray::default()];
            assert_eq!(decoder.get(&mut out).unwrap(), 1);
            collected.push(out[0].clone());
        }
        assert_eq!(collected[0].as_bytes(), b"alpha");
        assert_eq!(collected[1].as_bytes(), b"alphabet");
        assert_eq!(collected[2].as_bytes(), b"alphorn");
    }

    #[test]
    fn test_corrupt_prefix_length_is_rejected() {
        // A prefix longer than anything decoded so far cannot be honored.
        let mut prefix_encoder =
            DeltaBitPackEncoder::<i32>::try_new(&CodecConfig::default()).unwrap();
        prefix_encoder.add(&[40]).unwrap();
        let prefix_page = prefix_encoder.encode().unwrap().to_vec();

        let mut suffix_encoder =
            DeltaLengthByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        suffix_encoder.add_value(b"tail").unwrap();
        let suffix_page = Encoder::<ByteArray>::encode(&mut suffix_encoder)
            .unwrap()
            .to_vec();

        let mut page = (prefix_page.len() as u32).to_le_bytes().to_vec();
        page.extend_from_slice(&prefix_page);
        page.extend_from_slice(&suffix_page);

        let mut decoder = DeltaByteArrayDecoder::new();
        decoder.set_data(1, &page).unwrap();
        let mut out = [ByteArray::default()];
        assert!(matches!(
            decoder.get(&mut out),
            Err(LontarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_add_batch_counts_once() {
        let values = [
            ByteArray::from("nab"),
            ByteArray::from("nabbed"),
            ByteArray::from("nabbing"),
        ];
        let mut encoder = DeltaByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        assert_eq!(encoder.add(&values).unwrap(), 3);
        assert_eq!(Encoder::<ByteArray>::num_values(&encoder), 3);
    }

    #[test]
    fn test_encode_is_idempotent() {
        let mut encoder = DeltaByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        encoder.add_value(b"myxa").unwrap();
        encoder.add_value(b"myxophyta").unwrap();
        let first = encoder.encode().unwrap().to_vec();
        let second = encoder.encode().unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_forgets_previous_string() {
        let mut encoder = DeltaByteArrayEncoder::try_new(&CodecConfig::default()).unwrap();
        encoder.add_value(b"shared-prefix").unwrap();
        encoder.reset();
        assert_eq!(Encoder::<ByteArray>::num_values(&encoder), 0);

        // After reset the first value must carry a zero prefix.
        encoder.add_value(b"shared-suffix").unwrap();
        let page = encoder.encode().unwrap().to_vec();
        assert_decodes_to(&page, &["shared-suffix"]);
    }
}
