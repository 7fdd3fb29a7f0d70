//! Boolean pages: the RLE/bit-packed hybrid with a bit width of one.

use crate::config::CodecConfig;
use crate::encodings::{Decoder, Encoder};
use crate::error::LontarError;
use crate::rle::{RleDecoder, RleEncoder};
use crate::types::{Encoding, PhysicalType};

#[derive(Debug)]
pub struct BoolEncoder {
    rle: RleEncoder,
    num_values: usize,
}

impl BoolEncoder {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            rle: RleEncoder::new(1, config.page_size_bytes),
            num_values: 0,
        }
    }
}

impl Encoder<bool> for BoolEncoder {
    fn add(&mut self, values: &[bool]) -> Result<usize, LontarError> {
        for (i, &value) in values.iter().enumerate() {
            match self.rle.put(value as u64) {
                Ok(()) => {}
                Err(LontarError::BufferFull { .. }) => {
                    self.num_values += i;
                    return Ok(i);
                }
                Err(e) => return Err(e),
            }
        }
        self.num_values += values.len();
        Ok(values.len())
    }

    fn encode(&mut self) -> Result<&[u8], LontarError> {
        self.rle.flush()?;
        Ok(self.rle.buffer())
    }

    fn reset(&mut self) {
        self.rle.clear();
        self.num_values = 0;
    }

    fn num_values(&self) -> usize {
        self.num_values
    }

    fn physical_type(&self) -> PhysicalType {
        PhysicalType::Boolean
    }

    fn encoding(&self) -> Encoding {
        Encoding::Rle
    }
}

#[derive(Debug)]
pub struct BoolDecoder<'a> {
    rle: RleDecoder<'a>,
    num_values: usize,
}

impl BoolDecoder<'_> {
    pub fn new() -> Self {
        Self {
            rle: RleDecoder::new(1),
            num_values: 0,
        }
    }
}

impl Default for BoolDecoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Decoder<'a, bool> for BoolDecoder<'a> {
    fn set_data(&mut self, num_values: usize, data: &'a [u8]) -> Result<(), LontarError> {
        self.num_values = num_values;
        self.rle.set_data(data);
        Ok(())
    }

    fn get(&mut self, buffer: &mut [bool]) -> Result<usize, LontarError> {
        let max = buffer.len().min(self.num_values);
        let read = self.rle.get_batch(&mut buffer[..max])?;
        if read < max {
            // The container promised more values than the run stream holds.
            return Err(LontarError::EndOfData);
        }
        self.num_values -= read;
        Ok(read)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::Rle
    }
}
