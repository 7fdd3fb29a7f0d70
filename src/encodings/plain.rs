//! Plain encoding: numeric values packed contiguously little-endian, and
//! byte strings as a 4-byte little-endian length followed by the raw bytes.

use std::marker::PhantomData;

use crate::config::CodecConfig;
use crate::encodings::{Decoder, Encoder};
use crate::error::LontarError;
use crate::traits::FixedWidth;
use crate::types::{ByteArray, Encoding, PhysicalType};

/// Plain encoder for the fixed-width numeric types. Values are packed into
/// the output buffer as they arrive, so `encode` is a borrow of the staging
/// buffer itself.
#[derive(Debug)]
pub struct PlainEncoder<T: FixedWidth> {
    buffer: Vec<u8>,
    max_bytes: usize,
    num_values: usize,
    _native: PhantomData<T>,
}

impl<T: FixedWidth> PlainEncoder<T> {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            buffer: Vec::new(),
            max_bytes: config.page_size_bytes,
            num_values: 0,
            _native: PhantomData,
        }
    }
}

impl<T: FixedWidth> Encoder<T> for PlainEncoder<T> {
    fn add(&mut self, values: &[T]) -> Result<usize, LontarError> {
        let room = (self.max_bytes - self.buffer.len()) / T::SIZE;
        let accepted = values.len().min(room);
        for &value in &values[..accepted] {
            value.write_le(&mut self.buffer);
        }
        self.num_values += accepted;
        Ok(accepted)
    }

    fn encode(&mut self) -> Result<&[u8], LontarError> {
        Ok(&self.buffer)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.num_values = 0;
    }

    fn num_values(&self) -> usize {
        self.num_values
    }

    fn physical_type(&self) -> PhysicalType {
        T::PHYSICAL
    }

    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }
}

/// Plain decoder for the fixed-width numeric types: a bounded copy that
/// reports end-of-page when fewer than one element's bytes remain.
#[derive(Debug, Default)]
pub struct PlainDecoder<'a, T: FixedWidth> {
    data: &'a [u8],
    num_values: usize,
    _native: PhantomData<T>,
}

impl<T: FixedWidth> PlainDecoder<'_, T> {
    pub fn new() -> Self {
        Self {
            data: &[],
            num_values: 0,
            _native: PhantomData,
        }
    }
}

impl<'a, T: FixedWidth> Decoder<'a, T> for PlainDecoder<'a, T> {
    fn set_data(&mut self, num_values: usize, data: &'a [u8]) -> Result<(), LontarError> {
        self.num_values = num_values;
        self.data = data;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [T]) -> Result<usize, LontarError> {
        let mut count = buffer.len().min(self.num_values);
        if self.data.len() < count * T::SIZE {
            count = self.data.len() / T::SIZE;
        }
        for (i, slot) in buffer[..count].iter_mut().enumerate() {
            *slot = T::read_le(&self.data[i * T::SIZE..]);
        }
        self.data = &self.data[count * T::SIZE..];
        self.num_values -= count;
        Ok(count)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }
}

/// Plain encoder for byte strings: `[len: u32 LE][bytes]`, concatenated.
#[derive(Debug)]
pub struct PlainByteArrayEncoder {
    buffer: Vec<u8>,
    max_bytes: usize,
    num_values: usize,
}

impl PlainByteArrayEncoder {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            buffer: Vec::new(),
            max_bytes: config.page_size_bytes,
            num_values: 0,
        }
    }
}

impl<'v> Encoder<ByteArray<'v>> for PlainByteArrayEncoder {
    fn add(&mut self, values: &[ByteArray<'v>]) -> Result<usize, LontarError> {
        let mut accepted = 0;
        for value in values {
            let needed = 4 + value.len();
            if self.buffer.len() + needed > self.max_bytes {
                break;
            }
            self.buffer
                .extend_from_slice(&(value.len() as u32).to_le_bytes());
            self.buffer.extend_from_slice(value.as_bytes());
            accepted += 1;
        }
        self.num_values += accepted;
        Ok(accepted)
    }

    fn encode(&mut self) -> Result<&[u8], LontarError> {
        Ok(&self.buffer)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.num_values = 0;
    }

    fn num_values(&self) -> usize {
        self.num_values
    }

    fn physical_type(&self) -> PhysicalType {
        PhysicalType::ByteArray
    }

    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }
}

/// Plain decoder for byte strings. Decoded values borrow from the page, so
/// they are valid until the next `set_data`.
#[derive(Debug, Default)]
pub struct PlainByteArrayDecoder<'a> {
    data: &'a [u8],
    num_values: usize,
}

impl PlainByteArrayDecoder<'_> {
    pub fn new() -> Self {
        Self {
            data: &[],
            num_values: 0,
        }
    }
}

impl<'a> Decoder<'a, ByteArray<'a>> for PlainByteArrayDecoder<'a> {
    fn set_data(&mut self, num_values: usize, data: &'a [u8]) -> Result<(), LontarError> {
        self.num_values = num_values;
        self.data = data;
        Ok(())
    }

    fn get(&mut self, buffer: &mut [ByteArray<'a>]) -> Result<usize, LontarError> {
        let max = buffer.len().min(self.num_values);
        let mut produced = 0;
        while produced < max {
            if self.data.is_empty() {
                // Short return, treated by callers as end of page.
                break;
            }
            if self.data.len() < 4 {
                return Err(LontarError::EndOfData);
            }
            let mut len_bytes = [0u8; 4];
            len_bytes.copy_from_slice(&self.data[..4]);
            let len = u32::from_le_bytes(len_bytes) as usize;
            if self.data.len() < 4 + len {
                return Err(LontarError::EndOfData);
            }
            buffer[produced] = ByteArray::Borrowed(&self.data[4..4 + len]);
            self.data = &self.data[4 + len..];
            produced += 1;
        }
        self.num_values -= produced;
        Ok(produced)
    }

    fn values_left(&self) -> usize {
        self.num_values
    }

    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }
}
