//! Typed page codecs and the container-facing dispatch facade.
//!
//! Encoders follow the calling pattern `add`* then `encode`, then `reset`
//! to start the next page. `add` stages values (copying whatever it needs)
//! and may accept fewer than offered when the staging budget is exhausted;
//! `encode` returns the framed page bytes, owned by the encoder and valid
//! until the next `encode` or `reset`, and is idempotent between mutations.
//! Decoders are handed `(num_values, bytes)` through `set_data` and serve
//! batched pulls through `get`; a short `get` means end of page.
//!
//! Codecs are typed. The [`PageValue`] trait links each native value type
//! to the codecs that support it, and `new_encoder` / `new_decoder` bridge
//! from the container's runtime `(PhysicalType, Encoding)` tags into the
//! typed world.

mod boolean;
mod delta_bit_pack;
mod delta_byte_array;
mod delta_length_byte_array;
mod plain;


pub use boolean::{BoolDecoder, BoolEncoder};
pub use delta_bit_pack::{DeltaBitPackDecoder, DeltaBitPackEncoder};
pub use delta_byte_array::{DeltaByteArrayDecoder, DeltaByteArrayEncoder};
pub use delta_length_byte_array::{DeltaLengthByteArrayDecoder, DeltaLengthByteArrayEncoder};
pub use plain::{PlainByteArrayDecoder, PlainByteArrayEncoder, PlainDecoder, PlainEncoder};

use log::debug;

use crate::config::CodecConfig;
use crate::error::LontarError;
use crate::types::{ByteArray, Encoding, PhysicalType};

//==================================================================================
// 1. Codec Traits
//==================================================================================

/// Write half of a page codec for values of type `T`.
pub trait Encoder<T> {
    /// Stages values for the current page, copying them as needed. Returns
    /// the number accepted; a short count means the staging budget is
    /// exhausted and the caller should `encode`/`reset` before re-adding
    /// the remainder.
    fn add(&mut self, values: &[T]) -> Result<usize, LontarError>;

    /// Builds and returns the page bytes for everything staged since the
    /// last `reset`. The slice is owned by the encoder and invalidated by
    /// the next `encode` or `reset`.
    fn encode(&mut self) -> Result<&[u8], LontarError>;

    /// Returns the encoder to its empty state.
    fn reset(&mut self);

    /// Values staged since the last `reset`.
    fn num_values(&self) -> usize;

    fn physical_type(&self) -> PhysicalType;

    fn encoding(&self) -> Encoding;
}

/// Read half of a page codec for values of type `T`; `'a` is the lifetime
/// of the page bytes.
pub trait Decoder<'a, T> {
    /// Installs a page and resets all cursor state. May be called
    /// repeatedly to reuse the decoder across pages.
    fn set_data(&mut self, num_values: usize, data: &'a [u8]) -> Result<(), LontarError>;

    /// Decodes up to `buffer.len()` values. Returns the count produced,
    /// never more than the values left in the page; a short count means
    /// end of page.
    fn get(&mut self, buffer: &mut [T]) -> Result<usize, LontarError>;

    /// Values not yet pulled from the current page.
    fn values_left(&self) -> usize;

    fn encoding(&self) -> Encoding;
}

//==================================================================================
// 2. Runtime-Tag Facade
//==================================================================================

mod sealed {
    pub trait Sealed {}

    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for crate::types::ByteArray<'_> {}
}

/// Links a native value type to its physical tag and to the codecs that can
/// carry it. Implemented for the six value types pages may hold; sealed
/// because the set is the wire format's, not the caller's.
pub trait PageValue<'a>: sealed::Sealed + Sized {
    const PHYSICAL: PhysicalType;

    fn encoder(
        encoding: Encoding,
        config: &CodecConfig,
    ) -> Result<Box<dyn Encoder<Self>>, LontarError>;

    fn decoder(encoding: Encoding) -> Result<Box<dyn Decoder<'a, Self> + 'a>, LontarError>;
}

/// Builds an encoder for pages tagged `(physical, encoding)`, checking the
/// container's tag against the static value type.
pub fn new_encoder<'a, T: PageValue<'a>>(
    physical: PhysicalType,
    encoding: Encoding,
    config: &CodecConfig,
) -> Result<Box<dyn Encoder<T>>, LontarError> {
    if physical != T::PHYSICAL {
        return Err(LontarError::TypeMismatch {
            expected: T::PHYSICAL,
            actual: physical,
        });
    }
    debug!("building {encoding} encoder for {physical} pages");
    T::encoder(encoding, config)
}

/// Decoder counterpart of [`new_encoder`].
pub fn new_decoder<'a, T: PageValue<'a>>(
    physical: PhysicalType,
    encoding: Encoding,
) -> Result<Box<dyn Decoder<'a, T> + 'a>, LontarError> {
    if physical != T::PHYSICAL {
        return Err(LontarError::TypeMismatch {
            expected: T::PHYSICAL,
            actual: physical,
        });
    }
    T::decoder(encoding)
}

fn unsupported(physical: PhysicalType, encoding: Encoding) -> LontarError {
    LontarError::NotImplemented(format!("{encoding} pages for {physical} values"))
}

fn delta_needs_integers(physical: PhysicalType) -> LontarError {
    LontarError::InvalidArgument(format!(
        "delta bit packing requires an integer type, got {physical}"
    ))
}

//==================================================================================
// 3. Per-Type Codec Tables
//==================================================================================

macro_rules! impl_page_value_int {
    ($native:ty, $physical:expr) => {
        impl<'a> PageValue<'a> for $native {
            const PHYSICAL: PhysicalType = $physical;

            fn encoder(
                encoding: Encoding,
                config: &CodecConfig,
            ) -> Result<Box<dyn Encoder<Self>>, LontarError> {
                match encoding {
                    Encoding::Plain => Ok(Box::new(PlainEncoder::<$native>::new(config))),
                    Encoding::DeltaBinaryPacked => {
                        Ok(Box::new(DeltaBitPackEncoder::<$native>::try_new(config)?))
                    }
                    other => Err(unsupported(Self::PHYSICAL, other)),
                }
            }

            fn decoder(
                encoding: Encoding,
            ) -> Result<Box<dyn Decoder<'a, Self> + 'a>, LontarError> {
                match encoding {
                    Encoding::Plain => Ok(Box::new(PlainDecoder::<$native>::new())),
                    Encoding::DeltaBinaryPacked => {
                        Ok(Box::new(DeltaBitPackDecoder::<$native>::new()))
                    }
                    other => Err(unsupported(Self::PHYSICAL, other)),
                }
            }
        }
    };
}

macro_rules! impl_page_value_float {
    ($native:ty, $physical:expr) => {
        impl<'a> PageValue<'a> for $native {
            const PHYSICAL: PhysicalType = $physical;

            fn encoder(
                encoding: Encoding,
                config: &CodecConfig,
            ) -> Result<Box<dyn Encoder<Self>>, LontarError> {
                match encoding {
                    Encoding::Plain => Ok(Box::new(PlainEncoder::<$native>::new(config))),
                    Encoding::DeltaBinaryPacked => Err(delta_needs_integers(Self::PHYSICAL)),
                    other => Err(unsupported(Self::PHYSICAL, other)),
                }
            }

            fn decoder(
                encoding: Encoding,
            ) -> Result<Box<dyn Decoder<'a, Self> + 'a>, LontarError> {
                match encoding {
                    Encoding::Plain => Ok(Box::new(PlainDecoder::<$native>::new())),
                    Encoding::DeltaBinaryPacked => Err(delta_needs_integers(Self::PHYSICAL)),
                    other => Err(unsupported(Self::PHYSICAL, other)),
                }
            }
        }
    };
}

impl_page_value_int!(i32, PhysicalType::Int32);
impl_page_value_int!(i64, PhysicalType::Int64);
impl_page_value_float!(f32, PhysicalType::Float);
impl_page_value_float!(f64, PhysicalType::Double);

impl<'a> PageValue<'a> for bool {
    const PHYSICAL: PhysicalType = PhysicalType::Boolean;

    fn encoder(
        encoding: Encoding,
        config: &CodecConfig,
    ) -> Result<Box<dyn Encoder<Self>>, LontarError> {
        match encoding {
            Encoding::Rle => Ok(Box::new(BoolEncoder::new(config))),
            Encoding::Plain => Err(LontarError::NotImplemented(
                "booleans cannot be plain encoded; use the RLE hybrid".to_string(),
            )),
            other => Err(unsupported(Self::PHYSICAL, other)),
        }
    }

    fn decoder(encoding: Encoding) -> Result<Box<dyn Decoder<'a, Self> + 'a>, LontarError> {
        match encoding {
            Encoding::Rle => Ok(Box::new(BoolDecoder::new())),
            Encoding::Plain => Err(LontarError::NotImplemented(
                "booleans cannot be plain encoded; use the RLE hybrid".to_string(),
            )),
            other => Err(unsupported(Self::PHYSICAL, other)),
        }
    }
}

impl<'a> PageValue<'a> for ByteArray<'a> {
    const PHYSICAL: PhysicalType = PhysicalType::ByteArray;

    fn encoder(
        encoding: Encoding,
        config: &CodecConfig,
    ) -> Result<Box<dyn Encoder<Self>>, LontarError> {
        match encoding {
            Encoding::Plain => Ok(Box::new(PlainByteArrayEncoder::new(config))),
            Encoding::DeltaLengthByteArray => {
                Ok(Box::new(DeltaLengthByteArrayEncoder::try_new(config)?))
            }
            Encoding::DeltaByteArray => Ok(Box::new(DeltaByteArrayEncoder::try_new(config)?)),
            other => Err(unsupported(Self::PHYSICAL, other)),
        }
    }

    fn decoder(encoding: Encoding) -> Result<Box<dyn Decoder<'a, Self> + 'a>, LontarError> {
        match encoding {
            Encoding::Plain => Ok(Box::new(PlainByteArrayDecoder::new())),
            Encoding::DeltaLengthByteArray => Ok(Box::new(DeltaLengthByteArrayDecoder::new())),
            Encoding::DeltaByteArray => Ok(Box::new(DeltaByteArrayDecoder::new())),
            other => Err(unsupported(Self::PHYSICAL, other)),
        }
    }
}
