//! lontar is a library of column-oriented page-level encoders and decoders
//! for the Parquet wire format.
//!
//! It turns sequences of typed primitive values into compact
//! self-describing byte pages and reconstructs them bit-exactly:
//!
//! - PLAIN for the fixed-width numerics and byte strings,
//! - the RLE/bit-packed hybrid for booleans,
//! - DELTA_BINARY_PACKED for Int32/Int64,
//! - DELTA_LENGTH_BYTE_ARRAY and DELTA_BYTE_ARRAY for byte strings.
//!
//! The codecs are typed; the container's runtime `(PhysicalType, Encoding)`
//! tags enter through [`new_encoder`] / [`new_decoder`]. The file
//! container, compression codecs, and schema tree are collaborators above
//! this crate: only the page bytes and the `(num_values, encoding)` pair
//! cross the boundary.

pub mod bitio;
pub mod config;
pub mod encodings;
pub mod error;
pub mod rle;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::CodecConfig;
pub use encodings::{new_decoder, new_encoder, Decoder, Encoder, PageValue};
pub use error::LontarError;
pub use types::{ByteArray, Encoding, PhysicalType};
