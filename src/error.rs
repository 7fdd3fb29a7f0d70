//! This module defines the single, unified error type for the entire lontar
//! library.
//!
//! Every codec layer propagates the same enum, so a failure deep inside the
//! bit reader surfaces to the page boundary unchanged. The `thiserror` crate
//! is used to reduce boilerplate.

use thiserror::Error;

use crate::types::PhysicalType;

#[derive(Error, Debug)]
pub enum LontarError {
    /// A reader ran past the bytes supplied for the current page. Fatal for
    /// the page; there is no partial-page recovery.
    #[error("ran past the end of the page data")]
    EndOfData,

    /// The container's type tag disagrees with the value type the codec was
    /// built for.
    #[error("type mismatch: page is tagged {actual}, codec handles {expected}")]
    TypeMismatch {
        expected: PhysicalType,
        actual: PhysicalType,
    },

    /// An output buffer or staging budget cannot accept more data. Encoders
    /// report this from `add` as a short accepted count; seeing it out of
    /// `encode` means the page outgrew its computed bound.
    #[error("buffer full: needed {needed} bytes, capacity is {capacity}")]
    BufferFull { needed: usize, capacity: usize },

    /// The requested `(type, encoding)` pair has no codec.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A construction parameter or page header field is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
