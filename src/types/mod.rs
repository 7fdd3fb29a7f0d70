//! Canonical, type-safe representations of the tags and values that cross
//! the page boundary.

mod byte_array;
mod tags;

pub use byte_array::ByteArray;
pub use tags::{Encoding, PhysicalType};
