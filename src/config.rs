//! Construction-time configuration shared by the page encoders.
//!
//! A `CodecConfig` is created once at the application boundary and passed by
//! reference to every encoder constructor. Decoders take no configuration;
//! their geometry comes from the page header.

use serde::{Deserialize, Serialize};

use crate::error::LontarError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    /// Staging budget per encoder, in bytes. `add` stops accepting values
    /// once the staged data would exceed this; the caller should `encode`
    /// and `reset` before re-submitting the remainder.
    #[serde(default = "default_page_size_bytes")]
    pub page_size_bytes: usize,

    /// Values per mini-block in the delta-bit-packed codec. Must be a
    /// nonzero multiple of 8 so mini-blocks stay byte-aligned.
    #[serde(default = "default_mini_block_size")]
    pub mini_block_size: usize,
}

impl CodecConfig {
    pub fn validate(&self) -> Result<(), LontarError> {
        if self.page_size_bytes == 0 {
            return Err(LontarError::InvalidArgument(
                "page_size_bytes must be nonzero".to_string(),
            ));
        }
        if self.mini_block_size == 0 || self.mini_block_size % 8 != 0 {
            return Err(LontarError::InvalidArgument(format!(
                "mini_block_size must be a nonzero multiple of 8, got {}",
                self.mini_block_size
            )));
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            page_size_bytes: default_page_size_bytes(),
            mini_block_size: default_mini_block_size(),
        }
    }
}

/// Helper for `serde` to provide a default for `page_size_bytes`.
fn default_page_size_bytes() -> usize {
    1024 * 1024
}

/// Helper for `serde` to provide a default for `mini_block_size`.
fn default_mini_block_size() -> usize {
    8
}
