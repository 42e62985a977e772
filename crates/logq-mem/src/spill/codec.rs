//! Compression facade for spill segments (feature-gated).
//!
//! Only `None`, `Zstd`, `Lz4`. A codec compiled out reports
//! `CodecUnsupported` instead of silently storing plain bytes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Codec {
    None = 0,
    Zstd = 1,
    Lz4 = 2,
}

impl Codec {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Codec::None),
            1 => Ok(Codec::Zstd),
            2 => Ok(Codec::Lz4),
            other => Err(Error::CodecUnsupported(format!("tag {other}"))),
        }
    }

    /// Parse the `spill_codec` config value.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Codec::None),
            "zstd" => Ok(Codec::Zstd),
            "lz4" => Ok(Codec::Lz4),
            other => Err(Error::CodecUnsupported(other.to_string())),
        }
    }

    pub fn compress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(input.to_vec()),
            Codec::Zstd => zstd_compress(input),
            Codec::Lz4 => lz4_compress(input),
        }
    }

    pub fn decompress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(input.to_vec()),
            Codec::Zstd => zstd_decompress(input),
            Codec::Lz4 => lz4_decompress(input),
        }
    }
}

#[cfg(feature = "zstd")]
fn zstd_compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    zstd::stream::copy_encode(input, &mut out, 3).map_err(|e| Error::Codec(format!("zstd: {e}")))?;
    Ok(out)
}

#[cfg(feature = "zstd")]
fn zstd_decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    zstd::stream::copy_decode(input, &mut out).map_err(|e| Error::Codec(format!("zstd: {e}")))?;
    Ok(out)
}

#[cfg(not(feature = "zstd"))]
fn zstd_compress(_input: &[u8]) -> Result<Vec<u8>> {
    Err(Error::CodecUnsupported("zstd".into()))
}

#[cfg(not(feature = "zstd"))]
fn zstd_decompress(_input: &[u8]) -> Result<Vec<u8>> {
    Err(Error::CodecUnsupported("zstd".into()))
}

#[cfg(feature = "lz4")]
fn lz4_compress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(lz4_flex::compress_prepend_size(input))
}

#[cfg(feature = "lz4")]
fn lz4_decompress(input: &[u8]) -> Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(input).map_err(|e| Error::Codec(format!("lz4: {e}")))
}

#[cfg(not(feature = "lz4"))]
fn lz4_compress(_input: &[u8]) -> Result<Vec<u8>> {
    Err(Error::CodecUnsupported("lz4".into()))
}

#[cfg(not(feature = "lz4"))]
fn lz4_decompress(_input: &[u8]) -> Result<Vec<u8>> {
    Err(Error::CodecUnsupported("lz4".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_tags() {
        assert_eq!(Codec::from_name("ZSTD").unwrap(), Codec::Zstd);
        assert_eq!(Codec::from_u8(Codec::Lz4 as u8).unwrap(), Codec::Lz4);
        assert!(Codec::from_name("brotli").is_err());
        assert!(Codec::from_u8(9).is_err());
    }

    #[test]
    fn none_is_identity() {
        let data = b"some spilled rows";
        assert_eq!(Codec::None.decompress(&Codec::None.compress(data).unwrap()).unwrap(), data);
    }
}
