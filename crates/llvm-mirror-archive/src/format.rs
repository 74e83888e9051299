use std::io::Read;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Length of the two-part extension tag (`.tar.gz` / `.tar.xz`).
const EXTENSION_LEN: usize = 7;

/// Compression codec wrapping a tar stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
}

impl Compression {
    /// Select a codec from a two-part extension tag such as `.tar.xz`.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension {
            ".tar.gz" => Ok(Self::Gzip),
            ".tar.xz" => Ok(Self::Xz),
            _ => Err(Error::UnsupportedFormat {
                name: extension.to_string(),
            }),
        }
    }

    /// Wrap `reader` in a decoder for this codec.
    ///
    /// The decoders pull from `reader` on demand, so it may be an unseekable network body.
    /// Concatenated gzip members and xz streams are decoded as one continuous stream.
    pub fn decoder<R: Read>(self, reader: R) -> Decoder<R> {
        match self {
            Self::Gzip => Decoder::Gzip(Box::new(flate2::read::MultiGzDecoder::new(reader))),
            Self::Xz => Decoder::Xz(Box::new(xz2::read::XzDecoder::new_multi_decoder(reader))),
        }
    }
}

/// Decoder wrapper for tar decompression.
pub enum Decoder<R: Read> {
    Gzip(Box<flate2::read::MultiGzDecoder<R>>),
    Xz(Box<xz2::read::XzDecoder<R>>),
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Gzip(d) => d.read(buf),
            Self::Xz(d) => d.read(buf),
        }
    }
}

/// Returns true for release assets that carry a mirrorable toolchain tarball.
pub fn is_mirrored_asset(name: &str, family_prefix: &str) -> bool {
    name.starts_with(family_prefix) && (name.ends_with(".tar.gz") || name.ends_with(".tar.xz"))
}

/// Naming facts derived once from an asset name such as
/// `clang+llvm-17.0.0-x86_64-linux.tar.xz`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveName {
    pub asset: String,
    pub top_dir: String,
    pub version_tag: String,
    pub compression: Compression,
}

impl ArchiveName {
    /// Split `asset` into top-level directory, version tag and codec.
    ///
    /// The version tag is the top-level directory with `{family_prefix}-` removed; when the
    /// prefix is absent the directory name is used as is.
    pub fn parse(asset: &str, family_prefix: &str) -> Result<Self> {
        let split = asset
            .len()
            .checked_sub(EXTENSION_LEN)
            .filter(|&at| asset.is_char_boundary(at))
            .ok_or_else(|| Error::UnsupportedFormat {
                name: asset.to_string(),
            })?;
        let (top_dir, extension) = asset.split_at(split);
        let compression = Compression::from_extension(extension).map_err(|_| {
            Error::UnsupportedFormat {
                name: asset.to_string(),
            }
        })?;

        let version_tag = top_dir
            .strip_prefix(family_prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(top_dir);

        Ok(Self {
            asset: asset.to_string(),
            top_dir: top_dir.to_string(),
            version_tag: version_tag.to_string(),
            compression,
        })
    }

    /// Archive path of the binaries directory, `{top_dir}/{bin_dir}`.
    pub fn bin_prefix(&self, bin_dir: &str) -> PathBuf {
        PathBuf::from(&self.top_dir).join(bin_dir)
    }
}
