//! Parser and transcoder library for the Playdate handheld console's
//! proprietary binary asset formats.
//!
//! ## Formats
//!
//! - **Image** ([`image`]): 1-bpp bitmap plus optional alpha plane.
//! - **Image table** ([`image_table`]): a matrix or sequence of image cells.
//! - **Video** ([`video`]): I/P/combined frames reconstructed via XOR chaining.
//! - **Audio** ([`audio`]): raw PCM or IMA-ADPCM, decoded to PCM WAV.
//! - **Strings** ([`strings`]): an insertion-ordered key/value table.
//! - **Font** ([`font`]): a paged bitmap font with kerning.
//! - **Binary** ([`binary`]): a compiled Playdate executable, re-synthesised
//!   as a minimal ARMv7-M ELF32 object.
//! - **Archive** ([`archive`]): a PDZ container of the above, as a directory
//!   tree.
//!
//! [`dispatch`] classifies loose files by extension for callers that walk a
//! `.pdx` directory instead of reading a single `.pdz`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pdformats::reader::BinReader;
//! use pdformats::image::Image;
//!
//! # fn main() -> Result<(), pdformats::error::PdError> {
//! let mut reader = BinReader::from_path("icon.pdi")?;
//! let image = Image::parse(&mut reader, false)?;
//! let png = image.encode_png(false)?;
//! # let _ = png;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod audio;
pub mod binary;
pub mod byteorder;
pub mod container;
pub mod dispatch;
pub mod error;
pub mod font;
pub mod image;
pub mod image_table;
pub mod reader;
pub mod strings;
pub mod video;
