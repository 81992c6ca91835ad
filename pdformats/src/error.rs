//! Error taxonomy for the parser/decoder family.
//!
//! Each format module gets its own `thiserror`-derived enum, all folded into
//! the top-level [`PdError`] so CLI callers can match on a shared set of
//! kinds (`BadMagic`/`ShortRead`/`BadFormat`/`SizeMismatch`/`InflateFailed`/
//! `UnsupportedFeature`/`NotFound`) without caring which module raised them.

#[macro_export]
macro_rules! log_or_err {
    ($strict:expr, $level:expr, $err:expr $(,)?) => {{
        if $strict {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    #[error("short read at offset {offset}: needed {needed} byte(s), {available} available")]
    ShortRead {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("zlib inflate failed during {phase}: {source}")]
    InflateFailed {
        phase: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ContainerError {
    #[error("bad magic for {format}: expected one of the registered magics, found {found:?}")]
    BadMagic { format: &'static str, found: Vec<u8> },

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("IMG body at offset {offset}: {detail}")]
    BadFormat { offset: usize, detail: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ImageTableError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("IMT cell {index} offset range [{start}, {end}) exceeds body length {len}")]
    SizeMismatch {
        index: usize,
        start: u32,
        end: u32,
        len: usize,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("VID frame {index} body at offset {offset}: {detail}")]
    BadFormat {
        index: usize,
        offset: usize,
        detail: String,
    },

    #[error(
        "VID frame {index}: XOR reconstruction length mismatch, inflated {inflated} bytes vs reference {reference} bytes"
    )]
    SizeMismatch {
        index: usize,
        inflated: usize,
        reference: usize,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("AUD header at offset {offset}: unsupported sound format {fmt} (must be 0..=5)")]
    UnsupportedFeature { offset: usize, fmt: u8 },
}

#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("FNT page {page} offset range [{start}, {end}) exceeds body length {len}")]
    SizeMismatch {
        page: usize,
        start: u32,
        end: u32,
        len: usize,
    },

    #[error("FNT glyph for codepoint U+{codepoint:04X} not found")]
    NotFound { codepoint: u32 },
}

#[derive(thiserror::Error, Debug)]
pub enum StringsError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(thiserror::Error, Debug)]
pub enum BinaryError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("BIN body at offset {offset}: {detail}")]
    BadFormat { offset: usize, detail: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("archive entry {name:?} at offset {offset}: unknown type tag {tag:#04x}")]
    BadFormat {
        name: String,
        offset: usize,
        tag: u8,
    },

    #[error(
        "archive entry {name:?}: declared decompressed size {declared} disagrees with inflated size {actual}"
    )]
    SizeMismatch {
        name: String,
        declared: u32,
        actual: usize,
    },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    ImageTable(#[from] ImageTableError),

    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Strings(#[from] StringsError),

    #[error(transparent)]
    Font(#[from] FontError),

    #[error("entry not found: {0:?}")]
    NotFound(String),
}

/// Top-level error, uniting every format module behind one shared taxonomy.
#[derive(thiserror::Error, Debug)]
pub enum PdError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    ImageTable(#[from] ImageTableError),

    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Font(#[from] FontError),

    #[error(transparent)]
    Strings(#[from] StringsError),

    #[error(transparent)]
    Binary(#[from] BinaryError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("{path}: not a recognised Playdate asset and not inside a .pdx directory")]
    UnrecognisedFile { path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
