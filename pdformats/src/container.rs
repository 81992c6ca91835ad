//! The "magic number + flags word + optional compressed-header" preamble
//! shared by IMG/IMT/VID/STR/FNT, plus the dual-magic variant used by BIN
//! (`Playdate PDX`/`Playdate BIN`).

use crate::error::ContainerError;
use crate::reader::BinReader;

/// Which of a format's (up to two) accepted magics matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicMatch {
    Primary,
    Secondary,
}

/// Requires `magic` (or `magic2`, if given) at the current cursor position
/// and advances past it. Pass `skip_magic = true` to load headerless
/// sub-payloads (images embedded in IMT/PDZ/VID/FNT) without consuming
/// anything.
pub fn read_magic(
    reader: &mut BinReader,
    format: &'static str,
    magic: &'static [u8],
    magic2: Option<&'static [u8]>,
    skip_magic: bool,
) -> Result<MagicMatch, ContainerError> {
    if skip_magic {
        return Ok(MagicMatch::Primary);
    }

    let start = reader.tell();
    let found = reader.readbin(magic.len());
    if found == magic {
        return Ok(MagicMatch::Primary);
    }

    if let Some(magic2) = magic2 {
        reader.seek(start);
        let found2 = reader.readbin(magic2.len());
        if found2 == magic2 {
            return Ok(MagicMatch::Secondary);
        }
        reader.seek(start);
        return Err(ContainerError::BadMagic {
            format,
            found: reader.readbin(magic2.len().max(magic.len())),
        });
    }

    reader.seek(start);
    Err(ContainerError::BadMagic {
        format,
        found: reader.readbin(magic.len()),
    })
}

/// Reads the `uint32` file-flags word, and if the compressed bit (MSB) is
/// set, skips the format-specific 16-byte decompressed-meta header and
/// inflates the remainder in place. Returns whether the body was
/// compressed. A no-op (reads nothing) when `skip_magic` is set and the
/// caller has no flags word to consume — callers of headerless bodies
/// should not call this at all.
pub fn read_compressed_header(
    reader: &mut BinReader,
    phase: &'static str,
) -> Result<bool, ContainerError> {
    let flags = reader.readu32()?;
    let compressed = flags & 0x8000_0000 != 0;
    if compressed {
        reader.advance(16);
    }
    reader.decompress(compressed, phase)?;
    Ok(compressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_magic_is_rejected() {
        let mut r = BinReader::from_bytes(b"NOT A MAGIC!".to_vec());
        let err = read_magic(&mut r, "IMG", b"Playdate IMG", None, false).unwrap_err();
        matches!(err, ContainerError::BadMagic { .. });
    }

    #[test]
    fn primary_magic_matches() {
        let mut r = BinReader::from_bytes(b"Playdate IMG".to_vec());
        let m = read_magic(&mut r, "IMG", b"Playdate IMG", None, false).unwrap();
        assert_eq!(m, MagicMatch::Primary);
        assert_eq!(r.tell(), 12);
    }

    #[test]
    fn secondary_magic_matches() {
        let mut r = BinReader::from_bytes(b"Playdate BIN".to_vec());
        let m = read_magic(
            &mut r,
            "BIN",
            b"Playdate PDX",
            Some(b"Playdate BIN"),
            false,
        )
        .unwrap();
        assert_eq!(m, MagicMatch::Secondary);
    }

    #[test]
    fn skip_magic_consumes_nothing() {
        let mut r = BinReader::from_bytes(vec![0, 0, 0, 0]);
        read_magic(&mut r, "IMG", b"Playdate IMG", None, true).unwrap();
        assert_eq!(r.tell(), 0);
    }
}
