//! Stateful cursor over an owned byte buffer with typed little-endian
//! readers. Grounded on `loaders/pdfile.py`'s `PDFile`: every format parser
//! owns one of these rather than extending it.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::error::ReaderError;

#[derive(Debug, Clone)]
pub struct BinReader {
    data: Vec<u8>,
    pos: usize,
}

impl BinReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let data = fs::read(path)?;
        Ok(Self { data, pos: 0 })
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, offset: usize) {
        self.pos = offset.min(self.data.len());
    }

    pub fn seekrelto(&mut self, base: usize, offset: usize) {
        self.seek(base + offset);
    }

    pub fn advance(&mut self, n: usize) {
        self.seek(self.pos + n);
    }

    /// Advances until `tell() % modulus == 0`.
    pub fn align(&mut self, modulus: usize) {
        while self.pos % modulus != 0 {
            self.advance(1);
        }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Takes `n` bytes, or the remainder if `n` exceeds what's left. Never
    /// errors: a short read is reserved for the typed primitive readers,
    /// which know exactly how many bytes they need.
    pub fn readbin(&mut self, n: usize) -> Vec<u8> {
        let end = (self.pos + n).min(self.data.len());
        let out = self.data[self.pos..end].to_vec();
        self.pos = end;
        out
    }

    /// Takes every remaining byte.
    pub fn readbin_all(&mut self) -> Vec<u8> {
        let out = self.data[self.pos..].to_vec();
        self.pos = self.data.len();
        out
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ReaderError> {
        if self.remaining() < N {
            return Err(ReaderError::ShortRead {
                offset: self.pos,
                needed: N,
                available: self.remaining(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// `u8` read at EOF yields `None` rather than an error — this sentinel
    /// drives PDZ's entry loop terminator.
    pub fn try_readu8(&mut self) -> Option<u8> {
        if self.is_eof() {
            None
        } else {
            let b = self.data[self.pos];
            self.pos += 1;
            Some(b)
        }
    }

    pub fn readu8(&mut self) -> Result<u8, ReaderError> {
        self.take::<1>().map(|b| b[0])
    }

    pub fn reads8(&mut self) -> Result<i8, ReaderError> {
        self.take::<1>().map(|b| b[0] as i8)
    }

    pub fn readu16(&mut self) -> Result<u16, ReaderError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    pub fn reads16(&mut self) -> Result<i16, ReaderError> {
        self.take::<2>().map(i16::from_le_bytes)
    }

    pub fn readu24(&mut self) -> Result<u32, ReaderError> {
        let b = self.take::<3>()?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    pub fn readu32(&mut self) -> Result<u32, ReaderError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    pub fn readf32(&mut self) -> Result<f32, ReaderError> {
        self.take::<4>().map(f32::from_le_bytes)
    }

    /// Reads a null-terminated UTF-8 string. A missing terminator (EOF
    /// reached mid-string) is treated as "string ends at EOF", matching the
    /// Python loader's `while True: byte = readbin(1); if byte == b"": break`.
    pub fn readstr(&mut self) -> String {
        let mut buf = Vec::new();
        loop {
            match self.try_readu8() {
                None | Some(0) => break,
                Some(b) => buf.push(b),
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Inflates the remaining bytes via zlib and replaces the backing
    /// buffer, resetting the cursor to 0. A no-op when `compressed` is
    /// false. May only sensibly be called once per container.
    pub fn decompress(&mut self, compressed: bool, phase: &'static str) -> Result<(), ReaderError> {
        if !compressed {
            return Ok(());
        }
        let mut decoder = ZlibDecoder::new(&self.data[self.pos..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|source| ReaderError::InflateFailed { phase, source })?;
        self.data = out;
        self.pos = 0;
        Ok(())
    }
}

/// Inflates a standalone zlib stream (used outside the `BinReader`
/// decompression boundary, e.g. per-frame VID payloads and PDZ entries).
pub fn inflate(bytes: &[u8], phase: &'static str) -> Result<Vec<u8>, ReaderError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|source| ReaderError::InflateFailed { phase, source })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads_advance_cursor() {
        let mut r = BinReader::from_bytes(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x00]);
        assert_eq!(r.readu8().unwrap(), 0x01);
        assert_eq!(r.readu16().unwrap(), 0x0403);
        assert_eq!(r.tell(), 3);
    }

    #[test]
    fn short_read_is_distinguishable() {
        let mut r = BinReader::from_bytes(vec![0x01]);
        let err = r.readu32().unwrap_err();
        matches!(err, ReaderError::ShortRead { .. });
    }

    #[test]
    fn u8_at_eof_is_none_not_error() {
        let mut r = BinReader::from_bytes(vec![]);
        assert!(r.is_eof());
        assert_eq!(r.try_readu8(), None);
    }

    #[test]
    fn readstr_stops_at_nul() {
        let mut r = BinReader::from_bytes(b"hello\0world".to_vec());
        assert_eq!(r.readstr(), "hello");
        assert_eq!(r.readbin_all(), b"world");
    }

    #[test]
    fn align_advances_to_boundary() {
        let mut r = BinReader::from_bytes(vec![0; 16]);
        r.advance(5);
        r.align(4);
        assert_eq!(r.tell(), 8);
    }
}
