//! PDZ: a flat stream of typed, optionally-compressed entries materialised
//! into an ordered directory tree. Grounded on `loaders/pdz.py`'s
//! `PDZipEntry`/`PDZipFile`, with the directory/file sum type replacing the
//! original's dynamically-typed dict-of-dicts.

use std::collections::HashSet;

use crate::audio::Audio;
use crate::error::ArchiveError;
use crate::font::Font;
use crate::image::Image;
use crate::image_table::ImageTable;
use crate::reader::{inflate, BinReader};
use crate::strings::Strings;
use crate::video::Video;

pub const MAGIC: &[u8] = b"Playdate PDZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    None = 0,
    Lua = 1,
    Image = 2,
    ImageTable = 3,
    Video = 4,
    Audio = 5,
    Strings = 6,
    Font = 7,
}

impl EntryKind {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::None,
            1 => Self::Lua,
            2 => Self::Image,
            3 => Self::ImageTable,
            4 => Self::Video,
            5 => Self::Audio,
            6 => Self::Strings,
            7 => Self::Font,
            _ => return None,
        })
    }
}

#[derive(Debug)]
pub enum Payload {
    Raw(Vec<u8>),
    Image(Image),
    ImageTable(ImageTable),
    Video(Video),
    Audio(Audio),
    Strings(Strings),
    Font(Font),
}

#[derive(Debug)]
pub enum Entry {
    Dir(Vec<(String, Entry)>),
    File(Payload),
}

#[derive(Debug, Default)]
pub struct Archive {
    root: Vec<(String, Entry)>,
    imported: HashSet<String>,
}

fn path_components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

impl Archive {
    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, ArchiveError> {
        if !skip_magic {
            reader.advance(MAGIC.len());
            reader.advance(4); // file-flags word, like every other container's 16-byte header
        }

        let mut archive = Self::default();

        while let Some(flags) = reader.try_readu8() {
            let compressed = flags & 0x80 != 0;
            let tag = flags & 0x7f;
            let kind = EntryKind::from_tag(tag).ok_or_else(|| ArchiveError::BadFormat {
                name: String::new(),
                offset: reader.tell(),
                tag,
            })?;

            let length = reader.readu24()? as usize;
            let name = reader.readstr();
            reader.align(4);

            let raw = reader.readbin(length);
            let payload = Self::decode_payload(kind, compressed, &name, &raw)?;
            archive.add_file(&name, payload);
        }

        Ok(archive)
    }

    fn decode_payload(
        kind: EntryKind,
        compressed: bool,
        name: &str,
        raw: &[u8],
    ) -> Result<Payload, ArchiveError> {
        Ok(match kind {
            EntryKind::None => Payload::Raw(raw.to_vec()),
            EntryKind::Lua => Payload::Raw(raw.to_vec()),
            EntryKind::Image => {
                let body = Self::resolve_body(name, raw, compressed, false)?;
                let prefixed = prefix4(&body);
                let mut r = BinReader::from_bytes(prefixed);
                Payload::Image(Image::parse(&mut r, true)?)
            }
            EntryKind::ImageTable => {
                let body = Self::resolve_body(name, raw, compressed, false)?;
                let prefixed = prefix4(&body);
                let mut r = BinReader::from_bytes(prefixed);
                Payload::ImageTable(ImageTable::parse(&mut r, true)?)
            }
            EntryKind::Video => {
                let body = Self::resolve_body(name, raw, compressed, false)?;
                let prefixed = prefix4(&body);
                let mut r = BinReader::from_bytes(prefixed);
                Payload::Video(Video::parse(&mut r, true)?)
            }
            EntryKind::Audio => {
                let body = Self::resolve_body(name, raw, compressed, true)?;
                let mut r = BinReader::from_bytes(body);
                Payload::Audio(Audio::parse(&mut r, true)?)
            }
            EntryKind::Strings => {
                let body = Self::resolve_body(name, raw, compressed, false)?;
                let prefixed = prefix4(&body);
                let mut r = BinReader::from_bytes(prefixed);
                Payload::Strings(Strings::parse(&mut r, true)?)
            }
            EntryKind::Font => {
                let body = Self::resolve_body(name, raw, compressed, false)?;
                let prefixed = prefix4(&body);
                let mut r = BinReader::from_bytes(prefixed);
                Payload::Font(Font::parse(&mut r, true)?)
            }
        })
    }

    /// When `compressed`, peels off the declared-size prefix (after the
    /// audio format's 4-byte raw head, for AUD) and inflates the remainder,
    /// validating against the declared size. When not compressed, `raw`
    /// already is the body.
    fn resolve_body(
        name: &str,
        raw: &[u8],
        compressed: bool,
        is_audio: bool,
    ) -> Result<Vec<u8>, ArchiveError> {
        if !compressed {
            return Ok(raw.to_vec());
        }

        if is_audio {
            let head = &raw[..4];
            let declared = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
            let inflated = inflate(&raw[8..], "PDZ audio entry")?;
            if inflated.len() != declared as usize {
                return Err(ArchiveError::SizeMismatch {
                    name: name.to_string(),
                    declared,
                    actual: inflated.len(),
                });
            }
            let mut out = Vec::with_capacity(4 + inflated.len());
            out.extend_from_slice(head);
            out.extend_from_slice(&inflated);
            Ok(out)
        } else {
            let declared = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            let inflated = inflate(&raw[4..], "PDZ entry")?;
            if inflated.len() != declared as usize {
                return Err(ArchiveError::SizeMismatch {
                    name: name.to_string(),
                    declared,
                    actual: inflated.len(),
                });
            }
            Ok(inflated)
        }
    }

    pub fn add_file(&mut self, path: &str, payload: Payload) {
        let components = path_components(path);
        if components.is_empty() {
            return;
        }
        let (dirs, filename) = components.split_at(components.len() - 1);
        let dir = Self::ensure_dir(&mut self.root, dirs);
        if let Some(pos) = dir.iter().position(|(n, _)| n == filename[0]) {
            dir[pos].1 = Entry::File(payload);
        } else {
            dir.push((filename[0].to_string(), Entry::File(payload)));
        }
    }

    fn ensure_dir<'a>(
        tree: &'a mut Vec<(String, Entry)>,
        components: &[&str],
    ) -> &'a mut Vec<(String, Entry)> {
        let mut current = tree;
        for &component in components {
            let pos = current.iter().position(|(n, _)| n == component);
            let idx = match pos {
                Some(i) => i,
                None => {
                    current.push((component.to_string(), Entry::Dir(Vec::new())));
                    current.len() - 1
                }
            };
            match &mut current[idx].1 {
                Entry::Dir(sub) => current = sub,
                Entry::File(_) => {
                    current[idx].1 = Entry::Dir(Vec::new());
                    match &mut current[idx].1 {
                        Entry::Dir(sub) => current = sub,
                        Entry::File(_) => unreachable!(),
                    }
                }
            }
        }
        current
    }

    pub fn get_file(&self, path: &str) -> Result<&Payload, ArchiveError> {
        let components = path_components(path);
        let mut current = &self.root;
        for (i, &component) in components.iter().enumerate() {
            let entry = current
                .iter()
                .find(|(n, _)| n == component)
                .map(|(_, e)| e)
                .ok_or_else(|| ArchiveError::NotFound(component.to_string()))?;
            if i == components.len() - 1 {
                return match entry {
                    Entry::File(payload) => Ok(payload),
                    Entry::Dir(_) => Err(ArchiveError::NotFound(path.to_string())),
                };
            }
            match entry {
                Entry::Dir(sub) => current = sub,
                Entry::File(_) => return Err(ArchiveError::NotFound(component.to_string())),
            }
        }
        Err(ArchiveError::NotFound(path.to_string()))
    }

    /// Marks a Lua entry's path as imported; returns `true` the first time
    /// a given path is marked, `false` on any subsequent call.
    pub fn mark_imported(&mut self, path: &str) -> bool {
        self.imported.insert(path.to_string())
    }

    /// The top-level directory tree, in first-seen order. For callers (the
    /// CLI's `info` subcommand) that want to walk the structure without
    /// materialising it.
    pub fn tree(&self) -> &[(String, Entry)] {
        &self.root
    }

    /// Walks the tree in first-seen order, materialising each non-directory
    /// entry to `(relative_path_with_extension, bytes)`. Image tables expand
    /// to multiple outputs; everything else yields exactly one.
    pub fn materialize(&self, bw: bool) -> Result<Vec<(String, Vec<u8>)>, ArchiveError> {
        let mut out = Vec::new();
        Self::materialize_dir(&self.root, "", bw, &mut out)?;
        Ok(out)
    }

    fn materialize_dir(
        dir: &[(String, Entry)],
        prefix: &str,
        bw: bool,
        out: &mut Vec<(String, Vec<u8>)>,
    ) -> Result<(), ArchiveError> {
        for (name, entry) in dir {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            match entry {
                Entry::Dir(sub) => Self::materialize_dir(sub, &path, bw, out)?,
                Entry::File(payload) => {
                    for (suffix, ext, bytes) in Self::materialize_payload(payload, bw)? {
                        out.push((format!("{path}{suffix}{ext}"), bytes));
                    }
                }
            }
        }
        Ok(())
    }

    fn materialize_payload(
        payload: &Payload,
        bw: bool,
    ) -> Result<Vec<(String, &'static str, Vec<u8>)>, ArchiveError> {
        Ok(match payload {
            Payload::Raw(bytes) => vec![(String::new(), ".luac", bytes.clone())],
            Payload::Image(img) => vec![(String::new(), ".png", img.encode_png(bw)?)],
            Payload::ImageTable(table) => {
                if table.is_matrix {
                    vec![(String::new(), ".png", table.encode_png_combined(bw)?)]
                } else {
                    table
                        .encode_png_per_cell(bw)?
                        .into_iter()
                        .enumerate()
                        .map(|(i, bytes)| (format!("-frame{i}"), ".png", bytes))
                        .collect()
                }
            }
            Payload::Video(video) => {
                vec![(String::new(), ".gif", video.encode_gif(bw)?)]
            }
            Payload::Audio(audio) => vec![(String::new(), ".wav", audio.encode_wav())],
            Payload::Strings(strings) => {
                let json = strings
                    .to_json_string()
                    .unwrap_or_default()
                    .into_bytes();
                vec![(String::new(), ".json", json)]
            }
            // Fonts have no single-file transcoded target — `render` needs
            // text to rasterise and is exposed on `Font` directly instead.
            Payload::Font(_font) => Vec::new(),
        })
    }
}

fn prefix4(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn one_entry_strings_archive() {
        let inner = {
            let mut b = Vec::new();
            b.extend_from_slice(&2u32.to_le_bytes()); // num_keys
            b.extend_from_slice(&6u32.to_le_bytes()); // offset[1]
            b.extend_from_slice(b"a\0");
            b.extend_from_slice(b"1\0");
            b.extend_from_slice(b"b\0");
            b.extend_from_slice(b"2\0");
            b
        };
        let compressed_inner = zlib(&inner);

        let mut entry_data = Vec::new();
        entry_data.extend_from_slice(&(inner.len() as u32).to_le_bytes());
        entry_data.extend_from_slice(&compressed_inner);

        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate PDZ");
        body.extend_from_slice(&0u32.to_le_bytes()); // file-flags word
        let flags = 0x80 | 6u8; // compressed, STR tag
        body.push(flags);
        let length = entry_data.len() as u32;
        body.push((length & 0xff) as u8);
        body.push(((length >> 8) & 0xff) as u8);
        body.push(((length >> 16) & 0xff) as u8);
        body.extend_from_slice(b"a/b.pds\0");
        while body.len() % 4 != 0 {
            body.push(0);
        }
        body.extend_from_slice(&entry_data);

        let mut r = BinReader::from_bytes(body);
        let archive = Archive::parse(&mut r, false).unwrap();

        match archive.get_file("a/b.pds").unwrap() {
            Payload::Strings(s) => {
                assert_eq!(s.get("a"), Some("1"));
                assert_eq!(s.get("b"), Some("2"));
            }
            _ => panic!("expected strings payload"),
        }

        assert!(archive.get_file("a/c").is_err());
    }
}
