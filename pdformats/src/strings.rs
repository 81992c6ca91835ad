//! STR: an insertion-ordered key-value table. Grounded on
//! `loaders/pds.py`'s `PDStringsFile`.

use crate::container::{read_compressed_header, read_magic};
use crate::error::StringsError;
use crate::reader::BinReader;

pub const MAGIC: &[u8] = b"Playdate STR";

#[derive(Debug, Default)]
pub struct Strings {
    /// First-seen insertion order, so dumps are deterministic.
    entries: Vec<(String, String)>,
}

impl Strings {
    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, StringsError> {
        read_magic(reader, "STR", MAGIC, None, skip_magic)?;
        read_compressed_header(reader, "STR compressed header")?;

        let num_keys = reader.readu32()?;
        let mut offsets = vec![0u32];
        for _ in 0..num_keys.saturating_sub(1) {
            offsets.push(reader.readu32()?);
        }
        let header_end = reader.tell();

        let mut entries = Vec::with_capacity(offsets.len());
        for &offset in &offsets {
            reader.seekrelto(header_end, offset as usize);
            let key = reader.readstr();
            let value = reader.readstr();
            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            map.insert(k.clone(), serde_json::Value::String(v.clone()));
        }
        serde_json::Value::Object(map)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_json())
    }

    /// `.strings`-style `"key" = "value";` text dump, insertion order.
    pub fn to_strings_text(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.entries {
            out.push('"');
            out.push_str(&k.replace('"', "\\\""));
            out.push_str("\" = \"");
            out.push_str(&v.replace('"', "\\\""));
            out.push_str("\";\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_entry_table_preserves_order() {
        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate STR");
        body.extend_from_slice(&0u32.to_le_bytes()); // uncompressed
        body.extend_from_slice(&2u32.to_le_bytes()); // num_keys

        let rec0 = b"zkey\0zvalue\0";
        let rec1 = b"akey\0avalue\0";
        let offset1 = rec0.len() as u32;
        body.extend_from_slice(&offset1.to_le_bytes());
        body.extend_from_slice(rec0);
        body.extend_from_slice(rec1);

        let mut r = BinReader::from_bytes(body);
        let strings = Strings::parse(&mut r, false).unwrap();
        assert_eq!(strings.len(), 2);
        let list: Vec<_> = strings.iter().collect();
        assert_eq!(list[0], ("zkey", "zvalue"));
        assert_eq!(list[1], ("akey", "avalue"));
        assert_eq!(strings.get("akey"), Some("avalue"));
        assert_eq!(strings.get("missing"), None);
    }
}
