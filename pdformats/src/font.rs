//! FNT: a paged bitmap font. Page/glyph presence masks select which of up
//! to 512 pages of 256 codepoints each are actually stored; each glyph
//! carries advance width, kerning tables, and an embedded 1-bpp image cell.
//! Grounded on `loaders/pft.py`'s `PDFontPage`/`PDFontGlyph` for the page
//! bitmap/offset-list shape; the richer k8/k24 kerning split is this
//! format's own (the source's kerning table is a simpler flat scheme).

use std::collections::BTreeMap;

use image::RgbaImage;

use crate::container::{read_compressed_header, read_magic};
use crate::error::FontError;
use crate::image::Image;
use crate::reader::BinReader;

pub const MAGIC: &[u8] = b"Playdate FNT";

const PAGE_BITMAP_BITS: usize = 512;
const GLYPH_BITMAP_BITS: usize = 256;

#[derive(Debug)]
pub struct Glyph {
    pub codepoint: u32,
    pub advance: u8,
    /// Kerning applied when this glyph is immediately followed by the
    /// keyed codepoint.
    pub kerning: BTreeMap<u32, i8>,
    pub image: Image,
}

#[derive(Debug)]
pub struct Font {
    pub max_width: u8,
    pub max_height: u8,
    pub tracking: u16,
    pub glyphs: BTreeMap<u32, Glyph>,
}

fn bitmap_set_bits(bitmap: &[u8], count: usize) -> Vec<u16> {
    let mut out = Vec::new();
    for i in 0..count {
        let byte = bitmap.get(i / 8).copied().unwrap_or(0);
        if (byte >> (i % 8)) & 1 != 0 {
            out.push(i as u16);
        }
    }
    out
}

/// A coarse stand-in for Unicode categories Cc/Cf/Zl: no Unicode-category
/// table is available in this dependency stack, so only the handful of
/// codepoints that matter for text layout are recognised.
fn is_control_or_format(c: char) -> bool {
    if c.is_control() {
        return true;
    }
    matches!(
        c as u32,
        0x00AD | 0x200B..=0x200F | 0x202A..=0x202E | 0x2060..=0x2064 | 0xFEFF
    )
}

fn is_line_separator(c: char) -> bool {
    c == '\n' || c == '\r' || (c as u32) == 0x2028
}

impl Font {
    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, FontError> {
        read_magic(reader, "FNT", MAGIC, None, skip_magic)?;
        read_compressed_header(reader, "FNT compressed header")?;

        let max_width = reader.readu8()?;
        let max_height = reader.readu8()?;
        let tracking = reader.readu16()?;

        let page_bitmap = reader.readbin(PAGE_BITMAP_BITS / 8);
        let present_pages = bitmap_set_bits(&page_bitmap, PAGE_BITMAP_BITS);

        let mut page_offsets = vec![0u32];
        for _ in 0..present_pages.len() {
            page_offsets.push(reader.readu32()?);
        }
        let header_end = reader.tell();

        let mut glyphs = BTreeMap::new();
        for (idx, &page_num) in present_pages.iter().enumerate() {
            let start = page_offsets[idx];
            let end = page_offsets[idx + 1];
            if end < start {
                return Err(FontError::SizeMismatch {
                    page: idx,
                    start,
                    end,
                    len: reader.len() - header_end,
                });
            }
            reader.seekrelto(header_end, start as usize);
            Self::parse_page(reader, page_num, &mut glyphs)?;
        }

        Ok(Self {
            max_width,
            max_height,
            tracking,
            glyphs,
        })
    }

    fn parse_page(
        reader: &mut BinReader,
        page_num: u16,
        glyphs: &mut BTreeMap<u32, Glyph>,
    ) -> Result<(), FontError> {
        reader.advance(3);
        let num_glyphs = reader.readu8()? as usize;
        let glyph_bitmap = reader.readbin(GLYPH_BITMAP_BITS / 8);
        let present_glyphs = bitmap_set_bits(&glyph_bitmap, GLYPH_BITMAP_BITS);

        let mut glyph_offsets = vec![0u32];
        for _ in 0..num_glyphs {
            glyph_offsets.push(reader.readu16()? as u32);
        }
        reader.align(4);
        let glyphs_header_end = reader.tell();

        for i in 0..num_glyphs {
            let local_codepoint = present_glyphs.get(i).copied().unwrap_or(0) as u32;
            let codepoint = ((page_num as u32) << 8) | local_codepoint;

            let start = glyph_offsets[i];
            let end = glyph_offsets[i + 1];
            if end < start {
                return Err(FontError::SizeMismatch {
                    page: page_num as usize,
                    start,
                    end,
                    len: reader.len() - glyphs_header_end,
                });
            }
            reader.seekrelto(glyphs_header_end, start as usize);
            let glyph = Self::parse_glyph(reader, codepoint)?;
            glyphs.insert(codepoint, glyph);
        }

        Ok(())
    }

    fn parse_glyph(reader: &mut BinReader, codepoint: u32) -> Result<Glyph, FontError> {
        let mut advance = reader.readu8()?;
        let k8_count = reader.readu8()? as usize;
        let k24_count = reader.readu16()? as usize;

        let mut kerning = BTreeMap::new();
        for _ in 0..k8_count {
            let next = reader.readu8()? as u32;
            let kern = reader.reads8()?;
            kerning.insert(next, kern);
        }
        reader.align(4);
        for _ in 0..k24_count {
            let next = reader.readu24()?;
            let kern = reader.reads8()?;
            kerning.insert(next, kern);
        }

        let body = reader.readbin_all();
        let mut prefixed = Vec::with_capacity(4 + body.len());
        prefixed.extend_from_slice(&[0u8; 4]);
        prefixed.extend_from_slice(&body);
        let mut cell_reader = BinReader::from_bytes(prefixed);
        let image = Image::parse(&mut cell_reader, true)?;

        if advance == 0 {
            advance = image.width.min(u8::MAX as u16) as u8;
        }

        Ok(Glyph {
            codepoint,
            advance,
            kerning,
            image,
        })
    }

    pub fn get_glyph(&self, codepoint: u32) -> Result<&Glyph, FontError> {
        self.glyphs
            .get(&codepoint)
            .ok_or(FontError::NotFound { codepoint })
    }

    /// Sum of `tracking + 1 + advance` over each laid-out character, plus
    /// any kerning the preceding glyph declares for this codepoint.
    /// Stops at a line separator; skips control/format characters.
    pub fn get_width(&self, text: &str) -> Result<u32, FontError> {
        let mut total = 0u32;
        let mut prev: Option<&Glyph> = None;

        for c in text.chars() {
            if is_line_separator(c) {
                break;
            }
            if is_control_or_format(c) {
                continue;
            }
            let glyph = self.get_glyph(c as u32)?;
            if let Some(prev_glyph) = prev {
                if let Some(&kern) = prev_glyph.kerning.get(&(c as u32)) {
                    total = (total as i64 + kern as i64).max(0) as u32;
                }
            }
            total += self.tracking as u32 + 1 + glyph.advance as u32;
            prev = Some(glyph);
        }

        Ok(total)
    }

    /// Blits each line's glyphs onto a canvas sized to the widest line and
    /// `max_height` per line, honouring tracking and kerning.
    pub fn render(&self, text: &str, bw: bool) -> Result<RgbaImage, FontError> {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut widths = Vec::with_capacity(lines.len());
        for line in &lines {
            widths.push(self.get_width(line)?);
        }
        let canvas_width = widths.iter().copied().max().unwrap_or(0);
        let canvas_height = self.max_height as u32 * lines.len() as u32;

        let mut canvas = RgbaImage::new(canvas_width, canvas_height.max(1));

        for (row, line) in lines.iter().enumerate() {
            let mut x: i64 = 0;
            let mut prev: Option<&Glyph> = None;
            for c in line.chars() {
                if is_control_or_format(c) {
                    continue;
                }
                let glyph = self.get_glyph(c as u32)?;
                if let Some(prev_glyph) = prev {
                    if let Some(&kern) = prev_glyph.kerning.get(&(c as u32)) {
                        x += kern as i64;
                    }
                }
                let glyph_img = glyph.image.to_rgba_image(bw);
                image::imageops::overlay(&mut canvas, &glyph_img, x, row as i64 * self.max_height as i64);
                x += self.tracking as i64 + 1 + glyph.advance as i64;
                prev = Some(glyph);
            }
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_bytes(width: u16, height: u16, fill: u8) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&width.to_le_bytes());
        b.extend_from_slice(&height.to_le_bytes());
        b.extend_from_slice(&width.div_ceil(8).to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        for _ in 0..height {
            b.push(fill);
        }
        b
    }

    #[test]
    fn single_page_single_glyph() {
        let glyph_img = image_bytes(8, 1, 0x00);

        let mut glyph_body = Vec::new();
        glyph_body.push(5u8); // advance
        glyph_body.push(0u8); // k8_count
        glyph_body.extend_from_slice(&0u16.to_le_bytes()); // k24_count
        // align(4) from offset 4 is already aligned
        glyph_body.extend_from_slice(&glyph_img);

        let mut page_body = Vec::new();
        page_body.extend_from_slice(&[0u8; 3]); // skip
        page_body.push(1u8); // num_glyphs
        let mut glyph_bitmap = vec![0u8; 32];
        glyph_bitmap[8] = 0x02; // local codepoint 65 ('A') present
        page_body.extend_from_slice(&glyph_bitmap);
        page_body.extend_from_slice(&(glyph_body.len() as u16).to_le_bytes());
        while page_body.len() % 4 != 0 {
            page_body.push(0);
        }
        page_body.extend_from_slice(&glyph_body);

        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate FNT");
        body.extend_from_slice(&0u32.to_le_bytes()); // uncompressed
        body.push(8u8); // max_width
        body.push(10u8); // max_height
        body.extend_from_slice(&1u16.to_le_bytes()); // tracking
        let mut page_bitmap = vec![0u8; 64];
        page_bitmap[0] = 0x01; // page 0 present
        body.extend_from_slice(&page_bitmap);
        body.extend_from_slice(&(page_body.len() as u32).to_le_bytes());
        body.extend_from_slice(&page_body);

        let mut r = BinReader::from_bytes(body);
        let font = Font::parse(&mut r, false).unwrap();
        let glyph = font.get_glyph(65).unwrap();
        assert_eq!(glyph.advance, 5);
        assert_eq!(font.get_width("A").unwrap(), 1 + 1 + 5);
    }

    #[test]
    fn missing_glyph_is_not_found() {
        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate FNT");
        body.extend_from_slice(&0u32.to_le_bytes());
        body.push(8u8);
        body.push(10u8);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&vec![0u8; 64]); // no pages present
        let mut r = BinReader::from_bytes(body);
        let font = Font::parse(&mut r, false).unwrap();
        assert!(font.get_glyph(65).is_err());
    }
}
