//! IMG: 1-bpp pixel plane plus optional 1-bpp alpha plane, offset by a clip
//! rectangle. Grounded on `loaders/pdi.py`'s `PDImageFile`.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::container::{read_compressed_header, read_magic};
use crate::error::ImageError;
use crate::reader::BinReader;

pub const MAGIC: &[u8] = b"Playdate IMG";

/// Device palette recorded by the original loader (`PDI_PALETTE`).
pub const DEVICE_BLACK: [u8; 3] = [0x32, 0x2f, 0x28];
pub const DEVICE_WHITE: [u8; 3] = [0xb1, 0xae, 0xa7];
/// Pure black/white alternative (`PDI_BW_PALETTE`).
pub const BW_BLACK: [u8; 3] = [0x00, 0x00, 0x00];
pub const BW_WHITE: [u8; 3] = [0xff, 0xff, 0xff];

#[derive(Debug, Clone)]
pub struct Image {
    pub width: u16,
    pub height: u16,
    pub stride: u16,
    pub clip_l: u16,
    pub clip_r: u16,
    pub clip_t: u16,
    pub clip_b: u16,
    pub has_alpha: bool,
    pub stored_width: usize,
    pub stored_height: usize,
    /// Palette indices 0..=3: bit 0 colour (0 black, 1 white), bit 1
    /// opacity (0 transparent, 1 opaque).
    pub pixels: Vec<Vec<u8>>,
    /// Raw bytes of the image body (header onward), retained for P-frame
    /// XOR reconstruction in the video decoder.
    pub raw: Vec<u8>,
}

impl Image {
    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, ImageError> {
        read_magic(reader, "IMG", MAGIC, None, skip_magic)?;
        read_compressed_header(reader, "IMG compressed header")?;
        Self::parse_header_and_body(reader)
    }

    fn parse_header_and_body(reader: &mut BinReader) -> Result<Self, ImageError> {
        let width = reader.readu16()?;
        let height = reader.readu16()?;
        let stride = reader.readu16()?;
        let clip_l = reader.readu16()?;
        let clip_r = reader.readu16()?;
        let clip_t = reader.readu16()?;
        let clip_b = reader.readu16()?;
        let flags = reader.readu16()?;
        let has_alpha = flags & 0x3 != 0;

        let data_start = reader.tell();
        let raw = reader.readbin_all();
        reader.seek(data_start);

        let should_alpha = clip_l != 0 || clip_r != 0 || clip_t != 0 || clip_b != 0;
        let stored_width = width as usize + clip_l as usize + clip_r as usize;
        let stored_height = height as usize + clip_t as usize + clip_b as usize;

        let mut pixels = vec![vec![0u8; stored_width]; stored_height];

        for y in (clip_t as usize)..(clip_t as usize + height as usize) {
            let row = reader.readbin(stride as usize);
            for x in (clip_l as usize)..(clip_l as usize + width as usize) {
                let x_rel = x - clip_l as usize;
                let byte = row.get(x_rel / 8).copied().unwrap_or(0);
                let bit = (byte >> (7 - (x_rel % 8))) & 1;
                // Opaque by default; the alpha-plane pass below clears and
                // recomputes bit 1 when there's an actual alpha plane.
                pixels[y][x] = bit | 0x2;
            }
        }

        if has_alpha || should_alpha {
            for y in (clip_t as usize)..(clip_t as usize + height as usize) {
                let row = if has_alpha {
                    let mut row = reader.readbin(stride as usize);
                    row.resize(stride as usize, 0);
                    Some(row)
                } else {
                    None
                };

                for x in (clip_l as usize)..(clip_l as usize + width as usize) {
                    let x_rel = x - clip_l as usize;
                    pixels[y][x] &= 0x1;
                    if let Some(ref row) = row {
                        let byte = row.get(x_rel / 8).copied().unwrap_or(0);
                        let bit = (byte >> (7 - (x_rel % 8))) & 1;
                        pixels[y][x] |= bit << 1;
                    } else {
                        pixels[y][x] |= 0x2;
                    }
                }
            }
        }

        Ok(Self {
            width,
            height,
            stride,
            clip_l,
            clip_r,
            clip_t,
            clip_b,
            has_alpha,
            stored_width,
            stored_height,
            pixels,
            raw,
        })
    }

    /// Synthesises a headerless image from a raw 1-bpp payload, used by the
    /// video decoder for I/P-frame reconstruction. Mirrors
    /// `PDImageFile.from_bytes`.
    pub fn from_bytes(data: &[u8], width: u16, height: u16, has_alpha: bool) -> Result<Self, ImageError> {
        let stride = width.div_ceil(8);
        let mut buf = Vec::with_capacity(20 + data.len());
        buf.extend_from_slice(&0u32.to_le_bytes()); // file-flags stand-in: uncompressed
        buf.extend_from_slice(&width.to_le_bytes());
        buf.extend_from_slice(&height.to_le_bytes());
        buf.extend_from_slice(&stride.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        let image_flags: u16 = if has_alpha { 0x3 } else { 0x0 };
        buf.extend_from_slice(&image_flags.to_le_bytes());
        buf.extend_from_slice(data);

        let mut reader = BinReader::from_bytes(buf);
        Self::parse(&mut reader, true)
    }

    fn rgba_for(&self, value: u8, bw: bool) -> Rgba<u8> {
        let (black, white) = if bw {
            (BW_BLACK, BW_WHITE)
        } else {
            (DEVICE_BLACK, DEVICE_WHITE)
        };
        let color = if value & 1 != 0 { white } else { black };
        let alpha = if self.has_alpha {
            if value & 2 != 0 { 255 } else { 0 }
        } else {
            255
        };
        Rgba([color[0], color[1], color[2], alpha])
    }

    pub fn to_rgba_image(&self, bw: bool) -> RgbaImage {
        let mut img = RgbaImage::new(self.stored_width as u32, self.stored_height as u32);
        for (y, row) in self.pixels.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                img.put_pixel(x as u32, y as u32, self.rgba_for(value, bw));
            }
        }
        img
    }

    /// PNG emission via the `image` crate.
    pub fn encode_png(&self, bw: bool) -> Result<Vec<u8>, ImageError> {
        let rgba = self.to_rgba_image(bw);
        let mut out = Cursor::new(Vec::new());
        rgba.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| ImageError::BadFormat {
                offset: 0,
                detail: format!("PNG encode failed: {e}"),
            })?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_8x1_black() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"Playdate IMG");
        b.extend_from_slice(&0u32.to_le_bytes()); // uncompressed file flags
        b.extend_from_slice(&8u16.to_le_bytes()); // width
        b.extend_from_slice(&1u16.to_le_bytes()); // height
        b.extend_from_slice(&1u16.to_le_bytes()); // stride
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_l
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_r
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_t
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_b
        b.extend_from_slice(&0u16.to_le_bytes()); // image flags
        b.push(0x00); // all-black row, 8 bits
        b
    }

    #[test]
    fn scenario_minimal_8x1_black_pixel() {
        let mut r = BinReader::from_bytes(minimal_8x1_black());
        let img = Image::parse(&mut r, false).unwrap();
        assert_eq!(img.pixels, vec![vec![2u8; 8]]);
    }

    #[test]
    fn opaque_white_pixel_with_no_clip_or_alpha_is_three() {
        let mut b = Vec::new();
        b.extend_from_slice(b"Playdate IMG");
        b.extend_from_slice(&0u32.to_le_bytes()); // uncompressed file flags
        b.extend_from_slice(&8u16.to_le_bytes()); // width
        b.extend_from_slice(&1u16.to_le_bytes()); // height
        b.extend_from_slice(&1u16.to_le_bytes()); // stride
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_l
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_r
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_t
        b.extend_from_slice(&0u16.to_le_bytes()); // clip_b
        b.extend_from_slice(&0u16.to_le_bytes()); // image flags, no alpha plane
        b.push(0xff); // all-white row, 8 bits

        let mut r = BinReader::from_bytes(b);
        let img = Image::parse(&mut r, false).unwrap();
        assert_eq!(img.pixels, vec![vec![3u8; 8]]);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut r = BinReader::from_bytes(b"Playdate XXX".to_vec());
        assert!(Image::parse(&mut r, false).is_err());
    }

    #[test]
    fn clip_conservation() {
        let mut b = Vec::new();
        b.extend_from_slice(b"Playdate IMG");
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&8u16.to_le_bytes()); // width
        b.extend_from_slice(&1u16.to_le_bytes()); // height
        b.extend_from_slice(&1u16.to_le_bytes()); // stride
        b.extend_from_slice(&2u16.to_le_bytes()); // clip_l
        b.extend_from_slice(&3u16.to_le_bytes()); // clip_r
        b.extend_from_slice(&1u16.to_le_bytes()); // clip_t
        b.extend_from_slice(&1u16.to_le_bytes()); // clip_b
        b.extend_from_slice(&0u16.to_le_bytes());
        b.push(0xff);

        let mut r = BinReader::from_bytes(b);
        let img = Image::parse(&mut r, false).unwrap();
        assert_eq!(img.stored_width, 8 + 2 + 3);
        assert_eq!(img.stored_height, 1 + 1 + 1);
        assert_eq!(img.pixels.len(), img.stored_height);
        for row in &img.pixels {
            assert_eq!(row.len(), img.stored_width);
        }
        // top/bottom clip rows are all zero
        assert_eq!(img.pixels[0], vec![0u8; img.stored_width]);
        assert_eq!(img.pixels[2], vec![0u8; img.stored_width]);
        // left/right clip columns on the content row are zero
        assert_eq!(img.pixels[1][0], 0);
        assert_eq!(img.pixels[1][1], 0);
        assert_eq!(img.pixels[1][img.stored_width - 1], 0);
    }

    #[test]
    fn from_bytes_roundtrips_raw() {
        let data = vec![0xAAu8; 1];
        let img = Image::from_bytes(&data, 8, 1, false).unwrap();
        assert_eq!(img.width, 8);
        assert_eq!(img.height, 1);
    }
}
