//! IMT: an ordered collection of IMG cells keyed by either sequential or
//! row/column geometry. Grounded on `loaders/pdt.py`'s `PDImageTableFile`.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::container::{read_compressed_header, read_magic};
use crate::error::{ImageError, ImageTableError};
use crate::image::Image;
use crate::reader::BinReader;

pub const MAGIC: &[u8] = b"Playdate IMT";

#[derive(Debug)]
pub struct ImageTable {
    pub num_images: u16,
    pub num_per_row: u16,
    pub num_rows: u16,
    pub is_matrix: bool,
    /// Row-major: `cells[row][col]`.
    pub cells: Vec<Vec<Image>>,
}

impl ImageTable {
    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, ImageTableError> {
        read_magic(reader, "IMT", MAGIC, None, skip_magic)?;
        read_compressed_header(reader, "IMT compressed header")?;

        let num_images = reader.readu16()?;
        let num_per_row = reader.readu16()?;

        let is_matrix = num_per_row != 0 && num_per_row != num_images;
        let num_rows = if is_matrix {
            num_images / num_per_row
        } else {
            1
        };

        // The N stored offsets double as per-cell end-offsets over an
        // implicit leading zero (no separately stored trailing offset).
        let mut offsets = vec![0u32];
        for _ in 0..num_images {
            offsets.push(reader.readu32()?);
        }
        let header_end = reader.tell();

        // `num_per_row` is the row stride even outside matrix mode (a
        // sequential table has `num_per_row == num_images`, so this still
        // walks every cell); a `num_per_row` of 0 yields an empty table.
        let mut cells = Vec::with_capacity(num_rows as usize);
        for y in 0..num_rows {
            let mut row = Vec::with_capacity(num_per_row as usize);
            for x in 0..num_per_row {
                let idx = (y * num_per_row + x) as usize;
                let start = offsets[idx];
                let end = offsets[idx + 1];
                if end < start {
                    return Err(ImageTableError::SizeMismatch {
                        index: idx,
                        start,
                        end,
                        len: reader.len() - header_end,
                    });
                }
                reader.seekrelto(header_end, start as usize);
                let body = reader.readbin((end - start) as usize);

                let mut prefixed = Vec::with_capacity(4 + body.len());
                prefixed.extend_from_slice(&[0u8; 4]);
                prefixed.extend_from_slice(&body);
                let mut cell_reader = BinReader::from_bytes(prefixed);
                row.push(Image::parse(&mut cell_reader, true)?);
            }
            cells.push(row);
        }

        Ok(Self {
            num_images,
            num_per_row,
            num_rows,
            is_matrix,
            cells,
        })
    }

    /// Row-major flat listing of every cell.
    pub fn to_list(&self) -> Vec<&Image> {
        self.cells.iter().flat_map(|row| row.iter()).collect()
    }

    /// One PNG per cell, in `to_list` order.
    pub fn encode_png_per_cell(&self, bw: bool) -> Result<Vec<Vec<u8>>, ImageError> {
        self.to_list().iter().map(|img| img.encode_png(bw)).collect()
    }

    /// A single PNG tiling every cell onto a `num_per_row x num_rows` grid,
    /// using the first cell's dimensions as the tile pitch.
    pub fn encode_png_combined(&self, bw: bool) -> Result<Vec<u8>, ImageError> {
        let (tile_w, tile_h) = self
            .cells
            .first()
            .and_then(|row| row.first())
            .map(|c| (c.stored_width as u32, c.stored_height as u32))
            .unwrap_or((0, 0));

        let mut canvas = RgbaImage::new(tile_w * self.num_per_row as u32, tile_h * self.num_rows as u32);
        for (y, row) in self.cells.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let tile = cell.to_rgba_image(bw);
                image::imageops::overlay(&mut canvas, &tile, (x as u32 * tile_w) as i64, (y as u32 * tile_h) as i64);
            }
        }

        let mut out = Cursor::new(Vec::new());
        canvas
            .write_to(&mut out, ImageFormat::Png)
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
    fn sequential_table_parses_in_order() {
        let cell0 = image_bytes(8, 1, 0x00);
        let cell1 = image_bytes(8, 1, 0xff);

        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate IMT");
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&2u16.to_le_bytes()); // num_images
        body.extend_from_slice(&2u16.to_le_bytes()); // num_per_row == num_images -> sequential
        let offset0 = cell0.len() as u32;
        let offset1 = offset0 + cell1.len() as u32;
        body.extend_from_slice(&offset0.to_le_bytes());
        body.extend_from_slice(&offset1.to_le_bytes());
        body.extend_from_slice(&cell0);
        body.extend_from_slice(&cell1);

        let mut r = BinReader::from_bytes(body);
        let table = ImageTable::parse(&mut r, false).unwrap();
        assert!(!table.is_matrix);
        assert_eq!(table.num_rows, 1);
        let list = table.to_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].pixels[0][0], 2); // black
        assert_eq!(list[1].pixels[0][0], 3); // white
    }
}
