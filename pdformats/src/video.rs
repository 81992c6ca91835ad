//! VID: a sequence of I/P/combined frames, each independently
//! zlib-compressed, reconstructed via XOR against the previous frame.
//! Grounded on `loaders/pdv.py`'s `PDVideoFile`.

use std::io::Cursor;
use std::time::Duration;

use image::codecs::gif::GifEncoder;
use image::{Delay, Frame as GifFrame};

use crate::container::read_magic;
use crate::error::VideoError;
use crate::image::Image;
use crate::reader::{inflate, BinReader};

pub const MAGIC: &[u8] = b"Playdate VID";

const FRAME_NONE: u32 = 0;
const FRAME_IFRAME: u32 = 1;
const FRAME_PFRAME: u32 = 2;
const FRAME_COMBINED: u32 = 3;

#[derive(Debug)]
pub struct Video {
    pub num_frames: u16,
    pub framerate: f32,
    pub width: u16,
    pub height: u16,
    pub frames: Vec<Image>,
}

impl Video {
    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, VideoError> {
        read_magic(reader, "VID", MAGIC, None, skip_magic)?;

        reader.advance(4); // reserved file-flags word; VID compresses per-frame, not as a whole
        let num_frames = reader.readu16()?;
        reader.advance(2);
        let framerate = reader.readf32()?;
        let width = reader.readu16()?;
        let height = reader.readu16()?;

        let mut offsets = Vec::with_capacity(num_frames as usize + 1);
        let mut kinds = Vec::with_capacity(num_frames as usize + 1);
        for _ in 0..=num_frames {
            let value = reader.readu32()?;
            offsets.push(value >> 2);
            kinds.push(value & 0x3);
        }
        let header_end = reader.tell();

        let mut frames: Vec<Image> = Vec::with_capacity(num_frames as usize);
        for i in 0..num_frames as usize {
            let start = offsets[i] as usize;
            let end = offsets[i + 1] as usize;
            reader.seekrelto(header_end, start);
            let compressed = reader.readbin(end.saturating_sub(start));
            let payload = inflate(&compressed, "VID frame")?;

            let frame = match kinds[i] {
                FRAME_IFRAME => Image::from_bytes(&payload, width, height, false)?,
                FRAME_PFRAME => {
                    let prev = frames.last().ok_or_else(|| VideoError::BadFormat {
                        index: i,
                        offset: start,
                        detail: "P-frame has no preceding frame".into(),
                    })?;
                    if payload.len() != prev.raw.len() {
                        return Err(VideoError::SizeMismatch {
                            index: i,
                            inflated: payload.len(),
                            reference: prev.raw.len(),
                        });
                    }
                    let xored: Vec<u8> = payload
                        .iter()
                        .zip(prev.raw.iter())
                        .map(|(a, b)| a ^ b)
                        .collect();
                    Image::from_bytes(&xored, width, height, false)?
                }
                FRAME_COMBINED => {
                    if payload.len() < 2 {
                        return Err(VideoError::BadFormat {
                            index: i,
                            offset: start,
                            detail: "combined frame shorter than its length prefix".into(),
                        });
                    }
                    let iframe_len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
                    if 2 + iframe_len > payload.len() {
                        return Err(VideoError::BadFormat {
                            index: i,
                            offset: start,
                            detail: "combined frame I-slice exceeds payload".into(),
                        });
                    }
                    let i_slice = &payload[2..2 + iframe_len];
                    let p_bytes = &payload[2 + iframe_len..];
                    let pframe = Image::from_bytes(p_bytes, width, height, false)?;
                    if i_slice.len() != pframe.raw.len() {
                        return Err(VideoError::SizeMismatch {
                            index: i,
                            inflated: i_slice.len(),
                            reference: pframe.raw.len(),
                        });
                    }
                    let xored: Vec<u8> = i_slice
                        .iter()
                        .zip(pframe.raw.iter())
                        .map(|(a, b)| a ^ b)
                        .collect();
                    Image::from_bytes(&xored, width, height, false)?
                }
                FRAME_NONE | _ => {
                    return Err(VideoError::BadFormat {
                        index: i,
                        offset: start,
                        detail: format!("unexpected frame kind {}", kinds[i]),
                    });
                }
            };

            frames.push(frame);
        }

        Ok(Self {
            num_frames,
            framerate,
            width,
            height,
            frames,
        })
    }

    /// GIF emission via `image::codecs::gif::GifEncoder`, frame duration
    /// `round(1000 / framerate)` ms.
    pub fn encode_gif(&self, bw: bool) -> Result<Vec<u8>, VideoError> {
        let delay_ms = (1000.0 / self.framerate as f64).round().max(0.0) as u32;

        let mut out = Cursor::new(Vec::new());
        {
            let mut encoder = GifEncoder::new(&mut out);
            let gif_frames: Vec<GifFrame> = self
                .frames
                .iter()
                .map(|img| {
                    GifFrame::from_parts(
                        img.to_rgba_image(bw),
                        0,
                        0,
                        Delay::from_saturating_duration(Duration::from_millis(delay_ms as u64)),
                    )
                })
                .collect();
            encoder
                .encode_frames(gif_frames)
                .map_err(|e| VideoError::BadFormat {
                    index: 0,
                    offset: 0,
                    detail: format!("GIF encode failed: {e}"),
                })?;
        }
        Ok(out.into_inner())
    }
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
    fn two_frame_i_then_p() {
        let width = 8u16;
        let height = 8u16;
        let black_row = vec![0x00u8; 1];
        let black_frame: Vec<u8> = black_row.repeat(8);
        let iframe = Image::from_bytes(&black_frame, width, height, false).unwrap();

        let white_frame: Vec<u8> = vec![0xffu8; 8];
        let xor_payload: Vec<u8> = white_frame
            .iter()
            .zip(iframe.raw.iter())
            .map(|(a, b)| a ^ b)
            .collect();

        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate VID");
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&[0u8; 2]);
        body.extend_from_slice(&1.0f32.to_le_bytes());
        body.extend_from_slice(&width.to_le_bytes());
        body.extend_from_slice(&height.to_le_bytes());

        let compressed_i = zlib(&black_frame);
        let compressed_p = zlib(&xor_payload);

        let off0 = 0u32;
        let off1 = compressed_i.len() as u32;
        let off2 = off1 + compressed_p.len() as u32;

        body.extend_from_slice(&((off0 << 2) | FRAME_IFRAME).to_le_bytes());
        body.extend_from_slice(&((off1 << 2) | FRAME_PFRAME).to_le_bytes());
        body.extend_from_slice(&(off2 << 2).to_le_bytes());

        body.extend_from_slice(&compressed_i);
        body.extend_from_slice(&compressed_p);

        let mut r = BinReader::from_bytes(body);
        let vid = Video::parse(&mut r, false).unwrap();
        assert_eq!(vid.frames.len(), 2);
        assert_eq!(vid.frames[0].pixels[0][0] & 1, 0); // black
        assert_eq!(vid.frames[1].pixels[0][0] & 1, 1); // white after XOR
    }
}
