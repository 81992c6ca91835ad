//! AUD: raw PCM or IMA-ADPCM audio, decoded to a PCM `WAVE` byte stream.
//! Grounded on `loaders/pda.py`'s `PDAudioFile`/`PDAudioFormat`.

use pdtool_macros::ToBytes;

use crate::byteorder::WriteBytesLe;
use crate::container::read_magic;
use crate::error::AudioError;
use crate::reader::BinReader;

pub const MAGIC: &[u8] = b"Playdate AUD";

pub const FORMAT_MONO_8: u8 = 0;
pub const FORMAT_STEREO_8: u8 = 1;
pub const FORMAT_MONO_16: u8 = 2;
pub const FORMAT_STEREO_16: u8 = 3;
pub const FORMAT_MONO_ADPCM4: u8 = 4;
pub const FORMAT_STEREO_ADPCM4: u8 = 5;
const FORMAT_LENGTH: u8 = 6;

const STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

const INDEX_TABLE: [i32; 8] = [-1, -1, -1, -1, 2, 4, 6, 8];

#[derive(Debug)]
pub struct Audio {
    pub framerate: u32,
    pub fmt: u8,
    pub channels: u16,
    pub sample_width: u16,
    /// Interleaved signed 16-bit samples (L, R, L, R, … for stereo) when
    /// the source was ADPCM; raw sample bytes verbatim for PCM.
    pub samples: AudioSamples,
}

#[derive(Debug)]
pub enum AudioSamples {
    Pcm(Vec<u8>),
    Decoded(Vec<i16>),
}

struct ChannelState {
    predictor: i32,
    step_index: i32,
}

impl ChannelState {
    fn decode_nibble(&mut self, nibble: u8) -> i16 {
        let step = STEP_TABLE[self.step_index as usize];
        let mut diff = step >> 3;
        if nibble & 4 != 0 {
            diff += step;
        }
        if nibble & 2 != 0 {
            diff += step >> 1;
        }
        if nibble & 1 != 0 {
            diff += step >> 2;
        }
        if nibble & 8 != 0 {
            self.predictor -= diff;
        } else {
            self.predictor += diff;
        }
        self.predictor = self.predictor.clamp(-32767, 32767);
        self.step_index =
            (self.step_index + INDEX_TABLE[(nibble & 0x7) as usize]).clamp(0, 88);
        self.predictor as i16
    }
}

impl Audio {
    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, AudioError> {
        read_magic(reader, "AUD", MAGIC, None, skip_magic)?;

        let offset = reader.tell();
        let framerate = reader.readu24()?;
        let fmt = reader.readu8()?;
        if fmt >= FORMAT_LENGTH {
            return Err(AudioError::UnsupportedFeature { offset, fmt });
        }

        let channels = ((fmt & 1) + 1) as u16;
        let sample_width: u16 = if fmt < FORMAT_MONO_16 { 1 } else { 2 };

        let samples = if fmt < FORMAT_MONO_ADPCM4 {
            AudioSamples::Pcm(reader.readbin_all())
        } else {
            AudioSamples::Decoded(Self::decode_adpcm(reader, channels as usize)?)
        };

        Ok(Self {
            framerate,
            fmt,
            channels,
            sample_width,
            samples,
        })
    }

    fn decode_adpcm(reader: &mut BinReader, channels: usize) -> Result<Vec<i16>, AudioError> {
        let block_size = reader.readu16()? as usize;
        let header_bytes = 4 * channels;
        let mut out = Vec::new();

        while !reader.is_eof() {
            let mut states = Vec::with_capacity(channels);
            for _ in 0..channels {
                let predictor = reader.reads16()? as i32;
                let step_index = reader.readu8()? as i32;
                reader.advance(1);
                states.push(ChannelState {
                    predictor,
                    step_index,
                });
            }
            for s in &states {
                out.push(s.predictor as i16);
            }

            let payload_len = block_size.saturating_sub(header_bytes);
            let payload = reader.readbin(payload_len);

            // High nibble first, then low, per byte. For stereo this also
            // puts the left channel's nibble first in every byte.
            let mut nibble_index = 0usize;
            for byte in payload {
                for nibble in [byte >> 4, byte & 0xf] {
                    let channel = if channels > 1 { nibble_index % channels } else { 0 };
                    out.push(states[channel].decode_nibble(nibble));
                    nibble_index += 1;
                }
            }
        }

        Ok(out)
    }

    pub fn encode_wav(&self) -> Vec<u8> {
        let data: Vec<u8> = match &self.samples {
            AudioSamples::Pcm(bytes) => bytes.clone(),
            AudioSamples::Decoded(samples) => {
                let mut bytes = Vec::with_capacity(samples.len() * 2);
                for s in samples {
                    bytes.extend_from_slice(&s.to_le_bytes());
                }
                bytes
            }
        };

        let bits_per_sample: u16 = match &self.samples {
            AudioSamples::Pcm(_) => self.sample_width * 8,
            AudioSamples::Decoded(_) => 16,
        };
        let block_align = self.channels * (bits_per_sample / 8);
        let byte_rate = self.framerate * block_align as u32;

        let header = WavHeader {
            riff_magic: *b"RIFF",
            riff_size: 36 + data.len() as u32,
            wave_magic: *b"WAVE",
            fmt_magic: *b"fmt ",
            fmt_size: 16,
            format_tag: 0x0001,
            channels: self.channels,
            sample_rate: self.framerate,
            byte_rate,
            block_align,
            bits_per_sample,
            data_magic: *b"data",
            data_size: data.len() as u32,
        };

        let mut out = Vec::with_capacity(44 + data.len());
        header.write_le(&mut out);
        out.extend_from_slice(&data);
        out
    }
}

#[derive(ToBytes)]
struct WavHeader {
    riff_magic: [u8; 4],
    riff_size: u32,
    wave_magic: [u8; 4],
    fmt_magic: [u8; 4],
    fmt_size: u32,
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
    data_magic: [u8; 4],
    data_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adpcm_mono_block_size_8() {
        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate AUD");
        body.push(0x00);
        body.push(0x00);
        body.push(0x00); // framerate = 0
        body.push(FORMAT_MONO_ADPCM4);
        body.extend_from_slice(&8u16.to_le_bytes()); // block_size
        body.extend_from_slice(&0i16.to_le_bytes()); // predictor
        body.push(0x00); // step_index
        body.push(0x00); // zero byte
        body.extend_from_slice(&[0x08, 0x00, 0x00, 0x00]); // payload

        let mut r = BinReader::from_bytes(body);
        let aud = Audio::parse(&mut r, false).unwrap();
        match &aud.samples {
            AudioSamples::Decoded(samples) => {
                assert_eq!(samples.len(), 9);
                assert!(samples.iter().all(|&s| s == 0));
            }
            _ => panic!("expected decoded ADPCM samples"),
        }
    }

    #[test]
    fn pcm_passthrough() {
        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate AUD");
        body.push(0x44);
        body.push(0xac);
        body.push(0x00); // framerate = 44100
        body.push(FORMAT_MONO_8);
        body.extend_from_slice(&[1, 2, 3, 4]);

        let mut r = BinReader::from_bytes(body);
        let aud = Audio::parse(&mut r, false).unwrap();
        match &aud.samples {
            AudioSamples::Pcm(bytes) => assert_eq!(bytes, &vec![1, 2, 3, 4]),
            _ => panic!("expected PCM passthrough"),
        }
        let wav = aud.encode_wav();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }
}
