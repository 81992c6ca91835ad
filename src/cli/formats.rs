//! Per-format convenience subcommands: `img`, `vid`, `aud`, `fnt`, `str`,
//! `bin`. Each exposes a direct `(input[, output]) -> file` conversion,
//! without going through the archive/directory dump machinery.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::command::{FontArgs, FormatArgs};
use pdformats::audio::Audio;
use pdformats::binary::Binary;
use pdformats::font::Font;
use pdformats::image::Image;
use pdformats::reader::BinReader;
use pdformats::strings::Strings;
use pdformats::video::Video;

fn output_path(args_output: &Option<PathBuf>, input: &Path, ext: &str) -> PathBuf {
    args_output
        .clone()
        .unwrap_or_else(|| input.with_extension(ext))
}

pub fn cmd_img(args: &FormatArgs) -> Result<()> {
    let data = fs::read(&args.input)?;
    let image = Image::parse(&mut BinReader::from_bytes(data), false)?;
    let out = output_path(&args.output, &args.input, "png");
    fs::write(&out, image.encode_png(args.bw)?)?;
    log::info!("wrote {}", out.display());
    Ok(())
}

pub fn cmd_vid(args: &FormatArgs) -> Result<()> {
    let data = fs::read(&args.input)?;
    let video = Video::parse(&mut BinReader::from_bytes(data), false)?;
    let out = output_path(&args.output, &args.input, "gif");
    fs::write(&out, video.encode_gif(args.bw)?)?;
    log::info!("wrote {}", out.display());
    Ok(())
}

pub fn cmd_aud(args: &FormatArgs) -> Result<()> {
    let data = fs::read(&args.input)?;
    let audio = Audio::parse(&mut BinReader::from_bytes(data), false)?;
    let out = output_path(&args.output, &args.input, "wav");
    fs::write(&out, audio.encode_wav())?;
    log::info!("wrote {}", out.display());
    Ok(())
}

pub fn cmd_fnt(args: &FontArgs) -> Result<()> {
    let data = fs::read(&args.input)?;
    let font = Font::parse(&mut BinReader::from_bytes(data), false)?;
    let rendered = font.render(&args.text, args.bw)?;
    let out = output_path(&args.output, &args.input, "png");

    let mut bytes = std::io::Cursor::new(Vec::new());
    rendered.write_to(&mut bytes, image::ImageFormat::Png)?;
    fs::write(&out, bytes.into_inner())?;
    log::info!("wrote {}", out.display());
    Ok(())
}

pub fn cmd_str(args: &FormatArgs) -> Result<()> {
    let data = fs::read(&args.input)?;
    let strings = Strings::parse(&mut BinReader::from_bytes(data), false)?;
    let out = output_path(&args.output, &args.input, "json");
    fs::write(&out, strings.to_json_string()?)?;
    log::info!("wrote {}", out.display());
    Ok(())
}

pub fn cmd_bin(args: &FormatArgs) -> Result<()> {
    let data = fs::read(&args.input)?;
    let bin = Binary::parse_any(&mut BinReader::from_bytes(data))?;
    let out = output_path(&args.output, &args.input, "elf");
    fs::write(&out, bin.to_elf())?;
    log::info!("wrote {}", out.display());
    Ok(())
}
