//! `info` subcommand: parses a single asset and prints a structure summary
//! without materialising anything.

use std::fs;

use anyhow::Result;
use indicatif::MultiProgress;

use super::command::{Cli, InfoArgs};
use pdformats::archive::{Archive, Entry, Payload};
use pdformats::binary::Binary;
use pdformats::dispatch::{self, Asset};
use pdformats::reader::BinReader;

pub fn cmd_info(args: &InfoArgs, _cli: &Cli, _multi: Option<&MultiProgress>) -> Result<()> {
    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let data = fs::read(&args.input)?;

    if name == "pdex.bin" {
        let bin = Binary::parse(&mut BinReader::from_bytes(data), false)?;
        print_binary(&bin);
        return Ok(());
    }

    let asset = dispatch::classify(&name, data)?;
    print_asset(&asset, 0);
    Ok(())
}

fn indent(depth: usize) {
    print!("{}", "  ".repeat(depth));
}

fn print_asset(asset: &Asset, depth: usize) {
    match asset {
        Asset::Image(img) => {
            indent(depth);
            println!(
                "Image: {}x{} (clip l{} r{} t{} b{}, alpha={})",
                img.width, img.height, img.clip_l, img.clip_r, img.clip_t, img.clip_b, img.has_alpha
            );
        }
        Asset::ImageTable(table) => {
            indent(depth);
            println!(
                "ImageTable: {} cells, {} per row, {} rows (matrix={})",
                table.num_images, table.num_per_row, table.num_rows, table.is_matrix
            );
        }
        Asset::Video(video) => {
            indent(depth);
            println!(
                "Video: {}x{}, {} frames @ {:.2} fps",
                video.width, video.height, video.num_frames, video.framerate
            );
        }
        Asset::Audio(audio) => {
            indent(depth);
            println!(
                "Audio: {} Hz, {} channel(s), fmt={}",
                audio.framerate, audio.channels, audio.fmt
            );
        }
        Asset::Strings(strings) => {
            indent(depth);
            println!("Strings: {} entries", strings.len());
        }
        Asset::Font(font) => {
            indent(depth);
            println!(
                "Font: {}x{} max glyph cell, {} glyphs, tracking={}",
                font.max_width,
                font.max_height,
                font.glyphs.len(),
                font.tracking
            );
        }
        Asset::Archive(archive) => {
            indent(depth);
            println!("Archive (PDZ):");
            print_archive_tree(archive, depth + 1);
        }
        Asset::Stray(bytes) => {
            indent(depth);
            println!("Stray file: {} byte(s)", bytes.len());
        }
    }
}

fn print_archive_tree(archive: &Archive, depth: usize) {
    print_entries(archive.tree(), depth);
}

fn print_entries(entries: &[(String, Entry)], depth: usize) {
    for (name, entry) in entries {
        indent(depth);
        match entry {
            Entry::Dir(sub) => {
                println!("{name}/");
                print_entries(sub, depth + 1);
            }
            Entry::File(payload) => print_payload(name, payload),
        }
    }
}

fn print_payload(name: &str, payload: &Payload) {
    match payload {
        Payload::Raw(bytes) => println!("{name}: Lua bytecode, {} byte(s)", bytes.len()),
        Payload::Image(img) => println!("{name}: Image {}x{}", img.width, img.height),
        Payload::ImageTable(table) => {
            println!("{name}: ImageTable, {} cells", table.num_images)
        }
        Payload::Video(video) => println!("{name}: Video, {} frames", video.num_frames),
        Payload::Audio(audio) => println!("{name}: Audio, {} Hz", audio.framerate),
        Payload::Strings(strings) => println!("{name}: Strings, {} entries", strings.len()),
        Payload::Font(font) => println!("{name}: Font, {} glyphs", font.glyphs.len()),
    }
}

fn print_binary(bin: &Binary) {
    println!("Binary (BIN/PDX):");
    println!("  code size       {} byte(s)", bin.code_size);
    println!("  mem size        {} byte(s)", bin.mem_size);
    println!("  relocations     {}", bin.relocations.len());
    println!(
        "  md5             {}",
        bin.md5.iter().map(|b| format!("{b:02x}")).collect::<String>()
    );
}
