//! `dump` subcommand: materialises a PDZ archive, or a directory of loose
//! Playdate assets (a `.pdx` bundle), to a host directory of PNG/GIF/WAV/
//! JSON files, with a progress spinner over the input path and output path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::command::{Cli, DumpArgs};
use pdformats::binary::Binary;
use pdformats::dispatch::{self, Asset};
use pdformats::reader::BinReader;

pub fn cmd_dump(args: &DumpArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let out_dir = args
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.input));

    let pb = multi.map(|multi| {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    });

    if args.input.is_dir() {
        walk_directory(&args.input, &out_dir, args.bw, cli.strict, pb.as_ref())?;
    } else {
        dump_file(&args.input, &out_dir, args.bw, cli.strict, pb.as_ref())?;
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    log::info!("dumped {} to {}", args.input.display(), out_dir.display());
    Ok(())
}

fn default_output_dir(input: &Path) -> PathBuf {
    if input.is_dir() {
        return input.with_extension("");
    }
    let stem = input.file_stem().unwrap_or_default();
    input.with_file_name(stem)
}

/// Dumps a single file: a PDZ archive materialises into `out_dir` as a
/// directory tree; any other recognised asset materialises as one or more
/// files directly inside `out_dir`; `pdex.bin` re-synthesises to an ELF.
fn dump_file(
    input: &Path,
    out_dir: &Path,
    bw: bool,
    strict: bool,
    pb: Option<&ProgressBar>,
) -> Result<()> {
    let name = file_name(input);
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    if let Some(pb) = pb {
        pb.set_message(format!("dumping {}", input.display()));
    }

    if name == "pdex.bin" {
        let bin = Binary::parse_any(&mut BinReader::from_bytes(data))?;
        write_file(out_dir, "pdex.elf", &bin.to_elf())?;
        return Ok(());
    }

    let asset = match dispatch::classify(&name, data) {
        Ok(asset) => asset,
        Err(e) if !strict => {
            log::warn!("{}: {e}", input.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    materialize_asset(asset, out_dir, &name, bw)
}

fn walk_directory(
    input: &Path,
    out_dir: &Path,
    bw: bool,
    strict: bool,
    pb: Option<&ProgressBar>,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    for entry in fs::read_dir(input).with_context(|| format!("reading {}", input.display()))? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            walk_directory(&path, &out_dir.join(&name), bw, strict, pb)?;
            continue;
        }

        if let Some(pb) = pb {
            pb.set_message(format!("dumping {}", path.display()));
            pb.tick();
        }

        if name == "pdex.bin" {
            let data = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let bin = Binary::parse_any(&mut BinReader::from_bytes(data))?;
            write_file(out_dir, "pdex.elf", &bin.to_elf())?;
            continue;
        }

        let data = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let asset = match dispatch::classify(&name, data) {
            Ok(asset) => asset,
            Err(e) if !strict => {
                log::warn!("{}: {e}", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        materialize_asset(asset, out_dir, &name, bw)?;
    }

    Ok(())
}

/// Writes `asset`'s materialised output beneath `out_dir`. A PDZ archive
/// dumps to `out_dir/<stem>/...` following its own path tree; a stray file
/// is copied byte for byte under its original name (extension kept);
/// everything else materialises as `<stem><suffix>`.
fn materialize_asset(asset: Asset, out_dir: &Path, name: &str, bw: bool) -> Result<()> {
    match asset {
        Asset::Archive(archive) => {
            let archive_out = out_dir.join(strip_extension(name));
            for (rel, bytes) in archive.materialize(bw)? {
                write_file_at(&archive_out.join(rel), &bytes)?;
            }
        }
        Asset::Stray(bytes) => write_file(out_dir, name, &bytes)?,
        other => {
            let stem = strip_extension(name);
            for (suffix, bytes) in other.materialize(bw)? {
                write_file(out_dir, &format!("{stem}{suffix}"), &bytes)?;
            }
        }
    }
    Ok(())
}

fn strip_extension(name: &str) -> &str {
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    write_file_at(&dir.join(name), bytes)
}

fn write_file_at(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
