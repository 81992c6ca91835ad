use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Decoder and transcoder for Playdate console asset formats",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat per-entry archive failures as fatal instead of skipping them.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Materialise a PDZ archive, or a directory of loose assets, to a host
    /// directory of PNG/GIF/WAV/JSON files.
    Dump(DumpArgs),

    /// Print a parsed asset's structure without materialising it.
    Info(InfoArgs),

    /// Decode an IMG (.pdi) to PNG.
    Img(FormatArgs),

    /// Decode a VID (.pdv) to an animated GIF.
    Vid(FormatArgs),

    /// Decode an AUD (.pda) to a WAV file.
    Aud(FormatArgs),

    /// Render text with an FNT (.pft) font to a PNG.
    Fnt(FontArgs),

    /// Dump a STR (.pds) table to JSON.
    Str(FormatArgs),

    /// Re-synthesise a compiled BIN/PDX (`pdex.bin`) as an ELF32 object.
    Bin(FormatArgs),
}

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Input PDZ archive or directory (e.g. a `.pdx` bundle).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output directory for materialised files.
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Emit grayscale (black & white) imagery instead of the device's
    /// 2-bit greenish palette.
    #[arg(long)]
    pub bw: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input file: any recognised Playdate asset, or a PDZ archive.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct FormatArgs {
    /// Input file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path. Defaults to the input path with its extension swapped
    /// for the target format's native extension.
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Emit grayscale (black & white) imagery instead of the device's
    /// 2-bit greenish palette.
    #[arg(long)]
    pub bw: bool,
}

#[derive(Debug, Args)]
pub struct FontArgs {
    /// Input .pft font file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output PNG path. Defaults to the input path with its extension
    /// swapped for `.png`.
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Text to render.
    #[arg(long, default_value = "")]
    pub text: String,

    /// Emit grayscale (black & white) imagery instead of the device's
    /// 2-bit greenish palette.
    #[arg(long)]
    pub bw: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}
