use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use vidframes::{Decoder, DecoderOptions, FfmpegLogLevel, PacketizerKind, ScalingFilter};

const CLI_AFTER_HELP: &str = "Examples:\n  vidframes info input.mp4 --json\n  vidframes dump input.mp4 --out frames --progress\n  vidframes dump input.mkv --out frames --width 320 --filter lanczos --ext jpg\n  vidframes completions zsh > _vidframes";

#[derive(Debug, Parser)]
#[command(
    name = "vidframes",
    version,
    about = "Dump every decoded video frame of a media file as an image",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long)]
    verbose: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the selected video stream's metadata.
    #[command(
        about = "Print video stream metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  vidframes info input.mp4\n  vidframes info input.mp4 --json"
    )]
    Info {
        /// Input media path.
        input: PathBuf,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode every frame and write it to an output directory.
    #[command(
        about = "Dump all video frames",
        after_help = "Examples:\n  vidframes dump input.mp4 --out frames\n  vidframes dump input.mp4 --out frames --height 240 --packetizer rawvideo"
    )]
    Dump {
        /// Input media path.
        input: PathBuf,
        /// Output directory for frame images.
        #[arg(long)]
        out: PathBuf,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
        /// Target width; keeps aspect ratio when --height is omitted.
        #[arg(long)]
        width: Option<u32>,
        /// Target height; keeps aspect ratio when --width is omitted.
        #[arg(long)]
        height: Option<u32>,
        /// Resampling filter (bicubic, bilinear, lanczos, point, area).
        #[arg(long, default_value = "bicubic")]
        filter: String,
        /// Packetizer (linear, rawvideo).
        #[arg(long, default_value = "linear")]
        packetizer: String,
        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = FfmpegLogLevel::from_name(level)
            .ok_or(format!("unsupported --log-level: {level}"))?;
        vidframes::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn parse_extension(value: &str) -> Option<String> {
    let clean = value.trim_start_matches('.').to_ascii_lowercase();
    match clean.as_str() {
        "png" | "jpg" | "jpeg" | "bmp" | "tiff" => Some(clean),
        _ => None,
    }
}

fn dump_options(
    width: Option<u32>,
    height: Option<u32>,
    filter: &str,
    packetizer: &str,
) -> Result<DecoderOptions, Box<dyn std::error::Error>> {
    let filter =
        ScalingFilter::from_name(filter).ok_or(format!("unsupported --filter: {filter}"))?;
    let packetizer = PacketizerKind::from_name(packetizer)
        .ok_or(format!("unsupported --packetizer: {packetizer}"))?;
    Ok(DecoderOptions::new()
        .with_resolution(width, height)
        .with_scaling_filter(filter)
        .with_packetizer(packetizer))
}

fn frame_path(out: &Path, index: u64, ext: &str) -> PathBuf {
    out.join(format!("frame_{index:06}.{ext}"))
}

fn progress_bar(estimate: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    if estimate == 0 {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} {pos} frames {msg}")?);
        return Ok(bar);
    }

    let bar = ProgressBar::new(estimate);
    let style =
        ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
    bar.set_style(style.progress_chars("##-"));
    Ok(bar)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Info { input, json } => {
            let mut decoder = Decoder::open(&input)?;
            let descriptor = decoder.descriptor().clone();
            let (width, height) = decoder.size();
            decoder.close()?;

            if json {
                let payload = json!({
                    "stream_index": descriptor.index,
                    "codec": descriptor.codec,
                    "width": descriptor.width,
                    "height": descriptor.height,
                    "pixel_format": format!("{:?}", descriptor.pixel_format),
                    "frames_per_second": descriptor.frames_per_second,
                    "frame_count": descriptor.frame_count,
                    "time_base": format!(
                        "{}/{}",
                        descriptor.time_base.numerator(),
                        descriptor.time_base.denominator()
                    ),
                    "target": { "width": width, "height": height },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "File:".bold(), input.display());
                println!(
                    "{} #{} {} {}x{} {:?}",
                    "Video:".bold(),
                    descriptor.index,
                    descriptor.codec,
                    descriptor.width,
                    descriptor.height,
                    descriptor.pixel_format,
                );
                println!(
                    "{} {:.3} fps, ~{} frames (advisory)",
                    "Rate:".bold(),
                    descriptor.frames_per_second,
                    descriptor.frame_count,
                );
                println!("{} {width}x{height} RGBA", "Output:".bold());
            }
        }
        Commands::Dump {
            input,
            out,
            ext,
            width,
            height,
            filter,
            packetizer,
            progress,
        } => {
            let ext = parse_extension(&ext).ok_or(format!("unsupported --ext: {ext}"))?;
            let options = dump_options(width, height, &filter, &packetizer)?;
            fs::create_dir_all(&out)?;

            let mut decoder = Decoder::open_with_options(&input, &options)?;
            let bar = if progress {
                Some(progress_bar(decoder.frame_count())?)
            } else {
                None
            };

            let mut written = 0_u64;
            loop {
                let pull = decoder.pull()?;
                if !pull.more {
                    break;
                }
                for image in pull.images {
                    let path = frame_path(&out, written, &ext);
                    if path.exists() && !cli.global.overwrite {
                        return Err(format!(
                            "output file already exists: {} (use --overwrite)",
                            path.display()
                        )
                        .into());
                    }
                    image.save(&path)?;
                    written += 1;

                    if let Some(bar) = &bar {
                        bar.inc(1);
                    }
                    if cli.global.verbose {
                        eprintln!("saved frame {} -> {}", written - 1, path.display());
                    }
                }
            }
            decoder.close()?;

            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Wrote {written} frame(s) to {}", out.display()).green()
            );
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vidframes", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
