//! FFmpeg library setup and log level control.
//!
//! FFmpeg prints its own diagnostics to stderr independently of the Rust
//! [`log`](https://crates.io/crates/log) facade used by this crate. The
//! helpers here let callers tune that output without depending on
//! `ffmpeg-next` directly.
//!
//! ```no_run
//! use vidframes::{Decoder, FfmpegLogLevel};
//!
//! vidframes::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! let decoder = Decoder::open("input.mp4")?;
//! # Ok::<(), vidframes::VidframesError>(())
//! ```

use ffmpeg_next::util::log::Level;

use crate::error::VidframesError;

/// FFmpeg internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// No output at all.
    Quiet,
    /// Conditions after which the process aborts.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl FfmpegLogLevel {
    /// Parse a level name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        let level = match name.to_ascii_lowercase().as_str() {
            "quiet" => Self::Quiet,
            "panic" => Self::Panic,
            "fatal" => Self::Fatal,
            "error" => Self::Error,
            "warning" | "warn" => Self::Warning,
            "info" => Self::Info,
            "verbose" => Self::Verbose,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => return None,
        };
        Some(level)
    }
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl From<Level> for FfmpegLogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }
}

/// Set the FFmpeg internal log verbosity level.
///
/// Affects only what FFmpeg itself prints to stderr.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

/// Get the current FFmpeg internal log verbosity level, if it maps to a
/// known variant.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level().ok().map(FfmpegLogLevel::from)
}

/// Initialise the FFmpeg libraries. Safe to call repeatedly.
///
/// # Errors
///
/// [`VidframesError::FfmpegError`] if the libraries refuse to initialise.
pub(crate) fn initialize() -> Result<(), VidframesError> {
    ffmpeg_next::init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse() {
        assert_eq!(FfmpegLogLevel::from_name("warn"), Some(FfmpegLogLevel::Warning));
        assert_eq!(FfmpegLogLevel::from_name("QUIET"), Some(FfmpegLogLevel::Quiet));
        assert_eq!(FfmpegLogLevel::from_name("loud"), None);
    }

    #[test]
    fn initialize_is_repeatable() {
        initialize().expect("first init");
        initialize().expect("second init");
    }

    #[test]
    fn levels_map_both_ways() {
        for level in [
            FfmpegLogLevel::Quiet,
            FfmpegLogLevel::Error,
            FfmpegLogLevel::Info,
            FfmpegLogLevel::Trace,
        ] {
            assert_eq!(FfmpegLogLevel::from(Level::from(level)), level);
        }
    }
}
