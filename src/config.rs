// config.rs

use crate::cli::Args;
use crate::clock::{MeasureMode, PllTuning};
use crate::error::{ClockError, Result};
use config::{Config, Environment, File, FileFormat};
use log::{debug, LevelFilter};
use serde::Deserialize;
use std::path::Path;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "umpclockrs.toml";
/// Environment variables named `UMPCLOCK_<KEY>` override the file;
/// nested keys use `__`, as in `UMPCLOCK_PLL__GAIN`.
pub const ENV_PREFIX: &str = "UMPCLOCK";

/// Clock used to timestamp incoming pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimebaseKind {
    /// Monotonic microseconds.
    #[default]
    Micros,
    /// Emulated free-running counter at `counter_hz`.
    Counter,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Free-running and seed tempo, BPM x 100.
    pub tempo_sbpm: u16,
    pub timebase: TimebaseKind,
    pub counter_hz: u32,
    pub counter_counts_down: bool,
    pub measure_mode: MeasureMode,
    pub pll: PllTuning,
    pub follow_transport: bool,
    pub forward_channel_voice: bool,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub input_queue_len: usize,
    pub output_queue_len: usize,
    pub debug_pin: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tempo_sbpm: 12000,
            timebase: TimebaseKind::Micros,
            counter_hz: 1_000_000,
            counter_counts_down: false,
            measure_mode: MeasureMode::PerPulse,
            pll: PllTuning::default(),
            follow_transport: true,
            forward_channel_voice: true,
            input_device: None,
            output_device: None,
            input_queue_len: 128,
            output_queue_len: 256,
            debug_pin: false,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads defaults, then the config file (optional unless named
    /// explicitly), then `UMPCLOCK_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Parses settings from TOML text, without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Command line flags take precedence over every other source.
    pub fn apply_args(&mut self, args: &Args) -> Result<()> {
        if let Some(bpm) = &args.bpm {
            self.tempo_sbpm = bpm_to_sbpm(bpm)?;
        }
        if let Some(input) = &args.input {
            self.input_device = Some(input.clone());
        }
        if let Some(output) = &args.output {
            self.output_device = Some(output.clone());
        }
        if let Some(mode) = args.measure {
            self.measure_mode = mode;
        }
        if args.no_follow_transport {
            self.follow_transport = false;
        }
        if args.debug_pin {
            self.debug_pin = true;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(ClockError::Config(msg.to_string())) };

        if self.tempo_sbpm == 0 {
            return invalid("tempo_sbpm must be greater than zero");
        }
        if self.counter_hz == 0 {
            return invalid("counter_hz must be greater than zero");
        }
        if self.pll.filter_k <= 0 {
            return invalid("pll.filter_k must be greater than zero");
        }
        if self.pll.gain <= 0 {
            return invalid("pll.gain must be greater than zero");
        }
        if self.pll.track_threshold <= 0 {
            return invalid("pll.track_threshold must be greater than zero");
        }
        if self.input_queue_len == 0 || self.output_queue_len == 0 {
            return invalid("queue lengths must be greater than zero");
        }
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(ClockError::Config(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Parses a BPM value such as `120` or `98.76` to scaled BPM. At most two
/// decimal places are accepted.
pub fn bpm_to_sbpm(bpm: &str) -> Result<u16> {
    let invalid = || {
        ClockError::Config(format!(
            "tempo '{}' is not a BPM value in 0.01..=655.35",
            bpm
        ))
    };
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    let (whole, fraction) = bpm.trim().split_once('.').unwrap_or((bpm.trim(), ""));
    if (whole.is_empty() && fraction.is_empty()) || !digits(whole) || !digits(fraction) {
        return Err(invalid());
    }

    let whole: u32 = match whole {
        "" => 0,
        w => w.parse().map_err(|_| invalid())?,
    };
    let hundredths: u32 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u32>().map_err(|_| invalid())? * 10,
        2 => fraction.parse().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(hundredths))
        .and_then(|scaled| u16::try_from(scaled).ok())
        .filter(|&sbpm| sbpm > 0)
        .ok_or_else(invalid)
}
