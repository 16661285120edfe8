use crate::clock::MeasureMode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// List available MIDI devices
    #[arg(long)]
    pub device_list: bool,

    /// Settings file (defaults to umpclockrs.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Free-running tempo in BPM, e.g. 120 or 98.5
    #[arg(long)]
    pub bpm: Option<String>,

    /// Follow the clock arriving on this MIDI input device
    #[arg(long)]
    pub input: Option<String>,

    /// Send the generated clock to this MIDI output device
    #[arg(long)]
    pub output: Option<String>,

    /// Tempo measurement: per-pulse or averaged
    #[arg(long, value_parser = parse_measure_mode)]
    pub measure: Option<MeasureMode>,

    /// Keep generating when the input transport stops
    #[arg(long)]
    pub no_follow_transport: bool,

    /// Log a debug pin toggle on every pulse
    #[arg(long)]
    pub debug_pin: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log to stderr instead of the log file
    #[arg(long)]
    pub log_stderr: bool,
}

fn parse_measure_mode(value: &str) -> Result<MeasureMode, String> {
    match value {
        "per-pulse" | "per_pulse" => Ok(MeasureMode::PerPulse),
        "averaged" => Ok(MeasureMode::Averaged),
        other => Err(format!(
            "unknown measure mode '{}', expected per-pulse or averaged",
            other
        )),
    }
}

pub fn handle_device_list() -> Vec<String> {
    crate::midi::list_devices()
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}
