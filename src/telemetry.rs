// telemetry.rs

use crate::clock::{GeneratorReadout, MeasurementReadout, PllReadout};
use crate::state::SharedTransport;
use crate::tempo::ScaledTempo;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Point-in-time view of the whole clock chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    pub measured_valid: bool,
    pub measured_sbpm: u16,
    pub measured_interval: u32,
    pub pll_interval: u32,
    pub pll_filtered_error: i32,
    pub pll_slow_error: i32,
    pub generator_running: bool,
    pub generator_interval: u32,
    pub generator_sbpm: u16,
    pub pulses_emitted: u64,
    pub playing: bool,
    pub bar: u64,
    pub beat: u32,
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>3}.{} | out {} BPM ({}{})",
            if self.playing { "▶" } else { "■" },
            self.bar,
            self.beat,
            ScaledTempo(self.generator_sbpm),
            self.generator_interval,
            if self.generator_running { "" } else { ", stopped" },
        )?;
        if self.measured_valid {
            write!(
                f,
                " | in {} BPM ({}) | pll {} err {}/{}",
                ScaledTempo(self.measured_sbpm),
                self.measured_interval,
                self.pll_interval,
                self.pll_filtered_error,
                self.pll_slow_error
            )?;
        }
        write!(f, " | {} pulses", self.pulses_emitted)
    }
}

/// Lock-free handles to every component that reports state.
///
/// Measurement and loop readouts are absent when free running.
#[derive(Clone)]
pub struct Telemetry {
    generator: GeneratorReadout,
    transport: SharedTransport,
    measurement: Option<MeasurementReadout>,
    pll: Option<PllReadout>,
}

impl Telemetry {
    pub fn new(generator: GeneratorReadout, transport: SharedTransport) -> Self {
        Self {
            generator,
            transport,
            measurement: None,
            pll: None,
        }
    }

    pub fn with_follower(mut self, measurement: MeasurementReadout, pll: PllReadout) -> Self {
        self.measurement = Some(measurement);
        self.pll = Some(pll);
        self
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let mut snapshot = TelemetrySnapshot {
            generator_running: self.generator.is_running(),
            generator_interval: self.generator.interval(),
            generator_sbpm: self.generator.sbpm(),
            pulses_emitted: self.generator.pulses_emitted(),
            playing: self.transport.is_playing(),
            bar: self.transport.bar(),
            beat: self.transport.beat(),
            ..Default::default()
        };

        if let Some(measurement) = &self.measurement {
            snapshot.measured_valid = measurement.is_valid();
            snapshot.measured_sbpm = measurement.sbpm();
            snapshot.measured_interval = measurement.interval();
        }
        if let Some(pll) = &self.pll {
            snapshot.pll_interval = pll.interval();
            snapshot.pll_filtered_error = pll.filtered_error();
            snapshot.pll_slow_error = pll.slow_error();
        }
        snapshot
    }
}

fn create_status_spinner() -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Clock");
    pb
}

/// Redraws a one-line status every 100 ms until `running` is cleared.
pub fn run_inspector(telemetry: Telemetry, running: Arc<AtomicBool>) {
    let spinner = create_status_spinner();

    while running.load(Ordering::SeqCst) {
        spinner.set_message(telemetry.snapshot().to_string());
        spinner.tick();
        thread::sleep(Duration::from_millis(100));
    }

    spinner.finish_and_clear();
}
