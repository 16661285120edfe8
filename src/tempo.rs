//! Fixed-point tempo and interval conversions
//!
//! Tempo is carried as scaled BPM (sbpm): BPM x 100, so `12000` is 120.00 BPM
//! and the largest representable tempo is 655.35 BPM. Intervals are plain
//! `u32` values in one of three coordinate systems:
//!
//! - microseconds per quarter note (`*_us`)
//! - microseconds per 24 PPQN pulse (`*_24pqn`), the software generator's unit
//! - raw counter ticks per pulse (`*_ticks`), the hardware-counter unit
//!
//! All arithmetic is 64-bit integer with round-to-nearest (half the divisor is
//! added before dividing). A zero input, or a result that does not fit the
//! output type, yields the sentinel `0`. Callers must check for it before
//! scheduling anything.

use std::fmt;

/// Tempo scale factor: 1.00 BPM is 100.
pub const BPM_SCALE: u64 = 100;
pub const US_PER_SECOND: u64 = 1_000_000;
/// MIDI 1.0 timing clock resolution.
pub const PULSES_PER_QUARTER_NOTE: u32 = 24;

/// 60 s * 1e6 us * 100: quarter-note microseconds at 0.01 BPM.
const SBPM_US_NUMERATOR: u64 = 60 * US_PER_SECOND * BPM_SCALE;
/// Pulse microseconds at 0.01 BPM (250_000_000).
const SBPM_PULSE_US_NUMERATOR: u64 = SBPM_US_NUMERATOR / PULSES_PER_QUARTER_NOTE as u64;
/// 60 * 100 / 24: counter ticks per pulse are `clock_hz * 250 / sbpm`.
const SBPM_TICKS_FACTOR: u64 = 250;

#[inline]
fn div_round(num: u64, den: u64) -> u64 {
    (num + den / 2) / den
}

#[inline]
fn narrow_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[inline]
fn narrow_sbpm(value: u64) -> u16 {
    u16::try_from(value).unwrap_or(0)
}

/// Quarter-note interval in microseconds for a scaled tempo.
///
/// `sbpm_to_us(12000) == 500_000`. Returns 0 for `sbpm == 0` and for `sbpm == 1`
/// whose 6000 s period does not fit a `u32`.
pub fn sbpm_to_us(sbpm: u16) -> u32 {
    if sbpm == 0 {
        return 0;
    }
    narrow_u32(div_round(SBPM_US_NUMERATOR, u64::from(sbpm)))
}

/// Scaled tempo for a quarter-note interval in microseconds.
///
/// Intervals shorter than ~91.6 ms would exceed 655.35 BPM and return 0.
pub fn us_to_sbpm(us: u32) -> u16 {
    if us == 0 {
        return 0;
    }
    narrow_sbpm(div_round(SBPM_US_NUMERATOR, u64::from(us)))
}

/// Pulse interval in counter ticks for a scaled tempo on a counter running at
/// `clock_hz`.
pub fn sbpm_to_ticks(sbpm: u16, clock_hz: u32) -> u32 {
    if sbpm == 0 || clock_hz == 0 {
        return 0;
    }
    narrow_u32(div_round(
        u64::from(clock_hz) * SBPM_TICKS_FACTOR,
        u64::from(sbpm),
    ))
}

/// Scaled tempo for a pulse interval in counter ticks.
pub fn ticks_to_sbpm(ticks: u32, clock_hz: u32) -> u16 {
    if ticks == 0 || clock_hz == 0 {
        return 0;
    }
    narrow_sbpm(div_round(
        u64::from(clock_hz) * SBPM_TICKS_FACTOR,
        u64::from(ticks),
    ))
}

/// Quarter-note microseconds to pulse microseconds (divide by 24).
pub fn us_to_24pqn(us: u32) -> u32 {
    div_round(u64::from(us), u64::from(PULSES_PER_QUARTER_NOTE)) as u32
}

/// Pulse microseconds to quarter-note microseconds (multiply by 24).
pub fn pqn24_to_us(pqn: u32) -> u32 {
    pqn.checked_mul(PULSES_PER_QUARTER_NOTE).unwrap_or(0)
}

/// Pulse interval in microseconds for a scaled tempo.
///
/// Computed directly from the tempo rather than through [`sbpm_to_us`] so the
/// pulse value is rounded once: `sbpm_to_24pqn(12000) == 20833`.
pub fn sbpm_to_24pqn(sbpm: u16) -> u32 {
    if sbpm == 0 {
        return 0;
    }
    narrow_u32(div_round(SBPM_PULSE_US_NUMERATOR, u64::from(sbpm)))
}

/// Scaled tempo for a pulse interval in microseconds.
pub fn pqn24_to_sbpm(pulse_us: u32) -> u16 {
    if pulse_us == 0 {
        return 0;
    }
    narrow_sbpm(div_round(SBPM_PULSE_US_NUMERATOR, u64::from(pulse_us)))
}

/// Counter ticks to microseconds.
pub fn ticks_to_us(ticks: u32, clock_hz: u32) -> u32 {
    if clock_hz == 0 {
        return 0;
    }
    narrow_u32(div_round(
        u64::from(ticks) * US_PER_SECOND,
        u64::from(clock_hz),
    ))
}

/// Microseconds to counter ticks.
pub fn us_to_ticks(us: u32, clock_hz: u32) -> u32 {
    narrow_u32(div_round(
        u64::from(us) * u64::from(clock_hz),
        US_PER_SECOND,
    ))
}

/// Unit an interval is expressed in, together with the counter frequency
/// when the unit is raw ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timebase {
    /// Microseconds per pulse.
    Micros,
    /// Counter ticks per pulse on a counter running at the given frequency.
    Ticks { clock_hz: u32 },
}

impl Timebase {
    pub fn frequency_hz(&self) -> u32 {
        match self {
            Timebase::Micros => US_PER_SECOND as u32,
            Timebase::Ticks { clock_hz } => *clock_hz,
        }
    }

    /// Pulse interval in this timebase for a scaled tempo.
    pub fn interval_for_sbpm(&self, sbpm: u16) -> u32 {
        match self {
            Timebase::Micros => sbpm_to_24pqn(sbpm),
            Timebase::Ticks { clock_hz } => sbpm_to_ticks(sbpm, *clock_hz),
        }
    }

    /// Scaled tempo for a pulse interval in this timebase.
    pub fn sbpm_for_interval(&self, interval: u32) -> u16 {
        match self {
            Timebase::Micros => pqn24_to_sbpm(interval),
            Timebase::Ticks { clock_hz } => ticks_to_sbpm(interval, *clock_hz),
        }
    }

    /// Pulse interval in this timebase expressed in microseconds.
    pub fn interval_to_us(&self, interval: u32) -> u32 {
        match self {
            Timebase::Micros => interval,
            Timebase::Ticks { clock_hz } => ticks_to_us(interval, *clock_hz),
        }
    }

    /// Microseconds expressed in this timebase.
    pub fn us_to_interval(&self, us: u32) -> u32 {
        match self {
            Timebase::Micros => us,
            Timebase::Ticks { clock_hz } => us_to_ticks(us, *clock_hz),
        }
    }
}

/// Display wrapper printing a scaled tempo as `123.45`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScaledTempo(pub u16);

impl ScaledTempo {
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl From<u16> for ScaledTempo {
    fn from(sbpm: u16) -> Self {
        ScaledTempo(sbpm)
    }
}

impl fmt::Display for ScaledTempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
