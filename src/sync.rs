//! Following an external clock and bridging it to UMP
//!
//! [`ClockFollower`] turns received real-time messages into a locked,
//! regenerated clock. [`Bridge`] is the decoder's event sink: channel voice
//! messages are re-encoded as UMP and forwarded, real-time messages drive the
//! follower.

use crate::clock::{IntervalMeasurer, PllController, TickGenerator, TimeSource};
use crate::midi::{codec, EventSink, UmpPacket, UmpSink};
use crate::note::{note_name_with_octave, Accidentals};
use crate::state::SharedTransport;
use crate::tempo::{ScaledTempo, Timebase};
use log::{debug, info, trace, warn};
use std::sync::Arc;

/// Measure, lock and regenerate an incoming 24 PPQN clock.
pub struct ClockFollower<T: TimeSource> {
    measurer: IntervalMeasurer<T>,
    pll: PllController,
    generator: TickGenerator,
    transport: SharedTransport,
    sink: Arc<dyn UmpSink>,
    follow_transport: bool,
}

impl<T: TimeSource> ClockFollower<T> {
    /// Seeds the generator with the loop's nominal interval so a transport
    /// Start has a tempo to run at before anything has been measured.
    pub fn new(
        measurer: IntervalMeasurer<T>,
        pll: PllController,
        mut generator: TickGenerator,
        transport: SharedTransport,
        sink: Arc<dyn UmpSink>,
    ) -> Self {
        if generator.get_interval() == 0 {
            let seed = convert(pll.get_interval(), measurer.timebase(), generator.timebase());
            if let Err(e) = generator.set_interval(seed) {
                warn!("Failed to seed generator interval: {}", e);
            }
        }

        Self {
            measurer,
            pll,
            generator,
            transport,
            sink,
            follow_transport: true,
        }
    }

    /// Whether Start/Continue/Stop also start and stop the generator and are
    /// forwarded downstream.
    pub fn follow_transport(mut self, follow: bool) -> Self {
        self.follow_transport = follow;
        self
    }

    /// Handles one system real-time status byte.
    pub fn on_realtime(&mut self, code: u8) {
        match code {
            codec::TIMING_CLOCK => self.on_timing_clock(),
            codec::START => {
                self.measurer.reset();
                self.transport.start();
                if self.follow_transport {
                    self.forward(codec::start());
                    self.run_generator();
                }
                info!("Transport start");
            }
            codec::CONTINUE => {
                self.transport.resume();
                if self.follow_transport {
                    self.forward(codec::continue_());
                    self.run_generator();
                }
                info!("Transport continue");
            }
            codec::STOP => {
                self.measurer.reset();
                self.transport.stop();
                if self.follow_transport {
                    self.generator.stop();
                    self.forward(codec::stop());
                }
                info!("Transport stop");
            }
            other => trace!("Ignoring real-time {:02X}", other),
        }
    }

    fn on_timing_clock(&mut self) {
        self.transport.tick();

        let Some(measured) = self.measurer.pulse() else {
            return;
        };
        let locked = self.pll.process(measured);
        let interval = convert(locked, self.measurer.timebase(), self.generator.timebase());
        if interval == 0 || interval == self.generator.get_interval() {
            return;
        }

        debug!(
            "Retuning generator to {} ({} BPM)",
            interval,
            ScaledTempo(self.generator.timebase().sbpm_for_interval(interval))
        );
        if let Err(e) = self.generator.set_interval(interval) {
            warn!("Failed to retune generator: {}", e);
        }
    }

    fn run_generator(&mut self) {
        if let Err(e) = self.generator.resume() {
            warn!("Failed to start generator: {}", e);
        }
    }

    fn forward(&self, packet: UmpPacket) {
        if let Err(e) = self.sink.send(packet) {
            trace!("Real-time packet not sent: {}", e);
        }
    }

    pub fn measurer(&self) -> &IntervalMeasurer<T> {
        &self.measurer
    }

    pub fn pll(&self) -> &PllController {
        &self.pll
    }

    pub fn generator(&self) -> &TickGenerator {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut TickGenerator {
        &mut self.generator
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }
}

/// Moves an interval between timebases through microseconds.
fn convert(interval: u32, from: Timebase, to: Timebase) -> u32 {
    if from == to {
        interval
    } else {
        to.us_to_interval(from.interval_to_us(interval))
    }
}

/// Decoder sink forwarding channel voice as UMP and feeding the follower.
pub struct Bridge<T: TimeSource> {
    follower: ClockFollower<T>,
    sink: Arc<dyn UmpSink>,
    forward_channel_voice: bool,
}

impl<T: TimeSource> Bridge<T> {
    pub fn new(follower: ClockFollower<T>, sink: Arc<dyn UmpSink>) -> Self {
        Self {
            follower,
            sink,
            forward_channel_voice: true,
        }
    }

    pub fn forward_channel_voice(mut self, forward: bool) -> Self {
        self.forward_channel_voice = forward;
        self
    }

    pub fn follower(&self) -> &ClockFollower<T> {
        &self.follower
    }

    pub fn follower_mut(&mut self) -> &mut ClockFollower<T> {
        &mut self.follower
    }

    fn voice(&self, packet: UmpPacket) {
        if !self.forward_channel_voice {
            return;
        }
        if let Err(e) = self.sink.send(packet) {
            trace!("Channel voice packet not sent: {}", e);
        }
    }
}

impl<T: TimeSource> EventSink for Bridge<T> {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        trace!(
            "Note on {} ch {} vel {}",
            note_name_with_octave(key, Accidentals::Sharps),
            channel + 1,
            velocity
        );
        self.voice(codec::note_on(channel, key, velocity));
    }

    fn note_off(&mut self, channel: u8, key: u8, velocity: u8) {
        trace!(
            "Note off {} ch {}",
            note_name_with_octave(key, Accidentals::Sharps),
            channel + 1
        );
        self.voice(codec::note_off(channel, key, velocity));
    }

    fn poly_aftertouch(&mut self, channel: u8, key: u8, pressure: u8) {
        self.voice(codec::poly_aftertouch(channel, key, pressure));
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.voice(codec::control_change(channel, controller, value));
    }

    fn program_change(&mut self, channel: u8, program: u8) {
        self.voice(codec::program_change(channel, program));
    }

    fn channel_aftertouch(&mut self, channel: u8, value: u8) {
        self.voice(codec::channel_aftertouch(channel, value));
    }

    fn pitch_wheel(&mut self, channel: u8, lsb: u8, msb: u8) {
        let value = (u16::from(msb) << 7) | u16::from(lsb);
        self.voice(codec::pitch_wheel(channel, value));
    }

    fn song_position(&mut self, position: u16) {
        self.follower.transport().set_song_position(position);
    }

    fn realtime(&mut self, code: u8) {
        self.follower.on_realtime(code);
    }
}
