//! Running-status MIDI 1.0 byte stream decoder
//!
//! Bytes are consumed strictly in order, one at a time, and complete messages
//! are dispatched synchronously to an [`EventSink`]. Handlers run to
//! completion before the next byte is accepted, so they must not block.

use super::codec::{
    is_realtime, CHANNEL_AFTERTOUCH, CONTROL_CHANGE, NOTE_OFF, NOTE_ON, PITCH_WHEEL,
    POLY_AFTERTOUCH, PROGRAM_CHANGE, SONG_POSITION, SONG_SELECT, TIME_CODE_QUARTER_FRAME,
    TUNE_REQUEST,
};
use log::trace;

/// Where the decoder is within a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// No usable status; data bytes are discarded.
    #[default]
    Idle,
    AwaitingData1 {
        status: u8,
    },
    AwaitingData2 {
        status: u8,
        data1: u8,
    },
}

/// A complete message recovered from the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    PolyAfterTouch { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelAfterTouch { channel: u8, value: u8 },
    PitchWheel { channel: u8, lsb: u8, msb: u8 },
    TimeCode(u8),
    SongPosition(u16),
    SongSelect(u8),
    TuneRequest,
    RealTime(u8),
}

impl DecodedEvent {
    /// Delivers this event to the matching handler of `sink`.
    pub fn dispatch<S: EventSink + ?Sized>(self, sink: &mut S) {
        match self {
            DecodedEvent::NoteOn {
                channel,
                key,
                velocity,
            } => sink.note_on(channel, key, velocity),
            DecodedEvent::NoteOff {
                channel,
                key,
                velocity,
            } => sink.note_off(channel, key, velocity),
            DecodedEvent::PolyAfterTouch {
                channel,
                key,
                pressure,
            } => sink.poly_aftertouch(channel, key, pressure),
            DecodedEvent::ControlChange {
                channel,
                controller,
                value,
            } => sink.control_change(channel, controller, value),
            DecodedEvent::ProgramChange { channel, program } => {
                sink.program_change(channel, program)
            }
            DecodedEvent::ChannelAfterTouch { channel, value } => {
                sink.channel_aftertouch(channel, value)
            }
            DecodedEvent::PitchWheel { channel, lsb, msb } => sink.pitch_wheel(channel, lsb, msb),
            DecodedEvent::TimeCode(value) => sink.time_code(value),
            DecodedEvent::SongPosition(position) => sink.song_position(position),
            DecodedEvent::SongSelect(song) => sink.song_select(song),
            DecodedEvent::TuneRequest => sink.tune_request(),
            DecodedEvent::RealTime(code) => sink.realtime(code),
        }
    }
}

/// Receiver of decoded events. Every handler defaults to a no-op so a sink
/// only implements what it cares about.
pub trait EventSink {
    fn note_on(&mut self, _channel: u8, _key: u8, _velocity: u8) {}
    fn note_off(&mut self, _channel: u8, _key: u8, _velocity: u8) {}
    fn poly_aftertouch(&mut self, _channel: u8, _key: u8, _pressure: u8) {}
    fn control_change(&mut self, _channel: u8, _controller: u8, _value: u8) {}
    fn program_change(&mut self, _channel: u8, _program: u8) {}
    fn channel_aftertouch(&mut self, _channel: u8, _value: u8) {}
    fn pitch_wheel(&mut self, _channel: u8, _lsb: u8, _msb: u8) {}
    fn time_code(&mut self, _value: u8) {}
    fn song_position(&mut self, _position: u16) {}
    fn song_select(&mut self, _song: u8) {}
    fn tune_request(&mut self) {}
    fn realtime(&mut self, _code: u8) {}
}

/// Collects every event in arrival order.
impl EventSink for Vec<DecodedEvent> {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        self.push(DecodedEvent::NoteOn {
            channel,
            key,
            velocity,
        });
    }

    fn note_off(&mut self, channel: u8, key: u8, velocity: u8) {
        self.push(DecodedEvent::NoteOff {
            channel,
            key,
            velocity,
        });
    }

    fn poly_aftertouch(&mut self, channel: u8, key: u8, pressure: u8) {
        self.push(DecodedEvent::PolyAfterTouch {
            channel,
            key,
            pressure,
        });
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.push(DecodedEvent::ControlChange {
            channel,
            controller,
            value,
        });
    }

    fn program_change(&mut self, channel: u8, program: u8) {
        self.push(DecodedEvent::ProgramChange { channel, program });
    }

    fn channel_aftertouch(&mut self, channel: u8, value: u8) {
        self.push(DecodedEvent::ChannelAfterTouch { channel, value });
    }

    fn pitch_wheel(&mut self, channel: u8, lsb: u8, msb: u8) {
        self.push(DecodedEvent::PitchWheel { channel, lsb, msb });
    }

    fn time_code(&mut self, value: u8) {
        self.push(DecodedEvent::TimeCode(value));
    }

    fn song_position(&mut self, position: u16) {
        self.push(DecodedEvent::SongPosition(position));
    }

    fn song_select(&mut self, song: u8) {
        self.push(DecodedEvent::SongSelect(song));
    }

    fn tune_request(&mut self) {
        self.push(DecodedEvent::TuneRequest);
    }

    fn realtime(&mut self, code: u8) {
        self.push(DecodedEvent::RealTime(code));
    }
}

/// Running-status decoder for a single MIDI 1.0 byte stream.
#[derive(Debug, Default)]
pub struct Decoder {
    state: ParserState,
    running_status: u8,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Last channel or system common status byte, 0 when there is none.
    pub fn running_status(&self) -> u8 {
        self.running_status
    }

    /// Drops any partial message and the running status.
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.running_status = 0;
    }

    /// Consumes every byte of `bytes` in order.
    pub fn feed_all<S: EventSink + ?Sized>(&mut self, bytes: &[u8], sink: &mut S) {
        for &byte in bytes {
            self.feed(byte, sink);
        }
    }

    /// Consumes one byte, dispatching at most one event.
    pub fn feed<S: EventSink + ?Sized>(&mut self, byte: u8, sink: &mut S) {
        if byte & 0x80 != 0 {
            self.status_byte(byte, sink);
        } else {
            self.data_byte(byte, sink);
        }
    }

    fn status_byte<S: EventSink + ?Sized>(&mut self, byte: u8, sink: &mut S) {
        if is_realtime(byte) {
            // May arrive between the bytes of another message; leave it intact.
            sink.realtime(byte);
            return;
        }

        if byte == TUNE_REQUEST {
            self.reset();
            sink.tune_request();
            return;
        }

        self.running_status = byte;
        self.state = ParserState::AwaitingData1 { status: byte };
    }

    fn data_byte<S: EventSink + ?Sized>(&mut self, byte: u8, sink: &mut S) {
        match self.state {
            ParserState::Idle => {
                trace!("Discarding data byte {:02X} without status", byte);
            }
            ParserState::AwaitingData1 { status } => self.first_data_byte(status, byte, sink),
            ParserState::AwaitingData2 { status, data1 } => {
                self.second_data_byte(status, data1, byte, sink)
            }
        }
    }

    fn first_data_byte<S: EventSink + ?Sized>(&mut self, status: u8, data1: u8, sink: &mut S) {
        let channel = status & 0x0F;
        match status & 0xF0 {
            PROGRAM_CHANGE => sink.program_change(channel, data1),
            CHANNEL_AFTERTOUCH => sink.channel_aftertouch(channel, data1),
            NOTE_OFF | NOTE_ON | POLY_AFTERTOUCH | CONTROL_CHANGE | PITCH_WHEEL => {
                self.state = ParserState::AwaitingData2 { status, data1 };
            }
            _ => match status {
                TIME_CODE_QUARTER_FRAME => {
                    self.reset();
                    sink.time_code(data1);
                }
                SONG_SELECT => {
                    self.reset();
                    sink.song_select(data1);
                }
                SONG_POSITION => {
                    self.state = ParserState::AwaitingData2 { status, data1 };
                }
                _ => trace!("Discarding data byte {:02X} after status {:02X}", data1, status),
            },
        }
    }

    fn second_data_byte<S: EventSink + ?Sized>(
        &mut self,
        status: u8,
        data1: u8,
        data2: u8,
        sink: &mut S,
    ) {
        if status == SONG_POSITION {
            self.reset();
            sink.song_position(u16::from(data1) | (u16::from(data2) << 7));
            return;
        }

        // Running status persists for further data pairs.
        self.state = ParserState::AwaitingData1 { status };

        let channel = status & 0x0F;
        match self.running_status & 0xF0 {
            NOTE_ON if data2 == 0 => sink.note_off(channel, data1, data2),
            NOTE_ON => sink.note_on(channel, data1, data2),
            NOTE_OFF => sink.note_off(channel, data1, data2),
            POLY_AFTERTOUCH => sink.poly_aftertouch(channel, data1, data2),
            CONTROL_CHANGE => sink.control_change(channel, data1, data2),
            PITCH_WHEEL => sink.pitch_wheel(channel, data1, data2),
            _ => trace!("Ignoring message with status {:02X}", status),
        }
    }
}
