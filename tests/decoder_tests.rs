use umpclockrs::midi::{DecodedEvent, Decoder, EventSink, ParserState};

fn decode(bytes: &[u8]) -> Vec<DecodedEvent> {
    let mut decoder = Decoder::new();
    let mut events = Vec::new();
    decoder.feed_all(bytes, &mut events);
    events
}

fn note_on(key: u8, velocity: u8) -> DecodedEvent {
    DecodedEvent::NoteOn {
        channel: 0,
        key,
        velocity,
    }
}

#[test]
fn test_single_note_on() {
    assert_eq!(decode(&[0x90, 0x40, 0x64]), vec![note_on(0x40, 0x64)]);
}

#[test]
fn test_running_status_note_on() {
    assert_eq!(
        decode(&[0x90, 0x40, 0x64, 0x41, 0x65]),
        vec![note_on(0x40, 0x64), note_on(0x41, 0x65)]
    );
}

#[test]
fn test_velocity_zero_is_note_off() {
    assert_eq!(
        decode(&[0x90, 0x40, 0x00]),
        vec![DecodedEvent::NoteOff {
            channel: 0,
            key: 0x40,
            velocity: 0
        }]
    );
}

#[test]
fn test_interleaved_realtime() {
    assert_eq!(
        decode(&[0x90, 0xF8, 0x40, 0x64]),
        vec![DecodedEvent::RealTime(0xF8), note_on(0x40, 0x64)]
    );
}

#[test]
fn test_realtime_between_data_bytes() {
    assert_eq!(
        decode(&[0x90, 0x40, 0xFA, 0x64]),
        vec![DecodedEvent::RealTime(0xFA), note_on(0x40, 0x64)]
    );
}

#[test]
fn test_data_without_status_is_discarded() {
    assert!(decode(&[0x40, 0x64, 0x01]).is_empty());
}

#[test]
fn test_new_status_drops_partial_message() {
    assert_eq!(
        decode(&[0x90, 0x40, 0xB0, 0x07, 0x64]),
        vec![DecodedEvent::ControlChange {
            channel: 0,
            controller: 0x07,
            value: 0x64
        }]
    );
}

#[test]
fn test_one_data_byte_messages_with_running_status() {
    assert_eq!(
        decode(&[0xC2, 0x05, 0x06, 0xD3, 0x40]),
        vec![
            DecodedEvent::ProgramChange {
                channel: 2,
                program: 5
            },
            DecodedEvent::ProgramChange {
                channel: 2,
                program: 6
            },
            DecodedEvent::ChannelAfterTouch {
                channel: 3,
                value: 0x40
            },
        ]
    );
}

#[test]
fn test_channel_voice_classes() {
    assert_eq!(
        decode(&[0x85, 0x3C, 0x10, 0xA1, 0x3C, 0x22, 0xEF, 0x00, 0x40]),
        vec![
            DecodedEvent::NoteOff {
                channel: 5,
                key: 0x3C,
                velocity: 0x10
            },
            DecodedEvent::PolyAfterTouch {
                channel: 1,
                key: 0x3C,
                pressure: 0x22
            },
            DecodedEvent::PitchWheel {
                channel: 15,
                lsb: 0x00,
                msb: 0x40
            },
        ]
    );
}

#[test]
fn test_system_common_messages() {
    assert_eq!(
        decode(&[0xF2, 0x10, 0x01, 0xF3, 0x04, 0xF1, 0x23, 0xF6]),
        vec![
            DecodedEvent::SongPosition(0x90),
            DecodedEvent::SongSelect(4),
            DecodedEvent::TimeCode(0x23),
            DecodedEvent::TuneRequest,
        ]
    );
}

#[test]
fn test_system_common_cancels_running_status() {
    let mut decoder = Decoder::new();
    let mut events = Vec::new();
    decoder.feed_all(&[0x90, 0x40, 0x64, 0xF6, 0x41, 0x65], &mut events);

    assert_eq!(events, vec![note_on(0x40, 0x64), DecodedEvent::TuneRequest]);
    assert_eq!(decoder.state(), ParserState::Idle);
    assert_eq!(decoder.running_status(), 0);
}

#[test]
fn test_sysex_contents_are_discarded() {
    assert_eq!(
        decode(&[0xF0, 0x7E, 0x01, 0x02, 0xF7, 0xF8]),
        vec![DecodedEvent::RealTime(0xF8)]
    );
}

#[test]
fn test_reset_clears_running_status() {
    let mut decoder = Decoder::new();
    let mut events = Vec::new();
    decoder.feed_all(&[0x90, 0x40, 0x64], &mut events);
    decoder.reset();
    decoder.feed_all(&[0x41, 0x65], &mut events);
    assert_eq!(events.len(), 1);
}

#[derive(Default)]
struct ClockCounter {
    clocks: usize,
}

impl EventSink for ClockCounter {
    fn realtime(&mut self, code: u8) {
        if code == 0xF8 {
            self.clocks += 1;
        }
    }
}

#[test]
fn test_unhandled_events_default_to_noop() {
    let mut decoder = Decoder::new();
    let mut sink = ClockCounter::default();
    decoder.feed_all(&[0x90, 0x40, 0x64, 0xF8, 0xB0, 0x01, 0x02, 0xF8], &mut sink);
    assert_eq!(sink.clocks, 2);
}
