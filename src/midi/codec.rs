//! MIDI 1.0 message encoders producing single-word UMPs
//!
//! Out-of-range arguments are masked to their bit-width (channel to 4 bits,
//! data to 7 bits, wheel values to 14 bits) the same way the wire format
//! truncates them. Nothing here fails.

use super::ump::{UmpPacket, MT_MIDI1_CHANNEL_VOICE, MT_SYSTEM};

/// UMP group used for every packet built here.
pub const UMP_GROUP: u8 = 0;

// Channel voice message classes (status high nibble).
pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_AFTERTOUCH: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
pub const PITCH_WHEEL: u8 = 0xE0;

// System common.
pub const SYSEX_START: u8 = 0xF0;
pub const TIME_CODE_QUARTER_FRAME: u8 = 0xF1;
pub const SONG_POSITION: u8 = 0xF2;
pub const SONG_SELECT: u8 = 0xF3;
pub const TUNE_REQUEST: u8 = 0xF6;
pub const SYSEX_END: u8 = 0xF7;

// System real-time.
pub const TIMING_CLOCK: u8 = 0xF8;
pub const START: u8 = 0xFA;
pub const CONTINUE: u8 = 0xFB;
pub const STOP: u8 = 0xFC;
pub const ACTIVE_SENSING: u8 = 0xFE;
pub const RESET: u8 = 0xFF;

/// First status byte of the system real-time range.
pub const REALTIME_MIN: u8 = 0xF8;

pub const PITCH_WHEEL_CENTER: u16 = 8192;

/// Standard controller numbers.
pub mod controller {
    pub const BANK_SELECT_MSB: u8 = 0x00;
    pub const MOD_WHEEL_MSB: u8 = 0x01;
    pub const BREATH_MSB: u8 = 0x02;
    pub const FOOT_MSB: u8 = 0x04;
    pub const PORTAMENTO_TIME_MSB: u8 = 0x05;
    pub const DATA_ENTRY_MSB: u8 = 0x06;
    pub const MAIN_VOLUME_MSB: u8 = 0x07;
    pub const BALANCE_MSB: u8 = 0x08;
    pub const PAN_MSB: u8 = 0x0A;
    pub const EXPRESSION_MSB: u8 = 0x0B;
    pub const BANK_SELECT_LSB: u8 = 0x20;
    pub const MOD_WHEEL_LSB: u8 = 0x21;
    pub const MAIN_VOLUME_LSB: u8 = 0x27;
    pub const SUSTAIN: u8 = 0x40;
    pub const PORTAMENTO: u8 = 0x41;
    pub const SOSTENUTO: u8 = 0x42;
    pub const SOFT_PEDAL: u8 = 0x43;
    pub const DATA_INCREMENT: u8 = 0x60;
    pub const DATA_DECREMENT: u8 = 0x61;
    pub const NRPN_LSB: u8 = 0x62;
    pub const NRPN_MSB: u8 = 0x63;
    pub const RPN_LSB: u8 = 0x64;
    pub const RPN_MSB: u8 = 0x65;
    pub const ALL_SOUNDS_OFF: u8 = 0x78;
    pub const RESET_CONTROLLERS: u8 = 0x79;
    pub const LOCAL_CONTROL: u8 = 0x7A;
    pub const ALL_NOTES_OFF: u8 = 0x7B;
    pub const OMNI_OFF: u8 = 0x7C;
    pub const OMNI_ON: u8 = 0x7D;
    pub const MONO: u8 = 0x7E;
    pub const POLY: u8 = 0x7F;
}

/// True for status bytes in the system real-time range (0xF8..=0xFF).
pub fn is_realtime(byte: u8) -> bool {
    byte >= REALTIME_MIN
}

fn channel_voice(class: u8, channel: u8, data1: u8, data2: u8) -> UmpPacket {
    UmpPacket::new(
        MT_MIDI1_CHANNEL_VOICE,
        UMP_GROUP,
        class | (channel & 0x0F),
        data1,
        data2,
    )
}

pub fn note_on(channel: u8, key: u8, velocity: u8) -> UmpPacket {
    channel_voice(NOTE_ON, channel, key, velocity)
}

pub fn note_off(channel: u8, key: u8, velocity: u8) -> UmpPacket {
    channel_voice(NOTE_OFF, channel, key, velocity)
}

pub fn poly_aftertouch(channel: u8, key: u8, pressure: u8) -> UmpPacket {
    channel_voice(POLY_AFTERTOUCH, channel, key, pressure)
}

pub fn control_change(channel: u8, controller: u8, value: u8) -> UmpPacket {
    channel_voice(CONTROL_CHANGE, channel, controller, value)
}

pub fn program_change(channel: u8, program: u8) -> UmpPacket {
    channel_voice(PROGRAM_CHANGE, channel, program, 0)
}

pub fn channel_aftertouch(channel: u8, value: u8) -> UmpPacket {
    channel_voice(CHANNEL_AFTERTOUCH, channel, value, 0)
}

/// Pitch wheel with a 14-bit value (0 low, 8192 centre, 16383 high), sent
/// LSB first.
pub fn pitch_wheel(channel: u8, value: u16) -> UmpPacket {
    let value = value & 0x3FFF;
    channel_voice(
        PITCH_WHEEL,
        channel,
        (value & 0x7F) as u8,
        (value >> 7) as u8,
    )
}

/// Modulation wheel with a 14-bit value: MSB on CC 1, then LSB on CC 33.
pub fn mod_wheel(channel: u8, value: u16) -> [UmpPacket; 2] {
    let value = value & 0x3FFF;
    [
        control_change(channel, controller::MOD_WHEEL_MSB, (value >> 7) as u8),
        control_change(channel, controller::MOD_WHEEL_LSB, (value & 0x7F) as u8),
    ]
}

/// Real-time message for any status byte; the low 3 bits select the code
/// within 0xF8..=0xFF.
pub fn realtime(code: u8) -> UmpPacket {
    UmpPacket::new(MT_SYSTEM, UMP_GROUP, REALTIME_MIN | (code & 0x07), 0, 0)
}

pub fn timing_clock() -> UmpPacket {
    realtime(TIMING_CLOCK)
}

pub fn start() -> UmpPacket {
    realtime(START)
}

pub fn continue_() -> UmpPacket {
    realtime(CONTINUE)
}

pub fn stop() -> UmpPacket {
    realtime(STOP)
}

pub fn active_sensing() -> UmpPacket {
    realtime(ACTIVE_SENSING)
}

pub fn reset() -> UmpPacket {
    realtime(RESET)
}

/// Signed pitch wheel offset from centre for a received LSB/MSB pair.
pub fn pitch_wheel_offset(lsb: u8, msb: u8) -> i16 {
    let value = (u16::from(msb & 0x7F) << 7) | u16::from(lsb & 0x7F);
    value as i16 - PITCH_WHEEL_CENTER as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_word() {
        assert_eq!(note_on(0, 0x40, 0x64).word(), 0x2090_4064);
        assert_eq!(note_off(15, 0x40, 0).word(), 0x208F_4000);
    }

    #[test]
    fn test_out_of_range_inputs_are_masked() {
        let packet = note_on(0x13, 0xC0, 0xFF);
        assert_eq!(packet.status(), 0x93);
        assert_eq!(packet.data1(), 0x40);
        assert_eq!(packet.data2(), 0x7F);

        let wheel = pitch_wheel(0, 0xFFFF);
        assert_eq!((wheel.data1(), wheel.data2()), (0x7F, 0x7F));
    }

    #[test]
    fn test_pitch_wheel_split() {
        let centre = pitch_wheel(2, PITCH_WHEEL_CENTER);
        assert_eq!(centre.status(), 0xE2);
        assert_eq!(centre.data1(), 0x00);
        assert_eq!(centre.data2(), 0x40);
        assert_eq!(pitch_wheel_offset(centre.data1(), centre.data2()), 0);
        assert_eq!(pitch_wheel_offset(0, 0), -8192);
        assert_eq!(pitch_wheel_offset(0x7F, 0x7F), 8191);
    }

    #[test]
    fn test_mod_wheel_pair() {
        let [msb, lsb] = mod_wheel(1, 0x3FFF);
        assert_eq!((msb.status(), msb.data1(), msb.data2()), (0xB1, 0x01, 0x7F));
        assert_eq!((lsb.status(), lsb.data1(), lsb.data2()), (0xB1, 0x21, 0x7F));
    }

    #[test]
    fn test_realtime_codes() {
        assert_eq!(timing_clock().word(), 0x10F8_0000);
        assert_eq!(start().status(), START);
        assert_eq!(continue_().status(), CONTINUE);
        assert_eq!(stop().status(), STOP);
        assert_eq!(active_sensing().status(), ACTIVE_SENSING);
        assert_eq!(reset().status(), RESET);
        assert_eq!(realtime(0x02).status(), START);
    }

    #[test]
    fn test_one_data_byte_classes() {
        assert_eq!(program_change(0, 42).to_midi1_bytes(), vec![0xC0, 42]);
        assert_eq!(channel_aftertouch(3, 90).to_midi1_bytes(), vec![0xD3, 90]);
    }
}
