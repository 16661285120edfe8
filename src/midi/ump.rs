use std::fmt;

/// UMP message type for system common and real-time messages.
pub const MT_SYSTEM: u8 = 0x1;
/// UMP message type for MIDI 1.0 channel voice messages.
pub const MT_MIDI1_CHANNEL_VOICE: u8 = 0x2;

/// A 32-bit Universal MIDI Packet carrying one MIDI 1.0 message.
///
/// Layout, most significant nibble first:
/// `[message type][group][status byte][data1][data2]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UmpPacket(u32);

impl UmpPacket {
    pub const fn from_word(word: u32) -> Self {
        UmpPacket(word)
    }

    /// Builds a packet, masking every field to its bit-width.
    pub const fn new(message_type: u8, group: u8, status: u8, data1: u8, data2: u8) -> Self {
        UmpPacket(
            ((message_type as u32 & 0x0F) << 28)
                | ((group as u32 & 0x0F) << 24)
                | ((status as u32) << 16)
                | ((data1 as u32 & 0x7F) << 8)
                | (data2 as u32 & 0x7F),
        )
    }

    pub const fn word(&self) -> u32 {
        self.0
    }

    pub const fn message_type(&self) -> u8 {
        ((self.0 >> 28) & 0x0F) as u8
    }

    pub const fn group(&self) -> u8 {
        ((self.0 >> 24) & 0x0F) as u8
    }

    pub const fn status(&self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub const fn data1(&self) -> u8 {
        ((self.0 >> 8) & 0x7F) as u8
    }

    pub const fn data2(&self) -> u8 {
        (self.0 & 0x7F) as u8
    }

    /// Channel nibble of a channel voice packet.
    pub const fn channel(&self) -> u8 {
        self.status() & 0x0F
    }

    /// MIDI 1.0 wire bytes for this packet: 1 byte for real-time, 2 for
    /// program change / channel aftertouch, 3 for the other channel voice
    /// classes. Unknown message types yield an empty slice.
    pub fn to_midi1_bytes(&self) -> Vec<u8> {
        match self.message_type() {
            MT_SYSTEM => vec![self.status()],
            MT_MIDI1_CHANNEL_VOICE => match self.status() & 0xF0 {
                0xC0 | 0xD0 => vec![self.status(), self.data1()],
                _ => vec![self.status(), self.data1(), self.data2()],
            },
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for UmpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UmpPacket(mt={:X} group={} status={:02X} {:02X} {:02X})",
            self.message_type(),
            self.group(),
            self.status(),
            self.data1(),
            self.data2()
        )
    }
}

impl From<UmpPacket> for u32 {
    fn from(packet: UmpPacket) -> Self {
        packet.0
    }
}
