use super::engine::{ByteSource, UmpSink};
use super::ump::UmpPacket;
use crate::error::{ClockError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Sink that keeps every packet it is given, for tests and simulations.
#[derive(Default)]
pub struct RecordingSink {
    packets: Mutex<Vec<UmpPacket>>,
    not_ready: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that reports itself unavailable at init.
    pub fn not_ready() -> Self {
        let sink = Self::default();
        sink.not_ready.store(true, Ordering::SeqCst);
        sink
    }

    pub fn packets(&self) -> Vec<UmpPacket> {
        self.packets
            .lock()
            .map(|packets| packets.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.packets.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of recorded packets with the given status byte.
    pub fn count_status(&self, status: u8) -> usize {
        self.packets
            .lock()
            .map(|p| p.iter().filter(|packet| packet.status() == status).count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut packets) = self.packets.lock() {
            packets.clear();
        }
    }
}

impl UmpSink for RecordingSink {
    fn send(&self, packet: UmpPacket) -> Result<()> {
        self.packets
            .lock()
            .map(|mut packets| packets.push(packet))
            .map_err(|_| ClockError::Send("recording sink poisoned".to_string()))
    }

    fn is_ready(&self) -> bool {
        !self.not_ready.load(Ordering::SeqCst)
    }
}

/// Byte source replaying a fixed script, then reporting closed.
#[derive(Debug, Default, Clone)]
pub struct ScriptedBytes {
    bytes: VecDeque<u8>,
}

impl ScriptedBytes {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.iter().copied().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl ByteSource for ScriptedBytes {
    fn next_byte(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }
}
