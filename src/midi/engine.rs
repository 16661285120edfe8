use super::ump::UmpPacket;
use crate::error::{ClockError, Result};
use crossbeam::channel::{Receiver, Sender, TrySendError};
use log::trace;

/// Outbound destination for UMP packets.
///
/// `send` is called from the generator's firing path, so implementations must
/// return in bounded time without blocking. Delivery is best-effort; an `Err`
/// only says the packet was not accepted.
pub trait UmpSink: Send + Sync {
    fn send(&self, packet: UmpPacket) -> Result<()>;

    /// Whether the underlying transport is usable. Checked once at init.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Inbound MIDI 1.0 byte stream, drained one byte at a time.
pub trait ByteSource {
    /// Blocks until the next byte is available. `None` once the source has
    /// closed and no bytes remain.
    fn next_byte(&mut self) -> Option<u8>;
}

impl ByteSource for Receiver<u8> {
    fn next_byte(&mut self) -> Option<u8> {
        self.recv().ok()
    }
}

/// A sink that hands packets to a bounded queue drained by another thread.
///
/// Never blocks or allocates: a full queue drops the packet.
#[derive(Clone)]
pub struct ChannelSink {
    tx: Sender<UmpPacket>,
}

impl ChannelSink {
    pub fn new(tx: Sender<UmpPacket>) -> Self {
        Self { tx }
    }
}

impl UmpSink for ChannelSink {
    fn send(&self, packet: UmpPacket) -> Result<()> {
        self.tx.try_send(packet).map_err(|e| match e {
            TrySendError::Full(_) => ClockError::QueueFull,
            TrySendError::Disconnected(_) => ClockError::QueueClosed,
        })
    }
}

/// Sink for running without an output port: packets are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl UmpSink for LogSink {
    fn send(&self, packet: UmpPacket) -> Result<()> {
        trace!("UMP out: {:?}", packet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::codec;
    use crossbeam::channel::bounded;

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (tx, rx) = bounded(1);
        let sink = ChannelSink::new(tx);

        assert!(sink.send(codec::timing_clock()).is_ok());
        assert_eq!(sink.send(codec::timing_clock()), Err(ClockError::QueueFull));
        assert_eq!(rx.try_recv().ok(), Some(codec::timing_clock()));
    }

    #[test]
    fn test_channel_sink_reports_closed_queue() {
        let (tx, rx) = bounded(4);
        drop(rx);
        let sink = ChannelSink::new(tx);
        assert_eq!(sink.send(codec::start()), Err(ClockError::QueueClosed));
    }

    #[test]
    fn test_receiver_byte_source() {
        let (tx, mut rx) = bounded::<u8>(4);
        tx.send(0xF8).unwrap();
        drop(tx);
        assert_eq!(rx.next_byte(), Some(0xF8));
        assert_eq!(rx.next_byte(), None);
    }
}
