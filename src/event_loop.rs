// event_loop.rs

use crate::midi::{ByteSource, Decoder, EventSink};
use log::{debug, info};

/// Drains a byte source into the decoder, one byte at a time.
pub struct InputLoop<B: ByteSource, S: EventSink> {
    source: B,
    decoder: Decoder,
    sink: S,
    bytes_read: u64,
}

impl<B: ByteSource, S: EventSink> InputLoop<B, S> {
    pub fn new(source: B, sink: S) -> Self {
        InputLoop {
            source,
            decoder: Decoder::new(),
            sink,
            bytes_read: 0,
        }
    }

    /// Blocks until the source closes, then hands back the sink.
    pub fn run(mut self) -> S {
        info!("Input loop running");
        while let Some(byte) = self.source.next_byte() {
            self.bytes_read += 1;
            self.decoder.feed(byte, &mut self.sink);
        }
        debug!("Input source closed after {} bytes", self.bytes_read);
        self.sink
    }

    /// Processes bytes until the source closes or `limit` bytes were read.
    /// Returns how many were processed.
    pub fn pump(&mut self, limit: usize) -> usize {
        let mut processed = 0;
        while processed < limit {
            let Some(byte) = self.source.next_byte() else {
                break;
            };
            self.bytes_read += 1;
            self.decoder.feed(byte, &mut self.sink);
            processed += 1;
        }
        processed
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
