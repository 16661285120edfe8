//! Host MIDI ports via midir
//!
//! The receive callback only moves bytes into a bounded queue; decoding
//! happens on the input loop thread. Outbound packets go through a second
//! queue to a thread that owns the output connection, so the generator's
//! firing path never touches the port.

use super::engine::ChannelSink;
use super::ump::UmpPacket;
use crate::error::{ClockError, Result};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info, trace, warn};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use std::thread::{self, JoinHandle};

const CLIENT_NAME: &str = "umpclockrs";

#[cfg(not(feature = "test-mock"))]
pub fn list_devices() -> Vec<String> {
    let mut devices = Vec::new();

    if let Ok(midi_in) = MidiInput::new("umpclockrs-list-in") {
        for port in midi_in.ports() {
            if let Ok(name) = midi_in.port_name(&port) {
                devices.push(format!("{} [Input]", name));
            }
        }
    }

    if let Ok(midi_out) = MidiOutput::new("umpclockrs-list-out") {
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                devices.push(format!("{} [Output]", name));
            }
        }
    }

    devices
}

#[cfg(feature = "test-mock")]
pub fn list_devices() -> Vec<String> {
    // Fixed list so CLI tests do not depend on the host's ports
    vec!["Mock Device 1".to_string(), "Mock Device 2".to_string()]
}

/// An open input port feeding raw bytes into a queue.
///
/// The connection closes when this is dropped, which in turn disconnects the
/// queue once the receive callback is gone.
pub struct MidirInput {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidirInput {
    /// Connects to the first input port whose name contains `device_name`.
    /// Bytes that do not fit in `queue` are dropped.
    pub fn connect(device_name: &str, queue: Sender<u8>) -> Result<Self> {
        let mut midi_in = MidiInput::new(&format!("{}-in", CLIENT_NAME))
            .map_err(|e| ClockError::Connection(e.to_string()))?;
        // Timing clock and active sensing are filtered by default.
        midi_in.ignore(Ignore::None);

        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|p| midi_in.port_name(p).unwrap_or_default().contains(device_name))
            .ok_or_else(|| {
                ClockError::Connection(format!("input device '{}' not found", device_name))
            })?;
        let port_name = midi_in.port_name(port).unwrap_or_default();
        info!("Connecting to MIDI input port: {}", port_name);

        let connection = midi_in
            .connect(
                port,
                &format!("{}-input", CLIENT_NAME),
                move |_stamp, message, _| {
                    for &byte in message {
                        match queue.try_send(byte) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                trace!("Input queue full, dropping byte {:02X}", byte)
                            }
                            Err(TrySendError::Disconnected(_)) => return,
                        }
                    }
                },
                (),
            )
            .map_err(|e| ClockError::Connection(e.to_string()))?;

        Ok(MidirInput {
            _connection: connection,
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Opens `device_name` for input and returns the port with the receiving end
/// of a queue of `queue_len` bytes.
pub fn open_input(device_name: &str, queue_len: usize) -> Result<(MidirInput, Receiver<u8>)> {
    let (tx, rx) = bounded(queue_len);
    let input = MidirInput::connect(device_name, tx)?;
    Ok((input, rx))
}

/// An output port driven by its own thread.
///
/// The thread exits when every [`ChannelSink`] for it has been dropped.
pub struct MidirOutput {
    port_name: String,
    handle: Option<JoinHandle<()>>,
}

impl MidirOutput {
    /// Connects to the first output port whose name contains `device_name`
    /// and returns a sink feeding it through a queue of `queue_len` packets.
    pub fn connect(device_name: &str, queue_len: usize) -> Result<(Self, ChannelSink)> {
        let midi_out = MidiOutput::new(&format!("{}-out", CLIENT_NAME))
            .map_err(|e| ClockError::Connection(e.to_string()))?;

        let ports = midi_out.ports();
        let available: Vec<String> = ports
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect();
        debug!("Available MIDI output ports: {:?}", available);

        let port = ports
            .iter()
            .find(|p| midi_out.port_name(p).unwrap_or_default().contains(device_name))
            .ok_or_else(|| {
                ClockError::Connection(format!("output device '{}' not found", device_name))
            })?;
        let port_name = midi_out.port_name(port).unwrap_or_default();
        info!("Connecting to MIDI output port: {}", port_name);

        let connection = midi_out
            .connect(port, &format!("{}-output", CLIENT_NAME))
            .map_err(|e| ClockError::Connection(e.to_string()))?;

        let (tx, rx) = bounded(queue_len);
        let handle = thread::Builder::new()
            .name("midi-output".to_string())
            .spawn(move || run_output(connection, rx))
            .map_err(|e| ClockError::Connection(e.to_string()))?;

        Ok((
            MidirOutput {
                port_name,
                handle: Some(handle),
            },
            ChannelSink::new(tx),
        ))
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Waits for the output thread to drain and exit. Only returns once all
    /// sinks have been dropped.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("MIDI output thread panicked");
            }
        }
    }
}

fn run_output(mut connection: MidiOutputConnection, rx: Receiver<UmpPacket>) {
    while let Ok(packet) = rx.recv() {
        let bytes = packet.to_midi1_bytes();
        if bytes.is_empty() {
            trace!("Skipping packet with no MIDI 1.0 form: {:?}", packet);
            continue;
        }
        if let Err(e) = connection.send(&bytes) {
            warn!("MIDI output send failed: {}", e);
        }
    }
    debug!("MIDI output queue closed");
    connection.close();
}
