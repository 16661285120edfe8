//! MIDI 1.0 wire handling for umpclockrs
//!
//! This module provides:
//! - [`UmpPacket`], the 32-bit Universal MIDI Packet carried on the output side
//! - [`codec`] encoders for channel voice and real-time messages
//! - [`Decoder`], a running-status byte stream parser dispatching to an [`EventSink`]
//! - [`UmpSink`] and [`ByteSource`] traits for the transports at either end
//! - Host ports via midir and in-memory doubles for tests
//!
pub mod codec;
pub mod decoder;
mod engine;
pub mod midir_engine;
pub mod mock_engine;
pub mod ump;

pub use decoder::{DecodedEvent, Decoder, EventSink, ParserState};
pub use engine::{ByteSource, ChannelSink, LogSink, UmpSink};
pub use midir_engine::{list_devices, open_input, MidirInput, MidirOutput};
pub use mock_engine::{RecordingSink, ScriptedBytes};
pub use ump::UmpPacket;
