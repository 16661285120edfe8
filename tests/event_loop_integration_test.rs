extern crate umpclockrs;

use crossbeam::channel::bounded;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use umpclockrs::clock::{
    IntervalMeasurer, ManualTimer, MeasureMode, MonotonicMicros, PllController, PllTuning,
    TickGenerator,
};
use umpclockrs::create_shared_transport;
use umpclockrs::event_loop::InputLoop;
use umpclockrs::midi::{codec, ChannelSink, RecordingSink, UmpSink};
use umpclockrs::sync::{Bridge, ClockFollower};

#[test]
fn integration_test_input_thread_follows_clock() {
    let sink = Arc::new(RecordingSink::new());
    let transport = create_shared_transport();

    let measurer = IntervalMeasurer::new(MonotonicMicros::new(), MeasureMode::PerPulse);
    let pll = PllController::new(20_833, PllTuning::default());
    let generator = TickGenerator::new(sink.clone(), Box::new(ManualTimer::new())).unwrap();
    let follower = ClockFollower::new(measurer, pll, generator, transport.clone(), sink.clone());
    let bridge = Bridge::new(follower, sink.clone());

    let (byte_tx, byte_rx) = bounded::<u8>(16);
    let handle = thread::spawn(move || InputLoop::new(byte_rx, bridge).run());

    byte_tx.send(codec::START).unwrap();
    byte_tx.send(codec::TIMING_CLOCK).unwrap();
    thread::sleep(Duration::from_millis(20));
    byte_tx.send(codec::TIMING_CLOCK).unwrap();
    for byte in [0x90, 0x3C, 0x64] {
        byte_tx.send(byte).unwrap();
    }

    // Closing the channel ends the input loop.
    drop(byte_tx);
    let bridge = handle.join().expect("Input loop thread panicked");

    let follower = bridge.follower();
    assert_eq!(transport.pulse_count(), 2);
    assert!(follower.measurer().is_valid());
    assert!(follower.measurer().interval() >= 10_000);
    assert!(follower.generator().is_running());
    assert_eq!(sink.count_status(codec::START), 1);
    assert_eq!(sink.count_status(0x90), 1);
}

#[test]
fn integration_test_channel_sink_backpressure() {
    let (tx, rx) = bounded(2);
    let sink = ChannelSink::new(tx);
    assert!(sink.send(codec::timing_clock()).is_ok());
    assert!(sink.send(codec::timing_clock()).is_ok());
    assert!(sink.send(codec::timing_clock()).is_err());

    assert_eq!(rx.try_iter().count(), 2);
    drop(rx);
    assert!(sink.send(codec::timing_clock()).is_err());
}
