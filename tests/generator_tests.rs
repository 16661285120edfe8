use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use umpclockrs::clock::{CountingPin, DebugPin, ManualTimer, ThreadTimer, TickGenerator, Timer};
use umpclockrs::midi::{codec, RecordingSink};
use umpclockrs::tempo::Timebase;
use umpclockrs::ClockError;

const TIMING_CLOCK: u8 = 0xF8;

fn generator_with(timer: ManualTimer) -> (TickGenerator, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let generator = TickGenerator::new(sink.clone(), Box::new(timer)).unwrap();
    (generator, sink)
}

#[test]
fn test_emits_one_packet_per_interval() {
    let timer = ManualTimer::new();
    let (mut generator, sink) = generator_with(timer.clone());

    generator.start(1000).unwrap();
    timer.advance(5000);

    assert_eq!(timer.fired_at(), vec![1000, 2000, 3000, 4000, 5000]);
    assert_eq!(sink.count_status(TIMING_CLOCK), 5);
    assert_eq!(generator.pulses_emitted(), 5);
    assert!(sink
        .packets()
        .iter()
        .all(|p| *p == codec::timing_clock()));
}

#[test]
fn test_retune_before_first_pulse() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start(1000).unwrap();
    generator.set_interval(500).unwrap();
    timer.advance(1500);

    assert_eq!(&timer.fired_at()[..2], &[500, 1000]);
    assert_eq!(generator.get_interval(), 500);
}

#[test]
fn test_retune_is_anchored_to_previous_pulse() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start(1000).unwrap();
    timer.advance(1200);
    generator.set_interval(1500).unwrap();
    timer.advance(3000);

    assert_eq!(timer.fired_at(), vec![1000, 2500, 4000]);
}

#[test]
fn test_retune_past_due_fires_immediately() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start(1000).unwrap();
    timer.advance(1700);
    generator.set_interval(500).unwrap();
    timer.advance(0);

    assert_eq!(timer.fired_at(), vec![1000, 1700]);
    assert_eq!(timer.next_deadline(), Some(2200));
}

#[test]
fn test_stop_is_idempotent() {
    let timer = ManualTimer::new();
    let (mut generator, sink) = generator_with(timer.clone());

    generator.start(1000).unwrap();
    timer.advance(2500);
    generator.stop();
    generator.stop();
    timer.advance(10_000);

    assert!(!generator.is_running());
    assert!(!timer.is_armed());
    assert_eq!(sink.count_status(TIMING_CLOCK), 2);
    assert_eq!(generator.get_interval(), 1000);
}

#[test]
fn test_resume_keeps_interval() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start(800).unwrap();
    generator.stop();
    generator.resume().unwrap();

    assert!(generator.is_running());
    assert_eq!(generator.get_interval(), 800);
    assert_eq!(timer.next_deadline(), Some(800));
}

#[test]
fn test_zero_interval_is_ignored() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start(0).unwrap();
    assert!(!generator.is_running());
    assert!(!timer.is_armed());

    generator.start(1000).unwrap();
    generator.set_interval(0).unwrap();
    assert_eq!(generator.get_interval(), 1000);
}

#[test]
fn test_start_while_running_retunes() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start(1000).unwrap();
    generator.start(600).unwrap();
    assert_eq!(generator.get_interval(), 600);
    assert_eq!(timer.next_deadline(), Some(600));
}

#[test]
fn test_tempo_api() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start_sbpm(12000).unwrap();
    assert_eq!(generator.get_interval(), 20_833);
    assert_eq!(generator.get_tempo(), 12000);

    generator.set_sbpm(6000).unwrap();
    assert_eq!(generator.get_interval(), 41_667);
    assert_eq!(generator.readout().sbpm(), 6000);
}

#[test]
fn test_counter_timebase_generator() {
    let timer = ManualTimer::with_timebase(Timebase::Ticks {
        clock_hz: 48_000_000,
    });
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start_sbpm(12000).unwrap();
    assert_eq!(generator.get_interval(), 1_000_000);
    timer.advance(3_000_000);
    assert_eq!(generator.pulses_emitted(), 3);
}

#[test]
fn test_failed_retune_stops_generator() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());

    generator.start(1000).unwrap();
    timer.fail_next();
    let result = generator.set_interval(700);

    assert!(matches!(result, Err(ClockError::SchedulingFailure(_))));
    assert!(!generator.is_running());
    assert!(!timer.is_armed());
}

#[test]
fn test_not_ready_sink_is_rejected() {
    let sink = Arc::new(RecordingSink::not_ready());
    let result = TickGenerator::new(sink, Box::new(ManualTimer::new()));
    assert!(matches!(result, Err(ClockError::DeviceNotReady(_))));
}

#[test]
fn test_debug_pin_follows_pulses() {
    let timer = ManualTimer::new();
    let pin = CountingPin::new();
    let sink = Arc::new(RecordingSink::new());
    let mut generator =
        TickGenerator::with_debug_pin(sink, Box::new(timer.clone()), Box::new(pin.clone()))
            .unwrap();

    generator.start(100).unwrap();
    timer.advance(1000);
    assert_eq!(pin.toggles(), 10);
}

#[test]
fn test_readout_from_another_thread() {
    let timer = ManualTimer::new();
    let (mut generator, _sink) = generator_with(timer.clone());
    let readout = generator.readout();

    generator.start(1000).unwrap();
    timer.advance(3000);

    let handle = thread::spawn(move || (readout.is_running(), readout.pulses_emitted()));
    assert_eq!(handle.join().unwrap(), (true, 3));
}

#[test]
fn test_thread_timer_drives_generator() {
    let timer = ThreadTimer::new().unwrap();
    assert_eq!(timer.timebase(), Timebase::Micros);

    let sink = Arc::new(RecordingSink::new());
    let mut generator = TickGenerator::new(sink.clone(), Box::new(timer)).unwrap();

    generator.start(2_000).unwrap();
    thread::sleep(Duration::from_millis(60));
    generator.stop();
    let emitted = sink.count_status(TIMING_CLOCK);
    thread::sleep(Duration::from_millis(20));

    assert!(emitted >= 5, "only {} pulses", emitted);
    assert!(sink.count_status(TIMING_CLOCK) <= emitted + 1);
}

/// Records when each pulse went out.
#[derive(Clone, Default)]
struct StampPin {
    stamps: Arc<Mutex<Vec<Instant>>>,
}

impl DebugPin for StampPin {
    fn toggle(&self) {
        self.stamps.lock().unwrap().push(Instant::now());
    }
}

#[test]
fn test_thread_timer_past_due_retune_spacing() {
    let pin = StampPin::default();
    let sink = Arc::new(RecordingSink::new());
    let mut generator = TickGenerator::with_debug_pin(
        sink,
        Box::new(ThreadTimer::new().unwrap()),
        Box::new(pin.clone()),
    )
    .unwrap();

    generator.start(100_000).unwrap();
    thread::sleep(Duration::from_millis(170));
    generator.set_interval(50_000).unwrap();
    thread::sleep(Duration::from_millis(100));
    generator.stop();

    let stamps = pin.stamps.lock().unwrap().clone();
    assert!(stamps.len() >= 3, "only {} pulses", stamps.len());
    // The retune was past due, so a pulse went out at once and the new
    // interval runs from it.
    let catch_up = stamps[1].duration_since(stamps[0]);
    let next = stamps[2].duration_since(stamps[1]);
    assert!(catch_up >= Duration::from_millis(60), "{:?}", catch_up);
    assert!(
        next >= Duration::from_millis(40) && next <= Duration::from_millis(80),
        "next pulse {:?} after the catch-up",
        next
    );
}
