use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{thread, time::Duration};
use umpclockrs::{
    cli::{handle_device_list, validate_device, Args},
    clock::{
        DebugPin, FreeRunningCounter, IntervalMeasurer, LogPin, MonotonicMicros, NoopPin,
        PllController, ThreadTimer, TickGenerator, TimeSource,
    },
    config::{Settings, TimebaseKind},
    create_scheduler, create_shared_transport,
    event_loop::InputLoop,
    logging,
    midi::{open_input, LogSink, MidirInput, MidirOutput, UmpSink},
    sync::{Bridge, ClockFollower},
    telemetry::{run_inspector, Telemetry},
    tempo::ScaledTempo,
    Scheduler, SharedTransport,
};

fn main() {
    let args = Args::parse();
    let settings = load_settings(&args);
    initialize_logging(&args, &settings);

    let devices = handle_device_list();
    if args.device_list {
        list_available_devices(&devices);
        return;
    }

    for device_name in [&settings.input_device, &settings.output_device]
        .into_iter()
        .flatten()
    {
        if let Err(error_msg) = validate_device(device_name, &devices) {
            exit_with_error(&error_msg);
        }
    }

    let (output, sink) = initialize_output(&settings);
    let generator = initialize_generator(&settings, sink.clone());
    let transport = create_shared_transport();
    let running = Arc::new(AtomicBool::new(true));

    // Ports and the free-running generator must outlive the loop below.
    let (input, generator) = match settings.input_device.clone() {
        Some(device_name) => {
            let input = match settings.timebase {
                TimebaseKind::Micros => run_follow_mode(
                    MonotonicMicros::new(),
                    &device_name,
                    &settings,
                    generator,
                    sink.clone(),
                    transport,
                    &running,
                ),
                TimebaseKind::Counter if settings.counter_counts_down => run_follow_mode(
                    FreeRunningCounter::down(settings.counter_hz),
                    &device_name,
                    &settings,
                    generator,
                    sink.clone(),
                    transport,
                    &running,
                ),
                TimebaseKind::Counter => run_follow_mode(
                    FreeRunningCounter::new(settings.counter_hz),
                    &device_name,
                    &settings,
                    generator,
                    sink.clone(),
                    transport,
                    &running,
                ),
            };
            (Some(input), None)
        }
        None => (
            None,
            Some(run_free_mode(&settings, generator, transport, &running)),
        ),
    };

    run_application_loop(&running);

    // The output thread drains its queue once the last sink is gone.
    drop(generator);
    drop(input);
    drop(sink);
    if let Some(output) = output {
        output.join();
    }
}

fn load_settings(args: &Args) -> Settings {
    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => exit_with_error(&e.to_string()),
    };
    if let Err(e) = settings.apply_args(args) {
        exit_with_error(&e.to_string());
    }
    if let Err(e) = settings.validate() {
        exit_with_error(&e.to_string());
    }
    settings
}

fn initialize_logging(args: &Args, settings: &Settings) {
    let level = settings.level_filter();
    if args.log_stderr {
        logging::init_stderr_logger(level);
    } else if let Err(e) = logging::init_logger(level) {
        logging::init_stderr_logger(level);
        log::warn!("File logging unavailable ({}), logging to stderr", e);
    }
    log::info!("Application starting");
}

fn list_available_devices(devices: &[String]) {
    println!("Available MIDI devices:");
    for device in devices {
        println!("  - {}", device);
    }
}

fn exit_with_error(error_msg: &str) -> ! {
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    std::process::exit(1);
}

fn initialize_output(settings: &Settings) -> (Option<MidirOutput>, Arc<dyn UmpSink>) {
    match &settings.output_device {
        Some(device_name) => match MidirOutput::connect(device_name, settings.output_queue_len) {
            Ok((output, sink)) => {
                println!("Sending clock to MIDI device: {}", output.port_name());
                (Some(output), Arc::new(sink))
            }
            Err(e) => exit_with_error(&format!("Error connecting to MIDI output: {}", e)),
        },
        None => {
            log::info!("No output device, generated packets are only logged");
            (None, Arc::new(LogSink))
        }
    }
}

fn initialize_generator(settings: &Settings, sink: Arc<dyn UmpSink>) -> TickGenerator {
    let timer = match ThreadTimer::new() {
        Ok(timer) => timer,
        Err(e) => exit_with_error(&format!("Error creating clock timer: {}", e)),
    };
    let pin: Box<dyn DebugPin> = if settings.debug_pin {
        Box::new(LogPin::default())
    } else {
        Box::new(NoopPin)
    };

    match TickGenerator::with_debug_pin(sink, Box::new(timer), pin) {
        Ok(generator) => generator,
        Err(e) => exit_with_error(&format!("Error creating clock generator: {}", e)),
    }
}

fn run_free_mode(
    settings: &Settings,
    mut generator: TickGenerator,
    transport: SharedTransport,
    running: &Arc<AtomicBool>,
) -> TickGenerator {
    if let Err(e) = generator.start_sbpm(settings.tempo_sbpm) {
        exit_with_error(&format!("Error starting clock: {}", e));
    }
    println!(
        "Free-running clock at {} BPM",
        ScaledTempo(settings.tempo_sbpm)
    );

    let telemetry = Telemetry::new(generator.readout(), transport);
    spawn_inspector(telemetry, running);
    generator
}

fn run_follow_mode<T: TimeSource + 'static>(
    source: T,
    device_name: &str,
    settings: &Settings,
    mut generator: TickGenerator,
    sink: Arc<dyn UmpSink>,
    transport: SharedTransport,
    running: &Arc<AtomicBool>,
) -> MidirInput {
    let (input, rx) = match open_input(device_name, settings.input_queue_len) {
        Ok(opened) => opened,
        Err(e) => exit_with_error(&format!("Error connecting to MIDI input: {}", e)),
    };
    println!("Following clock from MIDI device: {}", input.port_name());

    if !settings.follow_transport {
        if let Err(e) = generator.start_sbpm(settings.tempo_sbpm) {
            exit_with_error(&format!("Error starting clock: {}", e));
        }
    }

    let measurer = IntervalMeasurer::new(source, settings.measure_mode);
    let pll = PllController::new(
        measurer.timebase().interval_for_sbpm(settings.tempo_sbpm),
        settings.pll,
    );
    let telemetry = Telemetry::new(generator.readout(), transport.clone())
        .with_follower(measurer.readout(), pll.readout());

    let follower = ClockFollower::new(measurer, pll, generator, transport, sink.clone())
        .follow_transport(settings.follow_transport);
    let bridge =
        Bridge::new(follower, sink).forward_channel_voice(settings.forward_channel_voice);

    let scheduler = create_scheduler();
    let input_running = running.clone();
    if let Err(e) = scheduler.spawn("midi-input", move || {
        InputLoop::new(rx, bridge).run();
        log::info!("MIDI input closed");
        input_running.store(false, Ordering::SeqCst);
    }) {
        exit_with_error(&format!("Error starting input thread: {}", e));
    }

    spawn_inspector(telemetry, running);
    input
}

fn spawn_inspector(telemetry: Telemetry, running: &Arc<AtomicBool>) {
    let scheduler = create_scheduler();
    let inspector_running = running.clone();
    if let Err(e) = scheduler.spawn("inspector", move || {
        run_inspector(telemetry, inspector_running)
    }) {
        log::warn!("Status display unavailable: {}", e);
    }
}

fn run_application_loop(running: &AtomicBool) {
    log::info!("Application running. Press Ctrl+C to exit...");
    println!("\nPress Ctrl+C to exit...");
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_secs(1));
    }
    log::info!("Application exiting");
}
