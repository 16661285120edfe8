use std::io::Write;
use umpclockrs::clock::{MeasureMode, PllTuning};
use umpclockrs::config::{Settings, TimebaseKind};
use umpclockrs::ClockError;

#[test]
fn test_empty_document_gives_defaults() {
    let settings = Settings::from_toml_str("").unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.tempo_sbpm, 12000);
    assert_eq!(settings.pll, PllTuning::default());
    assert!(settings.follow_transport);
}

#[test]
fn test_full_document() {
    let settings = Settings::from_toml_str(
        r#"
        tempo_sbpm = 9000
        timebase = "counter"
        counter_hz = 48000000
        counter_counts_down = true
        measure_mode = "averaged"
        follow_transport = false
        forward_channel_voice = false
        input_device = "Mock Device 1"
        log_level = "debug"

        [pll]
        filter_k = 32
        gain = 4
        "#,
    )
    .unwrap();

    assert_eq!(settings.tempo_sbpm, 9000);
    assert_eq!(settings.timebase, TimebaseKind::Counter);
    assert_eq!(settings.counter_hz, 48_000_000);
    assert!(settings.counter_counts_down);
    assert_eq!(settings.measure_mode, MeasureMode::Averaged);
    assert!(!settings.follow_transport);
    assert!(!settings.forward_channel_voice);
    assert_eq!(settings.input_device.as_deref(), Some("Mock Device 1"));
    assert_eq!(settings.output_device, None);
    assert_eq!(
        settings.pll,
        PllTuning {
            filter_k: 32,
            gain: 4,
            track_threshold: 512,
        }
    );
    assert!(settings.validate().is_ok());
}

#[test]
fn test_validation_failures() {
    let invalid = [
        "tempo_sbpm = 0",
        "counter_hz = 0",
        "input_queue_len = 0",
        "log_level = \"loud\"",
        "[pll]\ngain = 0",
        "[pll]\nfilter_k = -1",
        "[pll]\ntrack_threshold = 0",
    ];

    for document in invalid {
        let settings = Settings::from_toml_str(document).unwrap();
        assert!(
            matches!(settings.validate(), Err(ClockError::Config(_))),
            "accepted: {}",
            document
        );
    }
}

#[test]
fn test_malformed_document_is_config_error() {
    let result = Settings::from_toml_str("measure_mode = \"sometimes\"");
    assert!(matches!(result, Err(ClockError::Config(_))));
}

#[test]
fn test_load_explicit_file() {
    let path = std::env::temp_dir().join(format!("umpclockrs-test-{}.toml", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "tempo_sbpm = 13550").unwrap();
        writeln!(file, "debug_pin = true").unwrap();
    }

    let settings = Settings::load(Some(&path)).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(settings.tempo_sbpm, 13550);
    assert!(settings.debug_pin);
}

#[test]
fn test_missing_explicit_file_is_error() {
    let path = std::env::temp_dir().join("umpclockrs-does-not-exist.toml");
    assert!(Settings::load(Some(&path)).is_err());
}
