//! Output-device smoke tests. Need real audio hardware; run with
//! `--features live-hardware-tests`.
#![cfg(feature = "live-hardware-tests")]

use std::time::Duration;

use otoscreen_audio::device::DeviceSink;
use otoscreen_audio::{PlaybackSink, ToneAsset};

#[test]
fn default_device_plays_a_short_tone() {
    let mut sink = DeviceSink::open(None).expect("no default output device");
    let asset = ToneAsset::new(
        "1000 Hz",
        1000.0,
        Duration::from_millis(100),
        Duration::from_millis(400),
    );

    sink.load(&asset, 0.2).unwrap();
    assert_eq!(sink.duration(), Some(Duration::from_millis(500)));

    sink.seek(Duration::from_millis(100)).unwrap();
    sink.play().unwrap();
    std::thread::sleep(Duration::from_millis(700));

    assert!(sink.position() > Duration::from_millis(100));
    assert!(sink.is_ended());
    sink.unload();
}

#[test]
fn device_listing_includes_the_default() {
    let names = DeviceSink::list_output_devices();
    assert!(!names.is_empty());
}
