//! Audio pipeline behavior against a scripted transcoder and prober.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedRunner, flag_value, toolchain, toolchain_with};
use yoop_core::{
    AudioAsset, Bitrate, Channels, ErrorKind, Format, PartNumber, Samplerate, Tags, ToolConfig,
    ToolOutput, ValidationError,
};

const SOURCE: &[u8] = &[0xff, 0xfb, 0x90, 0x64, 0x00, 0x11, 0x22, 0x33];
const SOURCE_REPORT: &str = "[STREAM]\ncodec_name=mp3\nsample_rate=44100\nchannels=2\n[/STREAM]\n[FORMAT]\nduration=90.000000\nbit_rate=192000\n[/FORMAT]\n";
const CONVERTED_REPORT: &str = "[STREAM]\ncodec_name=mp3\nsample_rate=22050\nchannels=1\n[/STREAM]\n[FORMAT]\nduration=90.000000\nbit_rate=64000\n[/FORMAT]\n";
const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Prober answers by input; transcoder cuts by `-ss` or re-encodes.
fn pipeline() -> Arc<ScriptedRunner> {
    ScriptedRunner::new(|program, args, input| match program {
        "ffprobe" if input == b"converted" => ToolOutput::ok(CONVERTED_REPORT),
        "ffprobe" => ToolOutput::ok(SOURCE_REPORT),
        "ffmpeg" => match flag_value(args, "-ss") {
            Some(start) => ToolOutput::ok(format!("part@{start}")),
            None => ToolOutput::ok("converted"),
        },
        other => panic!("unexpected program {other}"),
    })
}

fn source(runner: Arc<ScriptedRunner>) -> AudioAsset {
    AudioAsset::new(toolchain(runner), SOURCE).unwrap()
}

#[test]
fn test_empty_buffer_unavailable() {
    let err = AudioAsset::new(toolchain(pipeline()), Vec::<u8>::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}

#[test]
fn test_probe_properties() {
    let runner = pipeline();
    let asset = source(runner.clone());

    assert_eq!(asset.bitrate().unwrap(), Bitrate::new(192).unwrap());
    assert_eq!(asset.samplerate().unwrap().hz(), 44_100);
    assert_eq!(asset.channels().unwrap(), Channels::Stereo);
    assert_eq!(asset.format().unwrap(), Format::Mp3);
    assert_eq!(asset.duration().unwrap(), Duration::from_secs(90));

    // One probe serves every property.
    assert_eq!(runner.calls_to("ffprobe"), 1);
}

#[test]
fn test_converted_properties() {
    let runner = pipeline();
    let asset = source(runner.clone());

    let converted = asset
        .converted(
            Bitrate::new(64).unwrap(),
            Samplerate::new(22_050).unwrap(),
            Format::Mp3,
            Channels::Mono,
        )
        .unwrap();

    assert_eq!(converted.as_bytes(), b"converted");
    assert_eq!(converted.bitrate().unwrap().kbps(), Some(64));
    assert_eq!(converted.samplerate().unwrap().hz(), 22_050);
    assert_eq!(converted.channels().unwrap(), Channels::Mono);
    assert_eq!(converted.part(), None);

    let encode = runner
        .calls()
        .into_iter()
        .find(|c| c.program == "ffmpeg")
        .unwrap();
    assert_eq!(flag_value(&encode.args, "-b:a"), Some("64k"));
    assert_eq!(flag_value(&encode.args, "-ar"), Some("22050"));
    assert_eq!(flag_value(&encode.args, "-ac"), Some("1"));
    assert_eq!(flag_value(&encode.args, "-f"), Some("mp3"));
}

#[test]
fn test_invalid_bitrates_rejected() {
    for kbps in [0, -5] {
        let err = Bitrate::new(kbps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    let runner = pipeline();
    let err = source(runner.clone())
        .converted(
            Bitrate::Unbounded,
            Samplerate::new(44_100).unwrap(),
            Format::Mp3,
            Channels::Stereo,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        yoop_core::Error::Validation(ValidationError::UnboundedBitrate)
    ));
    assert_eq!(runner.calls_to("ffmpeg"), 0);
}

#[test]
fn test_split_parts_and_ordinals() {
    let runner = pipeline();
    let parts = source(runner.clone()).splitted(3).unwrap();

    assert_eq!(parts.len(), 3);
    let starts: Vec<&[u8]> = parts.iter().map(AudioAsset::as_bytes).collect();
    assert_eq!(starts, [&b"part@0"[..], b"part@30", b"part@60"]);
    for (n, part) in parts.iter().enumerate() {
        assert_eq!(part.part(), Some(PartNumber::new(n + 1, 3).unwrap()));
    }
    assert_eq!(runner.calls_to("ffmpeg"), 3);
}

#[test]
fn test_split_zero_parts_runs_nothing() {
    let runner = pipeline();
    let err = source(runner.clone()).splitted(0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(runner.calls().is_empty());
}

#[test]
fn test_split_carries_tags_and_cover() {
    let runner = pipeline();
    let tagged = source(runner.clone())
        .tagged(&Tags::new().with("title", "Demo song").with("artist", "Demo Channel"))
        .unwrap()
        .covered(JPEG)
        .unwrap();

    for part in tagged.splitted(2).unwrap() {
        let tags = part.tags().unwrap();
        assert_eq!(tags.title(), Some("Demo song"));
        assert_eq!(tags.artist(), Some("Demo Channel"));
        assert_eq!(part.cover().unwrap(), Some(JPEG));
    }
}

#[test]
fn test_split_without_cover_adds_none() {
    let parts = source(pipeline()).splitted(2).unwrap();
    for part in &parts {
        assert_eq!(part.cover().unwrap(), None);
        assert!(part.tags().unwrap().is_empty());
    }
}

#[test]
fn test_tag_round_trip_keeps_audio() {
    let asset = source(pipeline());
    assert!(asset.tags().unwrap().is_empty());

    let tagged = asset
        .tagged(&Tags::new().with("album", "Demo album").with("date", "2024-01-31"))
        .unwrap();
    let retagged = tagged
        .tagged(&Tags::new().with("title", "Demo song"))
        .unwrap();

    let tags = retagged.tags().unwrap();
    assert_eq!(tags.album(), Some("Demo album"));
    assert_eq!(tags.title(), Some("Demo song"));
    assert!(retagged.as_bytes().ends_with(SOURCE));
}

#[test]
fn test_cover_replaced() {
    let other: &[u8] = &[0xff, 0xd8, 0xff, 0xdb, 0x01];
    let asset = source(pipeline()).covered(JPEG).unwrap();
    assert_eq!(asset.cover().unwrap(), Some(JPEG));

    let replaced = asset.covered(other).unwrap();
    assert_eq!(replaced.cover().unwrap(), Some(other));
    assert!(replaced.as_bytes().ends_with(SOURCE));
}

#[test]
fn test_verification_diagnostics() {
    let config = ToolConfig {
        verify_audio: true,
        ..ToolConfig::default()
    };
    let runner = ScriptedRunner::new(|_, _, input| {
        if input == SOURCE {
            ToolOutput::ok("")
        } else {
            ToolOutput::ok("").with_stderr("Header missing\n")
        }
    });

    assert!(AudioAsset::new_verified(toolchain_with(config.clone(), runner.clone()), SOURCE).is_ok());
    let err = AudioAsset::new_verified(toolchain_with(config, runner), &b"garbage"[..]).unwrap_err();
    assert!(matches!(
        err,
        yoop_core::Error::Validation(ValidationError::Diagnostics(_))
    ));
}

#[test]
fn test_estimated_size() {
    let asset = source(pipeline());
    assert_eq!(
        asset
            .estimated_converted_size(Bitrate::new(128).unwrap())
            .unwrap(),
        Some(90 * 128 * 1024 / 8)
    );
    assert_eq!(asset.estimated_converted_size(Bitrate::Unbounded).unwrap(), None);
}

#[test]
#[ignore = "requires ffmpeg and ffprobe - run with: cargo test --ignored -- --nocapture"]
fn test_real_tone_split() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let toolchain = yoop_core::Toolchain::from_environment().unwrap();
    let generated = std::process::Command::new(&toolchain.config().ffmpeg_path)
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=6",
            "-b:a",
            "128k",
            "-f",
            "mp3",
            "-",
        ])
        .output()
        .unwrap();
    let asset = AudioAsset::new(toolchain, generated.stdout).unwrap();

    let parts = asset.splitted(3).unwrap();
    assert_eq!(parts.len(), 3);
    for part in &parts {
        let secs = part.duration().unwrap().as_secs_f64();
        println!("{:?}: {secs:.2}s, {}", part.part(), part.bitrate().unwrap());
        assert!((1.5..=2.5).contains(&secs));
    }
}
