//! Decoder strategy tests
//!
//! Runs the clock decoder against generated WAV files and the completion
//! watchdog against a decoder that never reports completion.

mod helpers;

use chanplay::audio::source::probe_duration;
use chanplay::audio::{
    ClockDecoder, DecoderEvent, DecoderEventKind, DecoderEventReceiver, MediaDecoder, PlaybackId,
    PrepareRequest, SoundSource, WatchdogDecoder,
};
use chanplay::Error;
use helpers::{generate_silent_wav, generate_sine_wav};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

fn request(sound: &str, source: SoundSource, looping: bool) -> PrepareRequest {
    PrepareRequest {
        playback_id: PlaybackId::new(),
        sound: sound.to_string(),
        source,
        looping,
    }
}

fn wav_fixture(dir: &TempDir, name: &str, duration_ms: u64) -> PathBuf {
    let path = dir.path().join(name);
    generate_silent_wav(&path, duration_ms).expect("Failed to write WAV fixture");
    path
}

async fn next_event(rx: &mut DecoderEventReceiver, within: Duration) -> Option<DecoderEvent> {
    timeout(within, rx.recv()).await.ok().flatten()
}

/// Prepare `path` on a fresh clock decoder and wait for `Prepared`
async fn prepared_clock(
    path: &Path,
    looping: bool,
) -> (ClockDecoder, PlaybackId, DecoderEventReceiver) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut decoder = ClockDecoder::new(Handle::current(), None, tx);
    let req = request("fixture", SoundSource::File(path.to_path_buf()), looping);
    let id = req.playback_id;
    decoder.prepare(req).expect("prepare should open the fixture");

    let event = next_event(&mut rx, Duration::from_secs(5))
        .await
        .expect("no prepared event");
    assert_eq!(event, DecoderEvent::prepared(id));
    (decoder, id, rx)
}

#[test]
fn test_probe_duration_of_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    generate_sine_wav(&path, 750, 440.0, 0.5).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let duration = probe_duration(file, &path).unwrap();

    let diff = duration.as_millis().abs_diff(750);
    assert!(diff <= 2, "probed {:?}, expected ~750ms", duration);
}

#[test]
fn test_probe_rejects_non_media() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, b"definitely not a RIFF file").unwrap();

    let file = std::fs::File::open(&path).unwrap();
    assert!(matches!(probe_duration(file, &path), Err(Error::Decode(_))));
}

#[tokio::test]
async fn test_clock_decoder_prepares_and_completes() {
    let dir = TempDir::new().unwrap();
    let path = wav_fixture(&dir, "short.wav", 300);
    let (mut decoder, id, mut rx) = prepared_clock(&path, false).await;

    let expected = decoder.expected_duration().unwrap();
    assert!(expected.as_millis().abs_diff(300) <= 2);

    let started = Instant::now();
    decoder.start();
    assert!(decoder.is_playing());

    let event = next_event(&mut rx, Duration::from_secs(5))
        .await
        .expect("no completion");
    assert_eq!(event, DecoderEvent::completed(id));
    assert!(started.elapsed() >= Duration::from_millis(280));
}

#[tokio::test]
async fn test_clock_decoder_missing_file_fails_synchronously() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut decoder = ClockDecoder::new(Handle::current(), None, tx);

    let result = decoder.prepare(request(
        "ghost",
        SoundSource::File(PathBuf::from("/nonexistent/chanplay/ghost.wav")),
        false,
    ));

    assert!(matches!(result, Err(Error::SourceOpen { .. })));
    assert!(next_event(&mut rx, Duration::from_millis(100)).await.is_none());
}

#[tokio::test]
async fn test_clock_decoder_resolves_assets() {
    let dir = TempDir::new().unwrap();
    wav_fixture(&dir, "click.wav", 100);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut decoder = ClockDecoder::new(Handle::current(), Some(dir.path().to_path_buf()), tx);

    let req = request("click", SoundSource::Asset("click.wav".to_string()), false);
    let id = req.playback_id;
    decoder.prepare(req).unwrap();

    let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(event, DecoderEvent::prepared(id));
}

#[tokio::test]
async fn test_clock_decoder_reports_unreadable_media_as_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"garbage").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut decoder = ClockDecoder::new(Handle::current(), None, tx);
    let req = request("broken", SoundSource::File(path), false);
    let id = req.playback_id;
    decoder.prepare(req).unwrap();

    let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(event.playback_id, id);
    assert!(matches!(event.kind, DecoderEventKind::Error(_)));
}

#[tokio::test]
async fn test_clock_decoder_pause_keeps_position() {
    let dir = TempDir::new().unwrap();
    let path = wav_fixture(&dir, "medium.wav", 400);
    let (mut decoder, id, mut rx) = prepared_clock(&path, false).await;

    decoder.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    decoder.pause();

    assert!(!decoder.is_playing());
    let position = decoder.position();
    assert!(position >= Duration::from_millis(140), "position {:?}", position);

    // Paused: no completion even after the full length
    assert!(next_event(&mut rx, Duration::from_millis(450)).await.is_none());
    assert_eq!(decoder.position(), position);

    // Resuming plays only what is left
    let resumed = Instant::now();
    decoder.start();
    let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(event, DecoderEvent::completed(id));
    assert!(resumed.elapsed() < Duration::from_millis(380));
}

#[tokio::test]
async fn test_clock_decoder_looping_never_completes() {
    let dir = TempDir::new().unwrap();
    let path = wav_fixture(&dir, "loop.wav", 100);
    let (mut decoder, _id, mut rx) = prepared_clock(&path, true).await;

    decoder.start();
    assert!(next_event(&mut rx, Duration::from_millis(350)).await.is_none());
    assert!(decoder.position() < Duration::from_millis(100));

    // Turning looping off arms the completion timer
    decoder.set_looping(false);
    assert!(next_event(&mut rx, Duration::from_secs(5)).await.is_some());
}

#[tokio::test]
async fn test_clock_decoder_stop_cancels_completion() {
    let dir = TempDir::new().unwrap();
    let path = wav_fixture(&dir, "stop.wav", 150);
    let (mut decoder, _id, mut rx) = prepared_clock(&path, false).await;

    decoder.start();
    decoder.stop();

    assert!(!decoder.is_playing());
    assert_eq!(decoder.position(), Duration::ZERO);
    assert!(next_event(&mut rx, Duration::from_millis(300)).await.is_none());
}

#[tokio::test]
async fn test_clock_decoder_release_is_terminal() {
    let dir = TempDir::new().unwrap();
    let path = wav_fixture(&dir, "rel.wav", 100);
    let (mut decoder, _id, _rx) = prepared_clock(&path, false).await;

    decoder.release();

    let result = decoder.prepare(request("again", SoundSource::File(path), false));
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_clock_decoder_clamps_volume() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut decoder = ClockDecoder::new(Handle::current(), None, tx);
    decoder.set_volume(1.5, -0.2);
    assert_eq!(decoder.volume(), (1.0, 0.0));
}

// ----------------------------------------------------------------------------
// Completion watchdog
// ----------------------------------------------------------------------------

/// Decoder that knows its length but never reports completion
struct SilentDecoder {
    length: Duration,
}

impl MediaDecoder for SilentDecoder {
    fn prepare(&mut self, _request: PrepareRequest) -> chanplay::Result<()> {
        Ok(())
    }
    fn start(&mut self) {}
    fn pause(&mut self) {}
    fn stop(&mut self) {}
    fn reset(&mut self) {}
    fn release(&mut self) {}
    fn set_volume(&mut self, _left: f32, _right: f32) {}
    fn set_looping(&mut self, _looping: bool) {}
    fn expected_duration(&self) -> Option<Duration> {
        Some(self.length)
    }
}

fn watchdog(length_ms: u64, grace_ms: u64) -> (WatchdogDecoder, DecoderEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let decoder = WatchdogDecoder::new(
        Box::new(SilentDecoder {
            length: Duration::from_millis(length_ms),
        }),
        Handle::current(),
        tx,
        Duration::from_millis(grace_ms),
    );
    (decoder, rx)
}

fn silent_request(looping: bool) -> PrepareRequest {
    request("silent", SoundSource::File(PathBuf::from("/unused.wav")), looping)
}

#[tokio::test]
async fn test_watchdog_forces_completion() {
    let (mut decoder, mut rx) = watchdog(150, 50);
    let req = silent_request(false);
    let id = req.playback_id;
    decoder.prepare(req).unwrap();

    let started = Instant::now();
    decoder.start();
    assert!(decoder.is_armed());

    let event = next_event(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(event, DecoderEvent::completed(id));
    assert!(started.elapsed() >= Duration::from_millis(190));
}

#[tokio::test]
async fn test_watchdog_pause_disarms() {
    let (mut decoder, mut rx) = watchdog(100, 20);
    decoder.prepare(silent_request(false)).unwrap();

    decoder.start();
    decoder.pause();

    assert!(!decoder.is_armed());
    assert!(next_event(&mut rx, Duration::from_millis(250)).await.is_none());

    decoder.start();
    assert!(decoder.is_armed());
    assert!(next_event(&mut rx, Duration::from_secs(5)).await.is_some());
}

#[tokio::test]
async fn test_watchdog_ignores_looping_sounds() {
    let (mut decoder, mut rx) = watchdog(50, 10);
    decoder.prepare(silent_request(true)).unwrap();

    decoder.start();

    assert!(!decoder.is_armed());
    assert!(next_event(&mut rx, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_watchdog_reset_disarms() {
    let (mut decoder, mut rx) = watchdog(50, 10);
    decoder.prepare(silent_request(false)).unwrap();
    decoder.start();

    decoder.reset();

    assert!(!decoder.is_armed());
    assert!(next_event(&mut rx, Duration::from_millis(200)).await.is_none());
}
