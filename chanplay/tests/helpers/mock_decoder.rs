//! Recording mock decoder
//!
//! Every decoder built by `MockFactory` appends its calls to one shared
//! `MockLog`, tagged with the decoder's index. Tests drive asynchronous
//! progress themselves by feeding `DecoderEvent`s to the registry, using the
//! playback ids recorded at prepare time.

use chanplay::audio::{
    DecoderEvent, DecoderEventSender, DecoderFactory, MediaDecoder, PlaybackId, PrepareRequest,
};
use chanplay::Error;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One recorded decoder call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Prepare {
        playback_id: PlaybackId,
        sound: String,
        looping: bool,
    },
    Start,
    Pause,
    Stop,
    Reset,
    Release,
    Volume(f32, f32),
    Looping(bool),
}

#[derive(Default)]
struct LogState {
    calls: Vec<(usize, MockCall)>,
    decoders: usize,
    failing: HashSet<String>,
    auto_prepare: bool,
}

/// Shared call log for all mock decoders of one factory
#[derive(Clone, Default)]
pub struct MockLog {
    state: Arc<Mutex<LogState>>,
}

impl MockLog {
    /// Make `prepare` fail with `SourceOpen` for `sound`
    pub fn fail_on(&self, sound: &str) {
        self.state.lock().unwrap().failing.insert(sound.to_string());
    }

    /// Post `Prepared` straight from `prepare` (for tests through the service)
    pub fn auto_prepare(&self) {
        self.state.lock().unwrap().auto_prepare = true;
    }

    pub fn calls(&self) -> Vec<(usize, MockCall)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of decoders created so far
    pub fn decoder_count(&self) -> usize {
        self.state.lock().unwrap().decoders
    }

    /// Playback id of the most recent prepare of `sound`
    pub fn playback_id(&self, sound: &str) -> PlaybackId {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|(_, call)| match call {
                MockCall::Prepare {
                    playback_id,
                    sound: s,
                    ..
                } if s == sound => Some(playback_id),
                _ => None,
            })
            .unwrap_or_else(|| panic!("{} was never prepared", sound))
    }

    /// Decoder index that prepared `sound` most recently
    pub fn decoder_of(&self, sound: &str) -> usize {
        let id = self.playback_id(sound);
        self.calls()
            .into_iter()
            .find_map(|(index, call)| match call {
                MockCall::Prepare { playback_id, .. } if playback_id == id => Some(index),
                _ => None,
            })
            .unwrap_or_else(|| panic!("{} has no decoder", sound))
    }

    /// Calls made on decoder `index`, in order
    pub fn calls_of(&self, index: usize) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, call)| call)
            .collect()
    }

    /// How many times decoder `index` was started
    pub fn starts_of(&self, index: usize) -> usize {
        self.calls_of(index)
            .iter()
            .filter(|c| **c == MockCall::Start)
            .count()
    }

    /// Most recent gain applied to decoder `index`
    pub fn last_volume_of(&self, index: usize) -> Option<(f32, f32)> {
        self.calls_of(index).into_iter().rev().find_map(|c| match c {
            MockCall::Volume(l, r) => Some((l, r)),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, index: usize, call: MockCall) {
        self.state.lock().unwrap().calls.push((index, call));
    }
}

pub struct MockDecoder {
    index: usize,
    log: MockLog,
    events: DecoderEventSender,
}

impl MediaDecoder for MockDecoder {
    fn prepare(&mut self, request: PrepareRequest) -> chanplay::Result<()> {
        let (failing, auto) = {
            let state = self.log.state.lock().unwrap();
            (state.failing.contains(&request.sound), state.auto_prepare)
        };
        if failing {
            return Err(Error::SourceOpen {
                sound: request.sound,
                reason: "mock refuses to open".to_string(),
            });
        }

        self.log.record(
            self.index,
            MockCall::Prepare {
                playback_id: request.playback_id,
                sound: request.sound,
                looping: request.looping,
            },
        );
        if auto {
            let _ = self.events.send(DecoderEvent::prepared(request.playback_id));
        }
        Ok(())
    }

    fn start(&mut self) {
        self.log.record(self.index, MockCall::Start);
    }

    fn pause(&mut self) {
        self.log.record(self.index, MockCall::Pause);
    }

    fn stop(&mut self) {
        self.log.record(self.index, MockCall::Stop);
    }

    fn reset(&mut self) {
        self.log.record(self.index, MockCall::Reset);
    }

    fn release(&mut self) {
        self.log.record(self.index, MockCall::Release);
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        self.log.record(self.index, MockCall::Volume(left, right));
    }

    fn set_looping(&mut self, looping: bool) {
        self.log.record(self.index, MockCall::Looping(looping));
    }
}

/// Builds `MockDecoder`s sharing one `MockLog`
pub struct MockFactory {
    log: MockLog,
}

impl MockFactory {
    pub fn new() -> (Arc<Self>, MockLog) {
        let log = MockLog::default();
        (Arc::new(Self { log: log.clone() }), log)
    }
}

impl DecoderFactory for MockFactory {
    fn create(&self, events: DecoderEventSender) -> Box<dyn MediaDecoder> {
        let index = {
            let mut state = self.log.state.lock().unwrap();
            state.decoders += 1;
            state.decoders - 1
        };
        Box::new(MockDecoder {
            index,
            log: self.log.clone(),
            events,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
