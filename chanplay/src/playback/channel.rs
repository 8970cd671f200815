//! Sound channel
//!
//! A named playback lane with at most two slots:
//! - Current: the only slot that ever drives its decoder
//! - Next: a queued sound waiting for current to finish
//!
//! Queueing policy:
//! - NOW / LOOPING replace current immediately and discard anything queued
//! - NEXT loads into current without starting when the channel is idle,
//!   otherwise queues (replacing an already queued sound rather than growing
//!   the queue)

use crate::audio::decoder::{DecoderEventKind, PlaybackId};
use crate::audio::source::SoundSource;
use crate::error::Result;
use crate::playback::slot::{PlaybackSlot, SlotContext};
use chanplay_common::events::{CallbackToken, ChannelStatus, PlayMode, SoundEvent};
use tracing::{debug, info};

/// Which of a channel's slots an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPosition {
    Current,
    Next,
}

/// Named playback lane
pub struct Channel {
    name: String,

    /// Channel volume 0-100, applied to every slot that gets a sound
    volume: u8,

    /// Present once any sound has been played on the channel
    current: Option<PlaybackSlot>,

    /// Present only while a queued sound waits for current
    next: Option<PlaybackSlot>,

    /// Current was paused by a global pause (not by the user)
    suspended: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, volume: u8) -> Self {
        Self {
            name: name.into(),
            volume: volume.min(100),
            current: None,
            next: None,
            suspended: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Play `sound` on this channel according to `mode`
    ///
    /// `hold` is set while a global pause is active: an immediate start is
    /// remembered and happens on resume.
    pub fn play_sound(
        &mut self,
        ctx: &SlotContext,
        sound: &str,
        mode: PlayMode,
        source: SoundSource,
        token: Option<CallbackToken>,
        hold: bool,
    ) -> Result<()> {
        let volume = self.volume;

        if mode.is_immediate() {
            // Starting an immediate sound cancels anything queued
            if let Some(mut queued) = self.next.take() {
                debug!("Channel {}: dropping queued {:?}", self.name, queued.sound());
                queued.release();
            }

            let slot = self.current.get_or_insert_with(|| ctx.new_slot());
            slot.reset();
            slot.set_volume(volume);
            slot.set_sound(sound, mode == PlayMode::Looping, true, source, token)?;
            self.suspended = hold;
            return Ok(());
        }

        if !self.is_busy() {
            // Loaded into current but left paused until resumed
            let slot = self.current.get_or_insert_with(|| ctx.new_slot());
            slot.reset();
            slot.set_volume(volume);
            self.suspended = false;
            slot.set_sound(sound, false, false, source, token)?;
            debug!("Channel {}: loaded {} paused", self.name, sound);
            return Ok(());
        }

        let slot = self.next.get_or_insert_with(|| ctx.new_slot());
        slot.reset();
        slot.set_volume(volume);
        if let Err(e) = slot.set_sound(sound, false, false, source, token) {
            // Never keep an empty queued slot around
            if let Some(mut empty) = self.next.take() {
                empty.release();
            }
            return Err(e);
        }
        debug!("Channel {}: queued {}", self.name, sound);
        Ok(())
    }

    /// Reset current and discard any queued sound
    pub fn stop(&mut self) -> bool {
        if let Some(current) = self.current.as_mut() {
            current.reset();
        }
        if let Some(mut queued) = self.next.take() {
            queued.release();
        }
        self.suspended = false;
        true
    }

    pub fn pause(&mut self) -> bool {
        self.suspended = false;
        self.current.as_mut().map_or(true, |c| c.pause())
    }

    /// Resume current; with `hold` (global pause) the start waits for `wake`
    pub fn resume(&mut self, hold: bool) -> bool {
        let Some(current) = self.current.as_mut() else {
            return true;
        };
        if hold {
            current.queue_start();
            self.suspended = current.sound().is_some();
            true
        } else {
            self.suspended = false;
            current.play()
        }
    }

    /// Global pause: pause current only if it is actually running
    pub fn suspend(&mut self) {
        if let Some(current) = self.current.as_mut() {
            if current.is_playing() {
                current.pause();
                self.suspended = true;
            }
        }
    }

    /// Global resume: restart what `suspend` paused and any start held meanwhile
    pub fn wake(&mut self) {
        let suspended = std::mem::take(&mut self.suspended);
        if let Some(current) = self.current.as_mut() {
            if suspended || current.is_held() {
                current.play();
            }
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        if let Some(current) = self.current.as_mut() {
            current.set_volume(self.volume);
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn sound(&self) -> Option<&str> {
        self.current.as_ref().and_then(|c| c.sound())
    }

    pub fn next_sound(&self) -> Option<&str> {
        self.next.as_ref().and_then(|n| n.sound())
    }

    pub fn status(&self) -> ChannelStatus {
        let Some(current) = self.current.as_ref() else {
            return ChannelStatus::Stopped;
        };

        if current.is_playing() || (current.is_pending() && !current.is_prepared()) {
            ChannelStatus::Playing
        } else if current.is_prepared() || current.sound().is_some() {
            ChannelStatus::Paused
        } else {
            ChannelStatus::Stopped
        }
    }

    /// Number of allocated slots (never more than two)
    pub fn slot_count(&self) -> usize {
        usize::from(self.current.is_some()) + usize::from(self.next.is_some())
    }

    /// Current slot (read-only, for inspection)
    pub fn current_slot(&self) -> Option<&PlaybackSlot> {
        self.current.as_ref()
    }

    /// Queued slot (read-only, for inspection)
    pub fn next_slot(&self) -> Option<&PlaybackSlot> {
        self.next.as_ref()
    }

    /// Which slot owns `playback_id`, if any
    pub fn locate(&self, playback_id: PlaybackId) -> Option<SlotPosition> {
        if self.current.as_ref().is_some_and(|c| c.owns(playback_id)) {
            Some(SlotPosition::Current)
        } else if self.next.as_ref().is_some_and(|n| n.owns(playback_id)) {
            Some(SlotPosition::Next)
        } else {
            None
        }
    }

    /// Apply a decoder event to the slot at `position`
    pub fn on_decoder_event(
        &mut self,
        ctx: &SlotContext,
        position: SlotPosition,
        playback_id: PlaybackId,
        kind: &DecoderEventKind,
        hold: bool,
    ) {
        match (position, kind) {
            (SlotPosition::Current, DecoderEventKind::Prepared) => {
                if let Some(current) = self.current.as_mut() {
                    if current.on_prepared(playback_id, hold) && hold && current.is_held() {
                        self.suspended = true;
                    }
                }
            }
            (SlotPosition::Next, DecoderEventKind::Prepared) => {
                if let Some(queued) = self.next.as_mut() {
                    queued.on_prepared(playback_id, hold);
                }
            }
            (SlotPosition::Current, DecoderEventKind::Completed) => {
                let finished = self.current.as_mut().and_then(|c| c.complete(playback_id));
                if let Some(finished) = finished {
                    self.advance(ctx, finished.sound, finished.token, hold);
                }
            }
            (SlotPosition::Current, DecoderEventKind::Error(message)) => {
                let finished = self
                    .current
                    .as_mut()
                    .and_then(|c| c.fail(playback_id, message));
                if let Some(finished) = finished {
                    self.advance(ctx, finished.sound, finished.token, hold);
                }
            }
            (SlotPosition::Next, DecoderEventKind::Error(message)) => {
                // A queued sound that cannot be decoded is dropped
                info!(
                    "Channel {}: discarding queued {:?}: {}",
                    self.name,
                    self.next_sound(),
                    message
                );
                if let Some(mut queued) = self.next.take() {
                    queued.release();
                }
            }
            (SlotPosition::Next, DecoderEventKind::Completed) => {
                debug!("Channel {}: ignoring completion from queued slot", self.name);
            }
        }
    }

    /// Notify completion, then promote the queued sound or reset current in place
    fn advance(
        &mut self,
        ctx: &SlotContext,
        sound: Option<String>,
        token: Option<CallbackToken>,
        hold: bool,
    ) {
        info!("Channel {}: finished {:?}", self.name, sound);
        ctx.events()
            .emit(SoundEvent::sound_finished(self.name.clone(), sound, token));

        match self.next.take() {
            Some(mut promoted) if promoted.sound().is_some() => {
                promoted.set_volume(self.volume);
                if hold {
                    promoted.queue_start();
                    self.suspended = true;
                } else {
                    promoted.play();
                }
                if let Some(mut finished) = self.current.replace(promoted) {
                    finished.release();
                }
                debug!("Channel {}: promoted {:?}", self.name, self.sound());
            }
            other => {
                if let Some(mut empty) = other {
                    empty.release();
                }
                if let Some(current) = self.current.as_mut() {
                    current.reset();
                }
            }
        }
    }

    /// Current is running or about to run
    fn is_busy(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.is_playing() || (c.is_pending() && !c.is_prepared()))
    }

    /// Release both slots and their tokens
    pub fn release(&mut self) {
        if let Some(mut queued) = self.next.take() {
            queued.release();
        }
        if let Some(mut current) = self.current.take() {
            current.release();
        }
        self.suspended = false;
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.release();
    }
}
