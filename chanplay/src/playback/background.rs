//! Legacy background player
//!
//! One unnamed sound outside the channel map, with its own loudness setting.
//! This path predates channels and keeps its own behavior: playing an empty
//! sound name just stops, there are no callback tokens, and a natural end is
//! reported as `BackgroundSoundStopped`.

use crate::audio::decoder::{DecoderEventKind, PlaybackId};
use crate::audio::source::SoundSource;
use crate::error::Result;
use crate::playback::slot::{PlaybackSlot, SlotContext};
use chanplay_common::events::SoundEvent;
use tracing::{debug, info};

pub struct BackgroundPlayer {
    slot: Option<PlaybackSlot>,
    /// 0-100
    loudness: u8,
    suspended: bool,
}

impl BackgroundPlayer {
    pub fn new(loudness: u8) -> Self {
        Self {
            slot: None,
            loudness: loudness.min(100),
            suspended: false,
        }
    }

    /// Replace the background sound; an empty `sound` only stops playback
    pub fn play_sound(
        &mut self,
        ctx: &SlotContext,
        sound: &str,
        source: SoundSource,
        looping: bool,
        hold: bool,
    ) -> Result<()> {
        self.stop();
        if sound.is_empty() {
            debug!("Background player stopped");
            return Ok(());
        }

        let loudness = self.loudness;
        let slot = self.slot.get_or_insert_with(|| ctx.new_slot());
        slot.set_volume(loudness);
        slot.set_sound(sound, looping, true, source, None)?;
        self.suspended = hold;
        info!("Background player loading {} (looping={})", sound, looping);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(slot) = self.slot.as_mut() {
            slot.reset();
        }
        self.suspended = false;
    }

    pub fn loudness(&self) -> u8 {
        self.loudness
    }

    pub fn set_loudness(&mut self, loudness: u8) {
        self.loudness = loudness.min(100);
        if let Some(slot) = self.slot.as_mut() {
            slot.set_volume(self.loudness);
        }
    }

    pub fn sound(&self) -> Option<&str> {
        self.slot.as_ref().and_then(|s| s.sound())
    }

    pub fn is_playing(&self) -> bool {
        self.slot.as_ref().is_some_and(|s| s.is_playing())
    }

    pub fn owns(&self, playback_id: PlaybackId) -> bool {
        self.slot.as_ref().is_some_and(|s| s.owns(playback_id))
    }

    pub fn suspend(&mut self) {
        if let Some(slot) = self.slot.as_mut() {
            if slot.is_playing() {
                slot.pause();
                self.suspended = true;
            }
        }
    }

    pub fn wake(&mut self) {
        let suspended = std::mem::take(&mut self.suspended);
        if let Some(slot) = self.slot.as_mut() {
            if suspended || slot.is_held() {
                slot.play();
            }
        }
    }

    pub fn on_decoder_event(
        &mut self,
        ctx: &SlotContext,
        playback_id: PlaybackId,
        kind: &DecoderEventKind,
        hold: bool,
    ) {
        let Some(slot) = self.slot.as_mut() else {
            return;
        };

        let finished = match kind {
            DecoderEventKind::Prepared => {
                slot.on_prepared(playback_id, hold);
                None
            }
            DecoderEventKind::Completed => slot.complete(playback_id),
            DecoderEventKind::Error(message) => slot.fail(playback_id, message),
        };

        if finished.is_some() {
            slot.reset();
            self.suspended = false;
            info!("Background sound stopped");
            ctx.events().emit(SoundEvent::background_stopped());
        }
    }

    pub fn release(&mut self) {
        if let Some(mut slot) = self.slot.take() {
            slot.release();
        }
        self.suspended = false;
    }
}
