//! Channel registry
//!
//! Owns the name → channel map, the legacy background player and the global
//! pause flag, and routes every public sound operation.
//!
//! Only `play_sound_on_channel` and `set_channel_volume` create channels.
//! Every other operation on an unknown channel fails softly (an
//! `UnknownChannel` error or `None`) and creates nothing.
//!
//! Channels enumerate in name order.

use crate::audio::decoder::DecoderEvent;
use crate::audio::source::SoundSource;
use crate::error::{Error, Result};
use crate::playback::background::BackgroundPlayer;
use crate::playback::channel::Channel;
use crate::playback::slot::SlotContext;
use chanplay_common::events::{CallbackToken, ChannelStatus, PlayMode};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Registry defaults taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Volume of newly created channels (0-100)
    pub default_channel_volume: u8,
    /// Initial background player loudness (0-100)
    pub background_loudness: u8,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            default_channel_volume: 100,
            background_loudness: 100,
        }
    }
}

/// Owner of all channels
pub struct ChannelRegistry {
    ctx: SlotContext,
    channels: BTreeMap<String, Channel>,
    background: BackgroundPlayer,
    default_volume: u8,
    paused: bool,
}

impl ChannelRegistry {
    pub fn new(ctx: SlotContext, settings: RegistrySettings) -> Self {
        info!(
            "Channel registry created (decoder={}, default_volume={})",
            ctx.decoder_name(),
            settings.default_channel_volume
        );
        Self {
            ctx,
            channels: BTreeMap::new(),
            background: BackgroundPlayer::new(settings.background_loudness),
            default_volume: settings.default_channel_volume.min(100),
            paused: false,
        }
    }

    /// Play `sound` on `channel`, creating the channel if needed
    pub fn play_sound_on_channel(
        &mut self,
        sound: &str,
        channel: &str,
        mode: PlayMode,
        source: SoundSource,
        token: Option<CallbackToken>,
    ) -> Result<()> {
        debug!("play {} on {} ({}, {})", sound, channel, mode, source);
        let hold = self.paused;
        let entry = channel_or_create(&mut self.channels, channel, self.default_volume);
        entry.play_sound(&self.ctx, sound, mode, source, token, hold)
    }

    pub fn stop_channel(&mut self, channel: &str) -> Result<()> {
        self.existing_mut(channel)?.stop();
        Ok(())
    }

    pub fn pause_channel(&mut self, channel: &str) -> Result<()> {
        self.existing_mut(channel)?.pause();
        Ok(())
    }

    /// Resume a paused channel; during a global pause the resume waits for `on_resume`
    pub fn resume_channel(&mut self, channel: &str) -> Result<()> {
        let hold = self.paused;
        self.existing_mut(channel)?.resume(hold);
        Ok(())
    }

    /// Set a channel's volume, creating the channel if needed
    pub fn set_channel_volume(&mut self, channel: &str, volume: u8) {
        channel_or_create(&mut self.channels, channel, self.default_volume).set_volume(volume);
    }

    pub fn channel_volume(&self, channel: &str) -> Option<u8> {
        self.channels.get(channel).map(|c| c.volume())
    }

    pub fn sound_on_channel(&self, channel: &str) -> Option<String> {
        self.channels.get(channel)?.sound().map(str::to_string)
    }

    pub fn next_sound_on_channel(&self, channel: &str) -> Option<String> {
        self.channels.get(channel)?.next_sound().map(str::to_string)
    }

    pub fn channel_status(&self, channel: &str) -> Option<ChannelStatus> {
        self.channels.get(channel).map(|c| c.status())
    }

    pub fn list_channels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    /// Remove a channel, releasing both slots and their tokens
    pub fn delete_channel(&mut self, channel: &str) -> Result<()> {
        let mut removed = self
            .channels
            .remove(channel)
            .ok_or_else(|| Error::UnknownChannel(channel.to_string()))?;
        removed.release();
        info!("Deleted channel {}", channel);
        Ok(())
    }

    /// Read-only access for inspection
    pub fn channel(&self, channel: &str) -> Option<&Channel> {
        self.channels.get(channel)
    }

    /// Global pause (idempotent)
    pub fn on_pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        for channel in self.channels.values_mut() {
            channel.suspend();
        }
        self.background.suspend();
        info!("Sound paused ({} channels)", self.channels.len());
    }

    /// Global resume (idempotent)
    pub fn on_resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        for channel in self.channels.values_mut() {
            channel.wake();
        }
        self.background.wake();
        info!("Sound resumed ({} channels)", self.channels.len());
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Legacy background player: replace the background sound (empty name stops)
    pub fn play_sound(&mut self, sound: &str, source: SoundSource, looping: bool) -> Result<()> {
        let hold = self.paused;
        self.background
            .play_sound(&self.ctx, sound, source, looping, hold)
    }

    pub fn play_loudness(&self) -> u8 {
        self.background.loudness()
    }

    pub fn set_play_loudness(&mut self, loudness: u8) {
        self.background.set_loudness(loudness);
    }

    /// Background player (read-only, for inspection)
    pub fn background(&self) -> &BackgroundPlayer {
        &self.background
    }

    /// Route an asynchronous decoder event to the slot that issued it
    pub fn handle_decoder_event(&mut self, event: DecoderEvent) {
        let DecoderEvent { playback_id, kind } = event;
        let hold = self.paused;

        if self.background.owns(playback_id) {
            self.background
                .on_decoder_event(&self.ctx, playback_id, &kind, hold);
            return;
        }

        for channel in self.channels.values_mut() {
            if let Some(position) = channel.locate(playback_id) {
                channel.on_decoder_event(&self.ctx, position, playback_id, &kind, hold);
                return;
            }
        }

        debug!("Dropping stale decoder event {} ({:?})", playback_id, kind);
    }

    /// Release every channel and the background player
    pub fn shutdown(&mut self) {
        let count = self.channels.len();
        for (_, mut channel) in std::mem::take(&mut self.channels) {
            channel.release();
        }
        self.background.release();
        debug!("Channel registry shut down ({} channels released)", count);
    }

    fn existing_mut(&mut self, channel: &str) -> Result<&mut Channel> {
        self.channels
            .get_mut(channel)
            .ok_or_else(|| Error::UnknownChannel(channel.to_string()))
    }
}

fn channel_or_create<'a>(
    channels: &'a mut BTreeMap<String, Channel>,
    channel: &str,
    default_volume: u8,
) -> &'a mut Channel {
    channels.entry(channel.to_string()).or_insert_with(|| {
        debug!("Creating channel {}", channel);
        Channel::new(channel, default_volume)
    })
}

impl Drop for ChannelRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
