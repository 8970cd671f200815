//! Sound service (owner task)
//!
//! The registry lives on a single tokio task. Callers reach it through a
//! cloneable `SoundHandle`; decoders reach it through the decoder event queue.
//! The task consumes both queues with `tokio::select!`, so registry mutations
//! and decoder callbacks never run concurrently.

use crate::audio::decoder::{DecoderEventReceiver, DecoderFactory};
use crate::audio::source::SoundSource;
use crate::error::{Error, Result};
use crate::playback::events::EventSink;
use crate::playback::registry::{ChannelRegistry, RegistrySettings};
use crate::playback::slot::SlotContext;
use chanplay_common::events::{CallbackToken, ChannelStatus, PlayMode, SoundEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type Job = Box<dyn FnOnce(&mut ChannelRegistry) + Send>;

enum Command {
    /// Run a closure against the registry on the owner task
    Run(Job),
    /// Release everything and exit the loop
    Shutdown(oneshot::Sender<()>),
}

/// Spawns the owner task
pub struct SoundService;

impl SoundService {
    /// Start the owner task on the current tokio runtime
    ///
    /// Returns the control handle and the outbound event receiver. The event
    /// receiver closes after the service shuts down and every pending event has
    /// been delivered.
    pub fn spawn(
        factory: Arc<dyn DecoderFactory>,
        settings: RegistrySettings,
    ) -> (SoundHandle, mpsc::UnboundedReceiver<SoundEvent>) {
        let (decoder_tx, decoder_rx) = mpsc::unbounded_channel();
        let (sink, event_rx) = EventSink::new();
        let registry = ChannelRegistry::new(SlotContext::new(factory, decoder_tx, sink), settings);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_owner_loop(registry, command_rx, decoder_rx));

        (
            SoundHandle {
                command_tx,
                task: Arc::new(std::sync::Mutex::new(Some(task))),
            },
            event_rx,
        )
    }
}

async fn run_owner_loop(
    mut registry: ChannelRegistry,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut decoder_events: DecoderEventReceiver,
) {
    info!("Sound service started");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Run(job)) => job(&mut registry),
                Some(Command::Shutdown(reply)) => {
                    registry.shutdown();
                    let _ = reply.send(());
                    break;
                }
                None => {
                    debug!("All sound handles dropped");
                    registry.shutdown();
                    break;
                }
            },
            Some(event) = decoder_events.recv() => registry.handle_decoder_event(event),
        }
    }

    info!("Sound service stopped");
}

/// Cloneable handle to the sound service
#[derive(Clone)]
pub struct SoundHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    task: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl SoundHandle {
    /// Run `f` against the registry on the owner task and return its result
    pub async fn call<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut ChannelRegistry) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |registry| {
            let _ = reply_tx.send(f(registry));
        });
        self.command_tx
            .send(Command::Run(job))
            .map_err(|_| Error::ServiceStopped)?;
        reply_rx.await.map_err(|_| Error::ServiceStopped)
    }

    pub async fn play_sound_on_channel(
        &self,
        sound: impl Into<String>,
        channel: impl Into<String>,
        mode: PlayMode,
        source: SoundSource,
        token: Option<CallbackToken>,
    ) -> Result<()> {
        let (sound, channel) = (sound.into(), channel.into());
        self.call(move |r| r.play_sound_on_channel(&sound, &channel, mode, source, token))
            .await?
    }

    pub async fn stop_channel(&self, channel: impl Into<String>) -> Result<()> {
        let channel = channel.into();
        self.call(move |r| r.stop_channel(&channel)).await?
    }

    pub async fn pause_channel(&self, channel: impl Into<String>) -> Result<()> {
        let channel = channel.into();
        self.call(move |r| r.pause_channel(&channel)).await?
    }

    pub async fn resume_channel(&self, channel: impl Into<String>) -> Result<()> {
        let channel = channel.into();
        self.call(move |r| r.resume_channel(&channel)).await?
    }

    pub async fn set_channel_volume(&self, channel: impl Into<String>, volume: u8) -> Result<()> {
        let channel = channel.into();
        self.call(move |r| r.set_channel_volume(&channel, volume)).await
    }

    pub async fn channel_volume(&self, channel: impl Into<String>) -> Result<Option<u8>> {
        let channel = channel.into();
        self.call(move |r| r.channel_volume(&channel)).await
    }

    pub async fn sound_on_channel(&self, channel: impl Into<String>) -> Result<Option<String>> {
        let channel = channel.into();
        self.call(move |r| r.sound_on_channel(&channel)).await
    }

    pub async fn next_sound_on_channel(&self, channel: impl Into<String>) -> Result<Option<String>> {
        let channel = channel.into();
        self.call(move |r| r.next_sound_on_channel(&channel)).await
    }

    pub async fn channel_status(&self, channel: impl Into<String>) -> Result<Option<ChannelStatus>> {
        let channel = channel.into();
        self.call(move |r| r.channel_status(&channel)).await
    }

    pub async fn list_channels(&self) -> Result<Vec<String>> {
        self.call(|r| r.list_channels()).await
    }

    pub async fn delete_channel(&self, channel: impl Into<String>) -> Result<()> {
        let channel = channel.into();
        self.call(move |r| r.delete_channel(&channel)).await?
    }

    /// Global pause (app went to background)
    pub async fn pause_all(&self) -> Result<()> {
        self.call(|r| r.on_pause()).await
    }

    /// Global resume (app came back)
    pub async fn resume_all(&self) -> Result<()> {
        self.call(|r| r.on_resume()).await
    }

    /// Legacy background player
    pub async fn play_sound(
        &self,
        sound: impl Into<String>,
        source: SoundSource,
        looping: bool,
    ) -> Result<()> {
        let sound = sound.into();
        self.call(move |r| r.play_sound(&sound, source, looping)).await?
    }

    pub async fn play_loudness(&self) -> Result<u8> {
        self.call(|r| r.play_loudness()).await
    }

    pub async fn set_play_loudness(&self, loudness: u8) -> Result<()> {
        self.call(move |r| r.set_play_loudness(loudness)).await
    }

    /// Release every channel and stop the owner task
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.command_tx.send(Command::Shutdown(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }

        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            task.await
                .map_err(|e| Error::InvalidState(format!("Sound service task failed: {}", e)))?;
        }
        Ok(())
    }
}
