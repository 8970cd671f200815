//! Line-oriented command surface
//!
//! One command per line, results rendered the way the legacy scripting
//! surface reports them: `true`/`false` for control operations, `-1` for a
//! missing channel's status or volume, an empty line for a null sound, and a
//! newline-joined channel list.

use crate::audio::source::SoundSource;
use crate::error::{Error, Result};
use crate::playback::{SoundHandle, TokenTable};
use chanplay_common::events::PlayMode;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Play {
        channel: String,
        mode: PlayMode,
        sound: String,
        asset: bool,
    },
    Stop(String),
    Pause(String),
    Resume(String),
    Status(String),
    Sound(String),
    NextSound(String),
    Delete(String),
    /// Get (`None`) or set a channel's volume
    Volume(String, Option<u8>),
    List,
    /// Replace the background sound; `None` stops it
    Background { sound: Option<String>, looping: bool },
    /// Get (`None`) or set the background loudness
    Loudness(Option<u8>),
    Suspend,
    Wake,
    Quit,
}

fn parse_level(word: &str, what: &str) -> Result<u8> {
    word.parse::<u8>()
        .map_err(|_| Error::BadRequest(format!("{} must be 0-100, got '{}'", what, word)))
}

impl FromStr for LineCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(Error::BadRequest("empty command".to_string()));
        };

        let channel_arg = || -> Result<String> {
            match args {
                [channel] => Ok(channel.to_string()),
                _ => Err(Error::BadRequest(format!("usage: {} <channel>", verb))),
            }
        };

        let command = match verb {
            "play" => match args {
                [channel, mode, sound] | [channel, mode, sound, _] => {
                    let asset = match args.get(3) {
                        None => false,
                        Some(&"asset") => true,
                        Some(other) => {
                            return Err(Error::BadRequest(format!(
                                "expected 'asset', got '{}'",
                                other
                            )))
                        }
                    };
                    LineCommand::Play {
                        channel: channel.to_string(),
                        mode: mode.parse()?,
                        sound: sound.to_string(),
                        asset,
                    }
                }
                _ => {
                    return Err(Error::BadRequest(
                        "usage: play <channel> <now|next|looping> <sound> [asset]".to_string(),
                    ))
                }
            },
            "stop" => LineCommand::Stop(channel_arg()?),
            "pause" => LineCommand::Pause(channel_arg()?),
            "resume" => LineCommand::Resume(channel_arg()?),
            "status" => LineCommand::Status(channel_arg()?),
            "sound" => LineCommand::Sound(channel_arg()?),
            "next-sound" => LineCommand::NextSound(channel_arg()?),
            "delete" => LineCommand::Delete(channel_arg()?),
            "volume" => match args {
                [channel] => LineCommand::Volume(channel.to_string(), None),
                [channel, level] => {
                    LineCommand::Volume(channel.to_string(), Some(parse_level(level, "volume")?))
                }
                _ => {
                    return Err(Error::BadRequest(
                        "usage: volume <channel> [0-100]".to_string(),
                    ))
                }
            },
            "list" => LineCommand::List,
            "bg" => match args {
                [sound] | [sound, _] => {
                    let looping = match args.get(1) {
                        None => false,
                        Some(&"loop") => true,
                        Some(other) => {
                            return Err(Error::BadRequest(format!(
                                "expected 'loop', got '{}'",
                                other
                            )))
                        }
                    };
                    let sound = (*sound != "-").then(|| sound.to_string());
                    LineCommand::Background { sound, looping }
                }
                _ => return Err(Error::BadRequest("usage: bg <sound|-> [loop]".to_string())),
            },
            "loudness" => match args {
                [] => LineCommand::Loudness(None),
                [level] => LineCommand::Loudness(Some(parse_level(level, "loudness")?)),
                _ => return Err(Error::BadRequest("usage: loudness [0-100]".to_string())),
            },
            "suspend" => LineCommand::Suspend,
            "wake" => LineCommand::Wake,
            "quit" | "exit" => LineCommand::Quit,
            other => return Err(Error::BadRequest(format!("unknown command '{}'", other))),
        };

        Ok(command)
    }
}

fn flag(result: Result<()>) -> String {
    match result {
        Ok(()) => "true".to_string(),
        Err(e) => {
            debug!("Command failed: {}", e);
            "false".to_string()
        }
    }
}

impl LineCommand {
    /// Run the command and render its legacy result
    ///
    /// Plays allocate a callback token in `tokens` carrying the channel name;
    /// the event printer frees it again. Only a stopped service is an error.
    pub async fn execute(
        &self,
        handle: &SoundHandle,
        tokens: &Mutex<TokenTable<String>>,
    ) -> Result<String> {
        let output = match self {
            LineCommand::Play {
                channel,
                mode,
                sound,
                asset,
            } => {
                let token = tokens.lock().await.allocate(channel.clone());
                let source = SoundSource::from_legacy(sound, *asset);
                let result = handle
                    .play_sound_on_channel(sound.as_str(), channel.as_str(), *mode, source, Some(token))
                    .await;
                if let Err(Error::SourceOpen { sound, reason }) = &result {
                    warn!("Cannot play {} on {}: {}", sound, channel, reason);
                }
                flag(checked(result)?)
            }
            LineCommand::Stop(channel) => flag(checked(handle.stop_channel(channel.as_str()).await)?),
            LineCommand::Pause(channel) => {
                flag(checked(handle.pause_channel(channel.as_str()).await)?)
            }
            LineCommand::Resume(channel) => {
                flag(checked(handle.resume_channel(channel.as_str()).await)?)
            }
            LineCommand::Status(channel) => handle
                .channel_status(channel.as_str())
                .await?
                .map_or(-1, |status| status.code())
                .to_string(),
            LineCommand::Sound(channel) => handle
                .sound_on_channel(channel.as_str())
                .await?
                .unwrap_or_default(),
            LineCommand::NextSound(channel) => handle
                .next_sound_on_channel(channel.as_str())
                .await?
                .unwrap_or_default(),
            LineCommand::Delete(channel) => {
                flag(checked(handle.delete_channel(channel.as_str()).await)?)
            }
            LineCommand::Volume(channel, None) => handle
                .channel_volume(channel.as_str())
                .await?
                .map_or(-1, i32::from)
                .to_string(),
            LineCommand::Volume(channel, Some(level)) => {
                flag(checked(handle.set_channel_volume(channel.as_str(), *level).await)?)
            }
            LineCommand::List => handle.list_channels().await?.join("\n"),
            LineCommand::Background { sound, looping } => {
                let name = sound.clone().unwrap_or_default();
                let source = SoundSource::from_legacy(&name, false);
                flag(checked(handle.play_sound(name, source, *looping).await)?)
            }
            LineCommand::Loudness(None) => handle.play_loudness().await?.to_string(),
            LineCommand::Loudness(Some(level)) => {
                flag(checked(handle.set_play_loudness(*level).await)?)
            }
            LineCommand::Suspend => flag(checked(handle.pause_all().await)?),
            LineCommand::Wake => flag(checked(handle.resume_all().await)?),
            LineCommand::Quit => String::new(),
        };

        Ok(output)
    }
}

/// Turn a stopped service into a hard error, keep everything else as a result
fn checked(result: Result<()>) -> Result<Result<()>> {
    match result {
        Err(Error::ServiceStopped) => Err(Error::ServiceStopped),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play() {
        let command: LineCommand = "play fx next boom.wav asset".parse().unwrap();
        assert_eq!(
            command,
            LineCommand::Play {
                channel: "fx".to_string(),
                mode: PlayMode::Next,
                sound: "boom.wav".to_string(),
                asset: true,
            }
        );

        let command: LineCommand = "play music looping /tmp/theme.ogg".parse().unwrap();
        assert!(matches!(
            command,
            LineCommand::Play { mode: PlayMode::Looping, asset: false, .. }
        ));
    }

    #[test]
    fn test_parse_play_rejects_bad_arguments() {
        assert!("play fx".parse::<LineCommand>().is_err());
        assert!("play fx sometime a.wav".parse::<LineCommand>().is_err());
        assert!("play fx now a.wav bundled".parse::<LineCommand>().is_err());
    }

    #[test]
    fn test_parse_channel_commands() {
        assert_eq!("stop fx".parse::<LineCommand>().unwrap(), LineCommand::Stop("fx".into()));
        assert_eq!(
            "next-sound fx".parse::<LineCommand>().unwrap(),
            LineCommand::NextSound("fx".into())
        );
        assert!("status".parse::<LineCommand>().is_err());
        assert!("delete a b".parse::<LineCommand>().is_err());
    }

    #[test]
    fn test_parse_volume_and_loudness() {
        assert_eq!(
            "volume fx".parse::<LineCommand>().unwrap(),
            LineCommand::Volume("fx".into(), None)
        );
        assert_eq!(
            "volume fx 40".parse::<LineCommand>().unwrap(),
            LineCommand::Volume("fx".into(), Some(40))
        );
        assert!("volume fx loud".parse::<LineCommand>().is_err());
        assert_eq!("loudness".parse::<LineCommand>().unwrap(), LineCommand::Loudness(None));
        assert_eq!(
            "loudness 5".parse::<LineCommand>().unwrap(),
            LineCommand::Loudness(Some(5))
        );
    }

    #[test]
    fn test_parse_background() {
        assert_eq!(
            "bg rain.ogg loop".parse::<LineCommand>().unwrap(),
            LineCommand::Background {
                sound: Some("rain.ogg".into()),
                looping: true
            }
        );
        assert_eq!(
            "bg -".parse::<LineCommand>().unwrap(),
            LineCommand::Background {
                sound: None,
                looping: false
            }
        );
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!("  list  ".parse::<LineCommand>().unwrap(), LineCommand::List);
        assert_eq!("quit".parse::<LineCommand>().unwrap(), LineCommand::Quit);
        assert!("".parse::<LineCommand>().is_err());
        assert!("dance".parse::<LineCommand>().is_err());
    }
}
