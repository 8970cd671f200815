//! Sound sources and media probing
//!
//! A sound is either a file on disk or a bundled asset resolved against the
//! configured assets root. Probing uses symphonia to find the default audio
//! track and compute its duration without decoding any packets.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Where a sound's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// Path on the filesystem
    File(PathBuf),
    /// Name of a bundled asset
    Asset(String),
}

impl SoundSource {
    /// Build a source from the legacy `(path, is_asset)` pair
    pub fn from_legacy(path: &str, is_asset: bool) -> Self {
        if is_asset {
            SoundSource::Asset(path.to_string())
        } else {
            SoundSource::File(PathBuf::from(path))
        }
    }

    pub fn is_asset(&self) -> bool {
        matches!(self, SoundSource::Asset(_))
    }

    /// Filesystem path this source reads from
    pub fn resolve(&self, assets_root: Option<&Path>) -> PathBuf {
        match self {
            SoundSource::File(path) => path.clone(),
            SoundSource::Asset(name) => match assets_root {
                Some(root) => root.join(name),
                None => PathBuf::from(name),
            },
        }
    }

    /// Open the source for reading
    ///
    /// `sound` is only used to label the error.
    pub fn open(&self, sound: &str, assets_root: Option<&Path>) -> Result<(File, PathBuf)> {
        let path = self.resolve(assets_root);
        let file = File::open(&path).map_err(|e| Error::SourceOpen {
            sound: sound.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok((file, path))
    }
}

impl std::fmt::Display for SoundSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SoundSource::File(path) => write!(f, "file:{}", path.display()),
            SoundSource::Asset(name) => write!(f, "asset:{}", name),
        }
    }
}

/// Probe an opened media file and return the duration of its default audio track
///
/// Blocking; run it on a blocking task.
pub fn probe_duration(file: File, path: &Path) -> Result<Duration> {
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext_str);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

    let params = &track.codec_params;
    let n_frames = params
        .n_frames
        .ok_or_else(|| Error::Decode("Track length unknown".to_string()))?;

    let duration = if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(n_frames);
        Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac)
    } else {
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        Duration::from_secs_f64(n_frames as f64 / sample_rate as f64)
    };

    debug!("Probed {}: {} frames, {:?}", path.display(), n_frames, duration);
    Ok(duration)
}
