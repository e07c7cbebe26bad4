use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::effects::transitions::{TransitionKind, parse_transition};
use crate::foundation::error::{SlideError, SlideResult};

/// What to do when the audio is shorter than the nominal schedule needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortAudioPolicy {
    /// Keep the nominal durations and clamp the last segment to the minimum segment
    /// duration. The output cap trims the video back to the audio length.
    #[default]
    Floor,
    /// Spread the audio evenly across all segments, never going below the minimum
    /// segment duration.
    Shrink,
}

impl std::str::FromStr for ShortAudioPolicy {
    type Err = SlideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "floor" | "clamp" => Ok(Self::Floor),
            "shrink" | "proportional" => Ok(Self::Shrink),
            other => Err(SlideError::config(format!(
                "unknown short-audio policy '{other}'"
            ))),
        }
    }
}

/// Options controlling timeline planning, graph compilation and process invocation.
///
/// Every field has a default, so a JSON config file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlideshowOpts {
    /// Display time of every image except the last, in seconds.
    pub image_duration_secs: f64,
    /// Length of each crossfade, in seconds.
    pub crossfade_secs: f64,
    /// Transition name passed to `xfade` (see [`TransitionKind`]).
    pub transition: String,
    /// Duration the short-audio policy gives to a segment too short to carry the crossfade.
    pub min_segment_secs: f64,
    /// Policy applied when the audio is shorter than the schedule.
    pub short_audio: ShortAudioPolicy,
    /// Compositor binary.
    pub ffmpeg_bin: String,
    /// Probe binary.
    pub ffprobe_bin: String,
    /// Video encoder passed to `-c:v`.
    pub video_codec: String,
    /// Upper bound on a single compositor run, in seconds.
    pub compose_timeout_secs: u64,
    /// Root holding one working directory per job.
    pub work_root: PathBuf,
    /// Directory receiving finished videos.
    pub output_dir: PathBuf,
    /// File name of the audio track inside a job directory.
    pub audio_file_name: String,
    /// Base URL of the remote resize/collage service, if one is used.
    pub resize_url: Option<String>,
    /// Age after which a leftover job directory is considered stale, in seconds.
    pub stale_after_secs: u64,
}

impl Default for SlideshowOpts {
    fn default() -> Self {
        Self {
            image_duration_secs: 3.5,
            crossfade_secs: 0.25,
            transition: "slideleft".to_string(),
            min_segment_secs: 1.0,
            short_audio: ShortAudioPolicy::Floor,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            video_codec: "libx264".to_string(),
            compose_timeout_secs: 300,
            work_root: PathBuf::from("/tmp/collages"),
            output_dir: PathBuf::from("collages"),
            audio_file_name: "audio.mp3".to_string(),
            resize_url: None,
            stale_after_secs: 6 * 60 * 60,
        }
    }
}

impl SlideshowOpts {
    /// Load options from a JSON file and validate them.
    pub fn from_path(path: &Path) -> SlideResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json(&text)
    }

    /// Parse options from JSON text and validate them.
    pub fn from_json(text: &str) -> SlideResult<Self> {
        let opts: Self = serde_json::from_str(text)
            .map_err(|e| SlideError::config(format!("invalid config json: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Check the invariants the planner and compiler rely on.
    pub fn validate(&self) -> SlideResult<()> {
        for (name, value) in [
            ("image_duration_secs", self.image_duration_secs),
            ("crossfade_secs", self.crossfade_secs),
            ("min_segment_secs", self.min_segment_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SlideError::config(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        if self.crossfade_secs >= self.image_duration_secs {
            return Err(SlideError::config(
                "crossfade_secs must be shorter than image_duration_secs",
            ));
        }
        // xfade needs each incoming segment to outlast the blend.
        if self.min_segment_secs <= self.crossfade_secs {
            return Err(SlideError::config(
                "min_segment_secs must be longer than crossfade_secs",
            ));
        }
        if self.compose_timeout_secs == 0 {
            return Err(SlideError::config("compose_timeout_secs must be > 0"));
        }
        if self.ffmpeg_bin.trim().is_empty() || self.ffprobe_bin.trim().is_empty() {
            return Err(SlideError::config("ffmpeg_bin/ffprobe_bin must be non-empty"));
        }
        if self.video_codec.trim().is_empty() {
            return Err(SlideError::config("video_codec must be non-empty"));
        }
        if self.audio_file_name.is_empty()
            || self.audio_file_name.contains(['/', '\\'])
            || self.audio_file_name == ".."
        {
            return Err(SlideError::config(
                "audio_file_name must be a plain file name",
            ));
        }
        self.transition_kind()?;
        Ok(())
    }

    /// Parsed transition kind.
    pub fn transition_kind(&self) -> SlideResult<TransitionKind> {
        parse_transition(&self.transition)
    }

    /// Compositor timeout as a [`std::time::Duration`].
    pub fn compose_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.compose_timeout_secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/opts.rs"]
mod tests;
