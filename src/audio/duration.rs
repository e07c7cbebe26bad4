use std::path::Path;

use crate::assets::media::AudioProbe;
use crate::foundation::error::Condition;

/// Audio length the timeline is planned against.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedDuration {
    /// Duration in seconds.
    pub secs: f64,
    /// Set when the probe failed and `secs` is an estimate.
    pub condition: Option<Condition>,
}

impl ResolvedDuration {
    /// Return `true` when the duration was estimated rather than measured.
    pub fn is_estimate(&self) -> bool {
        self.condition.is_some()
    }
}

/// Estimate used when the audio cannot be probed: every image at nominal length.
pub fn fallback_duration(nominal_secs: f64, image_count: usize) -> f64 {
    nominal_secs * image_count as f64
}

/// Probe `audio_path`, falling back to [`fallback_duration`] on any failure.
///
/// Never fails. A fallback is logged at `warn` because the video will not line up with
/// the real audio length.
pub fn resolve_audio_duration(
    probe: &dyn AudioProbe,
    audio_path: &Path,
    image_count: usize,
    nominal_secs: f64,
) -> ResolvedDuration {
    match probe.probe_duration(audio_path) {
        Ok(secs) if secs.is_finite() && secs > 0.0 => {
            tracing::debug!(audio = %audio_path.display(), secs, "probed audio duration");
            ResolvedDuration {
                secs,
                condition: None,
            }
        }
        Ok(secs) => fall_back(
            audio_path,
            format!("probe returned {secs}"),
            image_count,
            nominal_secs,
        ),
        Err(e) => fall_back(audio_path, e.to_string(), image_count, nominal_secs),
    }
}

fn fall_back(
    audio_path: &Path,
    reason: String,
    image_count: usize,
    nominal_secs: f64,
) -> ResolvedDuration {
    let secs = fallback_duration(nominal_secs, image_count);
    tracing::warn!(
        audio = %audio_path.display(),
        %reason,
        fallback_secs = secs,
        "audio probe failed; timing will not match the real audio length"
    );
    ResolvedDuration {
        secs,
        condition: Some(Condition::ProbeFailed {
            reason,
            fallback_secs: secs,
        }),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/duration.rs"]
mod tests;
