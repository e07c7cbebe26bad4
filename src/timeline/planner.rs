use std::path::PathBuf;

use crate::assets::loader::ImageSet;
use crate::config::opts::{ShortAudioPolicy, SlideshowOpts};
use crate::foundation::error::{Condition, SlideError, SlideResult};
use crate::foundation::math::approx_eq;

/// One image of a job together with its position in the slideshow.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ImageEntry {
    /// Sequence number; unique within a job.
    pub sequence: u32,
    /// Location of the image file.
    pub path: PathBuf,
}

/// One image's timed slot in the timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Segment {
    /// Source image.
    pub entry: ImageEntry,
    /// Display duration in seconds, always > 0.
    pub duration_secs: f64,
    /// 1-based position in the timeline.
    pub ordinal: usize,
}

impl Segment {
    /// Label of this segment's timebase-normalized stream (`img1`, `img2`, ...).
    pub fn label(&self) -> String {
        format!("img{}", self.ordinal)
    }
}

/// Ordered segments plus the authoritative output duration.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Timeline {
    /// Segments in strictly increasing sequence order.
    pub segments: Vec<Segment>,
    /// Target duration in seconds (the audio length).
    pub target_secs: f64,
}

impl Timeline {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Return `true` when the timeline holds no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of all segment durations.
    pub fn total_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }
}

/// Planner output: the timeline and every non-fatal condition met while building it.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelinePlan {
    /// The planned timeline.
    pub timeline: Timeline,
    /// Conditions recorded while ordering and timing.
    pub conditions: Vec<Condition>,
}

/// Extract `N` from a file name of the form `img<N>.<ext>`.
pub fn parse_sequence_number(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix("img")?;
    let (digits, ext) = rest.split_once('.')?;
    if digits.is_empty() || ext.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Turn a loaded image set into entries sorted by sequence number.
///
/// Names without a sequence number and repeated sequence numbers are dropped, each with a
/// [`Condition::MalformedName`].
pub fn order_images(set: ImageSet) -> (Vec<ImageEntry>, Vec<Condition>) {
    let mut conditions = Vec::new();
    let mut entries: Vec<ImageEntry> = match set {
        ImageSet::Listed(paths) => paths
            .into_iter()
            .filter_map(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match parse_sequence_number(&name) {
                    Some(sequence) => Some(ImageEntry { sequence, path }),
                    None => {
                        tracing::warn!(%name, "excluding image without a sequence number");
                        conditions.push(Condition::MalformedName { name });
                        None
                    }
                }
            })
            .collect(),
        ImageSet::Manifest(rows) => rows
            .into_iter()
            .map(|(sequence, path)| ImageEntry { sequence, path })
            .collect(),
    };

    // Path as a tie-breaker keeps duplicate handling independent of listing order.
    entries.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.path.cmp(&b.path)));

    let mut ordered: Vec<ImageEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if ordered.last().is_some_and(|prev| prev.sequence == entry.sequence) {
            let name = entry.path.display().to_string();
            tracing::warn!(%name, sequence = entry.sequence, "excluding duplicate sequence number");
            conditions.push(Condition::MalformedName { name });
            continue;
        }
        ordered.push(entry);
    }
    (ordered, conditions)
}

/// Assign display durations so the timeline spans `audio_secs`.
///
/// All images but the last get the nominal duration; the last absorbs the remainder.
/// When the remainder is too short to carry the crossfade (`<= opts.crossfade_secs`,
/// including zero and negative remainders) the configured [`ShortAudioPolicy`] decides the
/// durations and a [`Condition::TimingOverflow`] is recorded.
pub fn plan_timeline(
    entries: Vec<ImageEntry>,
    audio_secs: f64,
    opts: &SlideshowOpts,
) -> SlideResult<TimelinePlan> {
    if entries.is_empty() {
        return Err(SlideError::graph_underflow("no usable images to plan"));
    }
    if !audio_secs.is_finite() || audio_secs <= 0.0 {
        return Err(SlideError::validation(format!(
            "audio duration must be finite and > 0, got {audio_secs}"
        )));
    }
    if let Some(pair) = entries.windows(2).find(|w| w[0].sequence >= w[1].sequence) {
        return Err(SlideError::validation(format!(
            "entries must be strictly ordered, found {} before {}",
            pair[0].sequence, pair[1].sequence
        )));
    }

    let count = entries.len();
    let mut conditions = Vec::new();

    let durations: Vec<f64> = if count == 1 {
        // No crossfade partner: the only image covers the whole audio.
        vec![audio_secs]
    } else {
        let nominal = opts.image_duration_secs;
        let elapsed = nominal * (count - 1) as f64;
        let raw_last = audio_secs - elapsed;

        // xfade needs the incoming segment to outlast the blend.
        if raw_last > opts.crossfade_secs {
            let mut d = vec![nominal; count - 1];
            d.push(raw_last);
            d
        } else {
            let d = match opts.short_audio {
                ShortAudioPolicy::Floor => {
                    let mut d = vec![nominal; count - 1];
                    d.push(opts.min_segment_secs);
                    d
                }
                ShortAudioPolicy::Shrink => {
                    let each = (audio_secs / count as f64).max(opts.min_segment_secs);
                    vec![each; count]
                }
            };
            let applied = d[count - 1];
            tracing::warn!(
                audio_secs,
                elapsed,
                raw_last,
                applied,
                policy = ?opts.short_audio,
                "audio shorter than nominal schedule"
            );
            conditions.push(Condition::TimingOverflow {
                raw_secs: raw_last,
                applied_secs: applied,
            });
            d
        }
    };

    let segments: Vec<Segment> = entries
        .into_iter()
        .zip(durations)
        .enumerate()
        .map(|(i, (entry, duration_secs))| Segment {
            entry,
            duration_secs,
            ordinal: i + 1,
        })
        .collect();

    let timeline = Timeline {
        segments,
        target_secs: audio_secs,
    };
    debug_assert!(!conditions.is_empty() || approx_eq(timeline.total_secs(), audio_secs));
    debug_assert!(timeline.segments.iter().all(|s| s.duration_secs > 0.0));

    Ok(TimelinePlan {
        timeline,
        conditions,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/planner.rs"]
mod tests;
