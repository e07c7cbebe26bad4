use std::path::Path;

use crate::foundation::core::Dimensions;
use crate::foundation::error::{SlideError, SlideResult};

/// Capability: measure the duration of an audio file in seconds.
pub trait AudioProbe: Send + Sync {
    /// Return the duration of `path`, or an error when it cannot be measured.
    fn probe_duration(&self, path: &Path) -> SlideResult<f64>;
}

/// Capability: read the pixel dimensions of an encoded video.
pub trait DimensionProbe: Send + Sync {
    /// Return the dimensions of the first video stream of `path`.
    fn probe_dimensions(&self, path: &Path) -> SlideResult<Dimensions>;
}

/// Both probes backed by the system `ffprobe` binary.
#[derive(Clone, Debug)]
pub struct Ffprobe {
    bin: String,
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Ffprobe {
    /// Use `bin` as the probe executable.
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl AudioProbe for Ffprobe {
    fn probe_duration(&self, path: &Path) -> SlideResult<f64> {
        let out = std::process::Command::new(&self.bin)
            .arg("-i")
            .arg(path)
            .args([
                "-show_entries",
                "format=duration",
                "-v",
                "quiet",
                "-of",
                "csv=p=0",
            ])
            .output()
            .map_err(|e| SlideError::probe(format!("failed to run {}: {e}", self.bin)))?;
        if !out.status.success() {
            return Err(SlideError::probe(format!(
                "{} exited with status {} for '{}': {}",
                self.bin,
                out.status,
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        parse_duration_output(&String::from_utf8_lossy(&out.stdout))
    }
}

impl DimensionProbe for Ffprobe {
    fn probe_dimensions(&self, path: &Path) -> SlideResult<Dimensions> {
        let out = std::process::Command::new(&self.bin)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                SlideError::composition(format!("failed to run {}: {e}", self.bin), "")
            })?;
        if !out.status.success() {
            return Err(SlideError::composition(
                format!(
                    "dimension probe failed for '{}' ({})",
                    path.display(),
                    out.status
                ),
                String::from_utf8_lossy(&out.stderr).trim(),
            ));
        }
        parse_dimensions_output(&out.stdout)
    }
}

/// Parse the single scalar `format=duration` prints in `csv=p=0` mode.
pub fn parse_duration_output(stdout: &str) -> SlideResult<f64> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(SlideError::probe("probe printed no duration"));
    }
    let secs: f64 = trimmed
        .parse()
        .map_err(|_| SlideError::probe(format!("unparsable duration '{trimmed}'")))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(SlideError::probe(format!(
            "duration must be finite and > 0, got '{trimmed}'"
        )));
    }
    Ok(secs)
}

/// Parse `-show_entries stream=width,height -of json` output.
pub fn parse_dimensions_output(stdout: &[u8]) -> SlideResult<Dimensions> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    let parsed: ProbeOut = serde_json::from_slice(stdout).map_err(|e| {
        SlideError::composition(
            format!("dimension probe json parse failed: {e}"),
            String::from_utf8_lossy(stdout),
        )
    })?;
    let stream = parsed
        .streams
        .first()
        .ok_or_else(|| SlideError::composition("no video stream found in output", ""))?;
    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Ok(Dimensions { width, height })
        }
        _ => Err(SlideError::composition(
            "missing video width/height from probe",
            String::from_utf8_lossy(stdout),
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
