use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assets::media::DimensionProbe;
use crate::encode::compositor::{Compositor, RenderRequest};
use crate::foundation::core::Dimensions;
use crate::foundation::error::{SlideError, SlideResult};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Compositor backed by the system `ffmpeg` binary.
///
/// Runs are blocking and bounded by `timeout`; stderr is captured for diagnostics.
pub struct FfmpegCompositor {
    bin: String,
    timeout: Duration,
    probe: Arc<dyn DimensionProbe>,
}

impl FfmpegCompositor {
    /// Create a compositor invoking `bin`, probing results with `probe`.
    pub fn new(bin: impl Into<String>, timeout: Duration, probe: Arc<dyn DimensionProbe>) -> Self {
        Self {
            bin: bin.into(),
            timeout,
            probe,
        }
    }

    /// Return `true` when the compositor binary can be invoked.
    pub fn is_available(&self) -> bool {
        Command::new(&self.bin)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run(&self, request: &RenderRequest) -> SlideResult<()> {
        let out_path = request.out_path();
        ensure_parent_dir(out_path)?;

        let args = request.to_args()?;
        tracing::debug!(bin = %self.bin, args = ?args, "spawning compositor");

        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SlideError::composition(
                    format!("failed to spawn {} (is it installed and on PATH?): {e}", self.bin),
                    "",
                )
            })?;

        let mut stderr = child.stderr.take().ok_or_else(|| {
            SlideError::composition("failed to open compositor stderr (unexpected)", "")
        })?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok::<_, std::io::Error>(stderr_bytes)
        });

        let waited = wait_with_timeout(&mut child, self.timeout);
        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| SlideError::composition("compositor stderr drain thread panicked", ""))?
            .unwrap_or_default();
        let captured = String::from_utf8_lossy(&stderr_bytes).trim().to_string();

        let err = match waited {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => SlideError::composition(
                format!("{} exited with status {status}", self.bin),
                captured,
            ),
            Ok(None) => SlideError::composition(
                format!(
                    "{} timed out after {}s and was killed",
                    self.bin,
                    self.timeout.as_secs_f64()
                ),
                captured,
            ),
            Err(e) => SlideError::composition(
                format!("failed to wait for {}: {e}", self.bin),
                captured,
            ),
        };
        // Only a spawned run can have written the output.
        remove_partial_output(out_path);
        Err(err)
    }
}

impl Compositor for FfmpegCompositor {
    fn compose(&self, request: &RenderRequest) -> SlideResult<Dimensions> {
        let out_path = request.out_path();
        let started = Instant::now();

        self.run(request)?;
        match self.probe.probe_dimensions(out_path) {
            Ok(dims) => {
                tracing::info!(
                    out = %out_path.display(),
                    %dims,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "composition finished"
                );
                Ok(dims)
            }
            Err(e) => {
                remove_partial_output(out_path);
                Err(e)
            }
        }
    }
}

/// Wait for `child`, killing it once `timeout` elapses.
///
/// Returns `Ok(None)` when the child had to be killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                // Reap the child so the stderr drain sees EOF.
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(out = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(out = %path.display(), error = %e, "failed to remove partial output"),
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> SlideResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
