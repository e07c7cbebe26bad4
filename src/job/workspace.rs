use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Context as _;

use crate::assets::manifest::{ImageManifest, MANIFEST_FILE_NAME, ManifestImage};
use crate::config::opts::SlideshowOpts;
use crate::foundation::core::JobId;
use crate::foundation::error::{SlideError, SlideResult};

/// Output kind of an animated slideshow (`slide-<id>.mp4`).
pub const SLIDESHOW_KIND: &str = "slide";
/// Output kind of a still-image video (`video-<id>.mp4`).
pub const STILL_KIND: &str = "video";
/// Output kind of a remote collage image (`collage-<id>.png`).
pub const COLLAGE_KIND: &str = "collage";

/// Per-job working directory and output naming.
///
/// `<work_root>/<id>/` holds the job's images and audio track; finished media goes to
/// `<output_dir>/<kind>-<id>.<ext>`.
#[derive(Clone, Debug)]
pub struct JobWorkspace {
    id: JobId,
    dir: PathBuf,
    audio_file_name: String,
    output_dir: PathBuf,
}

impl JobWorkspace {
    /// Lay out the workspace of `id` according to `opts`. Touches nothing on disk.
    pub fn new(id: JobId, opts: &SlideshowOpts) -> Self {
        let dir = opts.work_root.join(id.as_str());
        Self {
            id,
            dir,
            audio_file_name: opts.audio_file_name.clone(),
            output_dir: opts.output_dir.clone(),
        }
    }

    /// Job id.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Working directory of the job.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the job's audio track.
    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(&self.audio_file_name)
    }

    /// `<output_dir>/<kind>-<id>.<ext>`.
    pub fn output_path(&self, kind: &str, ext: &str) -> PathBuf {
        self.output_dir.join(format!("{kind}-{}.{ext}", self.id))
    }

    /// Output path of the animated slideshow.
    pub fn slideshow_output(&self) -> PathBuf {
        self.output_path(SLIDESHOW_KIND, "mp4")
    }

    /// Output path of the still-image video.
    pub fn still_output(&self) -> PathBuf {
        self.output_path(STILL_KIND, "mp4")
    }

    /// Where the remote service deposits the job's collage.
    pub fn collage_image(&self) -> PathBuf {
        self.output_path(COLLAGE_KIND, "png")
    }

    /// Return `true` when the working directory exists.
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Create the working directory and write the audio track into it.
    pub fn prepare(&self, audio: &[u8]) -> SlideResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SlideError::io(&self.dir, e))?;
        let audio_path = self.audio_path();
        std::fs::write(&audio_path, audio).map_err(|e| SlideError::io(&audio_path, e))?;
        tracing::debug!(job = %self.id, dir = %self.dir.display(), bytes = audio.len(), "prepared workspace");
        Ok(())
    }

    /// Write raw images as `img1.<ext>`, `img2.<ext>`, ... in upload order, plus a
    /// manifest pinning that order.
    ///
    /// The extension comes from the sniffed format; unrecognized bytes are stored as `.jpg`.
    pub fn stage_images(&self, images: &[Vec<u8>]) -> SlideResult<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SlideError::io(&self.dir, e))?;
        let mut out = Vec::with_capacity(images.len());
        let mut manifest = ImageManifest::default();
        for (i, bytes) in images.iter().enumerate() {
            let ext = image::guess_format(bytes)
                .ok()
                .and_then(|f| f.extensions_str().first().copied())
                .unwrap_or("jpg");
            let index = i as u32 + 1;
            let name = format!("img{index}.{ext}");
            let path = self.dir.join(&name);
            std::fs::write(&path, bytes).map_err(|e| SlideError::io(&path, e))?;
            manifest.images.push(ManifestImage { index, path: name });
            out.push(path);
        }
        manifest.write(&self.dir.join(MANIFEST_FILE_NAME))?;
        Ok(out)
    }

    /// Remove the working directory. Missing directories are fine.
    pub fn cleanup(&self) -> SlideResult<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                tracing::debug!(job = %self.id, dir = %self.dir.display(), "removed workspace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SlideError::io(&self.dir, e)),
        }
    }
}

/// Remove job directories under `work_root` last modified more than `max_age` ago.
///
/// Returns the removed paths, sorted. A missing `work_root` reaps nothing.
pub fn reap_stale(work_root: &Path, max_age: Duration) -> SlideResult<Vec<PathBuf>> {
    reap_stale_at(work_root, max_age, SystemTime::now())
}

pub(crate) fn reap_stale_at(
    work_root: &Path,
    max_age: Duration,
    now: SystemTime,
) -> SlideResult<Vec<PathBuf>> {
    let rd = match std::fs::read_dir(work_root) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SlideError::io(work_root, e)),
    };

    let mut removed = Vec::new();
    for entry in rd {
        let entry = entry.map_err(|e| SlideError::io(work_root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .with_context(|| format!("stat job dir '{}'", path.display()))?;
        // Clock skew makes `modified` later than `now`; such dirs are fresh.
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }
        std::fs::remove_dir_all(&path).map_err(|e| SlideError::io(&path, e))?;
        tracing::info!(dir = %path.display(), age_secs = age.as_secs(), "reaped stale job dir");
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}

#[cfg(test)]
#[path = "../../tests/unit/job/workspace.rs"]
mod tests;
