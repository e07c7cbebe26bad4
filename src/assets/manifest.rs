use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{SlideError, SlideResult};

/// File name of the ordered manifest inside a job directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Explicit `index -> path` listing of a job's images.
///
/// When present it replaces the `img<N>.<ext>` naming convention as the source of order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageManifest {
    /// Images in any order; `index` decides the slideshow order.
    pub images: Vec<ManifestImage>,
}

/// One manifest row.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ManifestImage {
    /// Position of the image in the slideshow.
    pub index: u32,
    /// Path relative to the job directory.
    pub path: String,
}

impl ImageManifest {
    /// Read and parse a manifest file.
    pub fn from_path(path: &Path) -> SlideResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest '{}'", path.display()))?;
        serde_json::from_str(&text).map_err(|e| {
            SlideError::validation(format!("invalid manifest '{}': {e}", path.display()))
        })
    }

    /// Write the manifest as pretty JSON.
    pub fn write(&self, path: &Path) -> SlideResult<()> {
        let text = serde_json::to_string_pretty(self)
            .with_context(|| "serialize image manifest")?;
        std::fs::write(path, text).map_err(|e| SlideError::io(path, e))
    }

    /// Resolve every row against `job_dir`, checking that the files exist.
    pub fn resolve(&self, job_dir: &Path) -> SlideResult<Vec<(u32, PathBuf)>> {
        let mut out = Vec::with_capacity(self.images.len());
        for row in &self.images {
            validate_rel_path(&row.path)?;
            let abs = job_dir.join(&row.path);
            if !abs.is_file() {
                return Err(SlideError::io(
                    abs,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "manifest entry does not exist",
                    ),
                ));
            }
            out.push((row.index, abs));
        }
        Ok(out)
    }
}

fn validate_rel_path(source: &str) -> SlideResult<()> {
    if source.trim().is_empty() {
        return Err(SlideError::validation("manifest path must be non-empty"));
    }
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(SlideError::validation(format!(
            "manifest path '{source}' must be relative"
        )));
    }
    if s.split('/').any(|part| part == "..") {
        return Err(SlideError::validation(format!(
            "manifest path '{source}' must not contain '..'"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/manifest.rs"]
mod tests;
