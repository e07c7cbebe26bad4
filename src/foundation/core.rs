use crate::foundation::error::{SlideError, SlideResult};

/// Identifier of one composition job (the upstream video id).
///
/// Used to namespace working directories and output files, so it is restricted to
/// ASCII alphanumerics, `-` and `_`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct JobId(String);

impl JobId {
    /// Create a validated job id.
    pub fn new(raw: impl Into<String>) -> SlideResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(SlideError::validation("job id must be non-empty"));
        }
        if raw.len() > 128 {
            return Err(SlideError::validation("job id must be at most 128 bytes"));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(SlideError::validation(format!(
                "job id '{raw}' contains invalid character '{bad}'"
            )));
        }
        Ok(Self(raw))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = SlideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Pixel dimensions of an encoded video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
