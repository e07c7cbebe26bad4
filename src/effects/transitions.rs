use crate::foundation::error::{SlideError, SlideResult};

/// Blend applied between consecutive slides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransitionKind {
    /// Incoming slide pushes in from the right.
    #[default]
    SlideLeft,
    /// Incoming slide pushes in from the left.
    SlideRight,
    /// Incoming slide pushes in from the bottom.
    SlideUp,
    /// Incoming slide pushes in from the top.
    SlideDown,
    /// Opacity crossfade.
    Fade,
    /// Hard edge sweeping leftwards.
    WipeLeft,
    /// Hard edge sweeping rightwards.
    WipeRight,
    /// Per-pixel random dissolve.
    Dissolve,
}

impl TransitionKind {
    /// Name understood by the `xfade` filter's `transition` option.
    pub fn xfade_name(self) -> &'static str {
        match self {
            Self::SlideLeft => "slideleft",
            Self::SlideRight => "slideright",
            Self::SlideUp => "slideup",
            Self::SlideDown => "slidedown",
            Self::Fade => "fade",
            Self::WipeLeft => "wipeleft",
            Self::WipeRight => "wiperight",
            Self::Dissolve => "dissolve",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.xfade_name())
    }
}

/// Parse a transition name (case-insensitive, a few aliases accepted).
pub fn parse_transition(name: &str) -> SlideResult<TransitionKind> {
    let kind = name.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(SlideError::validation("transition kind must be non-empty"));
    }

    match kind.as_str() {
        "slide" | "slideleft" | "slide_left" => Ok(TransitionKind::SlideLeft),
        "slideright" | "slide_right" => Ok(TransitionKind::SlideRight),
        "slideup" | "slide_up" => Ok(TransitionKind::SlideUp),
        "slidedown" | "slide_down" => Ok(TransitionKind::SlideDown),
        "fade" | "crossfade" => Ok(TransitionKind::Fade),
        "wipeleft" | "wipe_left" | "wipe" => Ok(TransitionKind::WipeLeft),
        "wiperight" | "wipe_right" => Ok(TransitionKind::WipeRight),
        "dissolve" => Ok(TransitionKind::Dissolve),
        _ => Err(SlideError::validation(format!(
            "unknown transition kind '{kind}'"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
