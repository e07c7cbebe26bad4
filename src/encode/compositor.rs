use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::compile::graph::CompiledGraph;
use crate::foundation::core::Dimensions;
use crate::foundation::error::{SlideError, SlideResult};
use crate::foundation::math::fmt_secs;

/// Everything the compositor needs to render a crossfaded slideshow.
#[derive(Clone, Debug)]
pub struct SlideshowPlan {
    /// Compiled graph plus positional image inputs.
    pub compiled: CompiledGraph,
    /// Audio track; looped so it never limits the output.
    pub audio_path: PathBuf,
    /// Hard output duration cap, in seconds.
    pub target_secs: f64,
    /// Encoder passed to `-c:v`.
    pub video_codec: String,
    /// Output video path.
    pub out_path: PathBuf,
}

/// One still image over the audio track, ending with the shorter stream.
#[derive(Clone, Debug)]
pub struct StillPlan {
    /// The still image (typically a collage).
    pub image_path: PathBuf,
    /// Audio track.
    pub audio_path: PathBuf,
    /// Output video path.
    pub out_path: PathBuf,
}

/// A unit of work for a [`Compositor`].
#[derive(Clone, Debug)]
pub enum RenderRequest {
    /// Crossfaded multi-image slideshow.
    Slideshow(SlideshowPlan),
    /// Still image with audio.
    Still(StillPlan),
}

impl RenderRequest {
    /// Path the compositor writes.
    pub fn out_path(&self) -> &Path {
        match self {
            Self::Slideshow(p) => &p.out_path,
            Self::Still(p) => &p.out_path,
        }
    }

    /// Build the compositor argument vector (without the program name).
    pub fn to_args(&self) -> SlideResult<Vec<OsString>> {
        match self {
            Self::Slideshow(p) => slideshow_args(p),
            Self::Still(p) => Ok(still_args(p)),
        }
    }
}

/// Capability: render a request and report the encoded dimensions.
pub trait Compositor: Send + Sync {
    /// Render `request`, returning the output's width and height.
    fn compose(&self, request: &RenderRequest) -> SlideResult<Dimensions>;
}

fn push(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

/// Argument vector for a slideshow render.
pub fn slideshow_args(plan: &SlideshowPlan) -> SlideResult<Vec<OsString>> {
    let inputs = &plan.compiled.inputs;
    let graph = &plan.compiled.graph;
    if inputs.is_empty() {
        return Err(SlideError::graph_underflow("slideshow plan has no inputs"));
    }
    if inputs.len() != graph.nodes.len() {
        return Err(SlideError::validation(format!(
            "plan has {} inputs but {} graph nodes",
            inputs.len(),
            graph.nodes.len()
        )));
    }
    if !plan.target_secs.is_finite() || plan.target_secs <= 0.0 {
        return Err(SlideError::validation(
            "slideshow target duration must be finite and > 0",
        ));
    }

    let mut args = Vec::new();
    push(&mut args, &["-y", "-loglevel", "error"]);
    for input in inputs {
        if input.loop_input {
            push(&mut args, &["-loop", "1"]);
        }
        push(&mut args, &["-t", &fmt_secs(input.duration_secs), "-i"]);
        args.push(input.path.clone().into_os_string());
    }
    push(&mut args, &["-stream_loop", "-1", "-i"]);
    args.push(plan.audio_path.clone().into_os_string());

    let audio_index = inputs.len();
    push(
        &mut args,
        &[
            "-filter_complex",
            &graph.to_filter_complex(),
            "-map",
            &format!("[{}]", graph.terminal),
            "-map",
            &format!("{audio_index}:a"),
            "-c:v",
            &plan.video_codec,
            "-pix_fmt",
            "yuv420p",
            "-t",
            &fmt_secs(plan.target_secs),
        ],
    );
    args.push(plan.out_path.clone().into_os_string());
    Ok(args)
}

/// Argument vector for a still-image video.
pub fn still_args(plan: &StillPlan) -> Vec<OsString> {
    let mut args = Vec::new();
    push(
        &mut args,
        &["-y", "-loglevel", "error", "-loop", "1", "-framerate", "1", "-i"],
    );
    args.push(plan.image_path.clone().into_os_string());
    args.push("-i".into());
    args.push(plan.audio_path.clone().into_os_string());
    push(
        &mut args,
        &[
            "-map",
            "0",
            "-map",
            "1:a",
            "-c:v",
            "libx264",
            "-preset",
            "ultrafast",
            "-tune",
            "stillimage",
            "-vf",
            "fps=1,format=yuv420p",
            "-c:a",
            "copy",
            "-shortest",
        ],
    );
    args.push(plan.out_path.clone().into_os_string());
    args
}

#[cfg(test)]
#[path = "../../tests/unit/encode/compositor.rs"]
mod tests;
