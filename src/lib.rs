//! slidereel turns a directory of ordered images plus an audio track into a crossfaded
//! slideshow video.
//!
//! A job flows through:
//!
//! - [`load_image_set`] and [`order_images`]: list and order the job's images
//! - [`resolve_audio_duration`]: probe the audio length, estimating it on failure
//! - [`plan_timeline`]: assign per-image durations that sum to the audio length
//! - [`compile_graph`]: build the `settb` + `xfade` filter graph
//! - [`Compositor`]: hand the plan to `ffmpeg` ([`FfmpegCompositor`])
//!
//! [`SlideshowPipeline`] wires these together per job, and runs batches of jobs on a
//! `rayon` pool.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod audio;
mod compile;
mod config;
mod effects;
mod encode;
mod foundation;
mod job;
mod remote;
mod timeline;

pub use crate::foundation::core::{Dimensions, JobId};
pub use crate::foundation::error::{Condition, SlideError, SlideResult};
pub use crate::foundation::math::{SECS_EPSILON, fmt_secs};

pub use crate::assets::loader::{ImageSet, is_image_path, load_image_set};
pub use crate::assets::manifest::{ImageManifest, MANIFEST_FILE_NAME, ManifestImage};
pub use crate::assets::media::{
    AudioProbe, DimensionProbe, Ffprobe, parse_dimensions_output, parse_duration_output,
};
pub use crate::audio::duration::{ResolvedDuration, fallback_duration, resolve_audio_duration};
pub use crate::compile::graph::{
    CompiledGraph, FilterGraph, InputClause, TimebaseNode, TransitionEdge, compile_graph,
};
pub use crate::config::opts::{ShortAudioPolicy, SlideshowOpts};
pub use crate::effects::transitions::{TransitionKind, parse_transition};
pub use crate::encode::compositor::{
    Compositor, RenderRequest, SlideshowPlan, StillPlan, slideshow_args, still_args,
};
pub use crate::encode::ffmpeg::{FfmpegCompositor, ensure_parent_dir};
pub use crate::job::pipeline::{JobPlan, JobReport, SlideshowJob, SlideshowPipeline};
pub use crate::job::workspace::{
    COLLAGE_KIND, JobWorkspace, SLIDESHOW_KIND, STILL_KIND, reap_stale,
};
pub use crate::remote::resize::{HttpResizeClient, ResizeService};
pub use crate::timeline::planner::{
    ImageEntry, Segment, Timeline, TimelinePlan, order_images, parse_sequence_number,
    plan_timeline,
};
