use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::assets::loader::load_image_set;
use crate::assets::media::{AudioProbe, Ffprobe};
use crate::audio::duration::resolve_audio_duration;
use crate::compile::graph::{CompiledGraph, compile_graph};
use crate::config::opts::SlideshowOpts;
use crate::encode::compositor::{Compositor, RenderRequest, SlideshowPlan, StillPlan};
use crate::encode::ffmpeg::FfmpegCompositor;
use crate::foundation::core::{Dimensions, JobId};
use crate::foundation::error::{Condition, SlideError, SlideResult};
use crate::job::workspace::JobWorkspace;
use crate::remote::resize::{HttpResizeClient, ResizeService};
use crate::timeline::planner::{Timeline, order_images, plan_timeline};

/// Input of one slideshow job.
#[derive(Clone, Debug)]
pub struct SlideshowJob {
    /// Job id; namespaces the working directory and outputs.
    pub id: JobId,
    /// Audio bytes to write into the workspace. `None` uses the audio already there.
    pub audio: Option<Vec<u8>>,
    /// Raw uploaded images. With a resize service configured they are resized remotely,
    /// otherwise staged as-is. Empty uses the images already in the workspace.
    pub images: Vec<Vec<u8>>,
}

impl SlideshowJob {
    /// A job over an already prepared working directory.
    pub fn prepared(id: JobId) -> Self {
        Self {
            id,
            audio: None,
            images: Vec::new(),
        }
    }
}

/// Everything decided for a slideshow job before the compositor runs.
#[derive(Clone, Debug)]
pub struct JobPlan {
    /// Job id.
    pub id: JobId,
    /// Planned timeline.
    pub timeline: Timeline,
    /// Compositor request built from the timeline.
    pub request: RenderRequest,
    /// Conditions met while ordering, probing and timing.
    pub conditions: Vec<Condition>,
}

impl JobPlan {
    /// Compiled graph of the slideshow.
    pub fn compiled(&self) -> Option<&CompiledGraph> {
        match &self.request {
            RenderRequest::Slideshow(p) => Some(&p.compiled),
            RenderRequest::Still(_) => None,
        }
    }

    /// Compositor argument vector (without the program name).
    pub fn args(&self) -> SlideResult<Vec<OsString>> {
        self.request.to_args()
    }
}

/// Outcome of a successfully composed job.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct JobReport {
    /// Job id.
    pub id: JobId,
    /// Path of the produced video.
    pub output: PathBuf,
    /// Probed dimensions of the produced video.
    pub dimensions: Dimensions,
    /// Target duration the output was capped at.
    pub target_secs: f64,
    /// Number of timeline segments.
    pub segments: usize,
    /// Non-fatal conditions recorded along the way.
    pub conditions: Vec<Condition>,
}

/// Sequential per-job pipeline: resize, load, resolve audio, plan, compile, compose, clean up.
///
/// Probing, composing and the remote service are injected so everything between them
/// stays pure.
pub struct SlideshowPipeline {
    opts: SlideshowOpts,
    audio_probe: Arc<dyn AudioProbe>,
    compositor: Arc<dyn Compositor>,
    resizer: Option<Arc<dyn ResizeService>>,
}

impl SlideshowPipeline {
    /// Create a pipeline from validated options and injected capabilities.
    pub fn new(
        opts: SlideshowOpts,
        audio_probe: Arc<dyn AudioProbe>,
        compositor: Arc<dyn Compositor>,
    ) -> SlideResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            audio_probe,
            compositor,
            resizer: None,
        })
    }

    /// Pipeline backed by `ffprobe`/`ffmpeg`, plus the HTTP resize service when
    /// `resize_url` is configured.
    pub fn with_ffmpeg(opts: SlideshowOpts) -> SlideResult<Self> {
        let probe = Arc::new(Ffprobe::new(opts.ffprobe_bin.clone()));
        let compositor = Arc::new(FfmpegCompositor::new(
            opts.ffmpeg_bin.clone(),
            opts.compose_timeout(),
            probe.clone(),
        ));
        let resizer = match &opts.resize_url {
            Some(url) => Some(Arc::new(HttpResizeClient::new(
                url.clone(),
                opts.compose_timeout(),
            )?) as Arc<dyn ResizeService>),
            None => None,
        };
        let mut pipeline = Self::new(opts, probe, compositor)?;
        pipeline.resizer = resizer;
        Ok(pipeline)
    }

    /// Attach a remote resize/collage service.
    pub fn with_resize_service(mut self, service: Arc<dyn ResizeService>) -> Self {
        self.resizer = Some(service);
        self
    }

    /// Options the pipeline runs with.
    pub fn opts(&self) -> &SlideshowOpts {
        &self.opts
    }

    /// Workspace of job `id`.
    pub fn workspace(&self, id: &JobId) -> JobWorkspace {
        JobWorkspace::new(id.clone(), &self.opts)
    }

    /// Plan a slideshow over the job's working directory without composing anything.
    #[tracing::instrument(skip(self), fields(job = %id))]
    pub fn plan(&self, id: &JobId) -> SlideResult<JobPlan> {
        let ws = self.workspace(id);
        if !ws.exists() {
            return Err(SlideError::io(
                ws.dir(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "job directory not found"),
            ));
        }
        let set = load_image_set(ws.dir(), &self.opts.audio_file_name)?;
        let (entries, mut conditions) = order_images(set);
        if entries.is_empty() {
            return Err(SlideError::graph_underflow(format!(
                "no usable images in '{}'",
                ws.dir().display()
            )));
        }

        let audio_path = ws.audio_path();
        let audio = resolve_audio_duration(
            self.audio_probe.as_ref(),
            &audio_path,
            entries.len(),
            self.opts.image_duration_secs,
        );
        conditions.extend(audio.condition);

        let planned = plan_timeline(entries, audio.secs, &self.opts)?;
        conditions.extend(planned.conditions);
        let timeline = planned.timeline;

        let compiled = compile_graph(
            &timeline,
            self.opts.transition_kind()?,
            self.opts.crossfade_secs,
        )?;
        let request = RenderRequest::Slideshow(SlideshowPlan {
            compiled,
            audio_path,
            target_secs: timeline.target_secs,
            video_codec: self.opts.video_codec.clone(),
            out_path: ws.slideshow_output(),
        });
        tracing::debug!(
            segments = timeline.len(),
            target_secs = timeline.target_secs,
            conditions = conditions.len(),
            "planned slideshow"
        );
        Ok(JobPlan {
            id: id.clone(),
            timeline,
            request,
            conditions,
        })
    }

    /// Run one slideshow job end to end.
    ///
    /// The working directory is removed on success and kept on failure.
    #[tracing::instrument(skip(self, job), fields(job = %job.id))]
    pub fn run(&self, job: &SlideshowJob) -> SlideResult<JobReport> {
        let ws = self.workspace(&job.id);
        if let Some(audio) = &job.audio {
            ws.prepare(audio)?;
        }
        if !job.images.is_empty() {
            match &self.resizer {
                Some(svc) => {
                    svc.resize(&job.id, &job.images)?;
                }
                None => {
                    ws.stage_images(&job.images)?;
                }
            }
        }

        let plan = self.plan(&job.id)?;
        let dimensions = self.compositor.compose(&plan.request)?;
        let report = JobReport {
            id: plan.id,
            output: plan.request.out_path().to_path_buf(),
            dimensions,
            target_secs: plan.timeline.target_secs,
            segments: plan.timeline.len(),
            conditions: plan.conditions,
        };
        release(&ws);
        tracing::info!(
            output = %report.output.display(),
            %dimensions,
            segments = report.segments,
            conditions = report.conditions.len(),
            "slideshow finished"
        );
        Ok(report)
    }

    /// Render the job's collage as a still image over `audio_path`.
    ///
    /// With `images` given the collage is requested from the resize service first; otherwise
    /// it must already exist.
    #[tracing::instrument(skip(self, images), fields(job = %id))]
    pub fn render_still(
        &self,
        id: &JobId,
        audio_path: PathBuf,
        images: &[Vec<u8>],
    ) -> SlideResult<JobReport> {
        let ws = self.workspace(id);
        if !images.is_empty() {
            let svc = self.resizer.as_ref().ok_or_else(|| {
                SlideError::config("a collage needs a resize service (set resize_url)")
            })?;
            svc.collage(id, images)?;
        }
        let image_path = ws.collage_image();
        if !image_path.is_file() {
            return Err(SlideError::io(
                &image_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "collage image not found"),
            ));
        }

        let audio = resolve_audio_duration(
            self.audio_probe.as_ref(),
            &audio_path,
            1,
            self.opts.image_duration_secs,
        );
        let request = RenderRequest::Still(StillPlan {
            image_path,
            audio_path,
            out_path: ws.still_output(),
        });
        let dimensions = self.compositor.compose(&request)?;
        tracing::info!(output = %request.out_path().display(), %dimensions, "still video finished");
        Ok(JobReport {
            id: id.clone(),
            output: request.out_path().to_path_buf(),
            dimensions,
            target_secs: audio.secs,
            segments: 1,
            conditions: audio.condition.into_iter().collect(),
        })
    }

    /// Run independent jobs concurrently, returning results in input order.
    ///
    /// `threads` overrides the worker count. Job ids must be distinct.
    pub fn run_batch(
        &self,
        jobs: &[SlideshowJob],
        threads: Option<usize>,
    ) -> SlideResult<Vec<SlideResult<JobReport>>> {
        let mut seen = HashSet::new();
        if let Some(dup) = jobs.iter().find(|j| !seen.insert(&j.id)) {
            return Err(SlideError::validation(format!(
                "job id '{}' appears more than once in the batch",
                dup.id
            )));
        }
        let pool = build_thread_pool(threads)?;
        tracing::info!(jobs = jobs.len(), threads = pool.current_num_threads(), "running batch");
        Ok(pool.install(|| jobs.par_iter().map(|job| self.run(job)).collect()))
    }
}

fn release(ws: &JobWorkspace) {
    if let Err(e) = ws.cleanup() {
        tracing::warn!(job = %ws.id(), error = %e, "failed to remove workspace");
    }
}

fn build_thread_pool(threads: Option<usize>) -> SlideResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(SlideError::validation("batch 'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

#[cfg(test)]
#[path = "../../tests/unit/job/pipeline.rs"]
mod tests;
