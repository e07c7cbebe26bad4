use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slidereel::{
    FfmpegCompositor, Ffprobe, JobId, JobReport, ShortAudioPolicy, SlideshowJob, SlideshowOpts,
    SlideshowPipeline,
};

#[derive(Parser, Debug)]
#[command(name = "slidereel", version)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose crossfaded slideshows (requires `ffmpeg`/`ffprobe` on PATH).
    Slideshow(SlideshowArgs),
    /// Print the timeline, filter graph and ffmpeg arguments without running anything.
    Plan(PlanArgs),
    /// Render a collage as a still image over an audio track.
    Still(StillArgs),
    /// Remove stale job working directories.
    Reap(ReapArgs),
}

/// Options shared by every subcommand; flags override the config file.
#[derive(Args, Debug)]
struct OptsArgs {
    /// JSON options file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of per-job working directories.
    #[arg(long)]
    work_root: Option<PathBuf>,

    /// Directory receiving finished videos.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Nominal seconds each image is shown.
    #[arg(long)]
    image_duration: Option<f64>,

    /// Crossfade seconds between consecutive images.
    #[arg(long)]
    crossfade: Option<f64>,

    /// xfade transition (slideleft, fade, wipeleft, ...).
    #[arg(long)]
    transition: Option<String>,

    /// Shortest segment the planner may produce, in seconds.
    #[arg(long)]
    min_segment: Option<f64>,

    /// Policy when the audio is too short: floor or shrink.
    #[arg(long)]
    short_audio: Option<ShortAudioPolicy>,

    /// ffmpeg binary.
    #[arg(long)]
    ffmpeg: Option<String>,

    /// ffprobe binary.
    #[arg(long)]
    ffprobe: Option<String>,

    /// Compositor timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Base URL of the resize/collage service.
    #[arg(long)]
    resize_url: Option<String>,
}

#[derive(Parser, Debug)]
struct SlideshowArgs {
    #[command(flatten)]
    opts: OptsArgs,

    /// Job ids; each must have a prepared working directory unless uploads are given.
    #[arg(long = "job", required = true)]
    jobs: Vec<String>,

    /// Audio file to place in the working directory (single job only).
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Images to upload or stage, in order (single job only).
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Worker threads for multi-job runs.
    #[arg(long)]
    threads: Option<usize>,

    /// Print job reports as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    opts: OptsArgs,

    /// Job id with a prepared working directory.
    #[arg(long)]
    job: String,

    /// Print the plan as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct StillArgs {
    #[command(flatten)]
    opts: OptsArgs,

    /// Job id.
    #[arg(long)]
    job: String,

    /// Audio track.
    #[arg(long)]
    audio: PathBuf,

    /// Images to send to the collage service. Without any, the collage must already exist.
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Print the job report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ReapArgs {
    #[command(flatten)]
    opts: OptsArgs,

    /// Age in seconds after which a working directory is stale.
    #[arg(long)]
    max_age_secs: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Slideshow(args) => cmd_slideshow(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Still(args) => cmd_still(args),
        Command::Reap(args) => cmd_reap(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl OptsArgs {
    fn resolve(&self) -> anyhow::Result<SlideshowOpts> {
        let mut opts = match &self.config {
            Some(path) => SlideshowOpts::from_path(path)?,
            None => SlideshowOpts::default(),
        };
        if let Some(v) = &self.work_root {
            opts.work_root = v.clone();
        }
        if let Some(v) = &self.output_dir {
            opts.output_dir = v.clone();
        }
        if let Some(v) = self.image_duration {
            opts.image_duration_secs = v;
        }
        if let Some(v) = self.crossfade {
            opts.crossfade_secs = v;
        }
        if let Some(v) = &self.transition {
            opts.transition = v.clone();
        }
        if let Some(v) = self.min_segment {
            opts.min_segment_secs = v;
        }
        if let Some(v) = self.short_audio {
            opts.short_audio = v;
        }
        if let Some(v) = &self.ffmpeg {
            opts.ffmpeg_bin = v.clone();
        }
        if let Some(v) = &self.ffprobe {
            opts.ffprobe_bin = v.clone();
        }
        if let Some(v) = self.timeout_secs {
            opts.compose_timeout_secs = v;
        }
        if let Some(v) = &self.resize_url {
            opts.resize_url = Some(v.clone());
        }
        opts.validate()?;
        Ok(opts)
    }
}

/// Fail early when the compositor binary cannot be run.
fn ensure_ffmpeg(opts: &SlideshowOpts) -> anyhow::Result<()> {
    let compositor = FfmpegCompositor::new(
        opts.ffmpeg_bin.clone(),
        opts.compose_timeout(),
        Arc::new(Ffprobe::new(opts.ffprobe_bin.clone())),
    );
    if !compositor.is_available() {
        anyhow::bail!(
            "'{}' cannot be run; install ffmpeg or pass --ffmpeg",
            opts.ffmpeg_bin
        );
    }
    Ok(())
}

fn read_all(paths: &[PathBuf]) -> anyhow::Result<Vec<Vec<u8>>> {
    paths
        .iter()
        .map(|p| std::fs::read(p).with_context(|| format!("read image '{}'", p.display())))
        .collect()
}

fn read_audio(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read audio '{}'", path.display()))
}

fn print_report(report: &JobReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!(
            "{} {} {} {:.3}s",
            report.id, report.output.display(), report.dimensions, report.target_secs
        );
        for condition in &report.conditions {
            println!("  note: {condition}");
        }
    }
    Ok(())
}

fn cmd_slideshow(args: SlideshowArgs) -> anyhow::Result<()> {
    let opts = args.opts.resolve()?;
    ensure_ffmpeg(&opts)?;
    let pipeline = SlideshowPipeline::with_ffmpeg(opts)?;

    let ids = args
        .jobs
        .iter()
        .map(|raw| JobId::new(raw.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    let has_uploads = args.audio.is_some() || !args.images.is_empty();
    if has_uploads && ids.len() != 1 {
        anyhow::bail!("--audio/--image need exactly one --job");
    }

    let jobs: Vec<SlideshowJob> = if has_uploads {
        let id = ids.into_iter().next().context("missing job id")?;
        vec![SlideshowJob {
            id,
            audio: args.audio.as_deref().map(read_audio).transpose()?,
            images: read_all(&args.images)?,
        }]
    } else {
        ids.into_iter().map(SlideshowJob::prepared).collect()
    };

    if let [job] = jobs.as_slice() {
        let report = pipeline.run(job)?;
        return print_report(&report, args.json);
    }

    let mut failed = 0usize;
    for (job, result) in jobs.iter().zip(pipeline.run_batch(&jobs, args.threads)?) {
        match result {
            Ok(report) => print_report(&report, args.json)?,
            Err(e) => {
                failed += 1;
                tracing::error!(job = %job.id, error = %e, "job failed");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} jobs failed", jobs.len());
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let opts = args.opts.resolve()?;
    let pipeline = SlideshowPipeline::with_ffmpeg(opts)?;
    let id = JobId::new(args.job)?;
    let plan = pipeline.plan(&id)?;
    let argv: Vec<String> = plan
        .args()?
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let graph = plan
        .compiled()
        .map(|c| c.graph.to_filter_complex())
        .unwrap_or_default();

    if args.json {
        let doc = serde_json::json!({
            "job": plan.id,
            "timeline": plan.timeline,
            "filter_complex": graph,
            "args": argv,
            "conditions": plan.conditions,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for seg in &plan.timeline.segments {
        println!(
            "{} {:.3}s {}",
            seg.label(),
            seg.duration_secs,
            seg.entry.path.display()
        );
    }
    println!("target {:.3}s", plan.timeline.target_secs);
    println!("filter_complex {graph}");
    println!("{} {}", pipeline.opts().ffmpeg_bin, argv.join(" "));
    for condition in &plan.conditions {
        println!("note: {condition}");
    }
    Ok(())
}

fn cmd_still(args: StillArgs) -> anyhow::Result<()> {
    let opts = args.opts.resolve()?;
    ensure_ffmpeg(&opts)?;
    let pipeline = SlideshowPipeline::with_ffmpeg(opts)?;
    let id = JobId::new(args.job)?;
    let images = read_all(&args.images)?;
    let report = pipeline.render_still(&id, args.audio, &images)?;
    print_report(&report, args.json)
}

fn cmd_reap(args: ReapArgs) -> anyhow::Result<()> {
    let opts = args.opts.resolve()?;
    let max_age = Duration::from_secs(args.max_age_secs.unwrap_or(opts.stale_after_secs));
    let removed = slidereel::reap_stale(&opts.work_root, max_age)?;
    for path in &removed {
        println!("{}", path.display());
    }
    eprintln!("removed {} stale job dir(s)", removed.len());
    Ok(())
}
