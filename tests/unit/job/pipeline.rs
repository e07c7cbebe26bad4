use super::*;
use std::path::Path;
use std::sync::Mutex;

struct FixedAudio(Option<f64>);

impl AudioProbe for FixedAudio {
    fn probe_duration(&self, _path: &Path) -> SlideResult<f64> {
        self.0.ok_or_else(|| SlideError::probe("no duration"))
    }
}

#[derive(Default)]
struct RecordingCompositor {
    fail: bool,
    requests: Mutex<Vec<RenderRequest>>,
}

impl Compositor for RecordingCompositor {
    fn compose(&self, request: &RenderRequest) -> SlideResult<Dimensions> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(SlideError::composition("exited with status 1", "boom"));
        }
        Ok(Dimensions {
            width: 1080,
            height: 1920,
        })
    }
}

/// Writes uploads into the job directory the way the resize server does.
struct FakeResizer {
    work_root: PathBuf,
    output_dir: PathBuf,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ResizeService for FakeResizer {
    fn resize(&self, job: &JobId, images: &[Vec<u8>]) -> SlideResult<String> {
        let dir = self.work_root.join(job.as_str());
        std::fs::create_dir_all(&dir).unwrap();
        for (i, bytes) in images.iter().enumerate() {
            std::fs::write(dir.join(format!("img{}.png", i + 1)), bytes).unwrap();
        }
        self.calls
            .lock()
            .unwrap()
            .push(("resize".to_string(), images.len()));
        Ok("ok".to_string())
    }

    fn collage(&self, job: &JobId, images: &[Vec<u8>]) -> SlideResult<String> {
        std::fs::create_dir_all(&self.output_dir).unwrap();
        std::fs::write(self.output_dir.join(format!("collage-{job}.png")), b"png").unwrap();
        self.calls
            .lock()
            .unwrap()
            .push(("collage".to_string(), images.len()));
        Ok("ok".to_string())
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_pipeline").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn opts_in(root: &Path) -> SlideshowOpts {
    SlideshowOpts {
        work_root: root.join("work"),
        output_dir: root.join("out"),
        ..SlideshowOpts::default()
    }
}

fn seed_job(opts: &SlideshowOpts, id: &str, names: &[&str]) -> JobId {
    let dir = opts.work_root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("audio.mp3"), b"audio").unwrap();
    for name in names {
        std::fs::write(dir.join(name), b"img").unwrap();
    }
    JobId::new(id).unwrap()
}

fn pipeline(
    opts: SlideshowOpts,
    audio: Option<f64>,
    compositor: Arc<RecordingCompositor>,
) -> SlideshowPipeline {
    SlideshowPipeline::new(opts, Arc::new(FixedAudio(audio)), compositor).unwrap()
}

#[test]
fn plan_collects_conditions_in_pipeline_order() {
    let root = scratch("plan_conditions");
    let opts = opts_in(&root);
    let id = seed_job(&opts, "v1", &["img2.png", "weird.png", "img1.png"]);
    let p = pipeline(opts, None, Arc::new(RecordingCompositor::default()));

    let plan = p.plan(&id).unwrap();
    assert_eq!(plan.timeline.len(), 2);
    assert!(matches!(plan.conditions[0], Condition::MalformedName { .. }));
    assert_eq!(
        plan.conditions[1],
        Condition::ProbeFailed {
            reason: "probe error: no duration".to_string(),
            fallback_secs: 7.0,
        }
    );
    assert_eq!(plan.timeline.target_secs, 7.0);
    assert!(plan.compiled().unwrap().graph.edges.len() == 1);
}

#[test]
fn run_composes_and_removes_the_workspace() {
    let root = scratch("run_ok");
    let opts = opts_in(&root);
    let id = seed_job(&opts, "v2", &["img1.png", "img2.png", "img3.png"]);
    let comp = Arc::new(RecordingCompositor::default());
    let p = pipeline(opts.clone(), Some(9.0), comp.clone());

    let report = p.run(&SlideshowJob::prepared(id.clone())).unwrap();
    assert_eq!(report.output, opts.output_dir.join("slide-v2.mp4"));
    assert_eq!(report.segments, 3);
    assert_eq!(report.target_secs, 9.0);
    assert!(report.conditions.is_empty());
    assert!(!opts.work_root.join("v2").exists());

    let requests = comp.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(matches!(requests[0], RenderRequest::Slideshow(_)));
}

#[test]
fn failed_composition_keeps_the_workspace() {
    let root = scratch("run_fail");
    let opts = opts_in(&root);
    let id = seed_job(&opts, "v3", &["img1.png", "img2.png"]);
    let comp = Arc::new(RecordingCompositor {
        fail: true,
        ..RecordingCompositor::default()
    });
    let p = pipeline(opts.clone(), Some(6.0), comp);

    let err = p.run(&SlideshowJob::prepared(id)).unwrap_err();
    assert_eq!(err.process_output(), Some("boom"));
    assert!(opts.work_root.join("v3").is_dir());
}

#[test]
fn missing_job_directory_is_an_io_error() {
    let root = scratch("missing_dir");
    let p = pipeline(
        opts_in(&root),
        Some(5.0),
        Arc::new(RecordingCompositor::default()),
    );
    let err = p.plan(&JobId::new("absent").unwrap()).unwrap_err();
    assert!(matches!(
        err,
        SlideError::Io { ref source, .. } if source.kind() == std::io::ErrorKind::NotFound
    ));
}

#[test]
fn empty_job_directory_is_a_graph_underflow() {
    let root = scratch("underflow");
    let opts = opts_in(&root);
    let id = seed_job(&opts, "v4", &["notes.txt"]);
    let comp = Arc::new(RecordingCompositor::default());
    let p = pipeline(opts, Some(5.0), comp.clone());

    let err = p.run(&SlideshowJob::prepared(id)).unwrap_err();
    assert!(matches!(err, SlideError::GraphUnderflow(_)));
    assert!(comp.requests.lock().unwrap().is_empty());
}

#[test]
fn uploads_are_staged_locally_without_a_resize_service() {
    let root = scratch("staged");
    let opts = opts_in(&root);
    let p = pipeline(
        opts.clone(),
        Some(4.0),
        Arc::new(RecordingCompositor::default()),
    );
    let job = SlideshowJob {
        id: JobId::new("v5").unwrap(),
        audio: Some(b"audio".to_vec()),
        images: vec![b"a".to_vec(), b"b".to_vec()],
    };
    let report = p.run(&job).unwrap();
    assert_eq!(report.segments, 2);
}

#[test]
fn uploads_go_through_the_resize_service_when_present() {
    let root = scratch("resized");
    let opts = opts_in(&root);
    let resizer = Arc::new(FakeResizer {
        work_root: opts.work_root.clone(),
        output_dir: opts.output_dir.clone(),
        calls: Mutex::new(Vec::new()),
    });
    let p = pipeline(
        opts.clone(),
        Some(10.0),
        Arc::new(RecordingCompositor::default()),
    )
    .with_resize_service(resizer.clone());

    let job = SlideshowJob {
        id: JobId::new("v6").unwrap(),
        audio: Some(b"audio".to_vec()),
        images: vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
    };
    let report = p.run(&job).unwrap();
    assert_eq!(report.segments, 3);
    assert_eq!(
        *resizer.calls.lock().unwrap(),
        vec![("resize".to_string(), 3)]
    );
}

#[test]
fn still_video_uses_the_remote_collage() {
    let root = scratch("still");
    let opts = opts_in(&root);
    let resizer = Arc::new(FakeResizer {
        work_root: opts.work_root.clone(),
        output_dir: opts.output_dir.clone(),
        calls: Mutex::new(Vec::new()),
    });
    let comp = Arc::new(RecordingCompositor::default());
    let p = pipeline(opts.clone(), Some(30.0), comp.clone()).with_resize_service(resizer);

    let id = JobId::new("v7").unwrap();
    let report = p
        .render_still(&id, root.join("track.mp3"), &[b"a".to_vec()])
        .unwrap();
    assert_eq!(report.output, opts.output_dir.join("video-v7.mp4"));
    assert_eq!(report.target_secs, 30.0);

    let requests = comp.requests.lock().unwrap();
    let RenderRequest::Still(still) = &requests[0] else {
        panic!("expected a still request");
    };
    assert_eq!(still.image_path, opts.output_dir.join("collage-v7.png"));
}

#[test]
fn collage_without_a_service_is_a_config_error() {
    let root = scratch("still_no_service");
    let p = pipeline(
        opts_in(&root),
        Some(3.0),
        Arc::new(RecordingCompositor::default()),
    );
    let err = p
        .render_still(&JobId::new("v8").unwrap(), root.join("a.mp3"), &[b"a".to_vec()])
        .unwrap_err();
    assert!(matches!(err, SlideError::Config(_)));
}

#[test]
fn batch_results_keep_input_order() {
    let root = scratch("batch");
    let opts = opts_in(&root);
    let ok_a = seed_job(&opts, "b1", &["img1.png", "img2.png"]);
    let empty = seed_job(&opts, "b2", &[]);
    let ok_b = seed_job(&opts, "b3", &["img1.png"]);
    let p = pipeline(opts, Some(8.0), Arc::new(RecordingCompositor::default()));

    let jobs = [ok_a, empty, ok_b].map(SlideshowJob::prepared);
    let results = p.run_batch(&jobs, Some(3)).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().id.as_str(), "b1");
    assert!(matches!(results[1], Err(SlideError::GraphUnderflow(_))));
    assert_eq!(results[2].as_ref().unwrap().segments, 1);
}

#[test]
fn batch_rejects_duplicate_ids_and_zero_threads() {
    let root = scratch("batch_invalid");
    let p = pipeline(
        opts_in(&root),
        Some(8.0),
        Arc::new(RecordingCompositor::default()),
    );
    let id = JobId::new("same").unwrap();
    let jobs = vec![
        SlideshowJob::prepared(id.clone()),
        SlideshowJob::prepared(id),
    ];
    assert!(matches!(
        p.run_batch(&jobs, None).unwrap_err(),
        SlideError::Validation(_)
    ));
    assert!(p.run_batch(&[], Some(0)).is_err());
}
