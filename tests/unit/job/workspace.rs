use super::*;

fn opts_in(root: &Path) -> SlideshowOpts {
    SlideshowOpts {
        work_root: root.join("work"),
        output_dir: root.join("out"),
        ..SlideshowOpts::default()
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_workspace").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn layout_is_namespaced_by_job_id() {
    let ws = JobWorkspace::new(JobId::new("v42").unwrap(), &SlideshowOpts::default());
    assert_eq!(ws.dir(), Path::new("/tmp/collages/v42"));
    assert_eq!(ws.audio_path(), Path::new("/tmp/collages/v42/audio.mp3"));
    assert_eq!(ws.slideshow_output(), Path::new("collages/slide-v42.mp4"));
    assert_eq!(ws.still_output(), Path::new("collages/video-v42.mp4"));
    assert_eq!(ws.collage_image(), Path::new("collages/collage-v42.png"));
}

#[test]
fn prepare_stage_and_cleanup() {
    let root = scratch("lifecycle");
    let ws = JobWorkspace::new(JobId::new("job_1").unwrap(), &opts_in(&root));
    assert!(!ws.exists());

    ws.prepare(b"ID3 fake audio").unwrap();
    assert_eq!(std::fs::read(ws.audio_path()).unwrap(), b"ID3 fake audio");

    let png_magic = b"\x89PNG\r\n\x1a\n rest".to_vec();
    let staged = ws
        .stage_images(&[png_magic, b"not an image".to_vec()])
        .unwrap();
    assert_eq!(staged[0].file_name().unwrap(), "img1.png");
    assert_eq!(staged[1].file_name().unwrap(), "img2.jpg");

    let manifest = ImageManifest::from_path(&ws.dir().join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(
        manifest.resolve(ws.dir()).unwrap(),
        vec![(1, staged[0].clone()), (2, staged[1].clone())]
    );

    ws.cleanup().unwrap();
    assert!(!ws.exists());
    // Second cleanup is a no-op.
    ws.cleanup().unwrap();
}

#[test]
fn reaping_removes_only_old_job_dirs() {
    let root = scratch("reap");
    std::fs::create_dir_all(root.join("a")).unwrap();
    std::fs::create_dir_all(root.join("b")).unwrap();
    std::fs::write(root.join("stray.txt"), b"x").unwrap();

    let now = SystemTime::now();
    assert!(
        reap_stale_at(&root, Duration::from_secs(3600), now)
            .unwrap()
            .is_empty()
    );

    let later = now + Duration::from_secs(7200);
    let removed = reap_stale_at(&root, Duration::from_secs(3600), later).unwrap();
    assert_eq!(removed, vec![root.join("a"), root.join("b")]);
    assert!(root.join("stray.txt").is_file());
}

#[test]
fn reaping_a_missing_root_is_empty() {
    let root = PathBuf::from("target").join("unit_workspace").join("never_created");
    let _ = std::fs::remove_dir_all(&root);
    assert!(reap_stale(&root, Duration::ZERO).unwrap().is_empty());
}
