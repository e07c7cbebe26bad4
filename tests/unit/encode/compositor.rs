use super::*;
use crate::compile::graph::compile_graph;
use crate::effects::transitions::TransitionKind;
use crate::timeline::planner::{ImageEntry, Segment, Timeline};

fn plan(durations: &[f64], target_secs: f64) -> SlideshowPlan {
    let timeline = Timeline {
        segments: durations
            .iter()
            .enumerate()
            .map(|(i, d)| Segment {
                entry: ImageEntry {
                    sequence: i as u32 + 1,
                    path: PathBuf::from(format!("/tmp/collages/v1/img{}.png", i + 1)),
                },
                duration_secs: *d,
                ordinal: i + 1,
            })
            .collect(),
        target_secs,
    };
    SlideshowPlan {
        compiled: compile_graph(&timeline, TransitionKind::SlideLeft, 0.25).unwrap(),
        audio_path: PathBuf::from("/tmp/collages/v1/audio.mp3"),
        target_secs,
        video_codec: "libx264".to_string(),
        out_path: PathBuf::from("collages/slide-v1.mp4"),
    }
}

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

fn value_after(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].clone())
        .collect()
}

#[test]
fn slideshow_args_follow_the_invocation_contract() {
    let args = strings(&slideshow_args(&plan(&[3.5, 3.5, 3.5, 1.5], 12.0)).unwrap());

    assert_eq!(&args[..3], &["-y", "-loglevel", "error"]);
    assert_eq!(&args[3..8], &["-loop", "1", "-t", "3.500", "-i"]);
    assert_eq!(args[8], "/tmp/collages/v1/img1.png");

    assert_eq!(
        value_after(&args, "-i"),
        vec![
            "/tmp/collages/v1/img1.png",
            "/tmp/collages/v1/img2.png",
            "/tmp/collages/v1/img3.png",
            "/tmp/collages/v1/img4.png",
            "/tmp/collages/v1/audio.mp3",
        ]
    );
    assert_eq!(
        value_after(&args, "-t"),
        vec!["3.500", "3.500", "3.500", "1.500", "12.000"]
    );
    assert_eq!(value_after(&args, "-stream_loop"), vec!["-1"]);
    assert_eq!(value_after(&args, "-map"), vec!["[filter3]", "4:a"]);
    assert_eq!(value_after(&args, "-c:v"), vec!["libx264"]);
    assert_eq!(args.last().unwrap(), "collages/slide-v1.mp4");

    let graph = &value_after(&args, "-filter_complex")[0];
    assert_eq!(graph.matches("xfade=").count(), 3);
    assert!(graph.contains("offset=9.750[filter3]"));
}

#[test]
fn looped_audio_follows_the_images() {
    let args = strings(&slideshow_args(&plan(&[3.5, 2.0], 5.5)).unwrap());
    let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
    assert_eq!(
        &args[loop_pos..loop_pos + 4],
        &["-stream_loop", "-1", "-i", "/tmp/collages/v1/audio.mp3"]
    );
    let last_image = args.iter().rposition(|a| a.ends_with("img2.png")).unwrap();
    assert!(loop_pos > last_image);
}

#[test]
fn single_image_emits_no_crossfade() {
    let args = strings(&slideshow_args(&plan(&[2.0], 2.0)).unwrap());
    assert!(args.iter().all(|a| !a.contains("xfade")));
    assert_eq!(
        value_after(&args, "-filter_complex"),
        vec!["[0]settb=AVTB[img1]"]
    );
    assert_eq!(value_after(&args, "-map"), vec!["[img1]", "1:a"]);
}

#[test]
fn inconsistent_plans_are_rejected() {
    let mut p = plan(&[3.5, 2.0], 5.5);
    p.compiled.inputs.pop();
    assert!(matches!(
        slideshow_args(&p).unwrap_err(),
        SlideError::Validation(_)
    ));

    let mut p = plan(&[3.5, 2.0], 5.5);
    p.compiled.inputs.clear();
    assert!(matches!(
        slideshow_args(&p).unwrap_err(),
        SlideError::GraphUnderflow(_)
    ));

    let mut p = plan(&[3.5, 2.0], 5.5);
    p.target_secs = 0.0;
    assert!(slideshow_args(&p).is_err());
}

#[test]
fn still_args_end_with_the_shortest_stream() {
    let req = RenderRequest::Still(StillPlan {
        image_path: PathBuf::from("collages/collage-v1.png"),
        audio_path: PathBuf::from("audio-v1.mp3"),
        out_path: PathBuf::from("collages/video-v1.mp4"),
    });
    let args = strings(&req.to_args().unwrap());
    assert_eq!(
        value_after(&args, "-i"),
        vec!["collages/collage-v1.png", "audio-v1.mp3"]
    );
    assert_eq!(value_after(&args, "-map"), vec!["0", "1:a"]);
    assert_eq!(value_after(&args, "-tune"), vec!["stillimage"]);
    assert!(args.contains(&"-shortest".to_string()));
    assert_eq!(req.out_path(), Path::new("collages/video-v1.mp4"));
}
