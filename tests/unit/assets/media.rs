use super::*;

#[test]
fn duration_output_is_trimmed_and_parsed() {
    assert_eq!(parse_duration_output("12.000000\n").unwrap(), 12.0);
    assert_eq!(parse_duration_output("  7.5 ").unwrap(), 7.5);
}

#[test]
fn bad_duration_output_is_a_probe_error() {
    for bad in ["", "\n", "N/A", "0", "-3.0", "inf", "NaN"] {
        assert!(
            matches!(parse_duration_output(bad), Err(SlideError::Probe(_))),
            "{bad:?}"
        );
    }
}

#[test]
fn dimensions_come_from_the_first_stream() {
    let json = br#"{ "programs": [], "streams": [ { "width": 720, "height": 1280 } ] }"#;
    assert_eq!(
        parse_dimensions_output(json).unwrap(),
        Dimensions {
            width: 720,
            height: 1280
        }
    );
}

#[test]
fn missing_dimensions_fail_the_composition() {
    for json in [
        &br#"{ "streams": [] }"#[..],
        &br#"{ }"#[..],
        &br#"{ "streams": [ { "width": 720 } ] }"#[..],
        &br#"not json"#[..],
    ] {
        assert!(matches!(
            parse_dimensions_output(json),
            Err(SlideError::CompositionFailed { .. })
        ));
    }
}

#[test]
fn missing_probe_binary_is_reported() {
    let probe = Ffprobe::new("slidereel-no-such-ffprobe");
    let err = probe
        .probe_duration(Path::new("target/nothing.mp3"))
        .unwrap_err();
    assert!(matches!(err, SlideError::Probe(_)));

    let err = probe
        .probe_dimensions(Path::new("target/nothing.mp4"))
        .unwrap_err();
    assert!(matches!(err, SlideError::CompositionFailed { .. }));
}
