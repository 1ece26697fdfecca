use super::*;
use crate::checkpoint::store::{SCRATCH_FILE, load_params};
use crate::model::translate::NoopTranslator;
use crate::model::variant::ModelVariant;
use crate::params::tensor::ImageParams;
use crate::synth::config::CarryMode;
use crate::synth::support::{FakeBackend, test_dir};
use std::cell::RefCell;

#[derive(Default)]
struct RecordingMuxer {
    jobs: RefCell<Vec<MuxJob>>,
}

impl VideoMuxer for RecordingMuxer {
    fn mux(&self, job: &MuxJob) {
        self.jobs.borrow_mut().push(job.clone());
    }
}

fn config(dir: &Path, phrases: &str, keep: CarryMode) -> RunConfig {
    let in_txt = dir.join("poem.txt");
    std::fs::write(&in_txt, phrases).unwrap();
    RunConfig {
        in_txt,
        out_dir: dir.join("out"),
        size: Resolution::new(4, 2).unwrap(),
        length: 10,
        fps: 25,
        steps: 3,
        samples: 2,
        keep,
        seed: Some(7),
        ..RunConfig::default()
    }
}

fn assert_close(a: &ImageParams, b: &ImageParams) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.to_vec().unwrap().iter().zip(b.to_vec().unwrap()) {
        assert!((x - y).abs() < 1e-6, "{a:?} vs {b:?}");
    }
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    assert_eq!(parse_phrases("# note\n\n  a cat  \n"), vec!["a cat".to_string()]);
    assert_eq!(
        parse_phrases("sea\r\n#comment\n\t\nsky"),
        vec!["sea".to_string(), "sky".to_string()]
    );
    assert!(parse_phrases("").is_empty());
}

#[test]
fn only_a_hash_in_column_zero_starts_a_comment() {
    assert_eq!(
        parse_phrases("  #hashtag sunset\nsea\n"),
        vec!["#hashtag sunset".to_string(), "sea".to_string()]
    );
    assert_eq!(
        parse_phrases("\t# still a phrase \n# gone"),
        vec!["# still a phrase".to_string()]
    );
}

#[test]
fn missing_phrase_file_is_a_config_error() {
    let err = read_phrases(Path::new("target/definitely/not/here.txt")).unwrap_err();
    assert!(matches!(err, TextmorphError::Validation(_)));
}

#[test]
fn single_phrase_run_writes_every_artifact() {
    let dir = test_dir("unit_sequence", "single");
    let cfg = config(&dir, "# note\n\n  a cat  \n", CarryMode::Reset);
    let mut backend = FakeBackend::new();
    let muxer = RecordingMuxer::default();
    let summary = Pipeline::new(&cfg, &mut backend, &NoopTranslator, &muxer)
        .run()
        .unwrap();

    assert_eq!(backend.encoded, vec!["a cat".to_string()]);
    assert_eq!(summary.phrases.len(), 1);
    let phrase = &summary.phrases[0];
    assert_eq!(phrase.name, "00-a_cat");
    assert!(summary.work_dir.join("00-a_cat").join("0000.jpg").is_file());
    assert!(phrase.snapshot.is_file());
    assert_eq!(
        phrase.poster.as_deref(),
        Some(summary.work_dir.join("00-a_cat-3.jpg").as_path())
    );
    assert!(summary.work_dir.join("00-a_cat-3.jpg").is_file());
    assert!(summary.work_dir.join(RUN_CONFIG_FILE).is_file());
    assert!(summary.work_dir.join(MANIFEST_FILE).is_file());
    assert!(!summary.work_dir.join(SCRATCH_FILE).exists());

    // One transition from the phrase back to itself.
    assert_eq!(summary.final_frames, 250);
    let jobs = muxer.jobs.borrow();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].out_path, summary.work_dir.join("00-a_cat.mp4"));
    assert_eq!(jobs[1].digits, 5);
    assert_eq!(jobs[1].out_path, dir.join("out").join("poem.mp4"));
}

#[test]
fn two_phrases_make_two_transitions_of_125_frames() {
    let dir = test_dir("unit_sequence", "two");
    let cfg = config(&dir, "sea\nsky\n", CarryMode::Reset);
    let mut backend = FakeBackend::new();
    let muxer = RecordingMuxer::default();
    let summary = Pipeline::new(&cfg, &mut backend, &NoopTranslator, &muxer)
        .run()
        .unwrap();

    assert_eq!(summary.final_frames, 250);
    let final_dir = summary.work_dir.join(FINAL_DIR);
    assert!(final_dir.join("00124.jpg").is_file());
    assert!(final_dir.join("00125.jpg").is_file());
    assert!(!final_dir.join("00250.jpg").exists());

    let manifest = Manifest::load(&summary.work_dir.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.transition_frames(), 125);
    assert_eq!(manifest.phrases, summary.phrases);
}

#[test]
fn reset_mode_restarts_every_phrase_from_the_same_init() {
    let dir = test_dir("unit_sequence", "reset");
    let cfg = config(&dir, "one\ntwo\nthree\n", CarryMode::Reset);
    let mut backend = FakeBackend::new();
    Pipeline::new(&cfg, &mut backend, &NoopTranslator, &RecordingMuxer::default())
        .run()
        .unwrap();

    assert_eq!(backend.starts.len(), 3);
    assert_eq!(backend.starts[1], backend.starts[0]);
    assert_eq!(backend.starts[2], backend.starts[0]);
}

#[test]
fn last_mode_blends_baseline_with_previous_result() {
    let dir = test_dir("unit_sequence", "last");
    let cfg = config(&dir, "one\ntwo\nthree\n", CarryMode::Last);
    let mut backend = FakeBackend::new();
    let summary = Pipeline::new(&cfg, &mut backend, &NoopTranslator, &RecordingMuxer::default())
        .run()
        .unwrap();

    let base = &backend.starts[0];
    for k in 1..3 {
        let prev = load_params(&summary.phrases[k - 1].snapshot).unwrap();
        let expected = base.blend(0.5, &prev, 0.5).unwrap();
        assert_close(&backend.starts[k], &expected);
    }
}

#[test]
fn all_mode_keeps_a_running_average_of_results() {
    let dir = test_dir("unit_sequence", "all");
    let cfg = config(&dir, "one\ntwo\nthree\n", CarryMode::All);
    let mut backend = FakeBackend::new();
    let summary = Pipeline::new(&cfg, &mut backend, &NoopTranslator, &RecordingMuxer::default())
        .run()
        .unwrap();

    let r0 = load_params(&summary.phrases[0].snapshot).unwrap();
    let r1 = load_params(&summary.phrases[1].snapshot).unwrap();
    assert_close(&backend.starts[1], &r0);
    assert_close(&backend.starts[2], &r0.blend(0.5, &r1, 0.5).unwrap());
}

#[test]
fn save_checkpoints_keeps_the_scratch_slot() {
    let dir = test_dir("unit_sequence", "keep_scratch");
    let cfg = RunConfig {
        save_checkpoints: true,
        ..config(&dir, "one\n", CarryMode::Reset)
    };
    let summary = Pipeline::new(
        &cfg,
        &mut FakeBackend::new(),
        &NoopTranslator,
        &RecordingMuxer::default(),
    )
    .run()
    .unwrap();
    assert!(summary.work_dir.join(SCRATCH_FILE).is_file());
}

#[test]
fn resnet_variants_tag_names_and_work_dir() {
    let dir = test_dir("unit_sequence", "variant");
    let cfg = RunConfig {
        model: ModelVariant::Rn50,
        ..config(&dir, "sea\n", CarryMode::Reset)
    };
    let summary = Pipeline::new(
        &cfg,
        &mut FakeBackend::new(),
        &NoopTranslator,
        &RecordingMuxer::default(),
    )
    .run()
    .unwrap();
    assert!(summary.work_dir.ends_with("poem-RN50"));
    assert_eq!(summary.phrases[0].name, "00-sea-RN50");
}

#[test]
fn empty_phrase_file_is_rejected() {
    let dir = test_dir("unit_sequence", "empty");
    let cfg = config(&dir, "# only a comment\n\n", CarryMode::Reset);
    let err = Pipeline::new(
        &cfg,
        &mut FakeBackend::new(),
        &NoopTranslator,
        &RecordingMuxer::default(),
    )
    .run()
    .unwrap_err();
    assert!(matches!(err, TextmorphError::Validation(_)));
}

#[test]
fn zero_frame_transitions_fail_before_any_optimization() {
    let dir = test_dir("unit_sequence", "zero_transition");
    let cfg = RunConfig {
        length: 1,
        fps: 1,
        ..config(&dir, "one\ntwo\nthree", CarryMode::Reset)
    };
    let mut backend = FakeBackend::new();
    let err = Pipeline::new(&cfg, &mut backend, &NoopTranslator, &RecordingMuxer::default())
        .run()
        .unwrap_err();
    assert!(matches!(err, TextmorphError::Validation(_)));
    assert_eq!(backend.forwards, 0);
    assert!(backend.encoded.is_empty());
    assert!(!cfg.work_dir().exists());
}

#[test]
fn anti_target_is_encoded_once_per_run() {
    let dir = test_dir("unit_sequence", "anti");
    let cfg = RunConfig {
        anti_text: Some(" blurry ".into()),
        ..config(&dir, "sea\nsky\n", CarryMode::Reset)
    };
    let mut backend = FakeBackend::new();
    Pipeline::new(&cfg, &mut backend, &NoopTranslator, &RecordingMuxer::default())
        .run()
        .unwrap();
    assert_eq!(
        backend.encoded,
        vec!["blurry".to_string(), "sea".to_string(), "sky".to_string()]
    );
}

#[test]
fn interpolate_rerenders_from_manifest() {
    let dir = test_dir("unit_sequence", "rerender");
    let cfg = config(&dir, "sea\nsky\n", CarryMode::Reset);
    let mut backend = FakeBackend::new();
    let summary = Pipeline::new(&cfg, &mut backend, &NoopTranslator, &RecordingMuxer::default())
        .run()
        .unwrap();

    let muxer = RecordingMuxer::default();
    let frames = interpolate_from_manifest(&summary.work_dir, &backend, &muxer, |m| m.fps = 5).unwrap();
    assert_eq!(frames, 50);
    let final_dir = summary.work_dir.join(FINAL_DIR);
    assert!(final_dir.join("00049.jpg").is_file());
    assert!(!final_dir.join("00050.jpg").exists());
    assert_eq!(muxer.jobs.borrow()[0].fps, 5);

    let err = interpolate_from_manifest(&dir, &backend, &muxer, |_| {}).unwrap_err();
    assert!(matches!(err, TextmorphError::Other(_)));
}

#[test]
fn interpolate_rejects_a_degenerate_manifest_size() {
    let dir = test_dir("unit_sequence", "bad_size");
    let cfg = config(&dir, "sea\n", CarryMode::Reset);
    let mut backend = FakeBackend::new();
    let summary = Pipeline::new(&cfg, &mut backend, &NoopTranslator, &RecordingMuxer::default())
        .run()
        .unwrap();

    let muxer = RecordingMuxer::default();
    let err = interpolate_from_manifest(&summary.work_dir, &backend, &muxer, |m| {
        m.size.width = 0
    })
    .unwrap_err();
    assert!(matches!(err, TextmorphError::Validation(_)));

    // Same for a hand-edited manifest on disk.
    let path = summary.work_dir.join(MANIFEST_FILE);
    let mut manifest = Manifest::load(&path).unwrap();
    manifest.size.height = 0;
    manifest.save(&path).unwrap();
    let err = interpolate_from_manifest(&summary.work_dir, &backend, &muxer, |_| {}).unwrap_err();
    assert!(matches!(err, TextmorphError::Validation(_)));
    assert!(muxer.jobs.borrow().is_empty());
}
