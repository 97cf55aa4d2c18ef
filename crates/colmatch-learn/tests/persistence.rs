//! Snapshot persistence across service restarts.

use std::fs;
use std::path::Path;
use std::thread;

use colmatch_learn::{
    AdaptiveState, AdaptiveWeights, CalibrationState, FeedbackData, FeedbackLearningSystem,
    LearningConfig, LearningServices, PatternState, load_json,
};
use colmatch_model::FeedbackSubmission;

fn config(dir: &Path) -> LearningConfig {
    LearningConfig::with_data_dir(dir.join("data"))
}

fn submit_feedback(services: &LearningServices) {
    let feedback = services.feedback();
    for i in 0..12 {
        let correct = i % 3 != 0;
        let mut submission = FeedbackSubmission::new("customer_id", "cust_id", correct)
            .with_scores(0.6, 0.4, 0.9)
            .with_confidence(40.0 + i as f64 * 4.0)
            .with_note(format!("round {i}"));
        if !correct {
            submission = submission.with_correct_match("client_id");
        }
        feedback.add_feedback(submission).expect("add feedback");
    }
}

#[test]
fn snapshots_round_trip_through_restart() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = config(dir.path());

    let services = LearningServices::open(config.clone()).expect("open services");
    submit_feedback(&services);
    services.flush().expect("flush services");

    let weights = services.weights().state();
    let patterns = services.patterns().state();
    let calibration = services.calibrator().state();
    let feedback = services.feedback().data();
    services.shutdown();
    drop(services);

    assert_eq!(weights.training_history.len(), 3);
    assert!(!patterns.patterns.is_empty());
    assert_eq!(feedback.matches.len(), 12);
    assert_eq!(feedback.corrections["customer_id|cust_id"].count, 4);

    // Files on disk hold exactly the in-memory state.
    let stored: AdaptiveState = load_json(&config.adaptive_weights_path())
        .expect("read weights")
        .expect("weights file exists");
    assert_eq!(stored, weights);
    let stored: PatternState = load_json(&config.pattern_learning_path())
        .expect("read patterns")
        .expect("patterns file exists");
    assert_eq!(stored, patterns);
    let stored: CalibrationState = load_json(&config.calibration_path())
        .expect("read calibration")
        .expect("calibration file exists");
    assert_eq!(stored, calibration);
    let stored: FeedbackData = load_json(&config.feedback_path())
        .expect("read feedback")
        .expect("feedback file exists");
    assert_eq!(stored, feedback);

    // A fresh process sees the same state.
    let reopened = LearningServices::open(config).expect("reopen services");
    assert_eq!(reopened.weights().state(), weights);
    assert_eq!(reopened.patterns().state(), patterns);
    assert_eq!(reopened.calibrator().state(), calibration);
    assert_eq!(reopened.feedback().data(), feedback);
}

#[test]
fn corrupt_snapshots_fall_back_to_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = config(dir.path());
    fs::create_dir_all(&config.data_dir).expect("create data dir");
    fs::write(config.adaptive_weights_path(), "{ definitely not json").expect("write weights");
    fs::write(config.feedback_path(), "42").expect("write feedback");

    let services = LearningServices::open(config).expect("open services");
    assert_eq!(services.weights().weights(), AdaptiveWeights::default());
    assert_eq!(services.feedback().stats().total_feedback, 0);
}

#[test]
fn calibration_with_wrong_bucket_count_keeps_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = config(dir.path());
    fs::create_dir_all(&config.data_dir).expect("create data dir");
    let snapshot = r#"{
        "buckets": [
            {"range_min": 0.0, "range_max": 50.0, "total_count": 9, "correct_count": 1,
             "actual_accuracy": 0.11, "calibration_factor": 0.44}
        ],
        "history": [
            {"timestamp": "2026-01-02T03:04:05Z", "predicted_confidence": 20.0,
             "actual_correct": false, "calibrated_confidence": 20.0}
        ]
    }"#;
    fs::write(config.calibration_path(), snapshot).expect("write calibration");

    let services = LearningServices::open(config).expect("open services");
    let calibrator = services.calibrator();
    assert_eq!(calibrator.buckets().len(), 10);
    assert_eq!(calibrator.stats().total_samples, 0);
    assert_eq!(calibrator.history().len(), 1);
    assert_eq!(calibrator.calibrate(20.0), 20.0);
}

#[test]
fn invalid_stored_weights_are_rescaled() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = config(dir.path());
    fs::create_dir_all(&config.data_dir).expect("create data dir");
    fs::write(
        config.adaptive_weights_path(),
        r#"{"weights": {"name": 2.0, "data": 1.0, "pattern": 0.5, "llm": 0.0}}"#,
    )
    .expect("write weights");

    let services = LearningServices::open(config).expect("open services");
    let weights = services.weights().weights();
    assert!(weights.is_valid(), "{weights:?}");
    assert!(weights.name > weights.data);
}

#[test]
fn cleared_feedback_is_persisted() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = config(dir.path());

    let services = LearningServices::open(config.clone()).expect("open services");
    submit_feedback(&services);
    services.feedback().clear();
    services.shutdown();

    let stored: FeedbackData = load_json(&config.feedback_path())
        .expect("read feedback")
        .expect("feedback file exists");
    assert!(stored.matches.is_empty());
    assert!(stored.corrections.is_empty());
}

#[test]
fn concurrent_feedback_leaves_a_complete_store() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("feedback.json");
    let system = FeedbackLearningSystem::open(&path);

    thread::scope(|scope| {
        for worker in 0..8 {
            let system = &system;
            scope.spawn(move || {
                for i in 0..25 {
                    let left = format!("left_{worker}_{i}");
                    system
                        .add_feedback(FeedbackSubmission::new(left, "right", i % 2 == 0))
                        .expect("add feedback");
                }
            });
        }
    });

    let stored: FeedbackData = load_json(&path)
        .expect("store parses")
        .expect("store written");
    assert_eq!(stored.matches.len(), 200);
    assert_eq!(FeedbackLearningSystem::open(&path).stats().total_feedback, 200);
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .expect("list dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
