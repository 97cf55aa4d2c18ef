//! Files on disk through matching and feedback, as the commands drive them.

use std::fs;
use std::path::Path;

use colmatch_cli::ingest::{load_context, load_dataset};
use colmatch_cli::settings::{Settings, load_settings, save_settings};
use colmatch_learn::{LearningConfig, LearningServices};
use colmatch_map::{EnhancedSimilarityService, best_matches};
use colmatch_model::FeedbackSubmission;

fn write_csvs(dir: &Path) {
    let mut left = String::from("customer_id,email,notes\n");
    let mut right = String::from("cust_id,mail\n");
    for i in 0..15 {
        left.push_str(&format!("C{},user{i}@example.com,row {i}\n", 500 + i));
        right.push_str(&format!("C{},user{i}@example.com\n", 500 + i));
    }
    fs::write(dir.join("left.csv"), left).expect("write left");
    fs::write(dir.join("right.csv"), right).expect("write right");
}

#[test]
fn settings_file_round_trips() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("conf").join("colmatch.toml");
    let mut settings = Settings::default();
    settings.learning = LearningConfig::with_data_dir(dir.path().join("state"));
    settings.matching.min_confidence = 25.0;

    save_settings(&settings, &path).expect("save settings");
    assert_eq!(load_settings(Some(&path)), settings);
}

#[test]
fn unreadable_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[matching\nmin_confidence = ").expect("write settings");
    assert_eq!(load_settings(Some(&path)), Settings::default());
    assert_eq!(
        load_settings(Some(&dir.path().join("missing.toml"))),
        Settings::default()
    );
}

#[test]
fn match_then_feedback_persists_across_runs() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_csvs(dir.path());
    let context_path = dir.path().join("left.toml");
    fs::write(&context_path, "exclusions = [\"notes\"]\n").expect("write context");

    let left = load_dataset(&dir.path().join("left.csv")).expect("load left");
    let right = load_dataset(&dir.path().join("right.csv")).expect("load right");
    let left_context = load_context(&context_path).expect("load context");
    let config = LearningConfig::with_data_dir(dir.path().join("state"));

    let services = LearningServices::open(config.clone()).expect("open services");
    let engine = EnhancedSimilarityService::from_services(&services);
    let results = engine.calculate(&left, &right, Some(&left_context), None);
    assert!(results.iter().all(|r| r.left_column != "notes"));

    let best = best_matches(&results);
    let pairs: Vec<_> = best
        .iter()
        .map(|r| (r.left_column.as_str(), r.right_column.as_str()))
        .collect();
    assert!(pairs.contains(&("customer_id", "cust_id")));
    assert!(pairs.contains(&("email", "mail")));

    let top = &best[0];
    services
        .feedback()
        .add_feedback(
            FeedbackSubmission::new(&top.left_column, &top.right_column, true)
                .with_scores(
                    top.name_similarity,
                    top.data_similarity,
                    top.pattern_similarity,
                )
                .with_confidence(top.confidence),
        )
        .expect("add feedback");
    services.flush().expect("flush services");
    services.shutdown();
    drop(services);

    let reopened = LearningServices::open(config).expect("reopen services");
    let stats = reopened.feedback().stats();
    assert_eq!(stats.total_feedback, 1);
    assert_eq!(stats.correct_matches, 1);
    assert_eq!(
        reopened.feedback().suggested_match(&top.left_column),
        Some(top.right_column.clone())
    );
    assert_eq!(reopened.calibrator().stats().total_samples, 1);
    reopened.shutdown();
}
