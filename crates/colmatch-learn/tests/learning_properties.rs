//! Property-based tests for learner invariants.

use chrono::Utc;
use colmatch_learn::{
    AdaptiveWeightLearner, ConfidenceCalibrator, MIN_BUCKET_SAMPLES, MIN_WEIGHT, bucket_index,
    pattern_confidence,
};
use colmatch_model::{FeedbackEntry, FeedbackSubmission};
use proptest::prelude::*;

fn entry_strategy() -> impl Strategy<Value = FeedbackEntry> {
    (0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, any::<bool>()).prop_map(
        |(name, data, pattern, correct)| {
            FeedbackSubmission::new("left", "right", correct)
                .with_scores(name, data, pattern)
                .into_entry(Utc::now())
        },
    )
}

fn batches_strategy() -> impl Strategy<Value = Vec<Vec<FeedbackEntry>>> {
    prop::collection::vec(prop::collection::vec(entry_strategy(), 0..12), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn weights_stay_normalized_and_floored(
        batches in batches_strategy(),
        learning_rate in 0.001f64..5.0,
    ) {
        let learner = AdaptiveWeightLearner::new(learning_rate);
        for batch in &batches {
            learner.update_weights(batch);
            let w = learner.weights();
            prop_assert!((w.sum() - 1.0).abs() < 1e-9, "weights sum to {}", w.sum());
            for value in [w.name, w.data, w.pattern, w.llm] {
                prop_assert!(value >= MIN_WEIGHT - 1e-12, "weight {value} below floor");
            }
        }
    }

    #[test]
    fn calibrate_is_identity_below_min_samples(
        observations in prop::collection::vec((0.0f64..=100.0, any::<bool>()), 0..60),
        x in 0.0f64..=100.0,
    ) {
        let calibrator = ConfidenceCalibrator::new();
        for (predicted, correct) in &observations {
            calibrator.update(*predicted, *correct);
        }
        let buckets = calibrator.buckets();
        let bucket = &buckets[bucket_index(x)];
        if bucket.total_count < MIN_BUCKET_SAMPLES {
            prop_assert_eq!(calibrator.calibrate(x), x);
        } else {
            let calibrated = calibrator.calibrate(x);
            prop_assert!((0.0..=100.0).contains(&calibrated));
        }
    }

    #[test]
    fn pattern_confidence_is_bounded_and_monotone(success in 0u32..10_000, fail in 0u32..10_000) {
        let confidence = pattern_confidence(success, fail);
        prop_assert!(confidence > 0.0 && confidence < 1.0);
        prop_assert!(pattern_confidence(success + 1, fail) > confidence);
        prop_assert!(pattern_confidence(success, fail + 1) < confidence);
    }
}

#[test]
fn fresh_calibrator_is_identity_everywhere() {
    let calibrator = ConfidenceCalibrator::new();
    for step in 0..=1000 {
        let x = f64::from(step) / 10.0;
        assert_eq!(calibrator.calibrate(x), x);
    }
}
