use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{info, info_span};

use colmatch_cli::ingest::{load_context, load_dataset};
use colmatch_cli::settings::Settings;
use colmatch_learn::LearningServices;
use colmatch_map::{EnhancedSimilarityService, MatchOptions, best_matches};
use colmatch_model::{DatasetContext, FeedbackSubmission};

use crate::cli::{FeedbackArgs, MatchArgs, StatsArgs, SuggestArgs, WeightsArgs};
use crate::summary::{
    print_calibration, print_feedback_stats, print_matches, print_patterns, print_weights,
};

/// Open the learned state, run `f`, then wait for every pending write.
pub fn with_services<F>(settings: &Settings, f: F) -> Result<()>
where
    F: FnOnce(&LearningServices) -> Result<()>,
{
    let services = LearningServices::open(settings.learning.clone()).map_err(|error| {
        anyhow!(
            "{}{}",
            error.user_message(),
            error
                .suggestion()
                .map(|hint| format!(" {hint}"))
                .unwrap_or_default()
        )
    })?;
    let outcome = f(&services);
    let flushed = services.flush().context("flush learned state");
    services.shutdown();
    outcome?;
    flushed
}

pub fn run_match(args: &MatchArgs, settings: &Settings) -> Result<()> {
    let span = info_span!("match", left = %args.left.display(), right = %args.right.display());
    let _guard = span.enter();

    let left = load_dataset(&args.left)?;
    let right = load_dataset(&args.right)?;
    let left_context = optional_context(args.left_context.as_deref())?;
    let right_context = optional_context(args.right_context.as_deref())?;
    let options = MatchOptions {
        min_confidence: args
            .min_confidence
            .unwrap_or(settings.matching.min_confidence),
    };

    with_services(settings, |services| {
        let engine = EnhancedSimilarityService::from_services(services).with_options(options);
        let mut results = engine.calculate(
            &left,
            &right,
            left_context.as_ref(),
            right_context.as_ref(),
        );
        if args.best {
            results = best_matches(&results);
        }
        if let Some(limit) = args.limit {
            results.truncate(limit);
        }
        info!("Reporting {} column pairs", results.len());

        if args.json {
            let json = serde_json::to_string_pretty(&results).context("serialize results")?;
            println!("{json}");
        } else {
            print_matches(&results, args.explain);
        }
        Ok(())
    })
}

pub fn run_feedback(args: &FeedbackArgs, settings: &Settings) -> Result<()> {
    let mut submission = FeedbackSubmission::new(
        &args.left_column,
        &args.right_column,
        args.verdict.is_correct(),
    )
    .with_scores(args.name_score, args.data_score, args.pattern_score)
    .with_confidence(args.confidence);
    if let Some(correct) = &args.correct_match {
        submission = submission.with_correct_match(correct);
    }
    if let Some(note) = &args.note {
        submission = submission.with_note(note);
    }

    with_services(settings, move |services| {
        if let (Some(left_path), Some(right_path)) = (&args.left_file, &args.right_file) {
            let left = load_dataset(left_path)?;
            let right = load_dataset(right_path)?;
            let engine = EnhancedSimilarityService::from_services(services);
            let result = engine
                .compare_columns(
                    &left,
                    &args.left_column,
                    &right,
                    &args.right_column,
                    None,
                    None,
                )
                .ok_or_else(|| {
                    anyhow!(
                        "column {} or {} not found in the given files",
                        args.left_column,
                        args.right_column
                    )
                })?;
            submission = submission
                .with_scores(
                    result.name_similarity,
                    result.data_similarity,
                    result.pattern_similarity,
                )
                .with_confidence(result.confidence);
        }

        let entry = services
            .feedback()
            .add_feedback(submission)
            .context("record feedback")?;
        println!(
            "Recorded {} feedback for {} <-> {} (confidence {:.1})",
            if entry.is_correct { "positive" } else { "negative" },
            entry.left_column,
            entry.right_column,
            entry.confidence
        );
        Ok(())
    })
}

pub fn run_stats(args: &StatsArgs, settings: &Settings) -> Result<()> {
    with_services(settings, |services| {
        let feedback = services.feedback();
        print_feedback_stats(
            &feedback.stats(),
            &feedback.recent_feedback(args.recent),
            &feedback.corrections(),
        );
        Ok(())
    })
}

pub fn run_weights(args: &WeightsArgs, settings: &Settings) -> Result<()> {
    with_services(settings, |services| {
        let learner = services.weights();
        let history = learner.training_history();
        let tail = &history[history.len().saturating_sub(args.history)..];
        print_weights(&learner.weights(), learner.learning_rate(), tail);
        Ok(())
    })
}

pub fn run_patterns(settings: &Settings) -> Result<()> {
    with_services(settings, |services| {
        let learner = services.patterns();
        print_patterns(&learner.patterns(), &learner.token_mappings());
        Ok(())
    })
}

pub fn run_calibration(settings: &Settings) -> Result<()> {
    with_services(settings, |services| {
        print_calibration(&services.calibrator().stats());
        Ok(())
    })
}

pub fn run_suggest(args: &SuggestArgs, settings: &Settings) -> Result<()> {
    with_services(settings, |services| {
        match services.feedback().suggested_match(&args.column) {
            Some(column) => println!("{} -> {}", args.column, column),
            None => println!("No learned match for {}", args.column),
        }
        Ok(())
    })
}

pub fn run_clear(settings: &Settings) -> Result<()> {
    with_services(settings, |services| {
        services.feedback().clear();
        println!(
            "Cleared feedback in {}",
            services.config().data_dir().display()
        );
        Ok(())
    })
}

fn optional_context(path: Option<&Path>) -> Result<Option<DatasetContext>> {
    path.map(load_context).transpose()
}
