//! CLI argument definitions for the column matcher.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "colmatch",
    version,
    about = "Column matcher - Suggest column correspondences between two datasets",
    long_about = "Suggest which columns of two tabular datasets hold the same data.\n\n\
                  Scores combine name, value, pattern and quality signals, and improve\n\
                  over time from the feedback you record."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Settings file (TOML). Defaults are used when absent.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the learned state (overrides the settings file).
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score every column pair of two CSV files.
    Match(MatchArgs),

    /// Record whether a suggested pair is correct.
    Feedback(FeedbackArgs),

    /// Show feedback counts and recent entries.
    Stats(StatsArgs),

    /// Show the learned signal weights.
    Weights(WeightsArgs),

    /// Show learned name patterns and token mappings.
    Patterns,

    /// Show confidence calibration buckets.
    Calibration,

    /// Show the column learned as the match for a left column.
    Suggest(SuggestArgs),

    /// Delete all recorded feedback.
    Clear,
}

#[derive(Args)]
pub struct MatchArgs {
    /// Left CSV file.
    #[arg(value_name = "LEFT")]
    pub left: PathBuf,

    /// Right CSV file.
    #[arg(value_name = "RIGHT")]
    pub right: PathBuf,

    /// Context for the left dataset (.json or .toml).
    #[arg(long = "left-context", value_name = "PATH")]
    pub left_context: Option<PathBuf>,

    /// Context for the right dataset (.json or .toml).
    #[arg(long = "right-context", value_name = "PATH")]
    pub right_context: Option<PathBuf>,

    /// Only report pairs scoring above this confidence (0-100).
    #[arg(long = "min-confidence", value_name = "SCORE")]
    pub min_confidence: Option<f64>,

    /// Keep only the best one-to-one assignment.
    #[arg(long = "best")]
    pub best: bool,

    /// Print results as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,

    /// Maximum number of rows to print.
    #[arg(long = "limit", value_name = "N")]
    pub limit: Option<usize>,

    /// Show the score adjustments applied to each pair.
    #[arg(long = "explain")]
    pub explain: bool,
}

#[derive(Args)]
pub struct FeedbackArgs {
    /// Column of the left dataset.
    #[arg(value_name = "LEFT_COLUMN")]
    pub left_column: String,

    /// Column of the right dataset that was suggested.
    #[arg(value_name = "RIGHT_COLUMN")]
    pub right_column: String,

    /// Whether the suggestion was right.
    #[arg(value_enum, value_name = "VERDICT")]
    pub verdict: VerdictArg,

    /// The right column that should have been suggested.
    #[arg(long = "correct-match", value_name = "COLUMN")]
    pub correct_match: Option<String>,

    /// Free-form note stored with the feedback.
    #[arg(long = "note", value_name = "TEXT")]
    pub note: Option<String>,

    /// Name score of the judged pair (0-1).
    #[arg(long = "name-score", value_name = "SCORE", default_value_t = 0.0)]
    pub name_score: f64,

    /// Data score of the judged pair (0-1).
    #[arg(long = "data-score", value_name = "SCORE", default_value_t = 0.0)]
    pub data_score: f64,

    /// Pattern score of the judged pair (0-1).
    #[arg(long = "pattern-score", value_name = "SCORE", default_value_t = 0.0)]
    pub pattern_score: f64,

    /// Confidence shown for the judged pair (0-100).
    #[arg(long = "confidence", value_name = "SCORE", default_value_t = 0.0)]
    pub confidence: f64,

    /// Left CSV file; with --right-file, scores are computed instead of given.
    #[arg(long = "left-file", value_name = "PATH", requires = "right_file")]
    pub left_file: Option<PathBuf>,

    /// Right CSV file; with --left-file, scores are computed instead of given.
    #[arg(long = "right-file", value_name = "PATH", requires = "left_file")]
    pub right_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Number of recent entries to list.
    #[arg(long = "recent", value_name = "N", default_value_t = 10)]
    pub recent: usize,
}

#[derive(Args)]
pub struct WeightsArgs {
    /// Number of training steps to list.
    #[arg(long = "history", value_name = "N", default_value_t = 5)]
    pub history: usize,
}

#[derive(Args)]
pub struct SuggestArgs {
    /// Column of the left dataset.
    #[arg(value_name = "COLUMN")]
    pub column: String,
}

/// Feedback verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum VerdictArg {
    Correct,
    Incorrect,
}

impl VerdictArg {
    pub fn is_correct(self) -> bool {
        self == Self::Correct
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
