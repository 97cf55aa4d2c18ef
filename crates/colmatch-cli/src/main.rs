//! Column matcher CLI.

use clap::{ColorChoice, Parser};
use colmatch_cli::logging::{LogConfig, LogFormat, init_logging};
use colmatch_cli::settings::{Settings, load_settings};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    run_calibration, run_clear, run_feedback, run_match, run_patterns, run_stats, run_suggest,
    run_weights,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let settings = settings_from_cli(&cli);
    let result = match &cli.command {
        Command::Match(args) => run_match(args, &settings),
        Command::Feedback(args) => run_feedback(args, &settings),
        Command::Stats(args) => run_stats(args, &settings),
        Command::Weights(args) => run_weights(args, &settings),
        Command::Patterns => run_patterns(&settings),
        Command::Calibration => run_calibration(&settings),
        Command::Suggest(args) => run_suggest(args, &settings),
        Command::Clear => run_clear(&settings),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Settings file first, then command-line overrides.
fn settings_from_cli(cli: &Cli) -> Settings {
    let mut settings = load_settings(cli.config.as_deref());
    if let Some(data_dir) = &cli.data_dir {
        settings.learning.data_dir = data_dir.clone();
    }
    settings
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
