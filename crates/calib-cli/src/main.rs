//! Calibration store CLI.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result, anyhow};
use calib_cli::commands::{
    open_store, run_export, run_groups, run_index, run_resolve, run_state_id, run_states,
};
use calib_cli::logging::{LogConfig, LogFormat, init_logging};
use calib_cli::types::ExportOptions;
use calib_store::StoreError;
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, StateArgs};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            if let Some(hint) = error
                .chain()
                .find_map(|cause| cause.downcast_ref::<StoreError>())
                .and_then(StoreError::suggestion)
            {
                eprintln!("hint: {hint}");
            }
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<()> {
    let store = open_store(cli.config.as_deref(), cli.data_root)?;
    match cli.command {
        Command::StateId(args) => {
            let selector = args
                .selector()
                .ok_or_else(|| anyhow!("pass --detector or all of --arc1/--arc2/--wavelength/--frequency/--position"))?;
            let report = run_state_id(&store, &selector, args.init)?;
            summary::print_state_id(&report);
        }
        Command::States => summary::print_states(&run_states(&store)?),
        Command::Index(args) => {
            let report = run_index(&store, &selector(&args.state)?, args.kind.into(), args.lite)?;
            summary::print_index(&report);
        }
        Command::Resolve(args) => {
            let report = run_resolve(
                &store,
                &selector(&args.state)?,
                args.kind.into(),
                args.lite,
                args.run_number,
                args.version,
            )?;
            summary::print_resolve(&report).context("render record")?;
        }
        Command::Groups(args) => {
            let report = run_groups(&store, &selector(&args.state)?)?;
            summary::print_groups(&report);
        }
        Command::Export(args) => {
            let options = ExportOptions {
                kind: args.kind.into(),
                use_lite_mode: args.lite,
                run_number: args.run_number,
                payload: args.payload,
                applies_to: args.applies_to,
                comments: args.comments,
                author: args.author,
            };
            let report = run_export(&store, &selector(&args.state)?, &options)?;
            summary::print_export(&report);
        }
    }
    Ok(())
}

fn selector(state: &StateArgs) -> Result<calib_cli::types::StateSelector> {
    state
        .selector()
        .ok_or_else(|| anyhow!("pass --state or --detector"))
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
