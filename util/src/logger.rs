//! # Logger
//!
//! Logs go to the terminal, with coloured level labels, and to the session's log file in plain
//! text. Noisy modules (the motor link repeats a command every few cycles) can be given their own
//! level on top of the global one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use std::collections::BTreeMap;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Invalid log level {level:?} for module {module}")]
    InvalidModuleLevel { module: String, level: String },

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `module_levels` overrides `min_level` for the named module paths, for example
/// `nav_lib::motor_link`.
///
/// # Notes
///
/// - `min_level` must be `INFO` or more verbose.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: self::LevelFilter,
    module_levels: &[(String, LevelFilter)],
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(session.log_file_path.clone()).map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new().level(min_level);
    for (module, level) in module_levels {
        dispatch = dispatch.level_for(module.clone(), *level);
    }

    let terminal = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}",
                session::get_elapsed_seconds(),
                level_label(record.level()),
                with_target(record, message)
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}",
                session::get_elapsed_seconds(),
                level_tag(record.level()),
                with_target(record, message)
            ))
        })
        .chain(log_file);

    dispatch
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    for (module, level) in module_levels {
        info!("    {}: {:?}", module, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Parse per-module levels as written in a parameter file (`"nav_lib::nav" = "debug"`).
pub fn parse_module_levels(
    levels: &BTreeMap<String, String>,
) -> Result<Vec<(String, LevelFilter)>, LoggerInitError> {
    levels
        .iter()
        .map(|(module, level)| {
            level
                .parse::<LevelFilter>()
                .map(|l| (module.clone(), l))
                .map_err(|_| LoggerInitError::InvalidModuleLevel {
                    module: module.clone(),
                    level: level.clone(),
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Debug and trace messages are prefixed with the module they came from.
fn with_target(record: &log::Record, message: &std::fmt::Arguments) -> String {
    if record.level() > log::Level::Info {
        format!("{}: {}", record.target(), message)
    } else {
        message.to_string()
    }
}

/// Coloured label for the terminal
fn level_label(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => level_tag(level).dimmed().italic(),
        log::Level::Debug => level_tag(level).dimmed(),
        log::Level::Info => level_tag(level).normal(),
        log::Level::Warn => level_tag(level).yellow(),
        log::Level::Error => level_tag(level).red().bold(),
    }
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_module_levels() {
        let mut levels = BTreeMap::new();
        levels.insert(String::from("nav_lib::nav"), String::from("debug"));
        levels.insert(String::from("nav_lib::motor_link"), String::from("INFO"));

        assert_eq!(
            parse_module_levels(&levels).unwrap(),
            vec![
                (String::from("nav_lib::motor_link"), LevelFilter::Info),
                (String::from("nav_lib::nav"), LevelFilter::Debug),
            ]
        );

        levels.insert(String::from("comms_if::net"), String::from("loud"));
        match parse_module_levels(&levels) {
            Err(LoggerInitError::InvalidModuleLevel { module, level }) => {
                assert_eq!(module, "comms_if::net");
                assert_eq!(level, "loud");
            }
            r => panic!("Expected an invalid level error, got {:?}", r),
        }
    }

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(log::Level::Warn), "WRN");
        assert!(level_label(log::Level::Error).to_string().contains("ERR"));
    }
}
