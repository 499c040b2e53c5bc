//! Installs the global `log` backend. Only one logger can be installed per process;
//! a second call returns `LoggerError::AlreadyInitialized`.
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Unknown log level '{0}', expected off, error, warn, info, debug or trace")]
    UnknownLevel(String),
    #[error("A logger is already installed")]
    AlreadyInitialized(#[from] SetLoggerError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    LevelFilter::from_str(level.trim()).map_err(|_| LoggerError::UnknownLevel(level.to_string()))
}

/// Terminal logger writing warnings and errors to stderr, the rest to stdout.
pub fn init_logger(level: LevelFilter) -> Result<(), LoggerError> {
    TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;
    Ok(())
}

/// Logger appending to `path`, created if missing.
pub fn init_file_logger(level: LevelFilter, path: &Path) -> Result<(), LoggerError> {
    let file = File::options().create(true).append(true).open(path)?;
    WriteLogger::init(level, Config::default(), file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::info;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::Info);
        assert_eq!(parse_level(" Debug ").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::Off);
        assert!(matches!(parse_level("loud"), Err(LoggerError::UnknownLevel(_))));
    }

    // the only test in the crate that installs a logger
    #[test]
    fn test_file_logger_and_double_init() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kisan.log");
        init_file_logger(LevelFilter::Info, &path).unwrap();
        info!("registry compiled");
        assert!(fs::read_to_string(&path).unwrap().contains("registry compiled"));
        assert!(matches!(
            init_logger(LevelFilter::Debug),
            Err(LoggerError::AlreadyInitialized(_))
        ));
    }
}
