
use crate::encoding::Encoding;
use simple_error::{simple_error, SimpleError};
use std::env::var;
use tracing::Level;

pub const LOG_LEVEL_VAR: &str = "ENV_LOG_LEVEL";
pub const RESPONSE_ENCODING_VAR: &str = "ENV_RESPONSE_ENCODING";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: Level,
    pub response_encoding: Encoding,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: Level::INFO,
            response_encoding: Encoding::Binary,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, SimpleError> {
        Config::from_lookup(|name| var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, SimpleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let log_level = match lookup(LOG_LEVEL_VAR) {
            Some(value) => _parse_log_level(&value)?,
            None => defaults.log_level,
        };
        let response_encoding = match lookup(RESPONSE_ENCODING_VAR) {
            Some(value) => _parse_response_encoding(&value)?,
            None => defaults.response_encoding,
        };
        Ok(Config {
            log_level,
            response_encoding,
        })
    }
}

fn _parse_log_level(value: &str) -> Result<Level, SimpleError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(simple_error!(format!(
            "Env var {} has unrecognized log level {:?}.",
            LOG_LEVEL_VAR, other
        ))),
    }
}

fn _parse_response_encoding(value: &str) -> Result<Encoding, SimpleError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "binary" => Ok(Encoding::Binary),
        "structured" => Ok(Encoding::Structured),
        other => Err(simple_error!(format!(
            "Env var {} must be binary or structured, got {:?}.",
            RESPONSE_ENCODING_VAR, other
        ))),
    }
}
