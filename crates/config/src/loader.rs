use std::{fs, io};

use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("could not parse YAML file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

pub fn read_config(filename: &str) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(filename).map_err(|source| ConfigError::Read {
        path: filename.to_string(),
        source,
    })?;

    parse_config(filename, &text)
}

pub fn parse_config(origin: &str, text: &str) -> Result<Config, ConfigError> {
    serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_string(),
        source,
    })
}
