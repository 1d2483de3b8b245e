use crate::chunking::{ChunkTarget, ChunkingConfig};
use crate::frame_scan::FrameValidation;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub const ENV_CHUNK_SIZE: &str = "FLAC_CHUNKER_CHUNK_SIZE";
pub const ENV_CHUNK_SECONDS: &str = "FLAC_CHUNKER_CHUNK_SECONDS";
pub const ENV_OUTPUT_DIR: &str = "FLAC_CHUNKER_OUTPUT_DIR";
pub const ENV_VALIDATE_FRAMES: &str = "FLAC_CHUNKER_VALIDATE_FRAMES";
pub const ENV_WRITE_MANIFEST: &str = "FLAC_CHUNKER_WRITE_MANIFEST";
pub const ENV_MAX_INPUT_BYTES: &str = "FLAC_CHUNKER_MAX_INPUT_BYTES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Application configuration
/// In debug builds: loads a .env file first, then reads the environment
/// In release builds: reads the environment only
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Target chunk size in bytes
    pub chunk_size: Option<usize>,
    /// Target chunk duration in seconds, takes precedence over `chunk_size`
    pub chunk_seconds: Option<f64>,
    /// Where chunk files go
    pub output_dir: Option<PathBuf>,
    /// Require a valid frame header behind each sync match
    pub validate_frames: bool,
    /// Write manifest.json next to the chunks
    pub write_manifest: bool,
    /// Refuse larger input files
    pub max_input_bytes: Option<u64>,
}

impl Config {
    /// Load configuration based on build mode
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(debug_assertions)]
        {
            if dotenvy::dotenv().is_ok() {
                tracing::info!("Config: Dev mode activated - loaded .env file");
            } else {
                debug!("Config: No .env file found");
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            chunk_size: parse_opt(&lookup, ENV_CHUNK_SIZE)?,
            chunk_seconds: parse_opt(&lookup, ENV_CHUNK_SECONDS)?,
            output_dir: lookup(ENV_OUTPUT_DIR).map(PathBuf::from),
            validate_frames: parse_flag(&lookup, ENV_VALIDATE_FRAMES)?.unwrap_or(false),
            write_manifest: parse_flag(&lookup, ENV_WRITE_MANIFEST)?.unwrap_or(true),
            max_input_bytes: parse_opt(&lookup, ENV_MAX_INPUT_BYTES)?,
        };

        debug!("Config: {:?}", config);
        Ok(config)
    }

    /// Splitter configuration with every unset value at its default
    pub fn chunking_config(&self) -> ChunkingConfig {
        let defaults = ChunkingConfig::default();

        let target = match (self.chunk_seconds, self.chunk_size) {
            (Some(seconds), _) => ChunkTarget::Seconds(seconds),
            (None, Some(bytes)) => ChunkTarget::Bytes(bytes),
            (None, None) => defaults.target,
        };

        ChunkingConfig {
            target,
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            validation: if self.validate_frames {
                FrameValidation::HeaderCrc
            } else {
                FrameValidation::SyncOnly
            },
            write_manifest: self.write_manifest,
            max_input_bytes: self.max_input_bytes,
        }
    }
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        },
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        },
    }
}
