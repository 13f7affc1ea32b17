use alloy_primitives::hex;
use anyhow::{Context, Result};
use config::{Environment, File};
use std::path::Path;
use tracing::info;

use crate::models::common::Config;

const ENV_PREFIX: &str = "SCANNER";

/// Lowercase hex without a `0x` prefix.
pub fn bytes_to_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Inverse of [`bytes_to_hex`]. A leading `0x` is tolerated.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s)
}

pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    let config_path = file_name.as_ref();
    info!("Config path: {}", config_path.to_string_lossy());

    // File is optional, every key can come from SCANNER__* env vars instead
    let settings = config::Config::builder()
        .add_source(File::from(config_path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read config")?;

    settings
        .try_deserialize::<Config>()
        .context("failed to parse config")
}

pub(crate) fn strip_html(error: &str) -> String {
    // If the error contains HTML tags, extract just the text content
    if error.contains("<!doctype html>") || error.contains("<html>") {
        error
            .lines()
            .map(|line| line.trim())
            .find(|line| {
                !line.starts_with('<')
                    && !line.ends_with('>')
                    && !line.is_empty()
                    && *line != "html"
                    && *line != "body"
            })
            .unwrap_or(error)
            .to_string()
    } else {
        error.to_string()
    }
}
