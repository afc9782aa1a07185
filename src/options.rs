use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::connection::{ConnectionSpec, SslMode, DEFAULT_PORT, DEFAULT_SCHEMA};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Options {
    /// Saved settings file holding both connections
    #[arg(long, conflicts_with_all = ["source_host", "dest_host"])]
    pub settings: Option<PathBuf>,

    #[arg(long, default_value = "source")]
    pub source_name: String,
    #[arg(long, required_unless_present = "settings")]
    pub source_host: Option<String>,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub source_port: u16,
    #[arg(long, required_unless_present = "settings")]
    pub source_database: Option<String>,
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    pub source_schema: String,
    #[arg(long, required_unless_present = "settings")]
    pub source_user: Option<String>,
    #[arg(long, default_value = "")]
    pub source_password: String,
    #[arg(long, value_enum, default_value_t = SslMode::Prefer)]
    pub source_ssl_mode: SslMode,

    #[arg(long, default_value = "destination")]
    pub dest_name: String,
    #[arg(long, required_unless_present = "settings")]
    pub dest_host: Option<String>,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub dest_port: u16,
    #[arg(long, required_unless_present = "settings")]
    pub dest_database: Option<String>,
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    pub dest_schema: String,
    #[arg(long, required_unless_present = "settings")]
    pub dest_user: Option<String>,
    #[arg(long, default_value = "")]
    pub dest_password: String,
    #[arg(long, value_enum, default_value_t = SslMode::Prefer)]
    pub dest_ssl_mode: SslMode,

    /// Seconds allowed for each of the four metadata fetches
    #[arg(long, default_value_t = 30)]
    pub fetch_timeout: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Leave out objects that are equal on both sides
    #[arg(long)]
    pub only_differences: bool,

    /// Log filter, e.g. `debug` or `pgcompare=trace`
    #[arg(long)]
    pub log: Option<String>,
}

/// Layout of a saved settings file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSettings {
    pub source_settings: ConnectionSpec,
    pub destination_settings: ConnectionSpec,
}

impl SavedSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let settings_error = |source: Box<dyn std::error::Error + Send + Sync>| Error::Settings {
            path: path.to_path_buf(),
            source,
        };
        let data = std::fs::read_to_string(path)
            .map_err(|e| settings_error(Box::new(e)))?;
        serde_json::from_str(&data)
            .map_err(|e| settings_error(Box::new(e)))
    }
}

impl Options {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    /// Source and destination connection specs, from the settings file when
    /// one was given, otherwise from the command line.
    pub fn connection_specs(&self) -> Result<(ConnectionSpec, ConnectionSpec)> {
        if let Some(path) = &self.settings {
            let saved = SavedSettings::load(path)?;
            return Ok((saved.source_settings, saved.destination_settings));
        }

        let source = ConnectionSpec::new(
            &self.source_name,
            required(&self.source_host, "--source-host")?,
            required(&self.source_database, "--source-database")?,
            required(&self.source_user, "--source-user")?,
        )
        .with_port(self.source_port)
        .with_schema(&self.source_schema)
        .with_password(&self.source_password)
        .with_ssl_mode(self.source_ssl_mode);

        let destination = ConnectionSpec::new(
            &self.dest_name,
            required(&self.dest_host, "--dest-host")?,
            required(&self.dest_database, "--dest-database")?,
            required(&self.dest_user, "--dest-user")?,
        )
        .with_port(self.dest_port)
        .with_schema(&self.dest_schema)
        .with_password(&self.dest_password)
        .with_ssl_mode(self.dest_ssl_mode);

        Ok((source, destination))
    }
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::Config(format!("{flag} is required")))
}
