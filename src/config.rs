//! Build-time configuration.
//!
//! Values are baked in when the WASM bundle is built:
//! `CONCEPT_GRAPH_API_BASE` (server origin) and `CONCEPT_GRAPH_DATA_SOURCE`
//! (`live` or `fixture`).

use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::error::ConfigError;
use crate::sync::{DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, SyncConfig};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Where pipeline data comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataSource {
	/// The pipeline server at `api_base`.
	#[default]
	Live,
	/// Offline fixture, no server needed.
	Fixture,
}

impl FromStr for DataSource {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"" | "live" => Ok(DataSource::Live),
			"fixture" => Ok(DataSource::Fixture),
			other => Err(ConfigError::UnknownDataSource(other.to_string())),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
	pub api_base: String,
	pub data_source: DataSource,
	pub poll_interval: Duration,
	pub max_poll_attempts: Option<u32>,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base: DEFAULT_API_BASE.to_string(),
			data_source: DataSource::Live,
			poll_interval: DEFAULT_POLL_INTERVAL,
			max_poll_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
		}
	}
}

impl AppConfig {
	/// Read the build environment. An unknown data source falls back to live.
	pub fn from_env() -> Self {
		let api_base = option_env!("CONCEPT_GRAPH_API_BASE");
		Self::from_values(api_base, option_env!("CONCEPT_GRAPH_DATA_SOURCE")).unwrap_or_else(|e| {
			warn!("{e}, using live data");
			Self::from_values(api_base, None).unwrap_or_default()
		})
	}

	pub fn from_values(
		api_base: Option<&str>,
		data_source: Option<&str>,
	) -> Result<Self, ConfigError> {
		let api_base = api_base
			.map(|base| base.trim().trim_end_matches('/'))
			.filter(|base| !base.is_empty())
			.unwrap_or(DEFAULT_API_BASE)
			.to_string();
		let data_source = data_source
			.map(str::parse::<DataSource>)
			.transpose()?
			.unwrap_or_default();
		Ok(Self {
			api_base,
			data_source,
			..Self::default()
		})
	}

	pub fn sync(&self) -> SyncConfig {
		SyncConfig {
			poll_interval: self.poll_interval,
			max_poll_attempts: self.max_poll_attempts,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_point_at_a_local_server() {
		let config = AppConfig::from_values(None, None).unwrap();
		assert_eq!(config, AppConfig::default());
		assert_eq!(config.sync().poll_interval, Duration::from_millis(2000));
		assert_eq!(config.sync().max_poll_attempts, Some(900));
	}

	#[test]
	fn api_base_is_trimmed() {
		let config = AppConfig::from_values(Some(" https://pipeline.example.org/ "), None).unwrap();
		assert_eq!(config.api_base, "https://pipeline.example.org");
		let config = AppConfig::from_values(Some("   "), None).unwrap();
		assert_eq!(config.api_base, DEFAULT_API_BASE);
	}

	#[test]
	fn data_source_parses_case_insensitively() {
		assert_eq!("Fixture".parse::<DataSource>(), Ok(DataSource::Fixture));
		assert_eq!(" live ".parse::<DataSource>(), Ok(DataSource::Live));
		assert_eq!(
			AppConfig::from_values(None, Some("mock")),
			Err(ConfigError::UnknownDataSource("mock".into()))
		);
	}
}
