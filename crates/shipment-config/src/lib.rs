// shipment-config/src/lib.rs

use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
	vars: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "SHIPMENT_".to_string(),
			vars: None,
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Resolve variables from the given map instead of the process environment.
	pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
		self.vars = Some(vars);
		self
	}

	/// Load the file (if any), apply environment overrides and validate.
	pub fn load(&self) -> Result<Config, ConfigError> {
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path)?,
			None => {
				debug!("No configuration file given, using defaults");
				Config::default()
			}
		};

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	/// Parse a TOML document after `${VAR}` substitution.
	pub fn parse_toml(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted = self.substitute_env_vars(content)?;
		toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn load_from_file(&self, path: &Path) -> Result<Config, ConfigError> {
		if !path.exists() {
			return Err(ConfigError::FileNotFound(path.display().to_string()));
		}
		info!("Loading configuration from {:?}", path);

		let content = std::fs::read_to_string(path)?;
		self.parse_toml(&content)
	}

	fn var(&self, name: &str) -> Option<String> {
		match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => env::var(name).ok(),
		}
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let value = self
				.var(var_name)
				.ok_or_else(|| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Some(email) = self.var("SHIPROCKET_EMAIL") {
			debug!("Overriding Shiprocket email from environment");
			config.shiprocket.email = Some(email);
		}

		if let Some(password) = self.var("SHIPROCKET_PASSWORD") {
			debug!("Overriding Shiprocket password from environment");
			config.shiprocket.password = Some(password);
		}

		if let Some(base_url) = self.var("SHIPROCKET_API_URL") {
			config.shiprocket.base_url = base_url;
		}

		if let Some(secret) = self.var("SHIPROCKET_WEBHOOK_SECRET") {
			debug!("Overriding webhook secret from environment");
			config.shiprocket.webhook_secret = Some(secret);
		}

		if let Some(log_level) = self.var(&format!("{}LOG_LEVEL", self.env_prefix)) {
			config.service.log_level = log_level;
		}

		if let Some(port) = self.var(&format!("{}PORT", self.env_prefix)) {
			config.service.port = port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid port: {}", e)))?;
		}

		Ok(())
	}
}

/// Check cross-field constraints that serde cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let shiprocket = &config.shiprocket;

	if !(shiprocket.base_url.starts_with("http://") || shiprocket.base_url.starts_with("https://"))
	{
		return Err(ConfigError::ValidationError(format!(
			"Shiprocket base URL must be http(s): {}",
			shiprocket.base_url
		)));
	}

	if shiprocket.request_timeout_secs == 0 {
		return Err(ConfigError::ValidationError(
			"request_timeout_secs must be positive".to_string(),
		));
	}

	if shiprocket.max_retries == 0 || shiprocket.courier_fetch_retries == 0 {
		return Err(ConfigError::ValidationError(
			"Retry budgets must allow at least one attempt".to_string(),
		));
	}

	if shiprocket.awb_poll_attempts == 0 {
		return Err(ConfigError::ValidationError(
			"awb_poll_attempts must be at least 1".to_string(),
		));
	}

	if shiprocket.token_ttl_days <= 0 {
		return Err(ConfigError::ValidationError(
			"token_ttl_days must be positive".to_string(),
		));
	}

	Ok(())
}
