//! Aggregated configuration.
//!
//! One TOML document configures every layer:
//!
//! ```toml
//! [runtime]
//! max_reruns_per_flush = 50
//!
//! [hydration]
//! repair_text = false
//! ```
//!
//! Missing tables and keys fall back to their defaults.

use std::path::{Path, PathBuf};

use rivulet_reactive::{RuntimeConfig, configure};
use serde::{Deserialize, Serialize};

#[cfg(feature = "pages")]
use rivulet_pages::HydrationOptions;

/// Errors raised while loading a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid configuration: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Configuration of the runtime and the hydration walker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Reactive runtime tunables.
	pub runtime: RuntimeConfig,

	/// Options passed to [`hydrate_with`](rivulet_pages::hydrate_with).
	#[cfg(feature = "pages")]
	pub hydration: HydrationOptions,
}

impl Config {
	/// Parses configuration from a TOML string.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(content)?)
	}

	/// Loads configuration from a TOML file.
	///
	/// # Errors
	///
	/// Returns error if the file cannot be read or parsed.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&content)
	}

	/// Installs the runtime part on the current thread.
	///
	/// Hydration options are per pass; hand [`Config::hydration`] to
	/// `hydrate_with`.
	pub fn apply(&self) {
		configure(self.runtime.clone());
		tracing::debug!(
			max_reruns_per_flush = self.runtime.max_reruns_per_flush,
			"runtime configuration applied"
		);
	}
}
