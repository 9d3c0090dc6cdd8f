//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::runtime::with_runtime;

/// Default bound on how often one block may re-run inside a single flush.
pub const DEFAULT_MAX_RERUNS_PER_FLUSH: usize = 100;

/// Tunables for the reactive runtime of the current thread.
///
/// Deserializes from a table such as:
///
/// ```toml
/// max_reruns_per_flush = 50
/// ```
///
/// Missing keys fall back to [`RuntimeConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
	/// How many times a single block may re-run within one flush before the
	/// flush fails with [`Error::InvalidationCycle`](crate::Error::InvalidationCycle).
	pub max_reruns_per_flush: usize,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			max_reruns_per_flush: DEFAULT_MAX_RERUNS_PER_FLUSH,
		}
	}
}

impl RuntimeConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the per-flush re-run limit. A limit of zero is raised to one.
	pub fn max_reruns_per_flush(mut self, limit: usize) -> Self {
		self.max_reruns_per_flush = limit.max(1);
		self
	}
}

/// Installs `config` on the runtime of the current thread.
pub fn configure(config: RuntimeConfig) {
	with_runtime(|rt| rt.set_config(config));
}
