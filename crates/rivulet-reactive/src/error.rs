//! Error taxonomy shared by every rivulet crate.
//!
//! Structural and contract violations ([`Error::Hydration`],
//! [`Error::InvalidationCycle`], [`Error::DoubleInvoke`]) always propagate to
//! the caller. Writes racing a block teardown are not errors at all: they are
//! dropped inside [`Tracked::set`](crate::Tracked::set).

use crate::runtime::Block;

/// Result alias used across the runtime.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors surfaced by the reactive runtime.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// Server markup and client render calls disagree.
	#[error("hydration mismatch: {0}")]
	Hydration(#[from] HydrationError),

	/// A block kept invalidating itself (directly or through other blocks)
	/// within a single flush.
	#[error("invalidation cycle: {block} re-ran more than {reruns} times in one flush")]
	InvalidationCycle {
		/// The block that exceeded the limit.
		block: Block,
		/// The configured per-flush limit.
		reruns: usize,
	},

	/// A one-shot operation was invoked a second time.
	#[error("{operation} invoked twice")]
	DoubleInvoke {
		/// Name of the operation.
		operation: &'static str,
	},
}

/// Ways a hydration walk can diverge from the server output.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrationError {
	#[error("no hydration pass is active")]
	NotHydrating,

	#[error("expected {expected}, but the server output has no node here")]
	MissingNode { expected: String },

	#[error("expected {expected}, found {found}")]
	UnexpectedNode { expected: String, found: String },

	#[error("block start marker has no matching end marker")]
	UnbalancedMarkers,

	#[error("block end marker found before its start marker")]
	UnexpectedEndMarker,

	#[error("server output has an unconsumed node: {found}")]
	UnconsumedNodes { found: String },
}

impl Error {
	/// Returns `true` for hydration mismatches, which callers typically answer
	/// with a full client-side remount.
	pub fn is_hydration_mismatch(&self) -> bool {
		matches!(self, Self::Hydration(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_hydration_error_converts() {
		let err: Error = HydrationError::UnbalancedMarkers.into();
		assert!(err.is_hydration_mismatch());
		assert_eq!(
			err.to_string(),
			"hydration mismatch: block start marker has no matching end marker"
		);
	}

	#[rstest]
	fn test_double_invoke_display() {
		let err = Error::DoubleInvoke {
			operation: "set_branch",
		};
		assert!(!err.is_hydration_mismatch());
		assert_eq!(err.to_string(), "set_branch invoked twice");
	}

	#[rstest]
	fn test_unexpected_node_display() {
		let err = HydrationError::UnexpectedNode {
			expected: "<div>".to_string(),
			found: "<span>".to_string(),
		};
		assert_eq!(err.to_string(), "expected <div>, found <span>");
	}
}
