use std::fmt;

use serde::Serialize;

/// Summary of a chain's shape.
///
/// Diagnostic only: the `Display` form is meant for humans, not parsers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainStats {
	/// Number of keys (states with at least one recorded successor).
	pub keys: usize,
	/// Total number of distinct edges.
	pub nodes: usize,
	/// Mean out-degree.
	pub nodes_per_key: f64,
	/// Out-degree threshold used for `nodes_over`.
	pub threshold: usize,
	/// Number of keys whose out-degree is strictly greater than `threshold`.
	pub nodes_over: usize,
	/// `nodes_over / keys`, in `[0, 1]`.
	pub nodes_over_ratio: f64,
}

impl fmt::Display for ChainStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "keys {}", self.keys)?;
		writeln!(f, "nodes per key {}", self.nodes_per_key)?;
		writeln!(
			f,
			"nodes over {} {} ({}%)",
			self.threshold,
			self.nodes_over,
			self.nodes_over_ratio * 100.0
		)
	}
}
