use thiserror::Error;

/// Errors raised by the chain model.
///
/// None of these are process-fatal: each one describes a condition local to
/// a single model, and the caller decides whether to retry, restart
/// generation or give up.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Generation or statistics were requested on a chain with no keys.
	#[error("the chain has no keys")]
	EmptyModel,

	/// The walk reached a state with no recorded transitions.
	#[error("dead end: no transitions recorded from state {0:?}")]
	DeadEnd(String),

	/// A custom start text does not resolve to a key of the chain.
	#[error("unknown state: {0:?}")]
	UnknownState(String),

	#[error("state size must be >= 1")]
	InvalidSize,

	#[error("overlap must be between 1 and {size}, got {overlap}")]
	InvalidOverlap { overlap: usize, size: usize },

	#[error("word budget must be >= 1")]
	InvalidWordBudget,

	#[error("invalid token pattern: {0}")]
	InvalidPattern(#[from] regex::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl ChainError {
	/// Returns `true` when generation can simply be restarted from a new start state.
	pub fn is_dead_end(&self) -> bool {
		matches!(self, ChainError::DeadEnd(_))
	}
}

pub type Result<T> = std::result::Result<T, ChainError>;
