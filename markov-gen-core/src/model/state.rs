use std::fmt;
use std::sync::Arc;

use super::tokenizer::PARAGRAPH_SENTINEL;

/// A node of the Markov chain: an ordered tuple of `size` consecutive tokens.
///
/// Two states are equal iff all their tokens are equal. Cloning is cheap
/// (the tokens are shared), which matters because every state is stored
/// both as a key and as successor of other keys.
///
/// ## Invariants
/// - A state is never mutated after creation
/// - All states of one chain have the same length
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(Arc<[String]>);

impl State {
	/// Creates a state from its tokens.
	pub fn new<I, S>(tokens: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(tokens.into_iter().map(Into::into).collect())
	}

	pub fn tokens(&self) -> &[String] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns the last `n` tokens (all of them if `n >= len`).
	pub fn tail(&self, n: usize) -> &[String] {
		&self.0[self.0.len().saturating_sub(n)..]
	}

	/// Heuristic for "looks like the beginning of a sentence":
	/// the first token starts with an upper-case letter and is not
	/// the paragraph sentinel.
	pub fn looks_like_sentence_start(&self) -> bool {
		match self.0.first() {
			Some(first) if first != PARAGRAPH_SENTINEL => {
				first.chars().next().is_some_and(char::is_uppercase)
			}
			_ => false,
		}
	}

	/// Renders the state as output text.
	///
	/// Tokens are joined by single spaces, the paragraph sentinel renders
	/// as an empty string and `" ."` collapses to `"."`.
	pub fn render(&self) -> String {
		self.0
			.iter()
			.map(|token| if token == PARAGRAPH_SENTINEL { "" } else { token.as_str() })
			.collect::<Vec<_>>()
			.join(" ")
			.replace(" .", ".")
	}
}

impl From<Vec<String>> for State {
	fn from(tokens: Vec<String>) -> Self {
		Self(tokens.into())
	}
}

/// Raw form: tokens joined by spaces, sentinel included.
impl fmt::Display for State {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.join(" "))
	}
}

/// Lazily partitions a token stream into non-overlapping states of `size` tokens.
///
/// A trailing group holding fewer than `size` tokens is discarded.
#[derive(Debug)]
pub struct Groups<I> {
	tokens: I,
	size: usize,
}

impl<I, S> Iterator for Groups<I>
where
	I: Iterator<Item = S>,
	S: Into<String>,
{
	type Item = State;

	fn next(&mut self) -> Option<State> {
		if self.size == 0 {
			return None;
		}
		let group: Vec<String> = self.tokens.by_ref().take(self.size).map(Into::into).collect();
		(group.len() == self.size).then(|| State::from(group))
	}
}

/// Groups `tokens` into states of `size` tokens each.
pub fn groups<I>(tokens: I, size: usize) -> Groups<I::IntoIter>
where
	I: IntoIterator,
{
	Groups { tokens: tokens.into_iter(), size }
}
