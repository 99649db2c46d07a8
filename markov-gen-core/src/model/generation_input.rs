use crate::error::{ChainError, Result};

use super::transitions::Sampling;

/// Strategy used to select the first state of a generation.
///
/// # Variants
/// - `Sentence`: a random key whose first token starts with an upper-case
///   letter; falls back to any random key when none qualifies.
/// - `Random`: any random key.
/// - `Custom(String)`: the first state of the given text (normalized and
///   tokenized like a corpus). It must be a key of the chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StartSeed {
	#[default]
	Sentence,
	Random,
	Custom(String),
}

/// Input parameters for one generation.
///
/// # Responsibilities
/// - Track the approximate number of tokens to emit (`word_budget`)
/// - Track the optional overlap length used to bridge between states
/// - Select the start strategy and the sampling mode
///
/// # Invariants
/// - `word_budget >= 1`
/// - `overlap`, when set, is in `1..=size` where `size` is the state size of
///   the chain this input was made for
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationInput {
	/// Optional starting strategy for generation.
	pub start_seed: StartSeed,

	/// Random draw used by weighted selection.
	pub sampling: Sampling,

	/// Approximate minimum number of tokens to emit.
	word_budget: usize,

	/// Number of trailing tokens used for overlap bridging.
	overlap: Option<usize>,

	/// State size of the chain.
	size: usize,
}

impl GenerationInput {
	/// Default number of tokens emitted by a generation.
	pub const DEFAULT_WORD_BUDGET: usize = 100;

	/// Creates an input with default values for a chain of state size `size`.
	///
	/// # Visibility
	/// - `pub(crate)`: build it with `MarkovChain::make_generation_input`.
	pub(crate) fn new(size: usize) -> Self {
		Self {
			start_seed: StartSeed::default(),
			sampling: Sampling::default(),
			word_budget: Self::DEFAULT_WORD_BUDGET,
			overlap: None,
			size,
		}
	}

	pub fn word_budget(&self) -> usize {
		self.word_budget
	}

	pub fn overlap(&self) -> Option<usize> {
		self.overlap
	}

	/// State size of the chain this input was made for.
	pub fn size(&self) -> usize {
		self.size
	}

	/// Sets the approximate number of tokens to emit.
	///
	/// # Errors
	/// Returns `ChainError::InvalidWordBudget` if `word_budget` is 0.
	pub fn set_word_budget(&mut self, word_budget: usize) -> Result<()> {
		if word_budget == 0 {
			return Err(ChainError::InvalidWordBudget);
		}
		self.word_budget = word_budget;
		Ok(())
	}

	/// Enables (`Some(n)`) or disables (`None`) overlap bridging.
	///
	/// # Errors
	/// Returns `ChainError::InvalidOverlap` if `n` is not in `1..=size`.
	pub fn set_overlap(&mut self, overlap: Option<usize>) -> Result<()> {
		if let Some(n) = overlap {
			check_overlap(n, self.size)?;
		}
		self.overlap = overlap;
		Ok(())
	}
}

pub(crate) fn check_overlap(overlap: usize, size: usize) -> Result<()> {
	if overlap == 0 || overlap > size {
		return Err(ChainError::InvalidOverlap { overlap, size });
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let input = GenerationInput::new(2);
		assert_eq!(input.word_budget(), GenerationInput::DEFAULT_WORD_BUDGET);
		assert_eq!(input.overlap(), None);
		assert_eq!(input.start_seed, StartSeed::Sentence);
		assert_eq!(input.sampling, Sampling::InclusiveDraw);
	}

	#[test]
	fn test_word_budget_must_be_positive() {
		let mut input = GenerationInput::new(2);
		assert!(matches!(input.set_word_budget(0), Err(ChainError::InvalidWordBudget)));
		input.set_word_budget(5).unwrap();
		assert_eq!(input.word_budget(), 5);
	}

	#[test]
	fn test_overlap_bounds() {
		let mut input = GenerationInput::new(3);
		assert!(matches!(
			input.set_overlap(Some(0)),
			Err(ChainError::InvalidOverlap { overlap: 0, size: 3 })
		));
		assert!(input.set_overlap(Some(4)).is_err());
		input.set_overlap(Some(3)).unwrap();
		assert_eq!(input.overlap(), Some(3));
		input.set_overlap(None).unwrap();
		assert_eq!(input.overlap(), None);
	}
}
