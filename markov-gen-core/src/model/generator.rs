use std::iter::FusedIterator;
use std::sync::LazyLock;

use log::{debug, trace, warn};
use regex::Regex;

use crate::error::Result;

use super::chain::MarkovChain;
use super::generation_input::GenerationInput;
use super::state::State;
use super::transitions::Sampling;

/// Shortest prefix ending with sentence-final punctuation.
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.*?[!?.]").unwrap());

/// Lazy random walk over a `MarkovChain`.
///
/// Yields one rendered chunk (one state) per item:
/// - the start state first
/// - then one weighted step per item, optionally preceded by an overlap
///   bridge (jump to a random key sharing the current state's last
///   `overlap` tokens, or to any random key if none does)
///
/// Once more than `word_budget` tokens have been emitted, the current chunk
/// is cut after its first `!`, `?` or `.` and the walk stops. A final chunk
/// without such punctuation is emitted whole.
///
/// A step from a state with no recorded transitions yields
/// `Err(ChainError::DeadEnd)`; nothing is yielded after an error.
#[derive(Debug)]
pub struct Generator<'a> {
	chain: &'a mut MarkovChain,
	current: State,
	word_budget: usize,
	overlap: Option<usize>,
	sampling: Sampling,
	/// Tokens emitted so far.
	emitted: usize,
	started: bool,
	finished: bool,
}

impl<'a> Generator<'a> {
	pub(crate) fn new(chain: &'a mut MarkovChain, start: State, input: &GenerationInput) -> Self {
		debug!("generation starts at {:?}", start.to_string());
		Self {
			chain,
			current: start,
			word_budget: input.word_budget(),
			overlap: input.overlap(),
			sampling: input.sampling,
			emitted: 0,
			started: false,
			finished: false,
		}
	}

	/// Number of tokens emitted so far.
	pub fn emitted(&self) -> usize {
		self.emitted
	}

	fn step(&mut self) -> Result<String> {
		let mut current = self.current.clone();

		if let Some(overlap) = self.overlap {
			current = match self.chain.overlapping_state(&current, overlap) {
				Some(bridge) => bridge,
				None => {
					trace!("no key shares the tail of {:?}, jumping to a random key", current.to_string());
					self.chain.random_state()?
				}
			};
		}

		let next = self.chain.next_state(&current, self.sampling)?;
		trace!("{:?} -> {:?}", current.to_string(), next.to_string());

		let out = next.render();
		self.emitted += next.len();
		self.current = next;

		if self.emitted > self.word_budget {
			self.finished = true;
			return Ok(match SENTENCE_END.find(&out) {
				Some(end) => end.as_str().to_owned(),
				None => {
					warn!("word budget reached without a sentence end, stopping untruncated");
					out
				}
			});
		}

		Ok(out)
	}
}

impl Iterator for Generator<'_> {
	type Item = Result<String>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.finished {
			return None;
		}

		if !self.started {
			self.started = true;
			self.emitted = self.current.len();
			return Some(Ok(self.current.render()));
		}

		let chunk = self.step();
		if chunk.is_err() {
			self.finished = true;
		}
		Some(chunk)
	}
}

impl FusedIterator for Generator<'_> {}
