use std::collections::{HashMap, HashSet};
use std::io::Write;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::SeedableRng;

use crate::error::{ChainError, Result};

use super::generation_input::{check_overlap, GenerationInput, StartSeed};
use super::generator::Generator;
use super::state::{groups, State};
use super::stats::ChainStats;
use super::tokenizer::Tokenizer;
use super::transitions::{Sampling, Transitions};

/// Word-level n-gram Markov chain.
///
/// The `MarkovChain` maps every state (a tuple of `size` consecutive tokens)
/// to the states observed right after it, weighted by occurrence count.
///
/// # Responsibilities
/// - Build the chain from one or more texts (`integrate`)
/// - Prune weak and orphaned states (`trim`)
/// - Provide random starting points, overlap bridges and weighted steps
///   to the `Generator`
/// - Report its shape (`stats`, `dump_stats`)
///
/// # Invariants
/// - `size` is always >= 1 and never changes
/// - Every key has at least one successor
/// - `key_index` holds exactly the keys of `chains`
///
/// A chain is not meant to be shared between threads without external
/// locking: generation needs `&mut self` for its random generator and index.
#[derive(Debug)]
pub struct MarkovChain {
	/// Number of tokens per state.
	size: usize,

	/// Mapping from a state to its outgoing edges.
	chains: HashMap<State, Transitions>,

	/// Shuffled list of the keys of `chains`.
	key_index: Vec<State>,

	tokenizer: Tokenizer,

	rng: StdRng,
}

impl MarkovChain {
	/// Creates an empty chain of state size `size`, seeded from the OS.
	///
	/// # Errors
	/// Returns `ChainError::InvalidSize` if `size == 0`.
	pub fn new(size: usize) -> Result<Self> {
		Self::with_rng(size, StdRng::from_os_rng())
	}

	/// Creates an empty chain whose random walk is reproducible.
	///
	/// # Errors
	/// Returns `ChainError::InvalidSize` if `size == 0`.
	pub fn with_seed(size: usize, seed: u64) -> Result<Self> {
		Self::with_rng(size, StdRng::seed_from_u64(seed))
	}

	fn with_rng(size: usize, rng: StdRng) -> Result<Self> {
		if size == 0 {
			return Err(ChainError::InvalidSize);
		}
		Ok(Self {
			size,
			chains: HashMap::new(),
			key_index: Vec::new(),
			tokenizer: Tokenizer::default(),
			rng,
		})
	}

	/// Replaces the tokenizer used by `integrate` and custom start seeds.
	pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
		self.tokenizer = tokenizer;
		self
	}

	pub fn size(&self) -> usize {
		self.size
	}

	/// Number of keys.
	pub fn key_count(&self) -> usize {
		self.chains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chains.is_empty()
	}

	/// Total number of distinct edges.
	pub fn edge_count(&self) -> usize {
		self.chains.values().map(Transitions::out_degree).sum()
	}

	/// Returns `true` if `state` has recorded successors.
	pub fn contains(&self, state: &State) -> bool {
		self.chains.contains_key(state)
	}

	/// Outgoing edges of `state`, if it is a key.
	pub fn transitions(&self, state: &State) -> Option<&Transitions> {
		self.chains.get(state)
	}

	/// The key index, in its current shuffled order.
	pub fn keys(&self) -> &[State] {
		&self.key_index
	}

	/// Adds a text to the chain.
	///
	/// The text is normalized, tokenized and grouped into states; every
	/// pair of adjacent states `(prev, cur)` increments the weight of the
	/// edge `prev -> cur`. Repeated calls accumulate.
	///
	/// Returns the number of transitions recorded.
	pub fn integrate(&mut self, text: &str) -> usize {
		let text = Tokenizer::normalize(text);
		let mut prev: Option<State> = None;
		let mut recorded = 0;

		for group in groups(self.tokenizer.tokens(&text), self.size) {
			if let Some(prev) = prev {
				self.chains.entry(prev).or_default().add_transition(group.clone());
				recorded += 1;
			}
			prev = Some(group);
		}

		self.rebuild_index();
		debug!("integrated {} transitions, chain has {} keys", recorded, self.chains.len());
		recorded
	}

	/// Prunes the chain.
	///
	/// Removes every key whose out-degree is `<= threshold`, then every
	/// successor that is no longer a key. Orphan removal lowers out-degrees,
	/// so both passes repeat until the orphan pass removes nothing.
	///
	/// Afterwards every key has out-degree `> threshold` and every successor
	/// is a key. Returns the number of keys removed.
	pub fn trim(&mut self, threshold: usize) -> usize {
		let before = self.chains.len();
		let mut passes = 0;

		loop {
			passes += 1;
			self.chains.retain(|_, transitions| transitions.out_degree() > threshold);

			let keys: HashSet<State> = self.chains.keys().cloned().collect();
			let orphans: usize = self
				.chains
				.values_mut()
				.map(|transitions| transitions.retain(|next| keys.contains(next)))
				.sum();

			if orphans == 0 {
				break;
			}
		}

		self.rebuild_index();
		let removed = before - self.chains.len();
		debug!("trim({}) removed {} keys in {} passes, {} left", threshold, removed, passes, self.chains.len());
		removed
	}

	/// Computes the chain summary for out-degree threshold `n`.
	///
	/// # Errors
	/// Returns `ChainError::EmptyModel` if the chain has no keys.
	pub fn stats(&self, n: usize) -> Result<ChainStats> {
		if self.chains.is_empty() {
			return Err(ChainError::EmptyModel);
		}

		let keys = self.chains.len();
		let nodes = self.edge_count();
		let nodes_over = self.chains.values().filter(|t| t.out_degree() > n).count();

		Ok(ChainStats {
			keys,
			nodes,
			nodes_per_key: nodes as f64 / keys as f64,
			threshold: n,
			nodes_over,
			nodes_over_ratio: nodes_over as f64 / keys as f64,
		})
	}

	/// Writes the human-readable summary to `out`.
	///
	/// # Errors
	/// Returns `ChainError::EmptyModel` on an empty chain, or an I/O error.
	pub fn dump_stats<W: Write>(&self, n: usize, out: &mut W) -> Result<()> {
		let stats = self.stats(n)?;
		write!(out, "{}", stats)?;
		Ok(())
	}

	/// Creates a `GenerationInput` with default values for this chain.
	pub fn make_generation_input(&self) -> GenerationInput {
		GenerationInput::new(self.size)
	}

	/// Starts a lazy generation.
	///
	/// # Errors
	/// - `ChainError::EmptyModel` if the chain has no keys
	/// - `ChainError::InvalidOverlap` if the input was made for a smaller state size
	/// - `ChainError::UnknownState` if a custom start seed is not a key
	pub fn generate(&mut self, input: &GenerationInput) -> Result<Generator<'_>> {
		if self.chains.is_empty() {
			return Err(ChainError::EmptyModel);
		}
		if let Some(overlap) = input.overlap() {
			check_overlap(overlap, self.size)?;
		}

		let start = self.start_state(&input.start_seed)?;
		Ok(Generator::new(self, start, input))
	}

	/// Runs a whole generation and joins its chunks with single spaces.
	///
	/// # Errors
	/// Same as `generate`, plus `ChainError::DeadEnd` if the walk gets stuck.
	pub fn generate_text(&mut self, input: &GenerationInput) -> Result<String> {
		let chunks = self.generate(input)?.collect::<Result<Vec<_>>>()?;
		Ok(chunks.join(" "))
	}

	fn rebuild_index(&mut self) {
		self.key_index = self.chains.keys().cloned().collect();
		// HashMap order is per-process; sort first so seeded chains shuffle alike.
		self.key_index.sort();
		self.key_index.shuffle(&mut self.rng);
	}

	fn start_state(&mut self, seed: &StartSeed) -> Result<State> {
		match seed {
			StartSeed::Sentence => {
				self.key_index.shuffle(&mut self.rng);
				if let Some(key) = self.key_index.iter().find(|key| key.looks_like_sentence_start()) {
					return Ok(key.clone());
				}
				warn!("no key looks like a sentence start, starting from a random key");
				self.random_state()
			}
			StartSeed::Random => self.random_state(),
			StartSeed::Custom(text) => {
				let text = Tokenizer::normalize(text);
				let state = groups(self.tokenizer.tokens(&text), self.size)
					.next()
					.ok_or_else(|| ChainError::UnknownState(text.clone()))?;
				if !self.chains.contains_key(&state) {
					return Err(ChainError::UnknownState(state.to_string()));
				}
				Ok(state)
			}
		}
	}

	/// Uniformly random key.
	pub(crate) fn random_state(&mut self) -> Result<State> {
		self.key_index.choose(&mut self.rng).cloned().ok_or(ChainError::EmptyModel)
	}

	/// Shuffles the key index and returns the first key sharing the last
	/// `overlap` tokens of `state`.
	pub(crate) fn overlapping_state(&mut self, state: &State, overlap: usize) -> Option<State> {
		self.key_index.shuffle(&mut self.rng);
		let tail = state.tail(overlap);
		self.key_index.iter().find(|key| key.tail(overlap) == tail).cloned()
	}

	/// Weighted step from `state`.
	///
	/// # Errors
	/// Returns `ChainError::DeadEnd` if `state` has no recorded transitions.
	pub(crate) fn next_state(&mut self, state: &State, sampling: Sampling) -> Result<State> {
		self.chains
			.get(state)
			.and_then(|transitions| transitions.select(&mut self.rng, sampling))
			.cloned()
			.ok_or_else(|| ChainError::DeadEnd(state.to_string()))
	}
}
