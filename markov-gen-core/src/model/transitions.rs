use std::collections::BTreeMap;

use rand::Rng;

use super::state::State;

/// How the random draw of a weighted selection is taken.
///
/// Both variants walk the same cumulative-weight array and pick the first
/// successor whose cumulative weight is `>= draw`; they only differ in the
/// range of the draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sampling {
	/// Draw in `[1, total]`: each successor is picked with probability `weight / total`.
	Proportional,
	/// Draw in `[0, total]`: the extra value `0` always lands on the first
	/// successor, which is picked with probability `(weight + 1) / (total + 1)`.
	#[default]
	InclusiveDraw,
}

/// Outgoing edges of one state.
///
/// Maps each successor state to the number of times it was observed right
/// after the owning state. Successors are kept ordered so that a seeded
/// random generator always reproduces the same walk.
///
/// ## Invariants
/// - Each weight is strictly positive
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transitions {
	successors: BTreeMap<State, usize>,
}

impl Transitions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one more occurrence of `next` after the owning state.
	pub fn add_transition(&mut self, next: State) {
		*self.successors.entry(next).or_insert(0) += 1;
	}

	/// Number of distinct successors.
	pub fn out_degree(&self) -> usize {
		self.successors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.successors.is_empty()
	}

	/// Sum of all successor weights.
	pub fn total_weight(&self) -> usize {
		self.successors.values().sum()
	}

	/// Weight of the edge toward `next`, `0` if there is none.
	pub fn weight(&self, next: &State) -> usize {
		self.successors.get(next).copied().unwrap_or(0)
	}

	/// Iterates over `(successor, weight)` pairs in their fixed order.
	pub fn iter(&self) -> impl Iterator<Item = (&State, usize)> {
		self.successors.iter().map(|(state, weight)| (state, *weight))
	}

	/// Drops every successor for which `keep` returns `false`.
	///
	/// Returns the number of successors removed.
	pub fn retain<F>(&mut self, mut keep: F) -> usize
	where
		F: FnMut(&State) -> bool,
	{
		let before = self.successors.len();
		self.successors.retain(|state, _| keep(state));
		before - self.successors.len()
	}

	/// Picks a successor with probability proportional to its weight.
	///
	/// Builds the ascending cumulative weights of the successors and binary
	/// searches the first one reaching the draw. The last cumulative weight
	/// equals the total, so every draw resolves to a successor.
	///
	/// Returns `None` if there are no successors.
	pub fn select<R: Rng + ?Sized>(&self, rng: &mut R, sampling: Sampling) -> Option<&State> {
		let mut total = 0;
		let cumulative: Vec<(usize, &State)> = self
			.successors
			.iter()
			.map(|(state, weight)| {
				total += weight;
				(total, state)
			})
			.collect();

		if total == 0 {
			return None;
		}

		let draw = match sampling {
			Sampling::Proportional => rng.random_range(1..=total),
			Sampling::InclusiveDraw => rng.random_range(0..=total),
		};
		let index = cumulative.partition_point(|(sum, _)| *sum < draw);
		cumulative.get(index).map(|(_, state)| *state)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn state(token: &str) -> State {
		State::new([token])
	}

	fn weighted(weights: &[(&str, usize)]) -> Transitions {
		let mut transitions = Transitions::new();
		for (token, weight) in weights {
			for _ in 0..*weight {
				transitions.add_transition(state(token));
			}
		}
		transitions
	}

	fn shares(transitions: &Transitions, sampling: Sampling, trials: usize) -> BTreeMap<State, f64> {
		let mut rng = StdRng::seed_from_u64(42);
		let mut counts: BTreeMap<State, usize> = BTreeMap::new();
		for _ in 0..trials {
			let next = transitions.select(&mut rng, sampling).unwrap().clone();
			*counts.entry(next).or_insert(0) += 1;
		}
		counts.into_iter().map(|(s, c)| (s, c as f64 / trials as f64)).collect()
	}

	#[test]
	fn test_add_transition_accumulates() {
		let transitions = weighted(&[("a", 2), ("b", 1)]);
		assert_eq!(transitions.out_degree(), 2);
		assert_eq!(transitions.total_weight(), 3);
		assert_eq!(transitions.weight(&state("a")), 2);
		assert_eq!(transitions.weight(&state("zzz")), 0);
	}

	#[test]
	fn test_default_sampling_is_inclusive_draw() {
		assert_eq!(Sampling::default(), Sampling::InclusiveDraw);
	}

	#[test]
	fn test_select_empty() {
		let mut rng = StdRng::seed_from_u64(1);
		assert!(Transitions::new().select(&mut rng, Sampling::Proportional).is_none());
	}

	#[test]
	fn test_select_single_successor_is_total() {
		let transitions = weighted(&[("only", 1)]);
		let mut rng = StdRng::seed_from_u64(7);
		for sampling in [Sampling::Proportional, Sampling::InclusiveDraw] {
			for _ in 0..100 {
				assert_eq!(transitions.select(&mut rng, sampling), Some(&state("only")));
			}
		}
	}

	#[test]
	fn test_proportional_shares_match_weights() {
		let transitions = weighted(&[("a", 1), ("b", 3), ("c", 6)]);
		let shares = shares(&transitions, Sampling::Proportional, 50_000);
		assert!((shares[&state("a")] - 0.1).abs() < 0.01);
		assert!((shares[&state("b")] - 0.3).abs() < 0.015);
		assert!((shares[&state("c")] - 0.6).abs() < 0.015);
	}

	#[test]
	fn test_inclusive_draw_favours_first_successor() {
		let transitions = weighted(&[("a", 1), ("b", 3)]);
		let shares = shares(&transitions, Sampling::InclusiveDraw, 50_000);
		// (1 + 1) / (4 + 1)
		assert!((shares[&state("a")] - 0.4).abs() < 0.015);
		assert!((shares[&state("b")] - 0.6).abs() < 0.015);
	}

	#[test]
	fn test_retain() {
		let mut transitions = weighted(&[("a", 1), ("b", 1), ("c", 1)]);
		let removed = transitions.retain(|s| s != &state("b"));
		assert_eq!(removed, 1);
		assert_eq!(transitions.iter().map(|(s, _)| s.to_string()).collect::<Vec<_>>(), vec!["a", "c"]);
	}
}
