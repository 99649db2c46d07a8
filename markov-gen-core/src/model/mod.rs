//! Top-level module for the Markov chain generation system.
//!
//! This module provides a word-level n-gram Markov chain, including:
//! - Text normalization and tokenization (`Tokenizer`)
//! - Fixed-size token tuples used as chain nodes (`State`, `Groups`)
//! - Weighted successor storage (`Transitions`)
//! - The chain store itself (`MarkovChain`)
//! - Generation configuration (`GenerationInput`)
//! - A lazy generation walk (`Generator`)

/// Text normalization and word tokenization.
pub mod tokenizer;

/// Fixed-size token tuples and the grouping of a token stream into them.
pub mod state;

/// Weighted outgoing edges of a single state.
///
/// Tracks successor occurrences and supports weighted random sampling.
pub mod transitions;

/// The chain store: training, pruning and reporting.
pub mod chain;

/// Generation parameters (word budget, overlap, start strategy, sampling).
pub mod generation_input;

/// Lazy, bounded random walk over a chain.
pub mod generator;

/// Read-only summary of a chain, used for reporting.
pub mod stats;
