//! N-gram Markov chain text generation library.
//!
//! This crate provides a word-level Markov chain system including:
//! - Text normalization and tokenization into word tokens
//! - Grouping of tokens into fixed-size states
//! - A weighted chain store with pruning (`trim`)
//! - Stochastic generation with optional overlap bridging
//! - Internal utilities for corpus I/O and path handling

/// Chain model, tokenizer and generation logic.
pub mod model;

/// Error type shared by the whole crate.
pub mod error;

/// I/O utilities (corpus loading, path helpers).
pub mod io;

pub use error::{ChainError, Result};
