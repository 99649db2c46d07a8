use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use markov_gen_core::io::read_corpus;
use markov_gen_core::model::chain::MarkovChain;
use markov_gen_core::model::generation_input::GenerationInput;

/// Builds a Markov chain from a corpus, generates text, trims the chain
/// and generates again.
#[derive(Parser)]
#[command(name = "markov-gen-exemple")]
struct Cli {
	/// Corpus text file
	corpus: PathBuf,

	/// Number of tokens per state
	#[arg(long, default_value_t = 2)]
	size: usize,

	/// Approximate number of tokens to generate
	#[arg(long, default_value_t = 100)]
	words: usize,

	/// Tail length used to bridge between states (1..=size)
	#[arg(long)]
	overlap: Option<usize>,

	/// Remove keys with at most this many distinct successors
	#[arg(long, default_value_t = 1)]
	trim: usize,

	/// Out-degree threshold reported by the stats
	#[arg(long, default_value_t = 1)]
	stats_n: usize,

	/// Seed for a reproducible run
	#[arg(long)]
	seed: Option<u64>,

	/// How many times a generation is restarted after a dead end
	#[arg(long, default_value_t = 5)]
	retries: usize,

	/// Enable verbose debug output
	#[arg(long)]
	verbose: bool,
}

fn init_logger(verbose: bool) {
	let default = if verbose { "debug" } else { "warn" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
		.target(env_logger::Target::Stderr)
		.init();
}

/// Generates text, starting over from a new start state after each dead end.
fn generate(chain: &mut MarkovChain, input: &GenerationInput, retries: usize) -> Result<String> {
	let mut attempt = 0;
	loop {
		match chain.generate_text(input) {
			Err(e) if e.is_dead_end() && attempt < retries => {
				attempt += 1;
				warn!("{e}, restarting ({attempt}/{retries})");
			}
			result => return result.context("generation failed"),
		}
	}
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logger(cli.verbose);

	let mut chain = match cli.seed {
		Some(seed) => MarkovChain::with_seed(cli.size, seed)?,
		None => MarkovChain::new(cli.size)?,
	};

	let text = read_corpus(&cli.corpus)
		.with_context(|| format!("failed to read corpus {}", cli.corpus.display()))?;
	let recorded = chain.integrate(&text);
	info!("{} transitions recorded from {}", recorded, cli.corpus.display());

	let mut input = chain.make_generation_input();
	input.set_word_budget(cli.words)?;
	input.set_overlap(cli.overlap)?;

	let mut stdout = io::stdout().lock();

	writeln!(stdout, "{}", generate(&mut chain, &input, cli.retries)?)?;
	chain.dump_stats(cli.stats_n, &mut stdout)?;

	let removed = chain.trim(cli.trim);
	info!("trim({}) removed {} keys", cli.trim, removed);
	if chain.is_empty() {
		warn!("trim({}) emptied the chain, nothing left to generate from", cli.trim);
		return Ok(());
	}

	chain.dump_stats(cli.stats_n, &mut stdout)?;
	writeln!(stdout, "{}", generate(&mut chain, &input, cli.retries)?)?;

	Ok(())
}
