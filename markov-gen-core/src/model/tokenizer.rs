use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

/// Word standing in for a paragraph break (`\n\n`) in the token stream.
///
/// It takes part in states like any other token and is rendered as an
/// empty string.
pub const PARAGRAPH_SENTINEL: &str = "NEWLINE";

/// Default allow-list: letters, digits and `! ' ? , . - ( ) "`.
pub const DEFAULT_PATTERN: &str = r#"[A-Za-z0-9!'?,.\-()"]+"#;

static DEFAULT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(DEFAULT_PATTERN).unwrap());

/// Splits normalized text into word tokens.
///
/// A token is a maximal run of characters matched by the pattern.
/// Everything else (whitespace, stray symbols) is skipped silently.
#[derive(Clone, Debug)]
pub struct Tokenizer {
	pattern: Regex,
}

impl Default for Tokenizer {
	fn default() -> Self {
		Self { pattern: DEFAULT_REGEX.clone() }
	}
}

impl Tokenizer {
	/// Creates a tokenizer from a custom character-class pattern.
	///
	/// # Errors
	/// Returns `ChainError::InvalidPattern` if the pattern does not compile.
	pub fn new(pattern: &str) -> Result<Self> {
		Ok(Self { pattern: Regex::new(pattern)? })
	}

	/// Returns the pattern source.
	pub fn pattern(&self) -> &str {
		self.pattern.as_str()
	}

	/// Normalizes raw text before tokenization.
	///
	/// - `\r\n` line endings become `\n`
	/// - typographic single quotes become `'`, double quotes become `"`
	/// - every `\n\n` becomes the paragraph sentinel word
	pub fn normalize(text: &str) -> String {
		text.replace("\r\n", "\n")
			.replace(['\u{201C}', '\u{201D}', '\u{201E}', '\u{201F}'], "\"")
			.replace(['\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'], "'")
			.replace("\n\n", &format!(" {PARAGRAPH_SENTINEL} "))
	}

	/// Lazily yields the tokens of `text` in order.
	pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.pattern.find_iter(text).map(|m| m.as_str())
	}
}
