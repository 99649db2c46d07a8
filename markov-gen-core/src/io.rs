use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Reads a corpus file and returns its whole content.
///
/// Line breaks are kept: paragraph boundaries (`\n\n`) are meaningful
/// to the tokenizer.
pub fn read_corpus<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/alice.txt"` → `"alice"`
/// - `"alice.txt"` → `"alice"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn read_corpus_keeps_paragraph_breaks() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "First line.\n\nSecond paragraph.").unwrap();

		let text = read_corpus(&path).unwrap();
		assert!(text.contains("\n\n"));
	}

	#[test]
	fn read_corpus_missing_file_is_an_error() {
		let dir = TempDir::new().unwrap();
		assert!(read_corpus(dir.path().join("nope.txt")).is_err());
	}

	#[test]
	fn list_files_filters_by_extension() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("b.txt"), "b").unwrap();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		fs::write(dir.path().join("notes.md"), "x").unwrap();
		fs::create_dir(dir.path().join("sub.txt")).unwrap();

		let files = list_files(dir.path(), "txt").unwrap();
		assert_eq!(files, vec!["a.txt", "b.txt"]);
	}

	#[test]
	fn get_filename_strips_extension() {
		assert_eq!(get_filename("./data/alice.txt").unwrap(), "alice");
		assert_eq!(get_filename("alice.txt").unwrap(), "alice");
	}

	#[test]
	fn normalize_folder_resolves_current_dir() {
		assert_eq!(normalize_folder("data"), PathBuf::from("data"));
		assert!(normalize_folder(".").is_absolute());
	}
}
