use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{get, middleware, put, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use log::{info, warn};
use serde::Deserialize;

use markov_gen_core::ChainError;
use markov_gen_core::io::{get_filename, list_files, normalize_folder, read_corpus};
use markov_gen_core::model::chain::MarkovChain;
use markov_gen_core::model::generation_input::StartSeed;
use markov_gen_core::model::transitions::Sampling;

/// Largest text accepted by `/v1/integrate`.
const MAX_BODY: usize = 16 * 1024 * 1024;

/// HTTP front end of a single Markov chain.
#[derive(Parser)]
#[command(name = "markov-gen-server")]
struct Cli {
	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	#[arg(long, default_value_t = 5000)]
	port: u16,

	/// Directory holding the `.txt` corpora
	#[arg(long, default_value = "./data")]
	data: String,

	/// Number of tokens per state
	#[arg(long, default_value_t = 2)]
	size: usize,

	/// Seed for reproducible generations
	#[arg(long)]
	seed: Option<u64>,

	/// Enable verbose debug output
	#[arg(long)]
	verbose: bool,
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	words: Option<usize>,
	overlap: Option<usize>,
	nb_try: Option<usize>,
	sampling: Option<String>,
	seed: Option<String> // sentence, random or custom(str)
}

#[derive(Deserialize)]
struct StatsQuery {
	n: Option<usize>
}

#[derive(Deserialize)]
struct TrimQuery {
	threshold: Option<usize>
}

#[derive(Deserialize)]
struct CorporaQuery {
	names: Option<String>
}

struct SharedData {
	model: MarkovChain,
	data_dir: PathBuf,
	seed: Option<u64>,
	loaded: Vec<String>
}

impl SharedData {
	fn new(data_dir: PathBuf, size: usize, seed: Option<u64>) -> Result<Self, ChainError> {
		Ok(Self { model: Self::empty_model(size, seed)?, data_dir, seed, loaded: Vec::new() })
	}

	fn empty_model(size: usize, seed: Option<u64>) -> Result<MarkovChain, ChainError> {
		match seed {
			Some(seed) => MarkovChain::with_seed(size, seed),
			None => MarkovChain::new(size),
		}
	}
}

impl GenerateParams {
	/// Determines the starting seed strategy for sequence generation.
	fn start_seed(&self) -> Result<StartSeed, String> {
		match &self.seed {
			None => Ok(StartSeed::Sentence),
			Some(s) if s.to_lowercase() == "sentence" => Ok(StartSeed::Sentence),
			Some(s) if s.to_lowercase() == "random" => Ok(StartSeed::Random),
			Some(s) if s.to_lowercase().starts_with("custom:") => {
				let value = &s["custom:".len()..];
				if value.trim().is_empty() {
					Err("Custom seed cannot be empty".into())
				} else {
					Ok(StartSeed::Custom(value.to_owned()))
				}
			}
			Some(_) => Err("Seed must be 'sentence', 'random' or start with 'custom:'".into()),
		}
	}

	fn sampling(&self) -> Result<Sampling, String> {
		match self.sampling.as_deref().map(str::to_lowercase).as_deref() {
			None | Some("inclusive") => Ok(Sampling::InclusiveDraw),
			Some("proportional") => Ok(Sampling::Proportional),
			Some(_) => Err("Sampling must be 'proportional' or 'inclusive'".into()),
		}
	}
}

/// A corpus name must be a single plain file stem inside the data directory.
fn is_plain_corpus_name(name: &str) -> bool {
	Path::new(name).file_name() == Some(OsStr::new(name))
}

/// Maps a chain error to the matching HTTP status.
fn error_response(e: ChainError) -> HttpResponse {
	match e {
		ChainError::InvalidSize
		| ChainError::InvalidOverlap { .. }
		| ChainError::InvalidWordBudget
		| ChainError::InvalidPattern(_)
		| ChainError::UnknownState(_) => HttpResponse::BadRequest().body(e.to_string()),
		ChainError::EmptyModel | ChainError::DeadEnd(_) => HttpResponse::Conflict().body(e.to_string()),
		ChainError::Io(_) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates text from the shared chain based on query parameters.
/// A dead end restarts the generation, at most `nb_try` times.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let nb_try = query.nb_try.unwrap_or(5);

	let start_seed = match query.start_seed() {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e)
	};
	let sampling = match query.sampling() {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e)
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let mut input = shared_data.model.make_generation_input();
	input.start_seed = start_seed;
	input.sampling = sampling;
	if let Err(e) = input.set_word_budget(query.words.unwrap_or(100)) {
		return error_response(e);
	}
	if let Err(e) = input.set_overlap(query.overlap) {
		return error_response(e);
	}

	let mut attempt = 0;
	loop {
		match shared_data.model.generate_text(&input) {
			Ok(result) => return HttpResponse::Ok().body(result),
			Err(e) if e.is_dead_end() && attempt < nb_try => {
				attempt += 1;
				warn!("{e}, restarting ({attempt}/{nb_try})");
			}
			Err(e) => return error_response(e),
		}
	}
}

/// HTTP GET endpoint `/v1/stats`
///
/// Returns the chain summary as JSON.
#[get("/v1/stats")]
async fn get_stats(data: web::Data<Mutex<SharedData>>, query: web::Query<StatsQuery>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match shared_data.model.stats(query.n.unwrap_or(4)) {
		Ok(stats) => HttpResponse::Ok().json(stats),
		Err(e) => error_response(e),
	}
}

/// HTTP PUT endpoint `/v1/integrate`
///
/// Adds the request body (plain text) to the shared chain.
#[put("/v1/integrate")]
async fn put_integrate(data: web::Data<Mutex<SharedData>>, body: String) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let recorded = shared_data.model.integrate(&body);
	HttpResponse::Ok().body(recorded.to_string())
}

/// HTTP PUT endpoint `/v1/trim`
///
/// Prunes the shared chain and returns the number of keys removed.
#[put("/v1/trim")]
async fn put_trim(data: web::Data<Mutex<SharedData>>, query: web::Query<TrimQuery>) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let removed = shared_data.model.trim(query.threshold.unwrap_or(1));
	HttpResponse::Ok().body(removed.to_string())
}

#[get("/v1/corpora")]
async fn get_corpora(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let data_dir = match data.lock() {
		Ok(m) => m.data_dir.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let files = match list_files(&data_dir, "txt") {
		Ok(files) => files,
		Err(_) => return HttpResponse::InternalServerError().body("Failed to list corpora")
	};
	let names: Vec<String> = files.iter().filter_map(|f| get_filename(f).ok()).collect();
	HttpResponse::Ok().body(names.join("\n"))
}

#[get("/v1/loaded_corpora")]
async fn get_loaded_corpora(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	HttpResponse::Ok().body(shared_data.loaded.join("\n"))
}

/// HTTP PUT endpoint `/v1/load_corpora`
///
/// Rebuilds the chain from `<data>/<name>.txt` for each comma-separated name.
#[put("/v1/load_corpora")]
async fn put_corpora(data: web::Data<Mutex<SharedData>>, query: web::Query<CorporaQuery>) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};

	let corpus_names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	if let Some(name) = corpus_names.iter().find(|name| !is_plain_corpus_name(name)) {
		return HttpResponse::BadRequest().body(format!("Invalid corpus name: {name}"));
	}

	let mut model = match SharedData::empty_model(shared_data.model.size(), shared_data.seed) {
		Ok(m) => m,
		Err(e) => return error_response(e),
	};
	for name in &corpus_names {
		let corpus_path = shared_data.data_dir.join(format!("{}.txt", name));
		let text = match read_corpus(&corpus_path) {
			Ok(text) => text,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return HttpResponse::NotFound().body(format!("Corpus not found: {name}"))
			}
			Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load corpus: {e}"))
		};
		let recorded = model.integrate(&text);
		info!("corpus {} integrated ({} transitions)", name, recorded);
	}

	shared_data.model = model;
	shared_data.loaded = corpus_names.iter().map(|s| s.to_string()).collect();
	HttpResponse::Ok().body("Corpora loaded successfully")
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.app_data(web::PayloadConfig::new(MAX_BODY))
		.service(get_generated)
		.service(get_stats)
		.service(put_integrate)
		.service(put_trim)
		.service(get_corpora)
		.service(get_loaded_corpora)
		.service(put_corpora);
}

/// Main entry point for the server.
///
/// Creates an empty chain, wraps it in a `Mutex` (a chain supports a single
/// writer at a time) and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	let default = if cli.verbose { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();

	let shared_data = SharedData::new(normalize_folder(&cli.data), cli.size, cli.seed)?;
	let shared_model = web::Data::new(Mutex::new(shared_data));

	info!("listening on {}:{}", cli.host, cli.port);
	HttpServer::new(move || {
		App::new()
			.wrap(middleware::Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_model.clone())
			.configure(routes)
	})
		.bind((cli.host.as_str(), cli.port))?
		.run()
		.await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::http::StatusCode;
	use actix_web::test;
	use tempfile::TempDir;

	const CORPUS: &str = "The cat sat on the mat. The dog sat on the log. The cat ran to the dog.";

	fn shared(data_dir: PathBuf) -> web::Data<Mutex<SharedData>> {
		web::Data::new(Mutex::new(SharedData::new(data_dir, 1, Some(42)).unwrap()))
	}

	macro_rules! app {
		($data:expr) => {
			test::init_service(App::new().app_data($data.clone()).configure(routes)).await
		};
	}

	#[actix_web::test]
	async fn generate_on_empty_model_conflicts() {
		let data = shared(PathBuf::from("."));
		let app = app!(data);
		let req = test::TestRequest::get().uri("/v1/generate").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::CONFLICT);
	}

	#[actix_web::test]
	async fn integrate_then_generate_and_stats() {
		let data = shared(PathBuf::from("."));
		let app = app!(data);

		let req = test::TestRequest::put().uri("/v1/integrate").set_payload(CORPUS).to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "17");

		let req = test::TestRequest::get().uri("/v1/generate?words=10&overlap=1").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/stats?n=1").to_request();
		let stats: serde_json::Value = test::call_and_read_body_json(&app, req).await;
		assert!(stats["keys"].as_u64().unwrap() > 0);
		assert_eq!(stats["threshold"], 1);
	}

	#[actix_web::test]
	async fn bad_parameters_are_rejected() {
		let data = shared(PathBuf::from("."));
		let app = app!(data);
		let req = test::TestRequest::put().uri("/v1/integrate").set_payload(CORPUS).to_request();
		test::call_service(&app, req).await;

		for uri in [
			"/v1/generate?overlap=2",
			"/v1/generate?words=0",
			"/v1/generate?seed=bogus",
			"/v1/generate?sampling=bogus",
			"/v1/generate?seed=custom:unicorns",
		] {
			let req = test::TestRequest::get().uri(uri).to_request();
			let resp = test::call_service(&app, req).await;
			assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
		}
	}

	#[actix_web::test]
	async fn dead_end_after_retries_conflicts() {
		let data = shared(PathBuf::from("."));
		let app = app!(data);
		let req = test::TestRequest::put().uri("/v1/integrate").set_payload("Alpha beta gamma.").to_request();
		test::call_service(&app, req).await;

		let req = test::TestRequest::get().uri("/v1/generate?words=10&nb_try=2").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::CONFLICT);
	}

	#[actix_web::test]
	async fn trim_returns_removed_keys() {
		let data = shared(PathBuf::from("."));
		let app = app!(data);
		let req = test::TestRequest::put().uri("/v1/integrate").set_payload("one two three four").to_request();
		test::call_service(&app, req).await;

		let req = test::TestRequest::put().uri("/v1/trim?threshold=0").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "3");
	}

	#[actix_web::test]
	async fn load_corpora_from_data_dir() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join("animals.txt"), CORPUS).unwrap();
		let data = shared(dir.path().to_path_buf());
		let app = app!(data);

		let req = test::TestRequest::get().uri("/v1/corpora").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, "animals");

		let req = test::TestRequest::put().uri("/v1/load_corpora?names=unknown").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		let req = test::TestRequest::put().uri("/v1/load_corpora?names=animals").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/loaded_corpora").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, "animals");

		let req = test::TestRequest::get().uri("/v1/generate?words=5&overlap=1").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
	}

	#[actix_web::test]
	async fn load_corpora_stays_inside_data_dir() {
		let root = TempDir::new().unwrap();
		let data_dir = root.path().join("data");
		std::fs::create_dir(&data_dir).unwrap();
		std::fs::write(root.path().join("secret.txt"), CORPUS).unwrap();
		let data = shared(data_dir);
		let app = app!(data);

		for names in ["../secret", "sub/secret", "..", "animals,../secret"] {
			let req = test::TestRequest::put()
				.uri(&format!("/v1/load_corpora?names={names}"))
				.to_request();
			assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST, "{names}");
		}
		assert!(data.lock().unwrap().model.is_empty());
		assert!(data.lock().unwrap().loaded.is_empty());
	}

	#[actix_web::test]
	async fn plain_corpus_names() {
		assert!(is_plain_corpus_name("animals"));
		assert!(is_plain_corpus_name("war-and-peace"));
		assert!(!is_plain_corpus_name("../secret"));
		assert!(!is_plain_corpus_name("a/b"));
		assert!(!is_plain_corpus_name("/etc/passwd"));
		assert!(!is_plain_corpus_name(".."));
		assert!(!is_plain_corpus_name("."));
	}
}
