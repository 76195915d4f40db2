use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coursemate::config::RetrievalBackend;
use coursemate::embeddings::OpenAIEmbedder;
use coursemate::ingest::load_directory;
use coursemate::llm::ChatCompletionClient;
use coursemate::parse::ChoiceLetter;
use coursemate::search::{ChunkingParams, EmbeddingSearch, KeywordSearch, SearchService};
use coursemate::server::{AccessPolicy, HttpServer};
use coursemate::session::{AssistantSettings, QuizOrigin};
use coursemate::{Config, Session, StudyAssistant};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "coursemate")]
#[command(about = "Study assistant over your course material", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// Answer one question from the material in a directory
    Ask {
        /// Directory holding PDFs, images or text files
        dir: PathBuf,
        question: String,
    },

    /// Summarize the material in a directory, file by file
    Summarize {
        dir: PathBuf,
        /// Optional focus for retrieval
        topic: Option<String>,
    },

    /// Interactive multiple-choice quiz over a directory
    Quiz { dir: PathBuf },
}

/// Build the assistant with the retrieval backend selected in config.toml
async fn build_assistant(config: &Config) -> Result<StudyAssistant> {
    let llm = ChatCompletionClient::from_config(&config.llm, config.llm_api_key()?)?;
    log::info!("LLM model: {}", llm.model());

    if config.llm.validate_on_start {
        llm.validate_credentials()
            .await
            .context("LLM credential check failed. Check the API key and base_url in config.toml.")?;
        log::info!("LLM credentials validated");
    }

    let chunking = ChunkingParams {
        chunk_size: config.retrieval.chunk_size_chars,
        overlap: config.retrieval.chunk_overlap_chars,
    };

    let search: Arc<dyn SearchService> = match config.retrieval.backend {
        RetrievalBackend::Embeddings => {
            let embedder = OpenAIEmbedder::from_config(&config.embeddings, config.embeddings_api_key()?)?;
            log::info!("Retrieval: embeddings ({})", embedder.model());
            Arc::new(EmbeddingSearch::new(Arc::new(embedder), chunking))
        }
        RetrievalBackend::Keyword => {
            log::info!("Retrieval: keyword (BM25)");
            Arc::new(KeywordSearch::new(chunking))
        }
    };

    Ok(StudyAssistant::new(
        Arc::new(llm),
        search,
        AssistantSettings::from_config(config),
    ))
}

/// Load every supported file under `dir` into a fresh session
async fn load_session(assistant: &StudyAssistant, dir: &Path) -> Result<Session> {
    let files = load_directory(dir)?;
    log::info!("Found {} files in {}", files.len(), dir.display());

    let mut session = Session::new();
    let report = assistant
        .ingest_uploads(&mut session, files)
        .await
        .with_context(|| format!("Failed to load material from {}", dir.display()))?;

    for name in &report.skipped {
        log::warn!("Skipped {} (no extractable text)", name);
    }
    if let Some(error) = &report.index_error {
        log::warn!("Material loaded without index: {}", error);
    }
    log::info!("Loaded {} files", report.loaded.len());
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.coursemate.log_level.as_str())
    ).init();

    log::info!("Starting Coursemate v{}", env!("CARGO_PKG_VERSION"));
    let assistant = build_assistant(&config).await?;

    match cli.command {
        Command::Serve => {
            let access = AccessPolicy::from_config(&config.http_server)?;
            let server = HttpServer::new(Arc::new(assistant), access);
            server.run(config.http_server.port).await?;
        }
        Command::Ask { dir, question } => {
            let session = load_session(&assistant, &dir).await?;
            println!("{}", assistant.run_rag(&session, &question).await);
        }
        Command::Summarize { dir, topic } => {
            let session = load_session(&assistant, &dir).await?;
            let topic = topic.unwrap_or_default();
            println!("{}", assistant.run_summary(&session, &topic).await);
        }
        Command::Quiz { dir } => {
            let mut session = load_session(&assistant, &dir).await?;
            run_quiz_loop(&assistant, &mut session).await?;
        }
    }

    Ok(())
}

/// Ask questions until the learner types `q` or closes stdin
async fn run_quiz_loop(assistant: &StudyAssistant, session: &mut Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let outcome = assistant.next_quiz(session).await;
        println!("\n{}", outcome.item.render());
        if matches!(outcome.origin, QuizOrigin::ServiceFailure | QuizOrigin::NoMaterial) {
            return Ok(());
        }

        let choice = loop {
            println!("\nYour answer (A-D, q to quit):");
            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };
            let line = line.trim();
            if line.eq_ignore_ascii_case("q") {
                return Ok(());
            }
            match ChoiceLetter::parse_answer(line) {
                Some(choice) => break choice,
                None => println!("Please answer with A, B, C or D."),
            }
        };

        if let Some(answer) = session.answer_quiz(choice) {
            println!("{}", answer.feedback);
        }
    }
}
