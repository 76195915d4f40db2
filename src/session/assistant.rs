use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Mode, RequestRejection, Role, Session};
use crate::config::Config;
use crate::error::{CoursemateError, Result};
use crate::ingest::{
    check_upload_size, extract_documents, fingerprint_uploads, ExtractorRegistry, SourceDocument,
    UploadedFile,
};
use crate::llm::{CompletionClient, SamplingParams};
use crate::material::{
    group_from_material, sections_from_groups, split_material_by_files, tag_documents,
    FileGroupedContent, Resolver,
};
use crate::parse::{
    enforce_bullet_format, fallback_summary, parse_quiz_reply, QuizField, QuizItem, QuizParse,
    NO_CONTENT_SUMMARY,
};
use crate::prompts::{build_quiz_prompt, build_rag_prompt, build_summary_prompt};
use crate::search::SearchService;

/// Returned by RAG and Summary when nothing has been loaded
pub const NO_MATERIAL_REPLY: &str = "Please load material first.";

/// Retrieval query used for summaries requested without a topic
pub const DEFAULT_SUMMARY_QUERY: &str = "main topics and key concepts";

/// Tunables for [`StudyAssistant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantSettings {
    pub top_k: usize,
    pub cooldown: Duration,
    pub max_upload_bytes: u64,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            top_k: 15,
            cooldown: Duration::from_secs(2),
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

impl AssistantSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            cooldown: Duration::from_millis(config.session.cooldown_ms),
            max_upload_bytes: config.session.max_upload_bytes as u64,
        }
    }
}

/// Reply to an admitted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Reply {
    Text { content: String },
    Quiz { item: QuizItem },
}

/// Where a quiz item came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", content = "missing", rename_all = "snake_case")]
pub enum QuizOrigin {
    Parsed,
    Defaulted(Vec<QuizField>),
    ServiceFailure,
    NoMaterial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizOutcome {
    pub item: QuizItem,
    pub origin: QuizOrigin,
}

/// Result of ingesting an upload batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Same file set as already loaded; nothing was changed
    pub unchanged: bool,
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
    /// Material is loaded but could not be indexed
    pub index_error: Option<String>,
}

/// Answer pipeline outcome before it is flattened into reply text
enum Answer {
    Complete(String),
    Failed(String),
}

impl Answer {
    fn into_text(self) -> String {
        match self {
            Self::Complete(text) | Self::Failed(text) => text,
        }
    }
}

/// Routes ask / summarize / quiz through prompt builder, completion service and reply parser
pub struct StudyAssistant {
    llm: Arc<dyn CompletionClient>,
    search: Arc<dyn SearchService>,
    extractors: Arc<ExtractorRegistry>,
    settings: AssistantSettings,
}

impl StudyAssistant {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        search: Arc<dyn SearchService>,
        settings: AssistantSettings,
    ) -> Self {
        Self::with_extractors(llm, search, Arc::new(ExtractorRegistry::new()), settings)
    }

    pub fn with_extractors(
        llm: Arc<dyn CompletionClient>,
        search: Arc<dyn SearchService>,
        extractors: Arc<ExtractorRegistry>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            llm,
            search,
            extractors,
            settings,
        }
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    /// Store `material` (replacing any previous material) and rebuild the index.
    ///
    /// If indexing fails the text stays loaded without an index and the error is returned.
    pub async fn load_material(&self, session: &mut Session, material: String) -> Result<()> {
        let indexed = self.search.index(&material).await;
        let (handle, outcome) = match indexed {
            Ok(handle) => (Some(handle), Ok(())),
            Err(e) => {
                log::warn!("Indexing failed, material loaded without index: {}", e);
                (None, Err(e))
            }
        };

        if let Some(previous) = session.replace_material(material, handle) {
            self.search.release(&previous);
        }
        outcome
    }

    /// Tag extracted documents into one blob and load it
    pub async fn load_documents(
        &self,
        session: &mut Session,
        documents: Vec<SourceDocument>,
        fingerprint: Option<String>,
    ) -> Result<LoadReport> {
        if documents.is_empty() {
            return Err(CoursemateError::InvalidInput(
                "Could not extract text from any files".to_string(),
            ));
        }

        let material = tag_documents(&documents);
        let loaded: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();
        log::info!(
            "Loading {} files ({} characters)",
            loaded.len(),
            material.chars().count()
        );

        session.set_documents(documents, fingerprint);
        let index_error = self
            .load_material(session, material)
            .await
            .err()
            .map(|e| e.to_string());

        Ok(LoadReport {
            unchanged: false,
            loaded,
            skipped: Vec::new(),
            index_error,
        })
    }

    /// Size-check, extract and load an upload batch.
    ///
    /// A batch identical to the one already processed is a no-op.
    pub async fn ingest_uploads(
        &self,
        session: &mut Session,
        files: Vec<UploadedFile>,
    ) -> Result<LoadReport> {
        check_upload_size(&files, self.settings.max_upload_bytes)?;

        let fingerprint = fingerprint_uploads(&files);
        if session.fingerprint() == Some(fingerprint.as_str()) && session.has_material() {
            log::info!("Upload batch unchanged, skipping processing");
            return Ok(LoadReport {
                unchanged: true,
                loaded: session.documents().iter().map(|d| d.name.clone()).collect(),
                skipped: Vec::new(),
                index_error: None,
            });
        }

        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        let extractors = Arc::clone(&self.extractors);
        let documents = tokio::task::spawn_blocking(move || extract_documents(&files, &extractors))
            .await
            .map_err(|e| CoursemateError::Extraction(format!("Extraction task failed: {}", e)))?;

        let skipped: Vec<String> = names
            .into_iter()
            .filter(|name| !documents.iter().any(|d| &d.name == name))
            .collect();

        let mut report = self.load_documents(session, documents, Some(fingerprint)).await?;
        report.skipped = skipped;
        Ok(report)
    }

    /// Retrieved chunks grouped by file. `None` means nothing is indexed.
    async fn retrieve_grouped(
        &self,
        session: &Session,
        material: &str,
        query: &str,
    ) -> Option<Result<FileGroupedContent>> {
        let handle = session.index()?;
        let start = Instant::now();
        let result = self
            .search
            .query(handle, query, self.settings.top_k)
            .await
            .map(|chunks| {
                log::debug!("Retrieved {} chunks in {:?}", chunks.len(), start.elapsed());
                Resolver::for_material(material).group_chunks(chunks.iter().map(|c| c.text.as_str()))
            });
        Some(result)
    }

    async fn rag_answer(&self, session: &Session, question: &str) -> Answer {
        let Some(material) = session.material() else {
            return Answer::Complete(NO_MATERIAL_REPLY.to_string());
        };

        let grouped = match self.retrieve_grouped(session, material, question).await {
            Some(Ok(grouped)) => grouped,
            Some(Err(e)) => {
                log::warn!("Retrieval failed: {}", e);
                return Answer::Failed(format!("Error retrieving content: {}", e));
            }
            None => FileGroupedContent::new(),
        };

        let grouped = if grouped.has_content() {
            grouped
        } else {
            log::debug!("Retrieval gave no usable content, grouping full material");
            group_from_material(material)
        };

        let prompt = build_rag_prompt(question, &grouped);
        log::debug!(
            "RAG prompt: {} characters over {} files",
            prompt.chars().count(),
            grouped.len()
        );

        match self.llm.complete(&prompt, SamplingParams::RAG).await {
            Ok(reply) => Answer::Complete(reply),
            Err(e) => {
                log::warn!("RAG completion failed: {}", e);
                Answer::Failed(format!("Error generating response: {}", e))
            }
        }
    }

    /// Answer a question from the loaded material
    pub async fn run_rag(&self, session: &Session, question: &str) -> String {
        self.rag_answer(session, question).await.into_text()
    }

    /// Per-file bullet summary of the loaded material, focused by `topic` for retrieval
    pub async fn run_summary(&self, session: &Session, topic: &str) -> String {
        let Some(material) = session.material() else {
            return NO_MATERIAL_REPLY.to_string();
        };

        let query = if topic.trim().is_empty() {
            DEFAULT_SUMMARY_QUERY
        } else {
            topic
        };

        let mut sections = match self.retrieve_grouped(session, material, query).await {
            Some(Ok(grouped)) => sections_from_groups(&grouped),
            Some(Err(e)) => {
                log::warn!("Retrieval for summary failed, using full material: {}", e);
                Vec::new()
            }
            None => Vec::new(),
        };
        if sections.is_empty() {
            sections = split_material_by_files(material);
        }
        if sections.is_empty() {
            return NO_CONTENT_SUMMARY.to_string();
        }

        let prompt = build_summary_prompt(&sections);
        log::debug!(
            "Summary prompt: {} characters over {} files",
            prompt.chars().count(),
            sections.len()
        );

        match self.llm.complete(&prompt, SamplingParams::SUMMARY).await {
            Ok(reply) => enforce_bullet_format(&reply, &sections).into_text(),
            Err(e) => {
                log::warn!("Summary completion failed, summarizing locally: {}", e);
                fallback_summary(&sections)
            }
        }
    }

    /// One multiple-choice question over the whole material
    pub async fn generate_mcq(&self, session: &Session) -> QuizOutcome {
        let Some(material) = session.material() else {
            return QuizOutcome {
                item: QuizItem::no_material(),
                origin: QuizOrigin::NoMaterial,
            };
        };

        let prompt = build_quiz_prompt(material);
        match self.llm.complete(&prompt, SamplingParams::QUIZ).await {
            Ok(reply) => {
                log::debug!("Quiz reply: {:?}", reply);
                match parse_quiz_reply(&reply) {
                    QuizParse::Parsed(item) => QuizOutcome {
                        item,
                        origin: QuizOrigin::Parsed,
                    },
                    QuizParse::Defaulted { item, missing } => QuizOutcome {
                        item,
                        origin: QuizOrigin::Defaulted(missing),
                    },
                }
            }
            Err(e) => {
                log::warn!("Quiz completion failed: {}", e);
                QuizOutcome {
                    item: QuizItem::service_unavailable(),
                    origin: QuizOrigin::ServiceFailure,
                }
            }
        }
    }

    /// Generate a quiz item and make it the session's current quiz
    pub async fn next_quiz(&self, session: &mut Session) -> QuizOutcome {
        let outcome = self.generate_mcq(session).await;
        if outcome.origin != QuizOrigin::NoMaterial {
            session.set_quiz(outcome.item.clone());
        }
        outcome
    }

    /// Apply the submission policy, then run `mode` and record the exchange
    pub async fn handle(
        &self,
        session: &mut Session,
        mode: Mode,
        input: &str,
    ) -> std::result::Result<Reply, RequestRejection> {
        session.admit(input, Instant::now(), self.settings.cooldown)?;
        session.push_turn(Role::User, mode, input);

        let (reply, failed) = match mode {
            Mode::Rag => match self.rag_answer(session, input).await {
                Answer::Complete(text) => (Reply::Text { content: text }, false),
                Answer::Failed(text) => (Reply::Text { content: text }, true),
            },
            Mode::Summary => (
                Reply::Text {
                    content: self.run_summary(session, input).await,
                },
                false,
            ),
            Mode::Quiz => {
                let outcome = self.next_quiz(session).await;
                let failed = outcome.origin == QuizOrigin::ServiceFailure;
                (Reply::Quiz { item: outcome.item }, failed)
            }
        };

        let transcript = match &reply {
            Reply::Text { content } => content.clone(),
            Reply::Quiz { item } => item.render(),
        };
        session.push_turn(Role::Assistant, mode, transcript);

        if failed {
            session.clear_last_input();
        }
        Ok(reply)
    }
}
