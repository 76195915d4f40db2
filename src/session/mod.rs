//! Per-user session state and the study assistant that drives it.

pub mod assistant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::ingest::{SourceDocument, PREVIEW_CHARS};
use crate::parse::{ChoiceLetter, QuizItem};
use crate::search::IndexHandle;

pub use assistant::{AssistantSettings, LoadReport, QuizOrigin, QuizOutcome, Reply, StudyAssistant};

/// Assistant behaviour selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Rag,
    Summary,
    Quiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub mode: Mode,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Why a submission was refused before any work was done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestRejection {
    #[error("Please enter a message")]
    EmptyInput,

    #[error("⏳ Please wait for the current request to complete")]
    DuplicateInput,

    #[error("⏳ Please wait a moment before sending another request")]
    Cooldown,

    #[error("📁 Please upload course material first.")]
    NoMaterial,
}

/// The learner's recorded answer to a quiz item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizAnswer {
    pub choice: ChoiceLetter,
    pub correct: bool,
    pub feedback: String,
}

/// Current quiz item and, once given, its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizState {
    pub item: QuizItem,
    pub answer: Option<QuizAnswer>,
}

impl QuizState {
    pub fn new(item: QuizItem) -> Self {
        Self { item, answer: None }
    }

    /// Evaluate `choice` the first time; later calls return the stored feedback
    pub fn answer(&mut self, choice: ChoiceLetter) -> &QuizAnswer {
        let item = &self.item;
        self.answer.get_or_insert_with(|| {
            let correct = choice == item.correct;
            let feedback = if correct {
                format!("🎉 **Correct!** {}", item.explanation)
            } else {
                format!(
                    "❌ **Incorrect.** The correct answer is {}. {}",
                    item.correct, item.explanation
                )
            };
            QuizAnswer {
                choice,
                correct,
                feedback,
            }
        })
    }
}

/// Per-file entry in the material status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub name: String,
    pub word_count: usize,
    pub preview: String,
}

/// Summary of what is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialStatus {
    pub loaded: bool,
    pub files: Vec<FileStatus>,
    pub total_words: usize,
    pub indexed_chunks: Option<usize>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Everything one learner's session holds
#[derive(Debug, Default)]
pub struct Session {
    material: Option<String>,
    index: Option<IndexHandle>,
    documents: Vec<SourceDocument>,
    fingerprint: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
    conversation: Vec<ConversationTurn>,
    quiz: Option<QuizState>,
    last_request_at: Option<Instant>,
    last_user_input: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_material(&self) -> bool {
        self.material.as_deref().is_some_and(|m| !m.trim().is_empty())
    }

    /// The combined, marker-tagged material
    pub fn material(&self) -> Option<&str> {
        self.material.as_deref().filter(|m| !m.trim().is_empty())
    }

    pub fn index(&self) -> Option<&IndexHandle> {
        self.index.as_ref()
    }

    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn conversation(&self) -> &[ConversationTurn] {
        &self.conversation
    }

    pub fn quiz(&self) -> Option<&QuizState> {
        self.quiz.as_ref()
    }

    /// Replace material wholesale. Returns the index handle being dropped, if any.
    pub(crate) fn replace_material(
        &mut self,
        material: String,
        index: Option<IndexHandle>,
    ) -> Option<IndexHandle> {
        self.material = Some(material);
        self.loaded_at = Some(Utc::now());
        std::mem::replace(&mut self.index, index)
    }

    pub(crate) fn set_documents(
        &mut self,
        documents: Vec<SourceDocument>,
        fingerprint: Option<String>,
    ) {
        self.documents = documents;
        self.fingerprint = fingerprint;
    }

    pub(crate) fn push_turn(&mut self, role: Role, mode: Mode, content: impl Into<String>) {
        self.conversation.push(ConversationTurn {
            role,
            mode,
            content: content.into(),
            at: Utc::now(),
        });
    }

    pub(crate) fn set_quiz(&mut self, item: QuizItem) {
        self.quiz = Some(QuizState::new(item));
    }

    /// Apply the submission policy at time `now`.
    ///
    /// Checks run in order: blank input, repeat of the previous input,
    /// cooldown since the last accepted request, loaded material. On success
    /// the input and time are recorded.
    pub fn admit(
        &mut self,
        input: &str,
        now: Instant,
        cooldown: Duration,
    ) -> Result<(), RequestRejection> {
        if input.trim().is_empty() {
            return Err(RequestRejection::EmptyInput);
        }

        if input == self.last_user_input {
            return Err(RequestRejection::DuplicateInput);
        }

        if let Some(last) = self.last_request_at {
            if now.saturating_duration_since(last) < cooldown {
                return Err(RequestRejection::Cooldown);
            }
        }

        if !self.has_material() {
            return Err(RequestRejection::NoMaterial);
        }

        self.last_user_input = input.to_string();
        self.last_request_at = Some(now);
        Ok(())
    }

    /// Forget the last input so the same text may be submitted again
    pub fn clear_last_input(&mut self) {
        self.last_user_input.clear();
    }

    /// Answer the current quiz item. `None` when there is no quiz.
    pub fn answer_quiz(&mut self, choice: ChoiceLetter) -> Option<&QuizAnswer> {
        self.quiz.as_mut().map(|quiz| quiz.answer(choice))
    }

    /// Clear conversation, quiz and request history. Material stays loaded.
    pub fn reset_conversation(&mut self) {
        self.conversation.clear();
        self.quiz = None;
        self.last_user_input.clear();
        self.last_request_at = None;
    }

    pub fn status(&self) -> MaterialStatus {
        let files: Vec<FileStatus> = self
            .documents
            .iter()
            .map(|doc| FileStatus {
                name: doc.name.clone(),
                word_count: doc.word_count(),
                preview: doc.preview(PREVIEW_CHARS),
            })
            .collect();
        let total_words = files.iter().map(|f| f.word_count).sum();

        MaterialStatus {
            loaded: self.has_material(),
            files,
            total_words,
            indexed_chunks: self.index.as_ref().map(IndexHandle::chunk_count),
            loaded_at: self.loaded_at,
        }
    }
}
