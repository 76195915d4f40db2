use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const DEFAULT_QUESTION: &str = "What is a key concept discussed across the material?";
pub const DEFAULT_EXPLANATION: &str =
    "This tests your understanding of key concepts from the provided material.";
const DEFAULT_CHOICES: [&str; 4] = ["Concept A", "Concept B", "Concept C", "Concept D"];

/// One of the four answer positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceLetter {
    A,
    B,
    C,
    D,
}

impl ChoiceLetter {
    pub const ALL: [ChoiceLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    /// Parse user input such as `"b"`, `" C "` or `"D) Mitosis"`
    pub fn parse_answer(input: &str) -> Option<Self> {
        input.trim().chars().next().and_then(Self::from_char)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }
}

impl fmt::Display for ChoiceLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A multiple-choice question with exactly four choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizItem {
    pub question: String,
    pub choices: [String; 4],
    pub correct: ChoiceLetter,
    pub explanation: String,
}

impl QuizItem {
    pub fn choice(&self, letter: ChoiceLetter) -> &str {
        &self.choices[letter.index()]
    }

    /// Shown when no material has been loaded
    pub fn no_material() -> Self {
        Self {
            question: "No material loaded".to_string(),
            choices: [
                "Please upload material first".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ],
            correct: ChoiceLetter::A,
            explanation: "No explanation available".to_string(),
        }
    }

    /// Shown when the completion service failed
    pub fn service_unavailable() -> Self {
        Self {
            question: "What is a key concept discussed across all the provided material?".to_string(),
            choices: DEFAULT_CHOICES.map(String::from),
            correct: ChoiceLetter::A,
            explanation: "Review the material to understand the key concepts discussed across all files."
                .to_string(),
        }
    }

    /// Plain-text rendering for terminals
    pub fn render(&self) -> String {
        let mut out = format!("QUESTION: {}\n", self.question);
        for letter in ChoiceLetter::ALL {
            out.push_str(&format!("{}) {}\n", letter, self.choice(letter)));
        }
        out
    }
}

/// Fields of a quiz reply that can fall back to a default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizField {
    Question,
    Choices,
    Correct,
    Explanation,
}

/// Outcome of decoding a quiz reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizParse {
    /// Every field was found in the reply
    Parsed(QuizItem),
    /// Some fields were missing and took their defaults
    Defaulted {
        item: QuizItem,
        missing: Vec<QuizField>,
    },
}

impl QuizParse {
    pub fn item(&self) -> &QuizItem {
        match self {
            Self::Parsed(item) | Self::Defaulted { item, .. } => item,
        }
    }

    pub fn into_item(self) -> QuizItem {
        match self {
            Self::Parsed(item) | Self::Defaulted { item, .. } => item,
        }
    }

    pub fn missing(&self) -> &[QuizField] {
        match self {
            Self::Parsed(_) => &[],
            Self::Defaulted { missing, .. } => missing,
        }
    }
}

fn choice_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[A-D]\)[ \t]*(.*?)[ \t\r]*$").expect("Invalid regex pattern"))
}

fn correct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"CORRECT:\s*([A-D])").expect("Invalid regex pattern"))
}

fn question_end_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\n(?:[A-D]\)|CORRECT:|EXPLANATION:)").expect("Invalid regex pattern")
    })
}

fn explanation_end_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n(?:[A-D]\)|QUESTION:)").expect("Invalid regex pattern"))
}

/// Text after `label` up to the first `terminator` match (or end), trimmed.
///
/// Returns `None` when the label is absent or the captured text is blank.
fn labelled_field(reply: &str, label: &str, terminator: &Regex) -> Option<String> {
    let start = reply.find(label)? + label.len();
    let rest = &reply[start..];
    let rest = rest.trim_start_matches([' ', '\t']);
    let end = terminator.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Decode a quiz reply. Never fails: missing fields take defaults.
pub fn parse_quiz_reply(reply: &str) -> QuizParse {
    let mut missing = Vec::new();

    let question = labelled_field(reply, "QUESTION:", question_end_regex()).unwrap_or_else(|| {
        missing.push(QuizField::Question);
        DEFAULT_QUESTION.to_string()
    });

    // Blank choice lines keep their position but count as missing
    let mut found: Vec<Option<String>> = choice_line_regex()
        .captures_iter(reply)
        .filter_map(|cap| cap.get(1))
        .map(|m| {
            let text = m.as_str().trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect();
    found.truncate(4);

    let choices: [String; 4] = if found.is_empty() {
        missing.push(QuizField::Choices);
        DEFAULT_CHOICES.map(String::from)
    } else {
        if found.len() < 4 || found.iter().any(Option::is_none) {
            missing.push(QuizField::Choices);
        }
        ChoiceLetter::ALL.map(|letter| {
            found
                .get(letter.index())
                .cloned()
                .flatten()
                .unwrap_or_else(|| format!("Option {}", letter))
        })
    };

    let correct = correct_regex()
        .captures(reply)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().chars().next())
        .and_then(ChoiceLetter::from_char)
        .unwrap_or_else(|| {
            missing.push(QuizField::Correct);
            ChoiceLetter::A
        });

    let explanation =
        labelled_field(reply, "EXPLANATION:", explanation_end_regex()).unwrap_or_else(|| {
            missing.push(QuizField::Explanation);
            DEFAULT_EXPLANATION.to_string()
        });

    let item = QuizItem {
        question,
        choices,
        correct,
        explanation,
    };

    if missing.is_empty() {
        QuizParse::Parsed(item)
    } else {
        log::warn!("Quiz reply missing fields {:?}, using defaults", missing);
        QuizParse::Defaulted { item, missing }
    }
}
