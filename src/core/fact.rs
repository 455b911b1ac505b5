//! Question/answer facts and the exact-match store built from them

use serde::Deserialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const BUILTIN_FACTS: &str = include_str!("../../data/faq.yaml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub question: String,
    pub answer: String,
}

/// A raw entry as read from a fact source. An entry without an answer is
/// malformed and rejected by [`FactStore::load`].
#[derive(Debug, Clone, Deserialize)]
pub struct FactEntry {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
}

impl From<Fact> for FactEntry {
    fn from(fact: Fact) -> Self {
        FactEntry {
            question: fact.question,
            answer: Some(fact.answer),
        }
    }
}

impl<Q: Into<String>, A: Into<String>> From<(Q, A)> for FactEntry {
    fn from((question, answer): (Q, A)) -> Self {
        FactEntry {
            question: question.into(),
            answer: Some(answer.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read fact file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse facts: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Fact #{index} has no answer for question: {question:?}")]
    MissingAnswer { index: usize, question: String },
}

/// Read-only table answering exact-match questions.
///
/// Lookups compare the full question text byte for byte: no case folding,
/// trimming or fuzzy matching is applied.
#[derive(Debug, Clone, Default)]
pub struct FactStore {
    answers: HashMap<String, String>,
}

impl FactStore {
    /// Builds the store from a sequence of entries.
    ///
    /// Repeated questions collapse to a single fact. When a repeated question
    /// carries a different answer the first one wins. Nothing is kept if any
    /// entry is missing its answer.
    pub fn load<I, E>(entries: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = E>,
        E: Into<FactEntry>,
    {
        let mut answers = HashMap::new();
        let mut duplicates = 0usize;

        for (index, entry) in entries.into_iter().map(Into::<FactEntry>::into).enumerate() {
            let FactEntry { question, answer } = entry;
            let answer = answer.ok_or_else(|| LoadError::MissingAnswer {
                index,
                question: question.clone(),
            })?;

            match answers.entry(question) {
                Entry::Vacant(slot) => {
                    slot.insert(answer);
                }
                Entry::Occupied(existing) => {
                    duplicates += 1;
                    if *existing.get() != answer {
                        warn!(
                            question = %existing.key(),
                            kept = %existing.get(),
                            ignored = %answer,
                            "Conflicting answers for question, keeping the first"
                        );
                    }
                }
            }
        }

        debug!(facts = answers.len(), duplicates, "Loaded fact store");
        Ok(FactStore { answers })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, LoadError> {
        let entries: Vec<FactEntry> = serde_yaml::from_str(yaml)?;
        Self::load(entries)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The finance FAQ bundled with the binary.
    pub fn builtin() -> Result<Self, LoadError> {
        Self::from_yaml_str(BUILTIN_FACTS)
    }

    /// Returns the stored answer, or `None` when no question matches exactly.
    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.answers.get(question).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.answers.keys().map(String::as_str)
    }
}
