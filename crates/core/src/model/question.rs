use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// One selectable answer of a question, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleAnswer {
    pub answer_text: String,
    pub is_correct: bool,
}

impl PossibleAnswer {
    #[must_use]
    pub fn new(answer_text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            answer_text: answer_text.into(),
            is_correct,
        }
    }
}

/// An immutable multiple-choice question with its source citation.
///
/// The serialized field names match the bundled question bank format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub possible_answers: Vec<PossibleAnswer>,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub paragraph: String,
    #[serde(default)]
    pub online_page: String,
}

impl Question {
    /// Build a question without citation metadata.
    #[must_use]
    pub fn new(question: impl Into<String>, possible_answers: Vec<PossibleAnswer>) -> Self {
        Self {
            question: question.into(),
            possible_answers,
            quote: String::new(),
            page: 0,
            paragraph: String::new(),
            online_page: String::new(),
        }
    }

    #[must_use]
    pub fn with_citation(
        mut self,
        quote: impl Into<String>,
        page: u32,
        paragraph: impl Into<String>,
        online_page: impl Into<String>,
    ) -> Self {
        self.quote = quote.into();
        self.page = page;
        self.paragraph = paragraph.into();
        self.online_page = online_page.into();
        self
    }

    /// Check the structural invariants a question bank entry must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text is blank, fewer than two answers are
    /// offered, or the number of correct answers is not exactly one.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.question.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.possible_answers.len() < 2 {
            return Err(QuestionError::TooFewAnswers {
                len: self.possible_answers.len(),
            });
        }
        match self.possible_answers.iter().filter(|a| a.is_correct).count() {
            0 => Err(QuestionError::NoCorrectAnswer),
            1 => Ok(()),
            count => Err(QuestionError::MultipleCorrectAnswers { count }),
        }
    }

    /// Index of the correct answer in display order.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.possible_answers.iter().position(|a| a.is_correct)
    }

    #[must_use]
    pub fn answer_count(&self) -> usize {
        self.possible_answers.len()
    }

    /// Returns `None` when `index` does not address an existing answer.
    #[must_use]
    pub fn is_correct_answer(&self, index: usize) -> Option<bool> {
        self.possible_answers.get(index).map(|a| a.is_correct)
    }

    #[must_use]
    pub fn citation(&self) -> Citation<'_> {
        Citation {
            quote: &self.quote,
            page: self.page,
            paragraph: &self.paragraph,
            online_page: &self.online_page,
        }
    }

    /// Returns a copy of this question with its answers rearranged.
    ///
    /// `order` lists source indices; entries that do not address an answer are skipped.
    #[must_use]
    pub fn with_answer_order(&self, order: &[usize]) -> Self {
        let possible_answers = order
            .iter()
            .filter_map(|&idx| self.possible_answers.get(idx).cloned())
            .collect();
        Self {
            possible_answers,
            ..self.clone()
        }
    }
}

/// Borrowed view over the source reference of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Citation<'a> {
    pub quote: &'a str,
    pub page: u32,
    pub paragraph: &'a str,
    pub online_page: &'a str,
}

impl Citation<'_> {
    /// Parsed reference link, if the stored value is an absolute URL.
    #[must_use]
    pub fn url(&self) -> Option<Url> {
        Url::parse(self.online_page.trim()).ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quote.is_empty() && self.paragraph.is_empty() && self.online_page.is_empty()
    }
}

//
// ─── VALIDATION ERRORS ─────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,

    #[error("question needs at least two answers, got {len}")]
    TooFewAnswers { len: usize },

    #[error("question has no correct answer")]
    NoCorrectAnswer,

    #[error("question has {count} correct answers, expected exactly one")]
    MultipleCorrectAnswers { count: usize },
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
