use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use quiz_core::model::Question;

use crate::error::LoadError;

/// Default location of the bundled question bank, relative to the site root.
pub const DEFAULT_BANK_PATH: &str = "/canadatestprep/questions.json";

/// Read-only source of the full question bank.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch every question in bank order.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` when the bank is unreachable, malformed, or holds an
    /// invalid question.
    async fn fetch(&self) -> Result<Vec<Question>, LoadError>;
}

/// Decode a bank document and validate every question.
///
/// Accepts either a bare JSON array or an object with a `questions` array.
///
/// # Errors
///
/// Returns `LoadError::Parse` for malformed JSON and
/// `LoadError::InvalidQuestion` for the first entry that fails validation.
pub fn parse_question_bank(raw: &[u8]) -> Result<Vec<Question>, LoadError> {
    // Decode the chosen shape directly so entry errors keep their field and position.
    let questions: Vec<Question> = match serde_json::from_slice::<Value>(raw)? {
        Value::Object(mut wrapper) => match wrapper.remove("questions") {
            Some(list) => serde_json::from_value(list)?,
            None => serde_json::from_value(Value::Object(wrapper))?,
        },
        other => serde_json::from_value(other)?,
    };
    for (index, question) in questions.iter().enumerate() {
        question
            .validate()
            .map_err(|source| LoadError::InvalidQuestion { index, source })?;
    }
    Ok(questions)
}

/// Fetches the bank over HTTP.
#[derive(Clone)]
pub struct HttpQuestionSource {
    client: Client,
    url: String,
}

impl HttpQuestionSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Point at the bundled bank path under `base_url`.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            DEFAULT_BANK_PATH
        ))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch(&self) -> Result<Vec<Question>, LoadError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(LoadError::HttpStatus(response.status()));
        }

        let body = response.bytes().await?;
        let questions = parse_question_bank(&body)?;
        tracing::debug!(url = %self.url, count = questions.len(), "fetched question bank");
        Ok(questions)
    }
}

/// Reads the bank from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileQuestionSource {
    path: PathBuf,
}

impl FileQuestionSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionSource for FileQuestionSource {
    async fn fetch(&self) -> Result<Vec<Question>, LoadError> {
        let raw = tokio::fs::read(&self.path).await?;
        let questions = parse_question_bank(&raw)?;
        tracing::debug!(path = %self.path.display(), count = questions.len(), "read question bank");
        Ok(questions)
    }
}

/// Fixed in-memory bank for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticQuestionSource {
    questions: Vec<Question>,
}

impl StaticQuestionSource {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn fetch(&self) -> Result<Vec<Question>, LoadError> {
        Ok(self.questions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ONE_QUESTION: &str = r#"{
        "question": "What is the capital of Canada?",
        "possible_answers": [
            {"answer_text": "Ottawa", "is_correct": true},
            {"answer_text": "Toronto", "is_correct": false}
        ],
        "quote": "Ottawa is the capital.",
        "page": 40,
        "paragraph": "Canada's Regions",
        "online_page": "https://example.org/regions"
    }"#;

    #[test]
    fn accepts_flat_array() {
        let raw = format!("[{ONE_QUESTION}]");
        let questions = parse_question_bank(raw.as_bytes()).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].page, 40);
    }

    #[test]
    fn accepts_wrapped_object() {
        let raw = format!(r#"{{"questions": [{ONE_QUESTION}, {ONE_QUESTION}]}}"#);
        let questions = parse_question_bank(raw.as_bytes()).unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_question_bank(b"{not json").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));

        let err = parse_question_bank(br#"{"items": []}"#).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn bad_entry_reports_the_offending_field() {
        let raw = r#"[{"question": "Q", "possible_answers": [{"answer_text": "A"}]}]"#;
        let err = parse_question_bank(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
        assert!(err.to_string().contains("is_correct"), "{err}");

        let raw = r#"{"questions": [{"possible_answers": []}]}"#;
        let err = parse_question_bank(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("question"), "{err}");
        assert!(!err.to_string().contains("did not match any variant"));
    }

    #[test]
    fn question_without_correct_answer_is_rejected() {
        let raw = r#"[{
            "question": "Q",
            "possible_answers": [
                {"answer_text": "A", "is_correct": false},
                {"answer_text": "B", "is_correct": false}
            ]
        }]"#;
        let err = parse_question_bank(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidQuestion { index: 0, .. }));
    }

    #[test]
    fn base_url_joins_bundled_path() {
        let source = HttpQuestionSource::with_base_url("http://localhost:3000/");
        assert_eq!(
            source.url(),
            "http://localhost:3000/canadatestprep/questions.json"
        );
    }

    #[tokio::test]
    async fn file_source_reads_bank() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[{ONE_QUESTION}]").unwrap();

        let source = FileQuestionSource::new(file.path());
        let questions = source.fetch().await.unwrap();
        assert_eq!(questions[0].question, "What is the capital of Canada?");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = FileQuestionSource::new("/definitely/not/here/questions.json");
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
