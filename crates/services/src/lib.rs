#![forbid(unsafe_code)]

pub mod bank;
pub mod engine;
pub mod error;
mod persistence;
pub mod selection;
pub mod shared;
pub mod view;

pub use bank::{
    FileQuestionSource, HttpQuestionSource, QuestionSource, StaticQuestionSource,
    parse_question_bank,
};
pub use engine::{QuizEngine, SessionState, SubmissionPhase};
pub use error::{LoadError, QuizError};
pub use shared::{QuizIntent, SharedQuiz};
pub use view::{AnswerMark, AnswerView, CitationView, QuestionView, QuizView};
