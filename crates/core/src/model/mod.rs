mod question;
mod score;

pub use question::{Citation, PossibleAnswer, Question, QuestionError};
pub use score::{Judgment, Score};
