//! Fixed keys the quiz engine reads and writes.

/// Remaining question pool, serialized as a JSON array.
pub const QUESTIONS: &str = "questions";

/// Number of correct submissions since the last reset.
pub const CORRECT_COUNT: &str = "correctAnswersCount";

/// Number of incorrect submissions since the last reset.
pub const INCORRECT_COUNT: &str = "incorrectAnswersCount";
