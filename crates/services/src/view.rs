use quiz_core::model::{Judgment, Question, Score};

use crate::engine::{QuizEngine, SessionState, SubmissionPhase};

/// How an answer row should be marked once the question is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMark {
    Unjudged,
    Correct,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerView {
    pub index: usize,
    pub text: String,
    pub selected: bool,
    pub mark: AnswerMark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationView {
    pub quote: String,
    pub page: u32,
    pub paragraph: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub text: String,
    pub answers: Vec<AnswerView>,
    pub judgment: Option<Judgment>,
    pub revealed: bool,
    /// Present once the question is revealed or judged.
    pub citation: Option<CitationView>,
}

/// Render-ready snapshot of a quiz session.
///
/// Carries no pre-formatted strings; the presentation layer owns wording and
/// percentage style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizView {
    pub phase: SubmissionPhase,
    pub question: Option<QuestionView>,
    pub score: Score,
    pub remaining: usize,
    /// 1-based position of the current question among everything dealt this session.
    pub ordinal: Option<u32>,
    /// Questions answered correctly plus those still in the pool.
    pub total: u32,
    pub can_submit: bool,
    pub can_advance: bool,
    pub persistence_degraded: bool,
}

impl QuizView {
    #[must_use]
    pub fn from_engine(engine: &QuizEngine) -> Self {
        Self::from_state(engine.state(), engine.persistence_degraded())
    }

    #[must_use]
    pub fn from_state(state: &SessionState, persistence_degraded: bool) -> Self {
        let phase = state.phase();
        let score = state.score();
        let remaining = state.remaining_pool().len();
        let total = score
            .correct
            .saturating_add(u32::try_from(remaining).unwrap_or(u32::MAX));

        let question = state
            .current_question()
            .map(|current| map_question(current, state));
        let ordinal = question.as_ref().map(|_| match state.last_judgment() {
            // The correct answer already moved the counter for this question.
            Some(Judgment::Correct) => score.correct,
            _ => score.correct.saturating_add(1),
        });

        Self {
            phase,
            question,
            score,
            remaining,
            ordinal,
            total,
            can_submit: phase == SubmissionPhase::Selected,
            can_advance: phase == SubmissionPhase::Submitted,
            persistence_degraded,
        }
    }
}

fn map_question(question: &Question, state: &SessionState) -> QuestionView {
    let judged = state.is_submitted();
    let answers = question
        .possible_answers
        .iter()
        .enumerate()
        .map(|(index, answer)| {
            let selected = state.selected_answer() == Some(index);
            let mark = if !judged {
                AnswerMark::Unjudged
            } else if answer.is_correct {
                AnswerMark::Correct
            } else if selected {
                AnswerMark::Wrong
            } else {
                AnswerMark::Unjudged
            };
            AnswerView {
                index,
                text: answer.answer_text.clone(),
                selected,
                mark,
            }
        })
        .collect();

    let citation = (state.is_revealed() || judged)
        .then(|| question.citation())
        .filter(|citation| !citation.is_empty())
        .map(|citation| CitationView {
            quote: citation.quote.to_owned(),
            page: citation.page,
            paragraph: citation.paragraph.to_owned(),
            url: citation.url().map(|url| url.to_string()),
        });

    QuestionView {
        text: question.question.clone(),
        answers,
        judgment: state.last_judgment(),
        revealed: state.is_revealed(),
        citation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::StaticQuestionSource;
    use quiz_core::model::PossibleAnswer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use storage::repository::InMemoryStore;

    async fn build_engine() -> QuizEngine {
        let question = Question::new(
            "Which city is the capital?",
            vec![
                PossibleAnswer::new("Ottawa", true),
                PossibleAnswer::new("Vancouver", false),
            ],
        )
        .with_citation(
            "Ottawa is the capital.",
            40,
            "Canada's Regions",
            "https://example.org/regions",
        );
        QuizEngine::initialize(
            Arc::new(StaticQuestionSource::new(vec![question])),
            Arc::new(InMemoryStore::new()),
            StdRng::seed_from_u64(9),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn unjudged_view_hides_citation() {
        let engine = build_engine().await;
        let view = QuizView::from_engine(&engine);

        assert_eq!(view.phase, SubmissionPhase::Unanswered);
        assert!(!view.can_submit);
        let question = view.question.unwrap();
        assert!(question.citation.is_none());
        assert!(question.answers.iter().all(|a| a.mark == AnswerMark::Unjudged));
        assert_eq!(view.ordinal, Some(1));
        assert_eq!(view.total, 1);
    }

    #[tokio::test]
    async fn reveal_shows_citation() {
        let mut engine = build_engine().await;
        engine.toggle_reveal();
        let view = QuizView::from_engine(&engine);
        let citation = view.question.unwrap().citation.unwrap();
        assert_eq!(citation.page, 40);
        assert_eq!(citation.url.as_deref(), Some("https://example.org/regions"));
    }

    #[tokio::test]
    async fn wrong_answer_marks_both_rows() {
        let mut engine = build_engine().await;
        let wrong = engine
            .state()
            .current_question()
            .and_then(|q| q.possible_answers.iter().position(|a| !a.is_correct))
            .unwrap();
        engine.select_answer(wrong).unwrap();
        assert!(QuizView::from_engine(&engine).can_submit);
        engine.submit().await;

        let view = QuizView::from_engine(&engine);
        assert!(view.can_advance);
        let question = view.question.unwrap();
        assert_eq!(question.judgment, Some(Judgment::Incorrect));
        assert!(question.citation.is_some());
        for answer in &question.answers {
            if answer.index == wrong {
                assert_eq!(answer.mark, AnswerMark::Wrong);
                assert!(answer.selected);
            } else {
                assert_eq!(answer.mark, AnswerMark::Correct);
            }
        }
    }
}
