use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use serde::Serialize;

use quiz_core::model::{Judgment, Question, Score};
use storage::repository::KeyValueStore;

use crate::bank::QuestionSource;
use crate::error::QuizError;
use crate::persistence::ProgressStore;
use crate::selection::{prepare_pool, requeue};

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Where the current question stands in the submission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    /// No answer chosen yet.
    Unanswered,
    /// An answer is chosen but not locked in.
    Selected,
    /// The answer has been judged; waiting for `advance`.
    Submitted,
    /// The pool is empty. Only `reset` does anything.
    Exhausted,
}

/// The engine's working set. Read-only outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    remaining_pool: Vec<Question>,
    current_question: Option<Question>,
    selected_answer: Option<usize>,
    score: Score,
    submitted: bool,
    last_judgment: Option<Judgment>,
    revealed: bool,
}

impl SessionState {
    fn new(remaining_pool: Vec<Question>, score: Score) -> Self {
        let current_question = remaining_pool.first().cloned();
        Self {
            remaining_pool,
            current_question,
            selected_answer: None,
            score,
            submitted: false,
            last_judgment: None,
            revealed: false,
        }
    }

    #[must_use]
    pub fn remaining_pool(&self) -> &[Question] {
        &self.remaining_pool
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<usize> {
        self.selected_answer
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.score.correct
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.score.incorrect
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    #[must_use]
    pub fn last_judgment(&self) -> Option<Judgment> {
        self.last_judgment
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    #[must_use]
    pub fn phase(&self) -> SubmissionPhase {
        if self.current_question.is_none() {
            SubmissionPhase::Exhausted
        } else if self.submitted {
            SubmissionPhase::Submitted
        } else if self.selected_answer.is_some() {
            SubmissionPhase::Selected
        } else {
            SubmissionPhase::Unanswered
        }
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Quiz session state machine.
///
/// Owns the session state, the rotation policy and persistence orchestration.
/// Questions are dealt from the head of the remaining pool. A correct answer
/// removes the question; a wrong one moves it to a random later slot.
pub struct QuizEngine {
    source: Arc<dyn QuestionSource>,
    progress: ProgressStore,
    rng: StdRng,
    state: SessionState,
    bank_size: Option<usize>,
}

impl QuizEngine {
    /// Restore the saved session, or start a fresh one from the question bank.
    ///
    /// A saved pool is adopted verbatim, even when empty. Without one, the bank
    /// is fetched, shuffled, and persisted before the engine is returned.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Load` if a fresh start is needed and the bank cannot
    /// be fetched. Store failures are not errors; see `persistence_degraded`.
    pub async fn initialize(
        source: Arc<dyn QuestionSource>,
        store: Arc<dyn KeyValueStore>,
        mut rng: StdRng,
    ) -> Result<Self, QuizError> {
        let mut progress = ProgressStore::new(store);

        let (state, bank_size) = if let Some(saved) = progress.load().await {
            tracing::info!(
                remaining = saved.pool.len(),
                correct = saved.score.correct,
                incorrect = saved.score.incorrect,
                "restored saved quiz session"
            );
            (SessionState::new(saved.pool, saved.score), None)
        } else {
            let pool = fetch_pool(source.as_ref(), &mut rng).await?;
            let bank_size = pool.len();
            progress.save_progress(&pool, Score::default()).await;
            tracing::info!(questions = bank_size, "started fresh quiz session");
            (SessionState::new(pool, Score::default()), Some(bank_size))
        };

        Ok(Self {
            source,
            progress,
            rng,
            state,
            bank_size,
        })
    }

    /// Flag the session as not durable, e.g. when the caller had to fall back
    /// to a volatile store because the configured one could not be opened.
    pub fn mark_persistence_degraded(&mut self) {
        self.progress.mark_volatile();
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> SubmissionPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.state.score
    }

    /// Size of the bank the current session was dealt from, when it was
    /// fetched in this process.
    #[must_use]
    pub fn bank_size(&self) -> Option<usize> {
        self.bank_size
    }

    /// True once any store operation has failed; progress may not survive a restart.
    #[must_use]
    pub fn persistence_degraded(&self) -> bool {
        self.progress.is_degraded()
    }

    /// Choose an answer for the current question.
    ///
    /// Ignored once the answer is submitted.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidSelection` if `index` does not address an
    /// answer of the current question, or no question is left. State is unchanged.
    pub fn select_answer(&mut self, index: usize) -> Result<(), QuizError> {
        let available = self
            .state
            .current_question
            .as_ref()
            .map_or(0, Question::answer_count);
        if index >= available {
            tracing::debug!(index, available, "rejected out-of-range selection");
            return Err(QuizError::InvalidSelection { index, available });
        }
        if self.state.submitted {
            tracing::debug!(index, "selection ignored after submit");
            return Ok(());
        }
        self.state.selected_answer = Some(index);
        Ok(())
    }

    /// Judge the selected answer, update the counters and the pool, and persist.
    ///
    /// Returns `None` without touching state when nothing is selected, the
    /// answer was already submitted, or no question is left.
    pub async fn submit(&mut self) -> Option<Judgment> {
        if self.state.submitted {
            return None;
        }
        let selected = self.state.selected_answer?;
        let current = self.state.current_question.as_ref()?;
        let is_correct = current.is_correct_answer(selected)?;
        let position = self.state.remaining_pool.iter().position(|q| q == current);

        let judgment = Judgment::from_correct(is_correct);
        self.state.score.record(judgment);
        if let Some(position) = position {
            match judgment {
                Judgment::Correct => {
                    self.state.remaining_pool.remove(position);
                }
                Judgment::Incorrect => {
                    self.state.remaining_pool =
                        requeue(&self.state.remaining_pool, position, &mut self.rng);
                }
            }
        }
        self.state.submitted = true;
        self.state.last_judgment = Some(judgment);

        tracing::debug!(
            ?judgment,
            remaining = self.state.remaining_pool.len(),
            correct = self.state.score.correct,
            incorrect = self.state.score.incorrect,
            "answer submitted"
        );

        self.progress
            .save_progress(&self.state.remaining_pool, self.state.score)
            .await;
        Some(judgment)
    }

    /// Move on to the next question after a submission.
    ///
    /// Returns `false` and leaves state unchanged unless the current answer has
    /// been submitted.
    pub fn advance(&mut self) -> bool {
        if !self.state.submitted {
            return false;
        }
        self.state.selected_answer = None;
        self.state.submitted = false;
        self.state.last_judgment = None;
        self.state.revealed = false;
        self.state.current_question = self.state.remaining_pool.first().cloned();
        if self.state.current_question.is_none() {
            tracing::info!(
                correct = self.state.score.correct,
                incorrect = self.state.score.incorrect,
                "question pool exhausted"
            );
        }
        true
    }

    /// Show or hide the quote and citation for the current question.
    ///
    /// Returns `false` when no question is left.
    pub fn toggle_reveal(&mut self) -> bool {
        if self.state.current_question.is_none() {
            return false;
        }
        self.state.revealed = !self.state.revealed;
        true
    }

    /// Start over with the full bank.
    ///
    /// The bank is fetched before anything changes, so a load failure leaves
    /// the running session and the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Load` if the bank cannot be fetched.
    pub async fn reset(&mut self) -> Result<(), QuizError> {
        let pool = fetch_pool(self.source.as_ref(), &mut self.rng).await?;
        self.bank_size = Some(pool.len());
        self.state = SessionState::new(pool, Score::default());

        self.progress.clear().await;
        self.progress
            .save_progress(&self.state.remaining_pool, self.state.score)
            .await;
        tracing::info!(questions = self.state.remaining_pool.len(), "quiz reset");
        Ok(())
    }
}

async fn fetch_pool(
    source: &dyn QuestionSource,
    rng: &mut StdRng,
) -> Result<Vec<Question>, QuizError> {
    let bank = source.fetch().await?;
    Ok(prepare_pool(&bank, rng))
}

impl fmt::Debug for QuizEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizEngine")
            .field("phase", &self.state.phase())
            .field("remaining", &self.state.remaining_pool.len())
            .field("score", &self.state.score)
            .field("bank_size", &self.bank_size)
            .field("persistence_degraded", &self.progress.is_degraded())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::StaticQuestionSource;
    use crate::view::QuizView;
    use quiz_core::model::PossibleAnswer;
    use rand::SeedableRng;
    use storage::repository::InMemoryStore;

    fn build_question(id: usize) -> Question {
        Question::new(
            format!("Q{id}"),
            vec![
                PossibleAnswer::new("right", true),
                PossibleAnswer::new("wrong", false),
                PossibleAnswer::new("also wrong", false),
            ],
        )
    }

    async fn build_engine(len: usize) -> QuizEngine {
        let bank = (1..=len).map(build_question).collect();
        QuizEngine::initialize(
            Arc::new(StaticQuestionSource::new(bank)),
            Arc::new(InMemoryStore::new()),
            StdRng::seed_from_u64(5),
        )
        .await
        .unwrap()
    }

    fn correct_index(engine: &QuizEngine) -> usize {
        engine.state().current_question().unwrap().correct_index().unwrap()
    }

    fn wrong_index(engine: &QuizEngine) -> usize {
        (correct_index(engine) + 1) % 3
    }

    #[tokio::test]
    async fn fresh_engine_starts_unanswered() {
        let engine = build_engine(3).await;
        assert_eq!(engine.phase(), SubmissionPhase::Unanswered);
        assert_eq!(engine.state().remaining_pool().len(), 3);
        assert_eq!(
            engine.state().current_question(),
            engine.state().remaining_pool().first()
        );
        assert_eq!(engine.bank_size(), Some(3));
    }

    #[tokio::test]
    async fn select_moves_to_selected_and_can_change() {
        let mut engine = build_engine(2).await;
        engine.select_answer(0).unwrap();
        assert_eq!(engine.phase(), SubmissionPhase::Selected);
        engine.select_answer(2).unwrap();
        assert_eq!(engine.state().selected_answer(), Some(2));
    }

    #[tokio::test]
    async fn out_of_range_selection_is_rejected() {
        let mut engine = build_engine(2).await;
        engine.select_answer(1).unwrap();
        let before = engine.state().clone();

        let err = engine.select_answer(3).unwrap_err();
        assert!(matches!(
            err,
            QuizError::InvalidSelection {
                index: 3,
                available: 3
            }
        ));
        assert_eq!(engine.state(), &before);
    }

    #[tokio::test]
    async fn submit_without_selection_is_ignored() {
        let mut engine = build_engine(2).await;
        let before = engine.state().clone();
        assert_eq!(engine.submit().await, None);
        assert_eq!(engine.state(), &before);
    }

    #[tokio::test]
    async fn correct_submit_removes_question() {
        let mut engine = build_engine(3).await;
        let current = engine.state().current_question().unwrap().clone();
        engine.select_answer(correct_index(&engine)).unwrap();

        assert_eq!(engine.submit().await, Some(Judgment::Correct));
        assert_eq!(engine.phase(), SubmissionPhase::Submitted);
        assert_eq!(engine.state().correct_count(), 1);
        assert_eq!(engine.state().remaining_pool().len(), 2);
        assert!(!engine.state().remaining_pool().contains(&current));
        // Still presented until advance.
        assert_eq!(engine.state().current_question(), Some(&current));
    }

    #[tokio::test]
    async fn wrong_submit_keeps_question_in_pool() {
        let mut engine = build_engine(3).await;
        let current = engine.state().current_question().unwrap().clone();
        engine.select_answer(wrong_index(&engine)).unwrap();

        assert_eq!(engine.submit().await, Some(Judgment::Incorrect));
        assert_eq!(engine.state().incorrect_count(), 1);
        assert_eq!(engine.state().remaining_pool().len(), 3);
        assert!(engine.state().remaining_pool().contains(&current));
        assert_ne!(engine.state().remaining_pool()[0], current);
    }

    #[tokio::test]
    async fn second_submit_does_not_double_count() {
        let mut engine = build_engine(2).await;
        engine.select_answer(correct_index(&engine)).unwrap();
        engine.submit().await;
        assert_eq!(engine.submit().await, None);
        assert_eq!(engine.score().answered(), 1);
    }

    #[tokio::test]
    async fn selection_after_submit_is_ignored() {
        let mut engine = build_engine(2).await;
        let wrong = wrong_index(&engine);
        engine.select_answer(wrong).unwrap();
        engine.submit().await;
        engine.select_answer(correct_index(&engine)).unwrap();
        assert_eq!(engine.state().selected_answer(), Some(wrong));
    }

    #[tokio::test]
    async fn advance_requires_submission() {
        let mut engine = build_engine(2).await;
        assert!(!engine.advance());
        engine.select_answer(0).unwrap();
        assert!(!engine.advance());
        assert_eq!(engine.phase(), SubmissionPhase::Selected);
    }

    #[tokio::test]
    async fn advance_clears_transient_state() {
        let mut engine = build_engine(2).await;
        engine.select_answer(correct_index(&engine)).unwrap();
        engine.toggle_reveal();
        engine.submit().await;
        assert!(engine.advance());

        let state = engine.state();
        assert_eq!(state.selected_answer(), None);
        assert!(!state.is_submitted());
        assert_eq!(state.last_judgment(), None);
        assert!(!state.is_revealed());
        assert_eq!(state.current_question(), state.remaining_pool().first());
    }

    #[tokio::test]
    async fn answering_everything_exhausts_the_pool() {
        let mut engine = build_engine(3).await;
        while engine.phase() != SubmissionPhase::Exhausted {
            engine.select_answer(correct_index(&engine)).unwrap();
            engine.submit().await;
            engine.advance();
        }
        assert!(engine.state().remaining_pool().is_empty());
        assert_eq!(engine.state().current_question(), None);
        assert_eq!(engine.score(), Score::new(3, 0));

        assert!(engine.select_answer(0).is_err());
        assert_eq!(engine.submit().await, None);
        assert!(!engine.toggle_reveal());
    }

    #[tokio::test]
    async fn reveal_toggles_without_scoring() {
        let mut engine = build_engine(1).await;
        assert!(engine.toggle_reveal());
        assert!(engine.state().is_revealed());
        assert!(engine.toggle_reveal());
        assert!(!engine.state().is_revealed());
        assert_eq!(engine.score(), Score::default());
    }

    #[tokio::test]
    async fn volatile_fallback_is_reported_as_degraded() {
        let mut engine = build_engine(2).await;
        assert!(!engine.persistence_degraded());

        engine.mark_persistence_degraded();
        assert!(engine.persistence_degraded());
        assert!(QuizView::from_engine(&engine).persistence_degraded);

        engine.select_answer(correct_index(&engine)).unwrap();
        assert_eq!(engine.submit().await, Some(Judgment::Correct));
        assert!(engine.persistence_degraded());
    }

    #[tokio::test]
    async fn reset_supersedes_submission() {
        let mut engine = build_engine(3).await;
        engine.select_answer(wrong_index(&engine)).unwrap();
        engine.submit().await;

        engine.reset().await.unwrap();
        assert_eq!(engine.phase(), SubmissionPhase::Unanswered);
        assert_eq!(engine.score(), Score::default());
        assert_eq!(engine.state().remaining_pool().len(), 3);
    }
}
