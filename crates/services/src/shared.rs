use std::sync::Arc;

use tokio::sync::Mutex;

use crate::engine::{QuizEngine, SessionState};
use crate::error::QuizError;
use crate::view::QuizView;

/// User intents forwarded by the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizIntent {
    Select(usize),
    Submit,
    Advance,
    ToggleReveal,
    Reset,
}

/// Cloneable handle that runs one intent at a time against a single engine.
///
/// Intents that arrive while a bank fetch or store write is in flight wait
/// for the lock in arrival order, so overlapping submits are judged once.
#[derive(Clone)]
pub struct SharedQuiz {
    engine: Arc<Mutex<QuizEngine>>,
}

impl SharedQuiz {
    #[must_use]
    pub fn new(engine: QuizEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Apply an intent and return the view that results.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidSelection` for an out-of-range `Select` and
    /// `QuizError::Load` when `Reset` cannot fetch the bank. The session is
    /// unchanged in both cases.
    pub async fn dispatch(&self, intent: QuizIntent) -> Result<QuizView, QuizError> {
        let mut engine = self.engine.lock().await;
        match intent {
            QuizIntent::Select(index) => engine.select_answer(index)?,
            QuizIntent::Submit => {
                engine.submit().await;
            }
            QuizIntent::Advance => {
                engine.advance();
            }
            QuizIntent::ToggleReveal => {
                engine.toggle_reveal();
            }
            QuizIntent::Reset => engine.reset().await?,
        }
        Ok(QuizView::from_engine(&engine))
    }

    pub async fn view(&self) -> QuizView {
        let engine = self.engine.lock().await;
        QuizView::from_engine(&engine)
    }

    /// Copy of the raw session state.
    pub async fn snapshot(&self) -> SessionState {
        self.engine.lock().await.state().clone()
    }
}
