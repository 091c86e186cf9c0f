use serde::{Deserialize, Serialize};

/// Outcome recorded for a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgment {
    Correct,
    Incorrect,
}

impl Judgment {
    #[must_use]
    pub fn from_correct(is_correct: bool) -> Self {
        if is_correct {
            Self::Correct
        } else {
            Self::Incorrect
        }
    }
}

/// Session counters. Both only grow until the session is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub incorrect: u32,
}

impl Score {
    #[must_use]
    pub fn new(correct: u32, incorrect: u32) -> Self {
        Self { correct, incorrect }
    }

    /// Number of submissions recorded.
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    pub fn record(&mut self, judgment: Judgment) {
        match judgment {
            Judgment::Correct => self.correct = self.correct.saturating_add(1),
            Judgment::Incorrect => self.incorrect = self.incorrect.saturating_add(1),
        }
    }

    /// Share of submissions that were correct, in whole percent.
    #[must_use]
    pub fn percent_of_answered(&self) -> Option<u32> {
        percent(self.correct, self.answered())
    }

    /// Correct answers as a share of everything seen so far plus what is still
    /// waiting in the pool.
    #[must_use]
    pub fn percent_of_total(&self, remaining: usize) -> Option<u32> {
        let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
        percent(self.correct, self.answered().saturating_add(remaining))
    }
}

fn percent(part: u32, whole: u32) -> Option<u32> {
    if whole == 0 {
        return None;
    }
    let scaled = u64::from(part) * 100 / u64::from(whole);
    u32::try_from(scaled).ok()
}
