use std::fmt;

use quiz_core::model::Judgment;
use services::{AnswerMark, CitationView, QuizIntent, QuizView};

/// A line of user input, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Intent(QuizIntent),
    Help,
    Quit,
}

/// Decode one input line. Answers are numbered from 1 on screen.
pub fn parse_command(line: &str) -> Option<Command> {
    let input = line.trim().to_lowercase();
    let command = match input.as_str() {
        "s" | "submit" => Command::Intent(QuizIntent::Submit),
        "n" | "next" => Command::Intent(QuizIntent::Advance),
        "r" | "reveal" => Command::Intent(QuizIntent::ToggleReveal),
        "reset" => Command::Intent(QuizIntent::Reset),
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        other => {
            let number: usize = other.parse().ok()?;
            Command::Intent(QuizIntent::Select(number.checked_sub(1)?))
        }
    };
    Some(command)
}

pub fn render_help() -> &'static str {
    "Commands: <number> choose answer | s submit | n next | r show/hide source | reset | q quit"
}

pub fn render_view(view: &QuizView) -> String {
    Screen(view).to_string()
}

/// Plain-text layout of one session snapshot.
struct Screen<'a>(&'a QuizView);

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;
        let Some(question) = &view.question else {
            return write_final_score(f, view);
        };

        if let Some(ordinal) = view.ordinal {
            writeln!(f, "Question {ordinal}/{}", view.total)?;
        }
        writeln!(f, "{}", question.text)?;
        for answer in &question.answers {
            let pointer = if answer.selected { '>' } else { ' ' };
            let mark = match answer.mark {
                AnswerMark::Unjudged => "",
                AnswerMark::Correct => "  [correct]",
                AnswerMark::Wrong => "  [your answer]",
            };
            writeln!(f, "{pointer} {}. {}{mark}", answer.index + 1, answer.text)?;
        }

        match question.judgment {
            Some(Judgment::Correct) => writeln!(f, "Correct!")?,
            Some(Judgment::Incorrect) => writeln!(f, "Not quite. This one will come back later.")?,
            None => {}
        }

        if let Some(citation) = &question.citation {
            write_citation(f, citation)?;
        }

        write!(
            f,
            "Correct: {}  Incorrect: {}  Remaining: {}",
            view.score.correct, view.score.incorrect, view.remaining
        )?;
        if view.persistence_degraded {
            write!(f, "\n(progress is not being saved)")?;
        }
        Ok(())
    }
}

fn write_final_score(f: &mut fmt::Formatter<'_>, view: &QuizView) -> fmt::Result {
    writeln!(
        f,
        "All questions answered. You scored {} out of {}.",
        view.score.correct,
        view.score.answered()
    )?;
    if let Some(percent) = view.score.percent_of_answered() {
        writeln!(f, "Accuracy: {percent}% of answers were correct")?;
    }
    write!(f, "Type `reset` to start over.")
}

fn write_citation(f: &mut fmt::Formatter<'_>, citation: &CitationView) -> fmt::Result {
    if !citation.quote.is_empty() {
        writeln!(f, "  \"{}\"", citation.quote)?;
    }
    match &citation.url {
        Some(url) => writeln!(f, "  Source: {} ({url}), page {}", citation.paragraph, citation.page),
        None => writeln!(f, "  Source: {}, page {}", citation.paragraph, citation.page),
    }
}
