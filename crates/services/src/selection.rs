//! Pure shuffle and rotation helpers.
//!
//! Every function takes its random source explicitly so tests can pass a
//! seeded generator.

use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::Question;

/// Returns the questions in a uniformly random order.
pub fn shuffle_questions<R: Rng + ?Sized>(questions: &[Question], rng: &mut R) -> Vec<Question> {
    let mut shuffled = questions.to_vec();
    shuffled.as_mut_slice().shuffle(rng);
    shuffled
}

/// Returns a copy of `question` with its answers in a uniformly random order.
pub fn shuffle_answers<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Question {
    let mut order: Vec<usize> = (0..question.answer_count()).collect();
    order.shuffle(rng);
    question.with_answer_order(&order)
}

/// Builds a fresh session pool: question order and every answer order are
/// permuted independently.
pub fn prepare_pool<R: Rng + ?Sized>(bank: &[Question], rng: &mut R) -> Vec<Question> {
    shuffle_questions(bank, rng)
        .iter()
        .map(|question| shuffle_answers(question, rng))
        .collect()
}

/// Moves the question at `index` to a random later slot so another question
/// comes up first whenever one exists.
///
/// Out-of-range indices return the pool unchanged.
pub fn requeue<R: Rng + ?Sized>(pool: &[Question], index: usize, rng: &mut R) -> Vec<Question> {
    let mut next = pool.to_vec();
    if index >= next.len() {
        return next;
    }
    let question = next.remove(index);
    let slot = if next.is_empty() {
        0
    } else {
        rng.random_range(1..=next.len())
    };
    next.insert(slot, question);
    next
}
