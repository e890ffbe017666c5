//! Lexical grounding check for generated answers.
//!
//! Reports the share of an answer's content words that also appear in the
//! context the model was given. Only a heuristic: it is logged and returned
//! to the caller, never used to reject an answer.

use std::collections::HashSet;

use crate::rag::prompt::REFUSAL;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "i",
    "in", "is", "it", "its", "of", "on", "or", "that", "the", "their", "there", "these", "this",
    "to", "was", "were", "what", "which", "with", "you", "your",
];

fn content_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

/// Fraction in `[0, 1]` of the answer's content words found in `context`.
///
/// The refusal sentence and answers without content words score `1.0`.
pub fn context_overlap(answer: &str, context: &str) -> f32 {
    if answer.trim() == REFUSAL {
        return 1.0;
    }

    let vocabulary: HashSet<String> = content_words(context).collect();
    let words: Vec<String> = content_words(answer).collect();
    if words.is_empty() {
        return 1.0;
    }

    let grounded = words.iter().filter(|w| vocabulary.contains(*w)).count();
    grounded as f32 / words.len() as f32
}
