//! Prompt assembly for grounded answers.

use crate::rag::index::ScoredChunk;
use crate::types::ConversationTurn;

/// Reply the model is told to give for questions outside the documents
pub const REFUSAL: &str = "I can only answer questions related to the provided PDF content.";

const CHUNK_SEPARATOR: &str = "\n\n";

/// Join ranked chunk texts into one context block of at most `max_chars`
/// characters.
///
/// Lower-ranked chunks are dropped first and a chunk is never cut. The top
/// chunk is always kept, even when it alone exceeds the budget. Returns the
/// block and how many chunks it holds.
pub fn build_context(ranked: &[ScoredChunk], max_chars: usize) -> (String, usize) {
    let mut context = String::new();
    let mut used_chars = 0;
    let mut used = 0;

    for scored in ranked {
        let text = scored.chunk.text.as_str();
        let cost = text.chars().count()
            + if used == 0 {
                0
            } else {
                CHUNK_SEPARATOR.len()
            };

        if used > 0 && used_chars + cost > max_chars {
            break;
        }

        if used > 0 {
            context.push_str(CHUNK_SEPARATOR);
        }
        context.push_str(text);
        used_chars += cost;
        used += 1;
    }

    (context, used)
}

/// Final user message: context, question and the answer-only-from-context rule
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions using the provided PDF context.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer only from the context above. Do not answer questions that are not related to \
         the PDF content. If the question is unrelated, respond with \"{REFUSAL}\""
    )
}

/// Prior turns as alternating user/assistant messages
pub fn history_messages(history: &[ConversationTurn]) -> Vec<(String, String)> {
    history
        .iter()
        .flat_map(|turn| {
            [
                ("user".to_string(), turn.question.clone()),
                ("assistant".to_string(), turn.answer.clone()),
            ]
        })
        .collect()
}

/// Asks the model to turn a follow-up into a self-contained question
pub fn build_condense_prompt(history: &[ConversationTurn], question: &str) -> String {
    let transcript: Vec<String> = history
        .iter()
        .map(|t| format!("Human: {}\nAssistant: {}", t.question, t.answer))
        .collect();

    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
         question to be a standalone question. Reply with the question only.\n\n\
         Chat History:\n{}\n\n\
         Follow Up Input: {}\n\
         Standalone question:",
        transcript.join("\n"),
        question
    )
}
