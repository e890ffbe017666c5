//! Fakes for the provider and parser seams.
//!
//! None of these touch the network or real PDF files, so session and API
//! tests run deterministically.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use talkpdf::llm::LLMClient;
use talkpdf::rag::prompt::REFUSAL;
use talkpdf::types::{AppError, Document, Page, Result};
use talkpdf::{EmbeddingProvider, PdfParser};

const DIMENSIONS: usize = 64;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "does", "do", "how", "in", "is", "it", "of", "on", "say", "the",
    "to", "was", "what", "which", "who", "why", "color", "colour",
];

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

// ============= PDF parser =============

/// Treats uploads as UTF-8 text with form feeds between pages.
///
/// Content starting with `CORRUPT` or that is not UTF-8 is unreadable.
pub struct TextPdfParser;

impl PdfParser for TextPdfParser {
    fn parse(&self, document: &Document) -> Result<Vec<Page>> {
        let text = std::str::from_utf8(&document.content).map_err(|_| {
            AppError::UnreadableDocument(format!("'{}': not a readable PDF", document.id))
        })?;
        if text.starts_with("CORRUPT") {
            return Err(AppError::UnreadableDocument(format!(
                "'{}': not a readable PDF",
                document.id
            )));
        }

        Ok(text
            .split('\x0c')
            .enumerate()
            .map(|(i, page)| Page {
                document_id: document.id.clone(),
                number: i as u32 + 1,
                text: page.to_string(),
            })
            .collect())
    }
}

// ============= Embeddings =============

/// Bag-of-words vectors hashed into a fixed number of buckets
pub struct HashingEmbedder {
    calls: AtomicUsize,
    /// Calls with an index at or past this one fail
    fail_from: Option<usize>,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_from: None,
        }
    }

    /// Every call fails as if the provider were unreachable
    pub fn failing() -> Self {
        Self::failing_after(0)
    }

    /// The first `ok_calls` batch calls succeed, the rest fail
    pub fn failing_after(ok_calls: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_from: Some(ok_calls),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIMENSIONS];
        // Constant component so that no vector is all zeros
        vector[0] = 0.1;
        for word in words(text) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            vector[(hasher.finish() as usize) % DIMENSIONS] += 1.0;
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|from| call >= from) {
            return Err(AppError::EmbeddingProvider(
                "mock: connection refused".to_string(),
            ));
        }
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> Option<usize> {
        Some(DIMENSIONS)
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

// ============= LLM clients =============

/// Fixed-response LLM client
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        if self.should_fail {
            return Err(AppError::Generation("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    async fn generate_with_history(&self, _messages: &[(String, String)]) -> Result<String> {
        self.generate("").await
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Answers with the context sentence sharing a keyword with the question,
/// or the refusal sentence when none does.
pub struct KeywordLLM;

impl KeywordLLM {
    fn answer(prompt: &str) -> String {
        let context = prompt
            .split_once("Context:\n")
            .and_then(|(_, rest)| rest.split_once("\n\nQuestion: "))
            .map(|(context, _)| context)
            .unwrap_or("");
        let question = prompt
            .split_once("Question: ")
            .and_then(|(_, rest)| rest.lines().next())
            .unwrap_or("");

        let keywords: Vec<String> = words(question)
            .into_iter()
            .filter(|w| !STOPWORDS.contains(&w.as_str()))
            .collect();

        context
            .split_inclusive(['.', '!', '?'])
            .map(str::trim)
            .find(|sentence| {
                let sentence_words = words(sentence);
                keywords.iter().any(|k| sentence_words.contains(k))
            })
            .map(str::to_string)
            .unwrap_or_else(|| REFUSAL.to_string())
    }
}

#[async_trait]
impl LLMClient for KeywordLLM {
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(Self::answer(prompt))
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let prompt = messages.last().map(|(_, c)| c.as_str()).unwrap_or("");
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

// ============= mockall =============

mockall::mock! {
    pub Parser {}

    impl PdfParser for Parser {
        fn parse(&self, document: &Document) -> Result<Vec<Page>>;
    }
}
