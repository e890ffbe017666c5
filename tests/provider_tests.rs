//! Provider clients against mocked HTTP servers.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use talkpdf::llm::openai::OpenAIClient;
use talkpdf::rag::embeddings::{EmbeddingProvider, OllamaEmbeddings, OpenAIEmbeddings};
use talkpdf::rag::index::{EmbeddingIndex, IndexOptions};
use talkpdf::types::{AppError, Chunk};
use talkpdf::utils::retry::RetryPolicy;
use talkpdf::LLMClient;

const TIMEOUT: Duration = Duration::from_secs(5);

fn openai_embeddings(server: &MockServer) -> OpenAIEmbeddings {
    OpenAIEmbeddings::new(
        "sk-test".to_string(),
        format!("{}/v1", server.uri()),
        "text-embedding-3-small".to_string(),
        TIMEOUT,
    )
}

fn chunk(position: usize, text: &str) -> Chunk {
    Chunk {
        position,
        document_id: "doc.pdf".to_string(),
        page: 1,
        offset: 0,
        text: text.to_string(),
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        timeout: TIMEOUT,
    }
}

// ============= OpenAI embeddings =============

#[tokio::test]
async fn test_openai_embeddings_ordered_by_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "object": "embedding", "index": 1, "embedding": [0.0, 1.0] },
                { "object": "embedding", "index": 0, "embedding": [1.0, 0.0] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = openai_embeddings(&server)
        .embed_batch(&["first", "second"])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_openai_embeddings_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = openai_embeddings(&server).embed("hello").await.unwrap_err();

    match err {
        AppError::EmbeddingProvider(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("Incorrect API key provided"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_embeddings_empty_batch_skips_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let vectors = openai_embeddings(&server).embed_batch(&[]).await.unwrap();
    assert!(vectors.is_empty());
}

// ============= Ollama embeddings =============

#[tokio::test]
async fn test_ollama_embeddings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "nomic-embed-text", "input": ["hello"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2, 0.3]]
        })))
        .mount(&server)
        .await;

    let provider = OllamaEmbeddings::new(server.uri(), "nomic-embed-text".to_string(), TIMEOUT);
    let vector = provider.embed("hello").await.unwrap();

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    assert_eq!(provider.dimensions(), None);
}

#[tokio::test]
async fn test_ollama_embeddings_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let provider = OllamaEmbeddings::new(server.uri(), "missing".to_string(), TIMEOUT);
    let err = provider.embed("hello").await.unwrap_err();

    assert!(matches!(err, AppError::EmbeddingProvider(ref m) if m.contains("model not found")));
}

// ============= Index build over HTTP =============

#[tokio::test]
async fn test_index_build_rejects_count_mismatch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0]]
        })))
        .mount(&server)
        .await;

    let provider = OllamaEmbeddings::new(server.uri(), "nomic-embed-text".to_string(), TIMEOUT);
    let options = IndexOptions {
        retry: RetryPolicy::none(TIMEOUT),
        ..IndexOptions::default()
    };

    let err = EmbeddingIndex::build(&provider, vec![chunk(0, "a"), chunk(1, "b")], &options)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::EmbeddingProvider(ref m) if m.contains("expected 2")));
}

#[tokio::test]
async fn test_index_build_retries_transient_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0], [0.0, 1.0]]
        })))
        .mount(&server)
        .await;

    let provider = OllamaEmbeddings::new(server.uri(), "nomic-embed-text".to_string(), TIMEOUT);
    let options = IndexOptions {
        retry: fast_retry(3),
        ..IndexOptions::default()
    };

    let index = EmbeddingIndex::build(&provider, vec![chunk(0, "a"), chunk(1, "b")], &options)
        .await
        .unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.dimensions(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

// ============= OpenAI chat =============

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "Answer from context." },
                { "role": "user", "content": "What color is the sky?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "The sky is blue." },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let client = OpenAIClient::new(
        "sk-test".to_string(),
        format!("{}/v1", server.uri()),
        "gpt-4o-mini".to_string(),
        TIMEOUT,
    );

    let history = vec![
        ("system".to_string(), "Answer from context.".to_string()),
        ("user".to_string(), "What color is the sky?".to_string()),
    ];
    let answer = client.generate_with_history(&history).await.unwrap();

    assert_eq!(answer, "The sky is blue.");
}

#[tokio::test]
async fn test_openai_chat_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = OpenAIClient::new(
        "sk-test".to_string(),
        format!("{}/v1", server.uri()),
        "gpt-4o-mini".to_string(),
        TIMEOUT,
    );

    let err = client.generate("hello").await.unwrap_err();
    assert!(matches!(err, AppError::Generation(ref m) if m.contains("upstream exploded")));
}

// ============= Ollama chat =============

#[cfg(feature = "ollama")]
mod ollama_chat {
    use super::*;
    use talkpdf::llm::ollama::OllamaClient;

    fn mock_chat_response(content: &str) -> serde_json::Value {
        json!({
            "model": "llama3.2",
            "created_at": "2024-01-01T00:00:00Z",
            "message": { "role": "assistant", "content": content },
            "done": true
        })
    }

    #[tokio::test]
    async fn test_ollama_chat() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3.2",
                "messages": [
                    { "role": "system", "content": "Answer from context." },
                    { "role": "user", "content": "What color is the sky?" }
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_chat_response("The sky is blue.")),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), "llama3.2".to_string()).unwrap();
        let answer = client
            .generate_with_history(&[
                ("system".to_string(), "Answer from context.".to_string()),
                ("user".to_string(), "What color is the sky?".to_string()),
            ])
            .await
            .unwrap();

        assert_eq!(answer, "The sky is blue.");
    }

    #[tokio::test]
    async fn test_ollama_chat_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), "llama3.2".to_string()).unwrap();
        let err = client.generate("hello").await.unwrap_err();

        assert!(matches!(err, AppError::Generation(_)));
    }
}
