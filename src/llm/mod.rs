//! LLM Provider Clients and Abstractions
//!
//! Provider-specific clients sit behind the [`LLMClient`] trait; the rest of
//! the application only ever holds a `dyn LLMClient`.
//!
//! # Supported Providers
//!
//! - OpenAI chat completions (always available)
//! - Ollama, behind the `ollama` Cargo feature (on by default)
//!
//! # Example
//!
//! ```ignore
//! use talkpdf::llm::Provider;
//!
//! let provider = Provider::from_config(&config)?;
//! let client = provider.create_client()?;
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

pub mod openai;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use client::{LLMClient, Provider};
