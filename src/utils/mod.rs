/// Bounded retry with backoff for provider calls.
pub mod retry;
/// TOML configuration loading and validation.
pub mod toml_config;
