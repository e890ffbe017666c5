//! Init command implementation
//!
//! Writes a commented `talkpdf.toml`, a `.env.example` and a `.gitignore`.

use super::output::Output;
use super::InitProvider;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// talkpdf.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Provider preset for embeddings and chat
    pub provider: InitProvider,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing talkpdf");

    let base_path = &config.path;

    let config_path = base_path.join("talkpdf.toml");
    if config_path.exists() && !config.force {
        output.warning("talkpdf.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    output.subheader("Creating configuration files");

    let files = [
        ("config", "talkpdf.toml", generate_talkpdf_toml(config.provider)),
        ("env", ".env.example", generate_env_example(config.provider)),
    ];
    for (kind, name, content) in &files {
        match write_file(&base_path.join(name), content, config.force) {
            Ok(true) => output.created(kind, name),
            Ok(false) => output.skipped(name, "already exists"),
            Err(e) => {
                output.error(&format!("Failed to create {}: {}", name, e));
                return InitResult::Error(e.to_string());
            }
        }
    }

    match write_file(&base_path.join(".gitignore"), GITIGNORE, false) {
        Ok(true) => output.created("file", ".gitignore"),
        Ok(false) => output.skipped(".gitignore", "already exists"),
        Err(e) => output.warning(&format!("Failed to create .gitignore: {}", e)),
    }

    output.complete("talkpdf initialized successfully!");

    output.header("Next Steps");
    output.newline();
    match config.provider {
        InitProvider::Openai => {
            output.info("1. Set your OpenAI API key:");
            output.command("cp .env.example .env");
            output.command("# Edit .env and set OPENAI_API_KEY");
        }
        InitProvider::Ollama => {
            output.info("1. Start Ollama and pull the models:");
            output.command("ollama serve");
            output.command("ollama pull llama3.2");
            output.command("ollama pull nomic-embed-text");
        }
    }
    output.newline();
    output.info("2. Start the server:");
    output.command("talkpdf-server");
    output.newline();
    output.info("3. Open http://127.0.0.1:3000, upload PDFs and click Process");

    InitResult::Success
}

/// Returns `false` when an existing file was kept
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_talkpdf_toml(provider: InitProvider) -> String {
    let providers = match provider {
        InitProvider::Openai => {
            r#"# Embeddings: OpenAI (reads the key from OPENAI_API_KEY)
[embeddings]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "text-embedding-3-small"

# Chat model
[llm]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "gpt-5-nano"
"#
        }
        InitProvider::Ollama => {
            r#"# Embeddings: local Ollama server
[embeddings]
type = "ollama"
base_url = "http://localhost:11434"
model = "nomic-embed-text"

# Chat model
[llm]
type = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2"
"#
        }
    };

    format!(
        r#"# talkpdf configuration
# Generated by: talkpdf-server init

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"
# pretty or json
log_format = "pretty"
max_upload_mb = 50
# Idle browser sessions are dropped after this many seconds
session_ttl_secs = 3600
secure_cookies = false

{providers}
[rag]
chunk_size = 1000
chunk_overlap = 200
top_k = 10
# Lowest-ranked chunks are dropped to fit this budget
max_context_chars = 12000
embed_batch_size = 64
# cosine or dotproduct
metric = "cosine"
# Rewrite follow-up questions into standalone ones before retrieval
condense_question = false
grounding_warn_threshold = 0.3

[retry]
max_attempts = 3
initial_backoff_ms = 500
max_backoff_ms = 8000
timeout_secs = 60
"#
    )
}

fn generate_env_example(provider: InitProvider) -> String {
    let key = match provider {
        InitProvider::Openai => "OPENAI_API_KEY=sk-...\n",
        InitProvider::Ollama => "# OPENAI_API_KEY=sk-...\n",
    };

    format!(
        "# talkpdf environment variables\n\
         # Copy this file to .env and fill in the values.\n\n\
         {key}\n\
         # Optional: log filter, overrides server.log_level\n\
         RUST_LOG=info,talkpdf=debug\n"
    )
}

const GITIGNORE: &str = r#"# Environment
.env
.env.local

# Rust
/target/
"#;
