use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use talkpdf::{
    api,
    cli::{
        chat,
        init::{self, InitConfig, InitResult},
        output::Output,
        Cli, Commands,
    },
    utils::toml_config::{LogFormat, ProviderConfig, ServerConfig, TalkConfig},
    AppState, Pipeline,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Secrets referenced by api_key_env may live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Init {
            path,
            force,
            provider,
        }) => match init::run(
            InitConfig {
                path,
                force,
                provider,
            },
            output,
        ) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
        },

        Some(Commands::Config { validate }) => {
            let config = TalkConfig::load_or_default(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            if validate {
                output.success(&format!("{} is valid", cli.config.display()));
            } else {
                print_config(&config, output);
            }
            Ok(())
        }

        Some(Commands::Chat { files }) => {
            let config = TalkConfig::load_or_default(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            // Keep the terminal quiet unless asked otherwise
            init_tracing(&config.server, if cli.verbose { "debug" } else { "warn" });

            let pipeline = Arc::new(Pipeline::from_config(&config)?);
            chat::run(pipeline, &files, output).await?;
            Ok(())
        }

        Some(Commands::Serve) | None => {
            let config = TalkConfig::load_or_default(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            let level = if cli.verbose {
                "debug".to_string()
            } else {
                config.server.log_level.clone()
            };
            init_tracing(&config.server, &level);
            serve(config).await
        }
    }
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(server: &ServerConfig, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: TalkConfig) -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let bind_address = config.bind_address();
    let ttl = Duration::from_secs(config.server.session_ttl_secs);

    let state = AppState::new(config, pipeline);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval((ttl / 4).max(Duration::from_secs(30)));
        loop {
            sweep.tick().await;
            sweeper.sweep().await;
        }
    });

    let app = api::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {}", bind_address))?;
    info!(address = %bind_address, "talkpdf listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

fn print_config(config: &TalkConfig, output: &Output) {
    output.header("Server");
    output.kv("address", &config.bind_address());
    output.kv("log_level", &config.server.log_level);
    output.kv("max_upload_mb", &config.server.max_upload_mb.to_string());
    output.kv("session_ttl_secs", &config.server.session_ttl_secs.to_string());

    for (title, provider) in [("Embeddings", &config.embeddings), ("LLM", &config.llm)] {
        output.header(title);
        output.kv("provider", provider.name());
        output.kv("model", provider.model());
        match provider {
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                ..
            } => {
                output.kv("api_base", api_base);
                let status = if config.resolve_env(api_key_env).is_some() {
                    "set"
                } else {
                    "NOT SET"
                };
                output.kv(api_key_env, status);
            }
            ProviderConfig::Ollama { base_url, .. } => output.kv("base_url", base_url),
        }
    }

    let rag = &config.rag;
    output.header("Retrieval");
    output.kv("chunk_size", &rag.chunk_size.to_string());
    output.kv("chunk_overlap", &rag.chunk_overlap.to_string());
    output.kv("top_k", &rag.top_k.to_string());
    output.kv("max_context_chars", &rag.max_context_chars.to_string());
    output.kv("metric", &format!("{:?}", rag.metric));
    output.kv("condense_question", &rag.condense_question.to_string());

    output.header("Retry");
    output.kv("max_attempts", &config.retry.max_attempts.to_string());
    output.kv("timeout_secs", &config.retry.timeout_secs.to_string());
    output.newline();
}
