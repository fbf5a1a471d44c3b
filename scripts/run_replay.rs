use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replay_adaptor_terminal::{
    CredentialRule, FileStore, HttpSearchBackend, SearchApp, Settings, SettingsStore,
    TerminalClient, VideoSource, DEFAULT_CREDENTIAL_LENGTH,
};
use replay_adaptor_web::{SearchApiConfig, SearchApiServer};
use replay_core::utils::logger::init_logging_with_level;
use replay_core::{
    load_env, QueryEmbedder, RetryPolicy, RetryingEmbedder, SearchConfig, SearchPipeline,
    DEFAULT_EMBEDDING_DIMENSION,
};
use replay_provider_openai::{OpenAiConfig, OpenAiEmbedder};
use replay_storage_supabase::{migrations, SupabaseConfig, SupabaseVectorSearch};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "run-replay",
    about = "Semantic search over the World Cup final, played back from the matching possession"
)]
struct Cli {
    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, env = "REPLAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Serve POST /api/search.
    Serve(ServeArgs),
    /// Interactive terminal client for a running endpoint.
    Client(ClientArgs),
    /// Print the SQL that creates the possessions table and search function.
    Schema {
        /// Embedding dimension of the vector column.
        #[arg(long, env = "REPLAY_EMBEDDING_DIMENSION", default_value_t = DEFAULT_EMBEDDING_DIMENSION)]
        embedding_dimension: usize,
    },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Host to bind.
    #[arg(long, env = "REPLAY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "REPLAY_PORT", default_value_t = 3000)]
    port: u16,

    /// Supabase project URL.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    /// Supabase service role key.
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_key: String,

    /// Embedding model identifier.
    #[arg(long, env = "REPLAY_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// Base URL for OpenAI-compatible endpoints.
    #[arg(long, env = "REPLAY_OPENAI_BASE", default_value = "https://api.openai.com/v1")]
    openai_base_url: String,

    /// Attempts per embedding call; retries only on 503.
    #[arg(long, env = "REPLAY_EMBED_MAX_ATTEMPTS", default_value_t = 1)]
    embed_max_attempts: u32,

    /// Disable the permissive CORS layer.
    #[arg(long)]
    no_cors: bool,
}

#[derive(clap::Args, Debug)]
struct ClientArgs {
    /// Search endpoint URL.
    #[arg(long, env = "REPLAY_ENDPOINT", default_value = "http://127.0.0.1:3000/api/search")]
    endpoint: String,

    /// Video the player mounts.
    #[arg(long, env = "REPLAY_VIDEO_SRC", default_value = "final.mp4")]
    video_src: String,

    /// Video length in seconds.
    #[arg(long, env = "REPLAY_VIDEO_DURATION", default_value_t = 12935.0)]
    video_duration: f64,

    /// File holding the saved API key and match count.
    #[arg(long, env = "REPLAY_SETTINGS_FILE", default_value = ".replay/settings.json")]
    settings_file: String,

    /// Exact length a valid API key has.
    #[arg(long, env = "REPLAY_CREDENTIAL_LENGTH", default_value_t = DEFAULT_CREDENTIAL_LENGTH)]
    credential_length: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env().context("failed to load .env")?;
    let cli = Cli::parse();
    init_logging_with_level(&cli.log_level);

    match cli.command {
        Mode::Serve(args) => serve(args).await,
        Mode::Client(args) => client(args).await,
        Mode::Schema {
            embedding_dimension,
        } => {
            for statement in migrations::all(embedding_dimension) {
                println!("{}\n", statement.trim());
            }
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = SearchConfig::from_env();

    let openai = OpenAiEmbedder::new(
        OpenAiConfig::default()
            .with_base_url(&args.openai_base_url)
            .with_model(&args.embedding_model),
    )
    .context("failed to build embedding client")?;

    let embedder: Arc<dyn QueryEmbedder> = if args.embed_max_attempts > 1 {
        let policy = RetryPolicy::transient_unavailable().with_max_attempts(args.embed_max_attempts);
        Arc::new(RetryingEmbedder::new(Arc::new(openai), policy))
    } else {
        Arc::new(openai)
    };

    let search = SupabaseVectorSearch::new(
        SupabaseConfig::new(&args.supabase_url, &args.supabase_key)
            .with_embedding_dimension(config.embedding_dimension),
    )
    .context("failed to build Supabase client")?;

    info!(
        "Up to {} matches per request, {}-dimension embeddings",
        config.max_match_count, config.embedding_dimension
    );
    let pipeline = SearchPipeline::new(embedder, Arc::new(search), config);

    let mut server = SearchApiServer::new(
        SearchApiConfig {
            host: args.host,
            port: args.port,
            enable_cors: !args.no_cors,
        },
        pipeline,
    );
    server.start().await.context("failed to start search endpoint")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");
    server.stop().await?;
    Ok(())
}

async fn client(args: ClientArgs) -> Result<()> {
    let store = Arc::new(FileStore::new(&args.settings_file));
    let settings = Settings::load(store.as_ref())
        .with_context(|| format!("failed to read {}", args.settings_file))?;
    let store: Arc<dyn SettingsStore> = store;

    let backend = HttpSearchBackend::new(&args.endpoint)?;
    info!("Searching via {}", backend.endpoint());

    let app = SearchApp::new(
        Arc::new(backend),
        store,
        settings,
        VideoSource {
            src: args.video_src,
            duration: args.video_duration,
        },
    )
    .with_credential_rule(CredentialRule {
        expected_len: args.credential_length,
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    TerminalClient::new(app, std::io::stdout()).run(stdin).await?;
    Ok(())
}
