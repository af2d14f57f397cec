use anyhow::Result;
use axum::Router;
use clap::Parser;
use picsearch_core::config::DEFAULT_FIELD;
use picsearch_core::{MissingSurrogatePolicy, SearchConfig};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use server::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./image_index")]
    index: String,
    /// Textual surrogate JSON file, re-read on every search
    #[arg(long, default_value = "./textual_surrogates.json")]
    surrogates: String,
    /// Index field queries are matched against
    #[arg(long, default_value = DEFAULT_FIELD)]
    field: String,
    /// What to do when a result has no surrogate: fail or score-zero
    #[arg(long, default_value_t = MissingSurrogatePolicy::Fail)]
    missing_surrogate: MissingSurrogatePolicy,
    /// Cap on results fetched from the index (unlimited when omitted)
    #[arg(long)]
    limit: Option<usize>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = SearchConfig { field: args.field, missing_surrogate: args.missing_surrogate, limit: args.limit };
    let app: Router = build_app(&args.index, &args.surrogates, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
