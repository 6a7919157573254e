use clap::Parser;
use notebridge::cli::{
    handle_create, handle_delete, handle_get, handle_health, handle_list, handle_recent,
    handle_search, handle_stats, handle_tags, handle_update, handle_validate, Cli, Commands,
};
use notebridge::{ClientConfig, Result, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.base_url = server;
    }
    let session = Session::new(config)?;

    match cli.command {
        Commands::List {
            query,
            tag,
            sort,
            order,
            json,
        } => handle_list(&session, query, tag, sort, order, json).await,
        Commands::Get { id, json } => handle_get(&session, id, json).await,
        Commands::Create {
            title,
            content,
            stdin,
            tags,
            json,
        } => handle_create(&session, title, content, stdin, tags, json).await,
        Commands::Update {
            id,
            title,
            content,
            stdin,
            tags,
            json,
        } => handle_update(&session, id, title, content, stdin, tags, json).await,
        Commands::Delete { id, json } => handle_delete(&session, id, json).await,
        Commands::Search { query, rag, json } => handle_search(&session, query, rag, json).await,
        Commands::Tags { tag, json } => handle_tags(&session, tag, json).await,
        Commands::Recent { limit, json } => handle_recent(&session, limit, json).await,
        Commands::Validate {
            title,
            content,
            stdin,
            tags,
            json,
        } => handle_validate(&session, title, content, stdin, tags, json).await,
        Commands::Stats { json } => handle_stats(&session, json).await,
        Commands::Health { full, json } => handle_health(&session, full, json).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,notebridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
