use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;

use smart_librarian::cli::{AskArgs, Cli, Command, CorpusArgs, SearchArgs, ServeArgs};
use smart_librarian::config::LibrarianConfig;
use smart_librarian::librarian::Librarian;
use smart_librarian::server::{AppState, router};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    smart_librarian::logging::init(smart_librarian::logging::DEFAULT_FILTER)
        .context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Serve(args) => serve(args).await.context("serve")?,
        Command::Ask(args) => ask(args).await.context("ask")?,
        Command::Search(args) => search(args).await.context("search")?,
        Command::Titles(args) => titles(args).await.context("titles")?,
        Command::Detail(args) => {
            let details = smart_librarian::details::DetailTable::builtin();
            println!("{}", details.detailed_summary(&args.title));
        }
    }

    Ok(())
}

fn load_config(corpus: &CorpusArgs) -> anyhow::Result<LibrarianConfig> {
    let mut config = LibrarianConfig::from_env().context("load config from environment")?;
    corpus.apply(&mut config);
    Ok(config)
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args.corpus)?;
    let librarian = Librarian::from_config(&config)
        .await
        .context("initialize librarian")?;
    tracing::info!(
        books = librarian.index().len().await,
        model = %config.chat_model,
        embedding = ?config.embedding,
        "librarian ready"
    );

    let app = router(AppState {
        librarian: Arc::new(librarian),
        corpus_path: config.corpus_path.clone(),
        chat_timeout: config.chat_timeout,
    });

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn ask(args: AskArgs) -> anyhow::Result<()> {
    let config = load_config(&args.corpus)?;
    let librarian = Librarian::from_config(&config)
        .await
        .context("initialize librarian")?;

    let result = tokio::time::timeout(config.chat_timeout, librarian.recommend(&args.message))
        .await
        .map_err(|_| anyhow::anyhow!("timed out after {:?}", config.chat_timeout))??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.response_text);
    if !result.recommended().is_empty() {
        println!();
        println!("Recommended: {}", result.recommended().join(", "));
    }
    Ok(())
}

async fn search(args: SearchArgs) -> anyhow::Result<()> {
    let config = load_config(&args.corpus)?;
    let librarian = Librarian::from_config(&config)
        .await
        .context("initialize librarian")?;

    let hits = librarian.search(&args.query, args.limit).await?;
    for hit in hits {
        println!("{}", serde_json::to_string(&hit)?);
    }
    Ok(())
}

async fn titles(args: CorpusArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let librarian = Librarian::from_config(&config)
        .await
        .context("initialize librarian")?;

    for title in librarian.list_titles().await {
        println!("{title}");
    }
    Ok(())
}
