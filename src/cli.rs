use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

use crate::config::{EmbeddingKind, LibrarianConfig};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP chat API.
    Serve(ServeArgs),
    /// Ask for a recommendation once and print it.
    Ask(AskArgs),
    /// Print the closest books for a query as JSON lines.
    Search(SearchArgs),
    /// Print every indexed title.
    Titles(CorpusArgs),
    /// Print the curated detailed summary of a title.
    Detail(DetailArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CorpusArgs {
    /// Corpus file (default: $LIBRARIAN_CORPUS or data/book_summaries.txt).
    #[arg(long)]
    pub corpus: Option<String>,

    /// Embedding backend (default: $LIBRARIAN_EMBEDDING or openai).
    #[arg(long, value_enum)]
    pub embedding: Option<EmbeddingKind>,
}

impl CorpusArgs {
    pub fn apply(&self, config: &mut LibrarianConfig) {
        if let Some(corpus) = self.corpus.as_deref() {
            config.corpus_path = corpus.into();
        }
        if let Some(embedding) = self.embedding {
            config.embedding = embedding;
        }
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    #[command(flatten)]
    pub corpus: CorpusArgs,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Free-text reading request.
    pub message: String,

    /// Print the full result as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub corpus: CorpusArgs,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,

    /// Maximum hits to print.
    #[arg(long, default_value_t = 5)]
    pub limit: usize,

    #[command(flatten)]
    pub corpus: CorpusArgs,
}

#[derive(Debug, Args)]
pub struct DetailArgs {
    /// Exact, case-sensitive title.
    pub title: String,
}
