use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::config::LibrarianConfig;
use crate::conversation::{ChatBackend, Conversation, ToolCall};
use crate::corpus::load_corpus;
use crate::details::{DETAIL_TOOL_NAME, DetailTable, detail_tool_spec};
use crate::error::LibrarianError;
use crate::index::{SearchHit, VectorIndex};
use crate::moderation::{DEFLECTION_MESSAGE, ModerationGate};

pub const SEARCH_RESULTS: usize = 3;
pub const EXCERPT_CHARS: usize = 200;
pub const MAX_RECOMMENDED: usize = 2;

pub const NO_MATCH_MESSAGE: &str = "I couldn't find any books matching your criteria in my current database. Could you try a different theme or provide more details about what you're looking for?";

/// Outcome of one chat request.
///
/// Field names on the wire follow the public chat API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "response")]
    pub response_text: String,
    #[serde(rename = "inappropriate_content")]
    pub flagged_inappropriate: bool,
    #[serde(rename = "recommended_books", default)]
    pub recommended_titles: Option<Vec<String>>,
}

impl Recommendation {
    fn flagged() -> Self {
        Self {
            response_text: DEFLECTION_MESSAGE.to_owned(),
            flagged_inappropriate: true,
            recommended_titles: None,
        }
    }

    fn no_match() -> Self {
        Self {
            response_text: NO_MATCH_MESSAGE.to_owned(),
            flagged_inappropriate: false,
            recommended_titles: None,
        }
    }

    fn failed(err: &anyhow::Error) -> Self {
        Self {
            response_text: apology_message(err),
            flagged_inappropriate: false,
            recommended_titles: None,
        }
    }

    pub fn recommended(&self) -> &[String] {
        self.recommended_titles.as_deref().unwrap_or_default()
    }
}

pub fn apology_message(err: &anyhow::Error) -> String {
    format!(
        "I apologize, but I encountered an error while processing your request. \
Please try again later. Error: {err:#}"
    )
}

#[derive(Debug, Deserialize)]
struct DetailArgs {
    title: String,
}

/// Runs the recommendation pipeline: moderation, retrieval, and the
/// two-round exchange with the language model.
pub struct Librarian {
    index: Arc<VectorIndex>,
    chat: Arc<dyn ChatBackend>,
    details: Arc<DetailTable>,
    moderation: Arc<ModerationGate>,
}

impl Librarian {
    pub fn new(index: Arc<VectorIndex>, chat: Arc<dyn ChatBackend>) -> Self {
        Self {
            index,
            chat,
            details: Arc::new(DetailTable::builtin()),
            moderation: Arc::new(ModerationGate::builtin()),
        }
    }

    pub fn with_moderation(mut self, moderation: ModerationGate) -> Self {
        self.moderation = Arc::new(moderation);
        self
    }

    /// Wires the OpenAI backends from `config` and loads the corpus.
    ///
    /// A missing or unloadable corpus leaves the index empty.
    pub async fn from_config(config: &LibrarianConfig) -> anyhow::Result<Self> {
        let client = config.openai_client()?;
        let index = VectorIndex::new(config.embedder(client.clone()))
            .with_max_distance(config.max_distance);
        let chat = config.chat_backend(client);

        let librarian = Self::new(Arc::new(index), Arc::new(chat))
            .with_moderation(config.moderation());
        librarian.initialize_corpus(&config.corpus_path).await;
        Ok(librarian)
    }

    /// Loads the corpus at startup, falling back to an empty index.
    pub async fn initialize_corpus(&self, path: &Path) -> usize {
        match self.reload_corpus(path).await {
            Ok(count) => count,
            Err(LibrarianError::ResourceNotFound { path }) => {
                tracing::warn!(
                    path = %path.display(),
                    "corpus file not found; serving with an empty index"
                );
                0
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load corpus; serving with an empty index");
                0
            }
        }
    }

    /// Re-reads `path` and replaces the indexed documents.
    pub async fn reload_corpus(&self, path: &Path) -> Result<usize, LibrarianError> {
        let records = load_corpus(path).await?;
        let count = self
            .index
            .reload(&records)
            .await
            .map_err(LibrarianError::BackendFailure)?;
        tracing::info!(path = %path.display(), books = count, "loaded books into vector index");
        Ok(count)
    }

    pub async fn list_titles(&self) -> Vec<String> {
        self.index.list_titles().await
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, LibrarianError> {
        if query.trim().is_empty() {
            return Err(LibrarianError::InvalidInput(
                "query cannot be empty".to_owned(),
            ));
        }
        self.index
            .search(query, limit)
            .await
            .map_err(LibrarianError::BackendFailure)
    }

    pub fn detailed_summary(&self, title: &str) -> String {
        self.details.detailed_summary(title)
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Answers one reading request.
    ///
    /// Only an empty query is an error. Backend failures come back as an
    /// apologetic response.
    pub async fn recommend(&self, query: &str) -> Result<Recommendation, LibrarianError> {
        if query.trim().is_empty() {
            return Err(LibrarianError::InvalidInput(
                "message cannot be empty".to_owned(),
            ));
        }

        if self.moderation.is_inappropriate(query) {
            tracing::info!("request flagged by moderation");
            return Ok(Recommendation::flagged());
        }

        let hits = match self.index.search(query, SEARCH_RESULTS).await {
            Ok(hits) => hits,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "search failed");
                return Ok(Recommendation::failed(&err));
            }
        };
        if hits.is_empty() {
            tracing::info!("no matching books");
            return Ok(Recommendation::no_match());
        }

        match self.generate(query, &hits).await {
            Ok(text) => Ok(Recommendation {
                response_text: text,
                flagged_inappropriate: false,
                recommended_titles: Some(
                    hits.iter()
                        .take(MAX_RECOMMENDED)
                        .map(|hit| hit.title.clone())
                        .collect(),
                ),
            }),
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "language model exchange failed");
                Ok(Recommendation::failed(&err))
            }
        }
    }

    async fn generate(&self, query: &str, hits: &[SearchHit]) -> anyhow::Result<String> {
        let all_titles = self.index.list_titles().await;
        let mut conversation = Conversation::new(build_system_prompt(hits, &all_titles), query);
        let tools = [detail_tool_spec()];

        let reply = self
            .chat
            .complete(conversation.messages(), &tools)
            .await
            .context("initial recommendation")?;
        tracing::info!(
            round = 1,
            tool_calls = reply.tool_calls.len(),
            "language model replied"
        );

        if reply.tool_calls.is_empty() {
            return Ok(reply.content.unwrap_or_default());
        }

        conversation.push_assistant(&reply);
        for call in &reply.tool_calls {
            let result = self.run_tool_call(call)?;
            conversation.push_tool_result(&call.id, &call.function.name, result);
        }

        let reply = self
            .chat
            .complete(conversation.messages(), &[])
            .await
            .context("final response with tool results")?;
        tracing::info!(round = 2, "language model replied");

        reply
            .text()
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("language model returned an empty final reply"))
    }

    fn run_tool_call(&self, call: &ToolCall) -> anyhow::Result<String> {
        if call.function.name != DETAIL_TOOL_NAME {
            tracing::warn!(
                tool_call_id = %call.id,
                tool = %call.function.name,
                "model requested an unsupported tool"
            );
            return Ok(format!(
                "Unsupported tool '{}'. Only {DETAIL_TOOL_NAME} is available.",
                call.function.name
            ));
        }

        let args: DetailArgs = serde_json::from_str(&call.function.arguments)
            .with_context(|| format!("parse arguments of tool call {}", call.id))?;
        tracing::info!(
            tool_call_id = %call.id,
            title = %args.title,
            found = self.details.contains(&args.title),
            "detail lookup"
        );
        Ok(self.details.detailed_summary(&args.title))
    }
}

/// System prompt with an excerpt of each hit and the full title list.
pub fn build_system_prompt(hits: &[SearchHit], all_titles: &[String]) -> String {
    let mut context =
        String::from("Based on your interests, here are some relevant books from my database:\n\n");
    for hit in hits {
        context.push_str(&format!(
            "**{}**: {}...\n\n",
            hit.title,
            excerpt(&hit.summary, EXCERPT_CHARS)
        ));
    }

    format!(
        "You are a knowledgeable and friendly librarian AI assistant. Your job is to recommend books based on user interests and provide engaging, conversational responses.\n\
\n\
Context from book database:\n\
{context}\n\
Guidelines:\n\
1. Recommend 1-2 books that best match the user's request\n\
2. Be conversational and enthusiastic about books\n\
3. After making your recommendation, use the {DETAIL_TOOL_NAME} tool with the exact title to provide a detailed summary\n\
4. Explain why you think the book(s) would be a good fit for the user\n\
5. Keep your initial response concise but engaging\n\
\n\
Available books in the database: {}",
        all_titles.join(", ")
    )
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
