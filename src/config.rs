use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::embed::{DEFAULT_HASH_DIM, Embedder, HashEmbedder, OpenAiEmbedder};
use crate::moderation::ModerationGate;
use crate::openai::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, OpenAiChat, OpenAiClient,
};

pub const DEFAULT_CORPUS_PATH: &str = "data/book_summaries.txt";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EmbeddingKind {
    /// OpenAI embeddings endpoint.
    Openai,
    /// Local feature hashing, no network.
    Hash,
}

impl EmbeddingKind {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "openai" => Ok(Self::Openai),
            "hash" => Ok(Self::Hash),
            other => anyhow::bail!("unsupported embedding backend: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LibrarianConfig {
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub temperature: f32,
    pub embedding: EmbeddingKind,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub corpus_path: PathBuf,
    pub max_distance: Option<f32>,
    pub denylist: Option<Vec<String>>,
    pub chat_timeout: Duration,
}

impl Default for LibrarianConfig {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_BASE_URL.to_owned(),
            openai_api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            embedding: EmbeddingKind::Openai,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            embedding_dim: DEFAULT_HASH_DIM,
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            max_distance: None,
            denylist: None,
            chat_timeout: Duration::from_secs(DEFAULT_CHAT_TIMEOUT_SECS),
        }
    }
}

impl LibrarianConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`, which returns the raw value of an
    /// environment variable. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(base_url) = get("OPENAI_BASE_URL") {
            url::Url::parse(&base_url)
                .with_context(|| format!("invalid OPENAI_BASE_URL={base_url:?}"))?;
            config.openai_base_url = base_url;
        }
        config.openai_api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("LIBRARIAN_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(raw) = get("LIBRARIAN_TEMPERATURE") {
            config.temperature = raw
                .parse()
                .with_context(|| format!("invalid LIBRARIAN_TEMPERATURE={raw:?}"))?;
        }
        if let Some(raw) = get("LIBRARIAN_EMBEDDING") {
            config.embedding = EmbeddingKind::parse(&raw)
                .with_context(|| format!("invalid LIBRARIAN_EMBEDDING={raw:?}"))?;
        }
        if let Some(model) = get("LIBRARIAN_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(raw) = get("LIBRARIAN_EMBEDDING_DIM") {
            config.embedding_dim = raw
                .parse::<usize>()
                .ok()
                .filter(|dim| *dim > 0)
                .ok_or_else(|| anyhow::anyhow!("invalid LIBRARIAN_EMBEDDING_DIM={raw:?}"))?;
        }
        if let Some(path) = get("LIBRARIAN_CORPUS") {
            config.corpus_path = PathBuf::from(path);
        }
        if let Some(raw) = get("LIBRARIAN_MAX_DISTANCE") {
            let max_distance = raw
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| anyhow::anyhow!("invalid LIBRARIAN_MAX_DISTANCE={raw:?}"))?;
            config.max_distance = Some(max_distance);
        }
        if let Some(raw) = get("LIBRARIAN_DENYLIST") {
            config.denylist = Some(raw.split(',').map(|term| term.trim().to_owned()).collect());
        }
        if let Some(raw) = get("LIBRARIAN_CHAT_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow::anyhow!("invalid LIBRARIAN_CHAT_TIMEOUT_SECS={raw:?}"))?;
            config.chat_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn openai_client(&self) -> anyhow::Result<OpenAiClient> {
        if self.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; OpenAI requests are sent without auth");
        }
        OpenAiClient::new(self.openai_base_url.clone(), self.openai_api_key.clone())
    }

    pub fn chat_backend(&self, client: OpenAiClient) -> OpenAiChat {
        OpenAiChat::new(client, self.chat_model.clone(), self.temperature)
    }

    pub fn embedder(&self, client: OpenAiClient) -> Arc<dyn Embedder> {
        match self.embedding {
            EmbeddingKind::Openai => Arc::new(OpenAiEmbedder::new(
                client,
                self.embedding_model.clone(),
            )),
            EmbeddingKind::Hash => Arc::new(HashEmbedder::new(self.embedding_dim)),
        }
    }

    pub fn moderation(&self) -> ModerationGate {
        match &self.denylist {
            Some(terms) => ModerationGate::from_terms(terms),
            None => ModerationGate::builtin(),
        }
    }
}
