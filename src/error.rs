use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LibrarianError {
    #[error("resource not found: {}", path.display())]
    ResourceNotFound { path: PathBuf },

    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend failure: {0:#}")]
    BackendFailure(anyhow::Error),
}

impl LibrarianError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}
