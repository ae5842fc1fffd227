use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LibrarianError;

/// Line prefix that opens a new record in the corpus file.
pub const TITLE_MARKER: &str = "## Title:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub summary: String,
}

/// Reads and parses a corpus file.
///
/// A missing file is reported as [`LibrarianError::ResourceNotFound`] so the
/// caller can decide to keep serving with an empty index.
pub async fn load_corpus(path: &Path) -> Result<Vec<BookRecord>, LibrarianError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(LibrarianError::ResourceNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(LibrarianError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let records = parse_corpus(&content);
    tracing::debug!(path = %path.display(), records = records.len(), "parsed corpus");
    Ok(records)
}

/// Splits `content` into records at each `## Title:` line.
///
/// Text before the first marker is dropped, records with an empty title or
/// summary are skipped, and only the first record per title is kept.
pub fn parse_corpus(content: &str) -> Vec<BookRecord> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some(title) = line.trim_start().strip_prefix(TITLE_MARKER) {
            if let Some((title, body)) = current.take() {
                push_record(&mut records, &mut seen, title, &body);
            }
            current = Some((title.trim().to_owned(), Vec::new()));
            continue;
        }
        if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((title, body)) = current.take() {
        push_record(&mut records, &mut seen, title, &body);
    }

    records
}

fn push_record(
    records: &mut Vec<BookRecord>,
    seen: &mut HashSet<String>,
    title: String,
    body: &[&str],
) {
    let summary = body.join("\n").trim().to_owned();
    if title.is_empty() || summary.is_empty() {
        tracing::debug!(title = %title, "skipping corpus record without title or summary");
        return;
    }
    if !seen.insert(title.clone()) {
        tracing::warn!(title = %title, "duplicate corpus title; keeping first record");
        return;
    }
    records.push(BookRecord { title, summary });
}
