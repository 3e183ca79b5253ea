// src/utils.rs
use crate::models::SourceId;
use sha2::{Digest, Sha256};

/// Content hash of a job. Changes whenever the company, position or
/// description of a listing changes, which marks it for re-evaluation.
pub fn hash_job(company: &str, position: &str, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company.as_bytes());
    hasher.update(b"|");
    hasher.update(position.as_bytes());
    hasher.update(b"|");
    hasher.update(description.as_bytes());
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Source named in a request. Only boards with a fetcher are accepted.
pub fn source_from_param(raw: &str) -> Option<SourceId> {
    raw.parse::<SourceId>()
        .ok()
        .filter(|source| *source == SourceId::Linkedin)
}

/// Split a comma separated keyword list, dropping blanks
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shorten text for log lines without splitting a character
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
