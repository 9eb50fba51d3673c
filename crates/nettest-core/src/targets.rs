//! Static target list
//!
//! The list file holds one address per line. Blank lines and lines
//! starting with `#` are ignored; order is kept.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};

/// Marker that starts a comment line
const COMMENT_MARKER: char = '#';

/// Parse a target list
pub fn parse_targets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .map(str::to_string)
        .collect()
}

/// Read and parse a target list file
pub async fn load_targets<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::config(format!("Failed to read targets file {}: {}", path.display(), e))
    })?;
    Ok(parse_targets(&text))
}

/// Join address lists, keeping the first occurrence of each address
pub fn merge_targets<I, S>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for address in lists {
        let address = address.as_ref().trim();
        if !address.is_empty() && seen.insert(address.to_string()) {
            merged.push(address.to_string());
        }
    }
    merged
}
