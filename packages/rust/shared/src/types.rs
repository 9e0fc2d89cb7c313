//! Core domain types for poemday.

use serde::{Deserialize, Serialize};

use crate::error::{PoemError, Result};

// ---------------------------------------------------------------------------
// PoemRecord
// ---------------------------------------------------------------------------

/// One extracted poem, as persisted to `poem.json`.
///
/// Field order is the serialized order. The body is stored under `poem` to
/// stay compatible with files written by earlier fetchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoemRecord {
    /// Poem title, site suffix removed.
    pub title: String,
    /// Author display name.
    pub author: String,
    /// Newline-separated poem text.
    #[serde(rename = "poem")]
    pub body: String,
    /// Dedication or epigraph shown above the poem, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epigraph: Option<String>,
}

impl PoemRecord {
    /// Build a record without an epigraph.
    pub fn new(title: impl Into<String>, author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            body: body.into(),
            epigraph: None,
        }
    }

    /// Returns true if the body holds no visible text.
    pub fn has_empty_body(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Number of line breaks in the body.
    pub fn line_breaks(&self) -> usize {
        self.body.matches('\n').count()
    }

    /// Pretty JSON with a trailing newline, non-ASCII kept verbatim.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| PoemError::malformed(format!("JSON serialization failed: {e}")))?;
        json.push('\n');
        Ok(json)
    }
}
