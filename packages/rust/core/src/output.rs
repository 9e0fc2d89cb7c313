//! Persisting the accepted record to `poem.json`.
//!
//! A failed run must never replace a good file: when every strategy failed
//! and the existing file still holds a poem, it is left untouched.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use poemday_shared::{PoemError, PoemRecord, Result};

/// What [`save_outcome`] did with the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new record was written.
    Written(PathBuf),
    /// Extraction failed; the previous record was kept.
    Preserved(PathBuf),
}

/// Write a successful result, or keep the prior file when extraction was
/// exhausted. Any other error, or exhaustion with no usable prior file, is
/// returned unchanged.
#[instrument(skip(outcome), fields(path = %path.display()))]
pub fn save_outcome(path: &Path, outcome: Result<PoemRecord>) -> Result<SaveOutcome> {
    match outcome {
        Ok(record) => {
            write_record(path, &record)?;
            Ok(SaveOutcome::Written(path.to_path_buf()))
        }
        Err(err) if err.is_exhausted() && has_prior_poem(path) => {
            warn!(error = %err, "extraction failed; keeping existing record");
            Ok(SaveOutcome::Preserved(path.to_path_buf()))
        }
        Err(err) => Err(err),
    }
}

/// Write `record` as pretty JSON, atomically (temp file, then rename).
pub fn write_record(path: &Path, record: &PoemRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PoemError::io(parent, e))?;
    }

    let json = record.to_pretty_json()?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "poem.json".to_string());
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, json.as_bytes()).map_err(|e| PoemError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| PoemError::io(path, e))?;

    debug!(path = %path.display(), bytes = json.len(), "wrote record");
    Ok(())
}

/// True if `path` holds JSON with a non-empty `poem` field.
fn has_prior_poem(path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(path) else {
        return false;
    };
    serde_json::from_str::<serde_json::Value>(&content)
        .ok()
        .and_then(|value| {
            value
                .get("poem")
                .and_then(|poem| poem.as_str())
                .map(|poem| !poem.trim().is_empty())
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("poemday-output-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn exhausted() -> PoemError {
        PoemError::Exhausted {
            attempts: vec!["embedded data: not found: embedded data script".into()],
        }
    }

    #[test]
    fn writes_pretty_json_with_trailing_newline() {
        let tmp = temp_dir();
        let path = tmp.join("out").join("poem.json");
        let record = PoemRecord::new("Café", "Zoë", "Line one\nLine two");

        let outcome = save_outcome(&path, Ok(record.clone())).unwrap();
        assert_eq!(outcome, SaveOutcome::Written(path.clone()));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n  \"title\": \"Café\""));
        assert!(content.ends_with("}\n"));
        assert!(!tmp.join("out").join(".poem.json.tmp").exists());

        let parsed: PoemRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, record);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn exhausted_keeps_existing_poem() {
        let tmp = temp_dir();
        let path = tmp.join("poem.json");
        let prior = PoemRecord::new("Ode", "Jane Poet", "kept line");
        write_record(&path, &prior).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let outcome = save_outcome(&path, Err(exhausted())).unwrap();
        assert_eq!(outcome, SaveOutcome::Preserved(path.clone()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn exhausted_without_prior_file_is_an_error() {
        let tmp = temp_dir();
        let path = tmp.join("poem.json");

        let err = save_outcome(&path, Err(exhausted())).unwrap_err();
        assert!(err.is_exhausted());
        assert!(!path.exists());

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn exhausted_with_empty_prior_poem_is_an_error() {
        let tmp = temp_dir();
        let path = tmp.join("poem.json");
        std::fs::write(&path, r#"{"title":"","author":"","poem":"  "}"#).unwrap();

        assert!(save_outcome(&path, Err(exhausted())).is_err());

        std::fs::write(&path, "not json").unwrap();
        assert!(save_outcome(&path, Err(exhausted())).is_err());

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn other_errors_pass_through() {
        let tmp = temp_dir();
        let path = tmp.join("poem.json");
        write_record(&path, &PoemRecord::new("Ode", "Jane Poet", "kept")).unwrap();

        let err = save_outcome(&path, Err(PoemError::config("bad"))).unwrap_err();
        assert!(matches!(err, PoemError::Config { .. }));

        std::fs::remove_dir_all(&tmp).ok();
    }
}
