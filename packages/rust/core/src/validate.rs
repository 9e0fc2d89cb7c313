//! Final acceptance check on extracted records.
//!
//! Every rule here fingerprints a failed extraction (page chrome, render
//! data, a listing page) rather than judging the poem itself.

use poemday_shared::{PoemError, PoemRecord, Result, ValidationLimits};
use tracing::debug;

/// Reason a record was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("body is empty")]
    EmptyBody,

    #[error("body has {chars} characters (max {max})")]
    TooLong { chars: usize, max: usize },

    #[error("body has {breaks} line breaks (max {max})")]
    TooManyLines { breaks: usize, max: usize },

    #[error("body contains site fingerprint {token:?}")]
    Fingerprint { token: String },

    #[error("placeholder title {title:?} without an author")]
    Placeholder { title: String },
}

/// Check `record` against the limits; `Ok` means accepted.
pub fn check(
    record: &PoemRecord,
    limits: &ValidationLimits,
    placeholder_title: &str,
) -> std::result::Result<(), Rejection> {
    if record.has_empty_body() {
        return Err(Rejection::EmptyBody);
    }
    let body = record.body.trim();

    let chars = body.chars().count();
    if chars > limits.max_chars {
        return Err(Rejection::TooLong {
            chars,
            max: limits.max_chars,
        });
    }

    let breaks = body.matches('\n').count();
    if breaks > limits.max_line_breaks {
        return Err(Rejection::TooManyLines {
            breaks,
            max: limits.max_line_breaks,
        });
    }

    let lower = body.to_lowercase();
    if let Some(token) = limits
        .denylist
        .iter()
        .find(|token| lower.contains(&token.to_lowercase()))
    {
        return Err(Rejection::Fingerprint {
            token: token.clone(),
        });
    }

    if record.author.trim().is_empty()
        && record.title.trim().eq_ignore_ascii_case(placeholder_title)
    {
        return Err(Rejection::Placeholder {
            title: record.title.clone(),
        });
    }

    Ok(())
}

/// [`check`] mapped into the crate error type.
pub fn validate(record: &PoemRecord, limits: &ValidationLimits, placeholder_title: &str) -> Result<()> {
    check(record, limits, placeholder_title).map_err(|rejection| {
        debug!(%rejection, title = %record.title, "record rejected");
        PoemError::invalid(rejection.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACEHOLDER: &str = "Poem of the Day";

    fn accept(record: &PoemRecord) -> std::result::Result<(), Rejection> {
        check(record, &ValidationLimits::default(), PLACEHOLDER)
    }

    #[test]
    fn accepts_ordinary_poem() {
        let record = PoemRecord::new("Ode", "Jane Poet", "Line one\nLine two");
        assert_eq!(accept(&record), Ok(()));
        assert!(validate(&record, &ValidationLimits::default(), PLACEHOLDER).is_ok());
    }

    #[test]
    fn rejects_blank_body() {
        let record = PoemRecord::new("Ode", "Jane Poet", " \n\t ");
        assert_eq!(accept(&record), Err(Rejection::EmptyBody));
    }

    #[test]
    fn rejects_overlong_body() {
        let record = PoemRecord::new("Ode", "Jane Poet", "a".repeat(20_001));
        assert!(matches!(accept(&record), Err(Rejection::TooLong { chars: 20_001, .. })));

        let at_limit = PoemRecord::new("Ode", "Jane Poet", "é".repeat(20_000));
        assert_eq!(accept(&at_limit), Ok(()));
    }

    #[test]
    fn rejects_too_many_lines() {
        let record = PoemRecord::new("Ode", "Jane Poet", "x\n".repeat(1_202));
        assert!(matches!(accept(&record), Err(Rejection::TooManyLines { .. })));
    }

    #[test]
    fn rejects_fingerprints_case_insensitively() {
        for body in [
            "line\nwindow.__NUXT__={}",
            "<SCRIPT src=x>",
            "Sign up to receive the Poem of the Day",
            "PrimaryNavigation_node",
        ] {
            let record = PoemRecord::new("Ode", "Jane Poet", body);
            assert!(
                matches!(accept(&record), Err(Rejection::Fingerprint { .. })),
                "{body:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_placeholder_title_without_author() {
        let record = PoemRecord::new("Poem of the Day", "", "Some teaser line");
        assert!(matches!(accept(&record), Err(Rejection::Placeholder { .. })));

        let with_author = PoemRecord::new("Poem of the Day", "Jane Poet", "Some teaser line");
        assert_eq!(accept(&with_author), Ok(()));
    }

    #[test]
    fn rejection_becomes_invalid_error() {
        let record = PoemRecord::new("Ode", "Jane Poet", "");
        let err = validate(&record, &ValidationLimits::default(), PLACEHOLDER).unwrap_err();
        assert!(matches!(err, PoemError::Invalid { .. }));
        assert!(err.is_recoverable());
    }
}
