//! End-to-end extraction: landing page → poem URL → strategies → validated record.
//!
//! [`resolve`] is a pure function of already-fetched page content; only
//! [`fetch_poem`] touches the network, through a [`ContentFetcher`].

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use url::Url;

use poemday_discovery::{ContentFetcher, locate_poem_url};
use poemday_markdown::{PageHeader, normalize_page, parse_header, parse_page};
use poemday_markup::extract_embedded;
use poemday_shared::{AppConfig, ExtractionConfig, PoemError, PoemRecord, Result};

use crate::validate::validate;

/// Everything fetched for one run.
#[derive(Debug, Clone, Default)]
pub struct PageSources {
    /// Landing page content, Markdown or markup.
    pub landing: String,
    /// Raw markup of the individual poem page.
    pub poem_markup: Option<String>,
    /// Markdown render of the individual poem page.
    pub poem_markdown: Option<String>,
}

/// Extraction strategies, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Body and epigraph from the poem page's embedded render data.
    EmbeddedData,
    /// The poem page's Markdown render.
    PoemMarkdown,
    /// The landing page itself, which sometimes inlines the poem.
    LandingPage,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::EmbeddedData,
        Strategy::PoemMarkdown,
        Strategy::LandingPage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::EmbeddedData => "embedded data",
            Strategy::PoemMarkdown => "poem markdown",
            Strategy::LandingPage => "landing page",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validator-accepted record and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPoem {
    pub record: PoemRecord,
    pub strategy: Strategy,
    /// Individual poem page, when one was found on the landing page.
    pub poem_url: Option<String>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a record has been accepted.
    fn done(&self, resolved: &ResolvedPoem);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _resolved: &ResolvedPoem) {}
}

/// Try each strategy in order and return the first accepted record.
///
/// Recoverable strategy failures and validator rejections are logged and
/// collected; when nothing is accepted the result is
/// [`PoemError::Exhausted`] listing every attempt. Any other error stops the
/// run and is returned as is.
#[instrument(skip_all)]
pub fn resolve(sources: &PageSources, config: &ExtractionConfig) -> Result<ResolvedPoem> {
    let mut attempts: Vec<String> = Vec::new();

    for strategy in Strategy::ALL {
        let outcome = extract_with(strategy, sources, config).and_then(|record| {
            validate(
                &record,
                &config.validation,
                &config.markdown.placeholder_title,
            )?;
            Ok(record)
        });

        if let Some(record) = settle(strategy, outcome, &mut attempts)? {
            info!(%strategy, title = %record.title, author = %record.author, "record accepted");
            return Ok(ResolvedPoem {
                record,
                strategy,
                poem_url: None,
            });
        }
    }

    Err(PoemError::Exhausted { attempts })
}

/// Accepted record, or `None` after noting a recoverable failure.
fn settle(
    strategy: Strategy,
    outcome: Result<PoemRecord>,
    attempts: &mut Vec<String>,
) -> Result<Option<PoemRecord>> {
    match outcome {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_recoverable() => {
            warn!(%strategy, error = %e, "strategy failed");
            attempts.push(format!("{strategy}: {e}"));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn extract_with(
    strategy: Strategy,
    sources: &PageSources,
    config: &ExtractionConfig,
) -> Result<PoemRecord> {
    match strategy {
        Strategy::EmbeddedData => {
            let markup = sources
                .poem_markup
                .as_deref()
                .ok_or_else(|| PoemError::not_found("poem page markup"))?;
            let embedded = extract_embedded(markup, &config.embedded)?;
            let header = poem_header(sources, config)?;
            Ok(PoemRecord {
                title: header.title,
                author: header.author,
                body: embedded.body,
                epigraph: embedded.epigraph,
            })
        }
        Strategy::PoemMarkdown => {
            let markdown = sources
                .poem_markdown
                .as_deref()
                .ok_or_else(|| PoemError::not_found("poem page markdown"))?;
            parse_page(markdown, &config.markdown)
        }
        Strategy::LandingPage => parse_page(&sources.landing, &config.markdown),
    }
}

/// Title and author for embedded-data bodies: the Markdown render is
/// preferred, the poem page's own markup is the fallback.
fn poem_header(sources: &PageSources, config: &ExtractionConfig) -> Result<PageHeader> {
    let from_markdown = sources
        .poem_markdown
        .as_deref()
        .ok_or_else(|| PoemError::not_found("poem page markdown"))
        .and_then(normalize_page)
        .and_then(|md| parse_header(&md, &config.markdown));

    match from_markdown {
        Ok(header) => Ok(header),
        Err(e) => {
            debug!(error = %e, "header not in markdown, trying markup");
            let markup = sources
                .poem_markup
                .as_deref()
                .ok_or_else(|| PoemError::not_found("poem page markup"))?;
            parse_header(&normalize_page(markup)?, &config.markdown)
        }
    }
}

/// Fetch today's pages and resolve them into an accepted record.
///
/// A landing page that cannot be fetched leaves nothing to extract from and
/// is reported as [`PoemError::Exhausted`].
#[instrument(skip_all, fields(landing = %landing_url))]
pub async fn fetch_poem<F: ContentFetcher + Sync>(
    fetcher: &F,
    config: &AppConfig,
    landing_url: &str,
    progress: &dyn ProgressReporter,
) -> Result<ResolvedPoem> {
    let start = Instant::now();

    progress.phase("Fetching landing page");
    let landing = fetcher.fetch_markdown(landing_url).await.map_err(|e| {
        warn!(error = %e, "landing page unavailable");
        PoemError::Exhausted {
            attempts: vec![format!("landing page: {e}")],
        }
    })?;

    progress.phase("Locating poem");
    let base = Url::parse(landing_url).ok();
    let poem_url = locate_poem_url(&landing, base.as_ref());

    let mut sources = PageSources {
        landing,
        ..PageSources::default()
    };

    match &poem_url {
        Some(url) => {
            info!(%url, "poem url found");
            progress.phase("Fetching poem page");
            sources.poem_markup = fetcher.fetch_markup(url).await;
            sources.poem_markdown = match fetcher.fetch_markdown(url).await {
                Ok(md) => Some(md),
                Err(e) => {
                    warn!(error = %e, "poem page markdown unavailable");
                    None
                }
            };
        }
        None => warn!("no poem url on landing page, parsing landing content"),
    }

    progress.phase("Extracting poem");
    let mut resolved = resolve(&sources, &config.extraction)?;
    resolved.poem_url = poem_url;

    progress.done(&resolved);
    info!(
        strategy = %resolved.strategy,
        title = %resolved.record.title,
        elapsed_ms = start.elapsed().as_millis(),
        "fetch pipeline complete"
    );

    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
