//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use poemday_core::{
    PageSources, ProgressReporter, ResolvedPoem, SaveOutcome, fetch_poem, resolve, save_outcome,
};
use poemday_discovery::{HttpFetcher, locate_poem_url};
use poemday_shared::{AppConfig, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// poemday: fetch today's poem as clean JSON.
#[derive(Parser)]
#[command(
    name = "poemday",
    version,
    about = "Extract the poem of the day into a structured poem.json record.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.poemday/poemday.toml).
    #[arg(long, global = true, env = "POEMDAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch today's poem and write it to the output file.
    Fetch {
        /// Output path (overrides `[output].path`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Landing page URL (overrides `[fetch].landing_url`).
        #[arg(long)]
        landing_url: Option<String>,
    },

    /// Extract a poem from saved pages without touching the network.
    Parse {
        /// Raw markup of the poem page.
        #[arg(long)]
        markup: Option<PathBuf>,

        /// Markdown render of the poem page.
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Landing page content.
        #[arg(long)]
        landing: Option<PathBuf>,

        /// Also write the record to this path.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the individual poem URL found in landing page content.
    Locate {
        /// Saved landing page (Markdown or markup).
        file: PathBuf,

        /// Base URL for resolving relative links.
        #[arg(long)]
        base: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "poemday=info",
        1 => "poemday=debug",
        _ => "poemday=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Fetch { out, landing_url } => {
            cmd_fetch(config_path, out, landing_url.as_deref()).await
        }
        Command::Parse {
            markup,
            markdown,
            landing,
            out,
        } => cmd_parse(
            config_path,
            markup.as_deref(),
            markdown.as_deref(),
            landing.as_deref(),
            out.as_deref(),
        ),
        Command::Locate { file, base } => cmd_locate(&file, base.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("cannot read {}", path.display()))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_fetch(
    config_path: Option<&Path>,
    out: Option<PathBuf>,
    landing_url: Option<&str>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let out = out.unwrap_or_else(|| config.output.path.clone());
    let landing_url = landing_url.unwrap_or(&config.fetch.landing_url).to_string();

    Url::parse(&landing_url).map_err(|e| eyre!("invalid landing URL '{landing_url}': {e}"))?;
    info!(landing = %landing_url, out = %out.display(), "fetching poem of the day");

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let reporter = CliProgress::new();
    let outcome = fetch_poem(&fetcher, &config, &landing_url, &reporter).await;
    reporter.clear();

    let summary = outcome.as_ref().ok().map(summarize);
    match save_outcome(&out, outcome.map(|resolved| resolved.record))? {
        SaveOutcome::Written(path) => {
            if let Some(summary) = summary {
                println!("{summary}");
            }
            println!("  Path:     {}", path.display());
        }
        SaveOutcome::Preserved(path) => {
            println!("Extraction failed; kept existing {}", path.display());
        }
    }

    Ok(())
}

fn cmd_parse(
    config_path: Option<&Path>,
    markup: Option<&Path>,
    markdown: Option<&Path>,
    landing: Option<&Path>,
    out: Option<&Path>,
) -> Result<()> {
    if markup.is_none() && markdown.is_none() && landing.is_none() {
        return Err(eyre!("nothing to parse: pass --markup, --markdown or --landing"));
    }

    let config = resolve_config(config_path)?;
    let sources = PageSources {
        landing: landing.map(read_file).transpose()?.unwrap_or_default(),
        poem_markup: markup.map(read_file).transpose()?,
        poem_markdown: markdown.map(read_file).transpose()?,
    };

    let resolved = resolve(&sources, &config.extraction)?;
    info!(strategy = %resolved.strategy, "parsed saved pages");

    println!("{}", resolved.record.to_pretty_json()?.trim_end());

    if let Some(path) = out {
        save_outcome(path, Ok(resolved.record))?;
        info!(path = %path.display(), "record written");
    }

    Ok(())
}

fn cmd_locate(file: &Path, base: Option<&str>) -> Result<()> {
    let content = read_file(file)?;
    let base = base
        .map(|b| Url::parse(b).map_err(|e| eyre!("invalid base URL '{b}': {e}")))
        .transpose()?;

    let url = locate_poem_url(&content, base.as_ref())
        .ok_or_else(|| eyre!("no poem URL found in {}", file.display()))?;
    println!("{url}");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn summarize(resolved: &ResolvedPoem) -> String {
    let record = &resolved.record;
    let mut lines = vec![
        String::new(),
        format!("  Title:    {}", record.title),
        format!("  Author:   {}", record.author),
        format!(
            "  Lines:    {} ({} chars)",
            record.line_breaks() + 1,
            record.body.chars().count()
        ),
        format!("  Strategy: {}", resolved.strategy),
    ];
    if let Some(url) = &resolved.poem_url {
        lines.push(format!("  Source:   {url}"));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _resolved: &ResolvedPoem) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fetch_overrides() {
        let cli = Cli::parse_from([
            "poemday",
            "-vv",
            "fetch",
            "--out",
            "/tmp/today.json",
            "--landing-url",
            "https://site.example/poems/poem-of-the-day",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Fetch { out, landing_url } => {
                assert_eq!(out, Some(PathBuf::from("/tmp/today.json")));
                assert_eq!(
                    landing_url.as_deref(),
                    Some("https://site.example/poems/poem-of-the-day")
                );
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn parses_locate_with_base() {
        let cli = Cli::parse_from([
            "poemday",
            "--log-format",
            "json",
            "locate",
            "landing.md",
            "--base",
            "https://site.example/",
        ]);
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.command, Command::Locate { .. }));
    }

    #[test]
    fn summary_names_strategy_and_source() {
        let resolved = ResolvedPoem {
            record: poemday_shared::PoemRecord::new("Ode", "Jane Poet", "a\nb"),
            strategy: poemday_core::Strategy::PoemMarkdown,
            poem_url: Some("https://site.example/poems/1".into()),
        };
        let text = summarize(&resolved);
        assert!(text.contains("Lines:    2"));
        assert!(text.contains("poem markdown"));
        assert!(text.contains("https://site.example/poems/1"));
    }
}
