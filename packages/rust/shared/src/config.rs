//! Application configuration for poemday.
//!
//! User config lives at `~/.poemday/poemday.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! The `[extraction]` tables hold every tunable the heuristics use. Their
//! defaults are the values the extractor was calibrated against; changing
//! them changes which blocks are accepted as poem text.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PoemError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "poemday.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".poemday";

// ---------------------------------------------------------------------------
// Config structs (matching poemday.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network sources.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Where the accepted record is written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Heuristic thresholds and policies.
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Page that links to today's poem.
    #[serde(default = "default_landing_url")]
    pub landing_url: String,

    /// Markdown reader service, prefixed to the target URL.
    #[serde(default = "default_reader_base")]
    pub reader_base: String,

    /// Raw-passthrough proxy used when the reader fails.
    #[serde(default = "default_proxy_base")]
    pub proxy_base: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            landing_url: default_landing_url(),
            reader_base: default_reader_base(),
            proxy_base: default_proxy_base(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_landing_url() -> String {
    "https://www.poetryfoundation.org/poems/poem-of-the-day".into()
}
fn default_reader_base() -> String {
    "https://r.jina.ai".into()
}
fn default_proxy_base() -> String {
    "https://api.allorigins.win".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path of the persisted record.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("poem.json")
}

// ---------------------------------------------------------------------------
// Extraction config (heuristics)
// ---------------------------------------------------------------------------

/// `[extraction]` section: grouped heuristic settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub embedded: EmbeddedScoring,
    #[serde(default)]
    pub markdown: MarkdownPolicy,
    #[serde(default)]
    pub validation: ValidationLimits,
}

/// `[extraction.embedded]`: candidate-block classification constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddedScoring {
    /// Fewest `<br>` markers a block needs to be considered at all.
    pub min_line_breaks: usize,
    /// Shortest plain-text length a block needs to be considered.
    pub min_plain_len: usize,
    /// Blocks with a visible link and a break ratio below this are prose.
    pub prose_ratio: f64,
    /// Blocks with a break ratio below this are never verse.
    pub verse_ratio_floor: f64,
    /// Weight of the break ratio in `len * (1 + ratio * weight)`.
    pub break_weight: f64,
    /// Italic blocks at or above this plain length are not epigraphs.
    pub epigraph_max_len: usize,
}

impl Default for EmbeddedScoring {
    fn default() -> Self {
        Self {
            min_line_breaks: 3,
            min_plain_len: 50,
            prose_ratio: 0.01,
            verse_ratio_floor: 0.003,
            break_weight: 100.0,
            epigraph_max_len: 300,
        }
    }
}

/// Which setext heading is taken as the poem title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleSelection {
    /// First heading on the page.
    First,
    /// Last heading before the byline (the page title comes first).
    #[default]
    Last,
}

/// `[extraction.markdown]`: page-template policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownPolicy {
    pub title_selection: TitleSelection,
    /// Lines searched after the title for a byline.
    pub author_window: usize,
    /// Title the site uses for its listing page.
    pub placeholder_title: String,
}

impl Default for MarkdownPolicy {
    fn default() -> Self {
        Self {
            title_selection: TitleSelection::Last,
            author_window: 30,
            placeholder_title: "Poem of the Day".into(),
        }
    }
}

/// `[extraction.validation]`: anti-corruption bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_chars: usize,
    pub max_line_breaks: usize,
    /// Lower-case substrings that only appear when extraction went wrong.
    pub denylist: Vec<String>,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_chars: 20_000,
            max_line_breaks: 1_200,
            denylist: [
                "window.__nuxt__",
                "__nuxt_data__",
                "primarynavigation_node",
                "cachetags",
                "<script",
                "poetry foundation homepage",
                "sign up to receive the poem of the day",
                "poetrymagazine archive",
                "advertise withpoetry",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.poemday/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PoemError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.poemday/poemday.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PoemError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PoemError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PoemError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| PoemError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PoemError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
