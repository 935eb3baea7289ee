use serde::Deserialize;
use std::time::Duration;

/// Default seed: private-seller car listings, 2019 or newer, up to 120 000 km
pub const DEFAULT_SEED: &str = "https://www.olx.pt/carros-motos-e-barcos/carros/aveiro/?search%5Bprivate_business%5D=private&search%5Bfilter_float_year%3Afrom%5D=2019&search%5Bfilter_float_quilometros%3Ato%5D=120000";

/// Main configuration structure for Listing-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default = "default_seeds")]
    pub seeds: Vec<String>,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers, each owning one rendering session
    pub max_concurrency: u32,

    /// Retries after the first attempt before a request fails permanently
    pub max_retries: u32,

    /// Upper bound for rendering a page (seconds)
    pub navigation_timeout_secs: u64,

    /// Upper bound for the card and title waits (milliseconds)
    pub wait_timeout_ms: u64,

    /// Settle delay after triggering the phone reveal (milliseconds)
    pub phone_settle_ms: u64,

    /// Settle delay after dismissing the consent overlay (milliseconds)
    pub cookie_settle_ms: u64,

    /// Value used for the phone field when it cannot be revealed
    pub phone_fallback: String,
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn phone_settle(&self) -> Duration {
        Duration::from_millis(self.phone_settle_ms)
    }

    pub fn cookie_settle(&self) -> Duration {
        Duration::from_millis(self.cookie_settle_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_retries: 2,
            navigation_timeout_secs: 60,
            wait_timeout_ms: 15_000,
            phone_settle_ms: 2_000,
            cookie_settle_ms: 1_000,
            phone_fallback: "not available".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Locators handed to the document accessor
///
/// The core never interprets these; the bundled HTTP accessor reads them as
/// CSS selectors.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    pub cookie_button: String,
    pub item_card: String,
    pub item_link: String,
    pub next_page: String,
    pub title: String,
    pub price: String,
    pub description: String,
    pub location: String,
    pub parameters: String,
    pub seller: String,
    pub phone_button: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            cookie_button: "#onetrust-accept-btn-handler".to_string(),
            item_card: r#"[data-cy="l-card"]"#.to_string(),
            item_link: r#"[data-cy="l-card"] a"#.to_string(),
            next_page: r#"[data-testid="pagination-forward"]"#.to_string(),
            title: "h1".to_string(),
            price: r#"[data-testid="ad-price-container"] h3"#.to_string(),
            description: r#"[data-cy="ad_description"] div"#.to_string(),
            location: r#"[data-testid="location-date"]"#.to_string(),
            parameters: r#"[data-testid="main-parameters"] li"#.to_string(),
            seller: r#"[data-testid="user-profile-user-name"]"#.to_string(),
            phone_button: r#"[data-testid="show-phone"]"#.to_string(),
        }
    }
}

/// Extraction tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractionConfig {
    /// Separator between city and date in the location field
    pub location_separator: char,

    /// Value of the `particular` flag; seeds only ever target private sellers
    pub private_seller: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            location_separator: '-',
            private_seller: true,
        }
    }
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URLs assigned round-robin to rendering sessions
    #[serde(default)]
    pub urls: Vec<String>,

    /// Refuse to start without at least one usable proxy
    #[serde(default)]
    pub required: bool,
}

/// Record sink format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    Jsonl,
    /// One row per record in a SQLite table
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Path to the records file (JSON lines or SQLite database)
    pub records_path: String,

    /// Directory receiving diagnostic snapshots
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: String,

    /// File holding unfinished requests of an interrupted crawl
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
}

fn default_seeds() -> Vec<String> {
    vec![DEFAULT_SEED.to_string()]
}

fn default_format() -> OutputFormat {
    OutputFormat::Jsonl
}

fn default_diagnostics_dir() -> String {
    "./diagnostics".to_string()
}

fn default_checkpoint_path() -> String {
    "./checkpoint.json".to_string()
}
