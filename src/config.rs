//! Configuration file handling.
//!
//! Settings come from `.carbon-eda.toml` (or `--config`), then individual
//! CLI flags override them.

use crate::cli::{Args, Command, RunArgs};
use crate::publish::converter::{default_nav_links, default_title};
use crate::publish::NavLink;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = ".carbon-eda.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// File locations and general settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset collection settings.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Chart rendering settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Notebook publishing settings.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Dataset CSV written by `collect` and read by later stages.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Analysis summary written by `analyze`.
    #[serde(default = "default_summary_path")]
    pub summary_path: PathBuf,

    /// Directory receiving static and interactive charts.
    #[serde(default = "default_plots_dir")]
    pub plots_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            summary_path: default_summary_path(),
            plots_dir: default_plots_dir(),
            verbose: false,
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/demo_carbon_dataset.csv")
}

fn default_summary_path() -> PathBuf {
    PathBuf::from("data/analysis_summary.md")
}

fn default_plots_dir() -> PathBuf {
    PathBuf::from("plots")
}

/// Dataset collector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Carbon estimation API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Site whose estimate is requested from the API.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of synthesized records.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Seed for synthesis.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Query the API before synthesizing.
    #[serde(default = "default_true")]
    pub fetch_remote: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            probe_url: default_probe_url(),
            timeout_seconds: default_timeout(),
            sample_size: default_sample_size(),
            seed: default_seed(),
            fetch_remote: true,
        }
    }
}

fn default_endpoint() -> String {
    "https://api.websitecarbon.com".to_string()
}

fn default_probe_url() -> String {
    "https://www.example.com".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_sample_size() -> usize {
    1000
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Pixels per inch for static charts.
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Write the interactive HTML documents.
    #[serde(default = "default_true")]
    pub interactive: bool,

    /// Write the static PNG charts.
    #[serde(default = "default_true")]
    pub static_charts: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            interactive: true,
            static_charts: true,
        }
    }
}

fn default_dpi() -> u32 {
    100
}

/// Notebook publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Notebook to convert.
    #[serde(default = "default_notebook")]
    pub notebook: PathBuf,

    /// Output directory for the page and its images.
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,

    /// Page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Links shown in the fixed navigation block.
    #[serde(default = "default_nav_links")]
    pub nav_links: Vec<NavLink>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            notebook: default_notebook(),
            site_dir: default_site_dir(),
            title: default_title(),
            nav_links: default_nav_links(),
        }
    }
}

fn default_notebook() -> PathBuf {
    PathBuf::from("carbon_eda.ipynb")
}

fn default_site_dir() -> PathBuf {
    PathBuf::from("site")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only flags the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if args.verbose {
            self.general.verbose = true;
        }

        match &args.command {
            Command::Collect(collect) => self.merge_collect(collect),
            Command::Analyze(analyze) => {
                if let Some(ref data) = analyze.data {
                    self.general.data_path = data.clone();
                }
                if let Some(ref output) = analyze.output {
                    self.general.summary_path = output.clone();
                }
            }
            Command::Render(render) => {
                if let Some(ref data) = render.data {
                    self.general.data_path = data.clone();
                }
                self.merge_render(&render.chart_args);
            }
            Command::Publish(publish) => {
                if let Some(ref notebook) = publish.notebook {
                    self.publish.notebook = notebook.clone();
                }
                if let Some(ref site_dir) = publish.site_dir {
                    self.publish.site_dir = site_dir.clone();
                }
                if let Some(ref title) = publish.title {
                    self.publish.title = title.clone();
                }
            }
            Command::Run(RunArgs {
                collect,
                summary,
                chart_args,
                ..
            }) => {
                self.merge_collect(collect);
                if let Some(summary) = summary {
                    self.general.summary_path = summary.clone();
                }
                self.merge_render(chart_args);
            }
            Command::InitConfig { .. } => {}
        }
    }

    fn merge_collect(&mut self, collect: &crate::cli::CollectArgs) {
        if let Some(ref data) = collect.data {
            self.general.data_path = data.clone();
        }
        if let Some(size) = collect.size {
            self.collector.sample_size = size;
        }
        if let Some(seed) = collect.seed {
            self.collector.seed = seed;
        }
        if let Some(ref endpoint) = collect.endpoint {
            self.collector.endpoint = endpoint.clone();
        }
        if let Some(timeout) = collect.timeout {
            self.collector.timeout_seconds = timeout;
        }
        if collect.no_remote {
            self.collector.fetch_remote = false;
        }
    }

    fn merge_render(&mut self, chart_args: &crate::cli::ChartArgs) {
        if let Some(ref out_dir) = chart_args.out_dir {
            self.general.plots_dir = out_dir.clone();
        }
        if let Some(dpi) = chart_args.dpi {
            self.render.dpi = dpi;
        }
        if chart_args.no_interactive {
            self.render.interactive = false;
        }
        if chart_args.no_static {
            self.render.static_charts = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
