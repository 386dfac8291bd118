//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// carbon-eda - website carbon emissions exploratory analysis
///
/// Builds a demo dataset of website carbon estimates, summarizes it,
/// renders charts and publishes an analysis notebook as a static page.
///
/// Examples:
///   carbon-eda run
///   carbon-eda collect --size 500 --seed 7 --no-remote
///   carbon-eda analyze --format json
///   carbon-eda render --dpi 150 --out-dir plots
///   carbon-eda publish --notebook carbon_eda.ipynb --site-dir site
///   carbon-eda init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .carbon-eda.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Query the carbon API, then synthesize and save the dataset
    Collect(CollectArgs),

    /// Compute statistics and write the analysis summary
    Analyze(AnalyzeArgs),

    /// Render static and interactive charts
    Render(RenderArgs),

    /// Convert a notebook into a standalone HTML page
    Publish(PublishArgs),

    /// Collect, analyze and render in one go
    Run(RunArgs),

    /// Generate a default .carbon-eda.toml configuration file
    InitConfig {
        /// Where to write the file
        #[arg(long, default_value = ".carbon-eda.toml", value_name = "FILE")]
        path: PathBuf,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CollectArgs {
    /// Number of records to synthesize
    #[arg(long, value_name = "COUNT")]
    pub size: Option<usize>,

    /// Seed for synthesis
    #[arg(long)]
    pub seed: Option<u64>,

    /// Dataset CSV path
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Skip the carbon API request
    #[arg(long)]
    pub no_remote: bool,

    /// Carbon API base URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// API request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Dataset CSV path
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Summary output path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Chart flags shared by `render` and `run`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ChartArgs {
    /// Directory for chart files
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Resolution of static charts in pixels per inch
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Skip the interactive HTML documents
    #[arg(long)]
    pub no_interactive: bool,

    /// Skip the static PNG charts
    #[arg(long)]
    pub no_static: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Dataset CSV path
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    #[command(flatten)]
    pub chart_args: ChartArgs,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PublishArgs {
    /// Notebook to convert
    #[arg(long, value_name = "FILE")]
    pub notebook: Option<PathBuf>,

    /// Output directory for the page
    #[arg(long, value_name = "DIR")]
    pub site_dir: Option<PathBuf>,

    /// Page title
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub collect: CollectArgs,

    /// Summary output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Summary output path
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    #[command(flatten)]
    pub chart_args: ChartArgs,
}

/// Output format for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        let (collect, charts) = match &self.command {
            Command::Collect(collect) => (Some(collect), None),
            Command::Render(render) => (None, Some(&render.chart_args)),
            Command::Run(run) => (Some(&run.collect), Some(&run.chart_args)),
            _ => (None, None),
        };

        if let Some(collect) = collect {
            if collect.size == Some(0) {
                return Err("Sample size must be at least 1".to_string());
            }
            if collect.timeout == Some(0) {
                return Err("Timeout must be at least 1 second".to_string());
            }
            if let Some(ref endpoint) = collect.endpoint {
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err("Endpoint must start with 'http://' or 'https://'".to_string());
                }
            }
        }

        if let Some(charts) = charts {
            if let Some(dpi) = charts.dpi {
                if !(10..=600).contains(&dpi) {
                    return Err("DPI must be between 10 and 600".to_string());
                }
            }
            if charts.no_interactive && charts.no_static {
                return Err(
                    "Nothing to render with both --no-interactive and --no-static".to_string(),
                );
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    #[test]
    fn test_every_subcommand_parses_without_flags() {
        for name in ["collect", "analyze", "render", "publish", "run", "init-config"] {
            let args = Args::try_parse_from(["carbon-eda", name]).unwrap();
            assert!(args.validate().is_ok(), "{} should validate", name);
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["carbon-eda", "analyze", "--quiet", "--format", "json"]).unwrap();
        assert!(args.quiet);
        match args.command {
            Command::Analyze(analyze) => assert_eq!(analyze.format, OutputFormat::Json),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Run(RunArgs::default()));
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_size() {
        let args = make_args(Command::Collect(CollectArgs {
            size: Some(0),
            ..CollectArgs::default()
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let args = make_args(Command::Run(RunArgs {
            collect: CollectArgs {
                timeout: Some(0),
                ..CollectArgs::default()
            },
            ..RunArgs::default()
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_endpoint() {
        let args = make_args(Command::Collect(CollectArgs {
            endpoint: Some("ftp://carbon".to_string()),
            ..CollectArgs::default()
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_dpi_range() {
        let with_dpi = |dpi| {
            make_args(Command::Render(RenderArgs {
                data: None,
                chart_args: ChartArgs {
                    dpi: Some(dpi),
                    ..ChartArgs::default()
                },
            }))
        };
        assert!(with_dpi(5).validate().is_err());
        assert!(with_dpi(700).validate().is_err());
        assert!(with_dpi(150).validate().is_ok());
    }

    #[test]
    fn test_validation_nothing_to_render() {
        let args = make_args(Command::Render(RenderArgs {
            data: None,
            chart_args: ChartArgs {
                no_interactive: true,
                no_static: true,
                ..ChartArgs::default()
            },
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::Run(RunArgs::default()));
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
