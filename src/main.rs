//! carbon-eda - website carbon emissions exploratory analysis
//!
//! Collects (or synthesizes) a dataset of per-site carbon estimates,
//! computes descriptive statistics, renders charts and publishes the
//! analysis notebook as a static page.
//!
//! Exit codes:
//!   0 - Success (some charts may have failed; each failure is reported)
//!   1 - Runtime error (bad arguments, unreadable dataset, notebook
//!       conversion failure, or every chart failed)

mod analysis;
mod cli;
mod collector;
mod config;
mod error;
mod models;
mod publish;
mod report;

use anyhow::{Context, Result};
use cli::{Args, Command, OutputFormat};
use config::Config;
use models::Dataset;
use publish::PageOptions;
use report::{AnalysisReport, ChartOutcome, RenderOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig { ref path } = args.command {
        return handle_init_config(path);
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("carbon-eda v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(&args, &config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: write the default configuration file.
fn handle_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to customize paths, sample size, chart resolution, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from `--config`, else the default file, else defaults.
///
/// An explicit path that cannot be read is an error; a broken default file
/// is only warned about.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", config::DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

/// Dispatch the subcommand. Returns the process exit code.
async fn run(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();

    let exit_code = match &args.command {
        Command::Collect(_) => {
            handle_collect(config).await?;
            0
        }
        Command::Analyze(analyze) => {
            let dataset = load_dataset(config)?;
            handle_analyze(config, &dataset, analyze.format)?;
            0
        }
        Command::Render(_) => {
            let dataset = load_dataset(config)?;
            handle_render(config, &dataset, !args.quiet)
        }
        Command::Publish(_) => {
            handle_publish(config)?;
            0
        }
        Command::Run(run) => run_pipeline(config, run.format, !args.quiet).await?,
        Command::InitConfig { .. } => 0,
    };

    println!("\n⏱️  Finished in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(exit_code)
}

/// Collect, then analyze and render from the saved file.
async fn run_pipeline(config: &Config, format: OutputFormat, show_progress: bool) -> Result<i32> {
    handle_collect(config).await?;

    let data_path = &config.general.data_path;
    let dataset = collector::load(data_path)
        .with_context(|| format!("Failed to reload dataset from {}", data_path.display()))?;

    handle_analyze(config, &dataset, format)?;
    Ok(handle_render(config, &dataset, show_progress))
}

/// Probe the API, synthesize and persist the dataset.
async fn handle_collect(config: &Config) -> Result<Dataset> {
    let collector_config = &config.collector;
    let data_path = &config.general.data_path;

    println!("📥 Collecting website carbon data...");
    if collector_config.fetch_remote {
        println!(
            "   API: {} (timeout {}s)",
            collector_config.endpoint, collector_config.timeout_seconds
        );
    }

    let collected = collector::collect(collector_config, data_path)
        .await
        .with_context(|| format!("Failed to save dataset to {}", data_path.display()))?;

    match &collected.remote {
        Some(Ok(record)) => {
            println!(
                "   ✅ Remote estimate for {} ({} fields)",
                collector_config.probe_url,
                record.len()
            );
            debug!("Remote record: {:?}", record);
        }
        Some(Err(e)) => println!("   ⚠️  API unavailable ({}), using demo data", e),
        None => println!("   Remote fetch disabled, using demo data"),
    }

    println!(
        "   💾 Saved {} records to {} (seed {})",
        collected.dataset.len(),
        data_path.display(),
        collector_config.seed
    );

    Ok(collected.dataset)
}

fn load_dataset(config: &Config) -> Result<Dataset> {
    let data_path = &config.general.data_path;
    println!("📂 Loading dataset: {}", data_path.display());

    let dataset = collector::load_or_synthesize(
        data_path,
        config.collector.sample_size,
        config.collector.seed,
    )
    .with_context(|| format!("Failed to load dataset from {}", data_path.display()))?;

    info!("Dataset has {} records", dataset.len());
    Ok(dataset)
}

/// Summary path for the chosen format; JSON swaps the extension.
fn summary_path(config: &Config, format: OutputFormat) -> PathBuf {
    match format {
        OutputFormat::Markdown => config.general.summary_path.clone(),
        OutputFormat::Json => config.general.summary_path.with_extension("json"),
    }
}

/// Compute statistics and write the summary file.
fn handle_analyze(config: &Config, dataset: &Dataset, format: OutputFormat) -> Result<()> {
    println!("\n🔬 Analyzing {} records...", dataset.len());

    let report = AnalysisReport::build(dataset, config.general.data_path.display().to_string());

    let content = match format {
        OutputFormat::Markdown => report::generate_markdown_summary(&report),
        OutputFormat::Json => report::generate_json_summary(&report)?,
    };

    let output_path = summary_path(config, format);
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(&output_path, &content)
        .with_context(|| format!("Failed to write summary to {}", output_path.display()))?;

    info!("Summary saved to: {}", output_path.display());

    println!("\n📊 Analysis Summary:");
    if let Some(ref overview) = report.overview {
        println!("   Websites: {}", overview.records);
        println!(
            "   Green hosting: {} ({:.1}%)",
            overview.green_count, overview.green_pct
        );
        println!("   Average emissions: {:.2}g CO2", overview.mean_gco2e);
    }
    if let Some(savings) = report.green_savings_pct {
        println!("   Green hosting reduces emissions by {:.1}%", savings);
    }
    if let Some(r) = report.size_emission_correlation {
        println!("   Size-emissions correlation: {:.3}", r);
    }
    for share in &report.ratings {
        println!(
            "   Rating {:<2}: {:>5} ({:.1}%)",
            share.rating.to_string(),
            share.count,
            share.pct
        );
    }
    for note in &report.notes {
        println!("   ⚠️  {}", note);
    }
    println!("\n✅ Summary saved to: {}", output_path.display());

    Ok(())
}

/// Render all enabled charts. Returns 1 only when every chart failed.
fn handle_render(config: &Config, dataset: &Dataset, show_progress: bool) -> i32 {
    let plots_dir = &config.general.plots_dir;
    println!("\n🎨 Rendering charts into {}...", plots_dir.display());

    let mut outcomes: Vec<ChartOutcome> = Vec::new();

    if config.render.static_charts {
        let options = RenderOptions {
            dpi: config.render.dpi,
            show_progress,
        };
        outcomes.extend(report::render_static_charts(dataset, plots_dir, &options));
    }
    if config.render.interactive {
        outcomes.extend(report::render_interactive_charts(dataset, plots_dir));
    }

    for outcome in &outcomes {
        match &outcome.result {
            Ok(path) => println!("   ✅ {}", path.display()),
            Err(e) => println!("   ❌ {}: {}", outcome.file_name, e),
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if !outcomes.is_empty() && failed == outcomes.len() {
        eprintln!("\n❌ Every chart failed to render.");
        return 1;
    }
    if failed > 0 {
        warn!("{} of {} charts failed", failed, outcomes.len());
        println!("\n⚠️  {} of {} charts failed.", failed, outcomes.len());
    } else {
        println!("\n✅ All {} charts rendered.", outcomes.len());
    }

    0
}

/// Convert the configured notebook into a page under the site directory.
fn handle_publish(config: &Config) -> Result<()> {
    let publish = &config.publish;
    println!("📖 Converting notebook: {}", publish.notebook.display());

    let options = PageOptions {
        title: publish.title.clone(),
        nav_links: publish.nav_links.clone(),
    };

    let output = publish::convert_notebook_to_page(&publish.notebook, &publish.site_dir, &options)
        .context("Notebook conversion failed")?;

    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    println!("✅ Conversion successful!");
    println!("📄 HTML file saved to: {}", output.display());
    println!("📊 File size: {} bytes", size);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.general.data_path = dir.join("data").join("carbon.csv");
        config.general.summary_path = dir.join("data").join("summary.md");
        config.general.plots_dir = dir.join("plots");
        config.collector.fetch_remote = false;
        config.collector.sample_size = 60;
        config.render.static_charts = false;
        config
    }

    #[test]
    fn test_summary_path_follows_format() {
        let config = Config::default();
        assert_eq!(
            summary_path(&config, OutputFormat::Markdown),
            PathBuf::from("data/analysis_summary.md")
        );
        assert_eq!(
            summary_path(&config, OutputFormat::Json),
            PathBuf::from("data/analysis_summary.json")
        );
    }

    #[tokio::test]
    async fn test_collect_analyze_render_pipeline() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());

        let dataset = handle_collect(&config).await.unwrap();
        assert_eq!(dataset.len(), 60);

        handle_analyze(&config, &dataset, OutputFormat::Markdown).unwrap();
        let summary = std::fs::read_to_string(&config.general.summary_path).unwrap();
        assert!(summary.contains("# Website Carbon Emissions Analysis"));

        assert_eq!(handle_render(&config, &dataset, false), 0);
        assert!(config.general.plots_dir.join("interactive_scatter.html").exists());
    }

    #[tokio::test]
    async fn test_run_reads_back_the_saved_dataset() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());

        let code = run_pipeline(&config, OutputFormat::Json, false).await.unwrap();
        assert_eq!(code, 0);

        let saved = collector::load(&config.general.data_path).unwrap();
        assert_eq!(saved.len(), 60);

        let summary_file = summary_path(&config, OutputFormat::Json);
        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(summary_file).unwrap()).unwrap();
        assert_eq!(summary["overview"]["records"], 60);
        assert!(config.general.plots_dir.join("interactive_histogram.html").exists());
    }

    #[test]
    fn test_render_fails_when_every_chart_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        std::fs::write(dir.path().join("plots"), "blocker").unwrap();
        config.render.static_charts = true;

        assert_eq!(handle_render(&config, &collector::synthesize(10, 1), false), 1);
    }

    #[test]
    fn test_publish_missing_notebook_is_error() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        config.publish.notebook = dir.path().join("absent.ipynb");
        config.publish.site_dir = dir.path().join("site");

        let err = handle_publish(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("notebook not found"));
        assert!(!config.publish.site_dir.exists());
    }
}
