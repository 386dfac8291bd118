//! Analysis summary generation.
//!
//! Bundles every aggregate statistic into an [`AnalysisReport`] and renders
//! it as Markdown or JSON.

use crate::analysis::{
    category_green_adoption, green_savings_pct, greenest_categories, grouped_emission_stats,
    overview, percentage_breakdown, rating_distribution, size_emission_correlation,
    DatasetOverview, EmissionStats, GroupKey, RatingShare,
};
use crate::error::InsufficientData;
use crate::models::{Category, Dataset};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about the summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetadata {
    /// When the summary was generated.
    pub generated_at: DateTime<Utc>,
    /// Dataset file the statistics were computed from.
    pub dataset_path: String,
    /// Number of records analyzed.
    pub records: usize,
}

/// Statistics for one group, labelled for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct GroupRow {
    pub group: String,
    #[serde(flatten)]
    pub stats: EmissionStats,
}

/// All aggregate statistics for one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: SummaryMetadata,
    pub overview: Option<DatasetOverview>,
    /// Emission statistics by hosting type.
    pub hosting: Vec<GroupRow>,
    pub green_savings_pct: Option<f64>,
    pub size_emission_correlation: Option<f64>,
    pub size_bands: Vec<GroupRow>,
    pub ratings: Vec<RatingShare>,
    /// Emission statistics by rating, A+ first.
    pub rating_emissions: Vec<GroupRow>,
    pub categories: Vec<GroupRow>,
    /// Share of records per category, in percent.
    pub category_shares: Vec<(String, f64)>,
    pub greenest_categories: Vec<(Category, f64)>,
    pub green_adoption: Vec<(Category, f64)>,
    /// Statistics that could not be computed, with the reason.
    pub notes: Vec<String>,
}

impl AnalysisReport {
    /// Compute every statistic for `dataset`.
    pub fn build(dataset: &Dataset, dataset_path: impl Into<String>) -> Self {
        let mut notes = Vec::new();

        let overview = noted(overview(dataset), "Overview", &mut notes);
        let green_savings_pct =
            noted(green_savings_pct(dataset), "Green hosting savings", &mut notes);
        let size_emission_correlation = noted(
            size_emission_correlation(dataset),
            "Size-emissions correlation",
            &mut notes,
        );

        Self {
            metadata: SummaryMetadata {
                generated_at: Utc::now(),
                dataset_path: dataset_path.into(),
                records: dataset.len(),
            },
            overview,
            hosting: rows(dataset, GroupKey::Green),
            green_savings_pct,
            size_emission_correlation,
            size_bands: rows(dataset, GroupKey::SizeBand),
            ratings: rating_distribution(dataset),
            rating_emissions: rows(dataset, GroupKey::Rating),
            categories: rows(dataset, GroupKey::Category),
            category_shares: percentage_breakdown(dataset, GroupKey::Category)
                .into_iter()
                .map(|(value, pct)| (value.to_string(), pct))
                .collect(),
            greenest_categories: greenest_categories(dataset, 3),
            green_adoption: category_green_adoption(dataset),
            notes,
        }
    }
}

/// Keep a computed statistic, or record why it is missing.
fn noted<T>(
    result: Result<T, InsufficientData>,
    label: &str,
    notes: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            notes.push(format!("{}: {}", label, e));
            None
        }
    }
}

fn rows(dataset: &Dataset, key: GroupKey) -> Vec<GroupRow> {
    grouped_emission_stats(dataset, key)
        .into_iter()
        .map(|(value, stats)| GroupRow {
            group: value.to_string(),
            stats,
        })
        .collect()
}

/// Generate a complete Markdown summary.
pub fn generate_markdown_summary(report: &AnalysisReport) -> String {
    let mut output = String::new();

    output.push_str("# Website Carbon Emissions Analysis\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_overview_section(report));
    output.push_str(&generate_hosting_section(report));
    output.push_str(&generate_size_section(report));
    output.push_str(&generate_rating_section(report));
    output.push_str(&generate_category_section(report));
    output.push_str(&generate_notes_section(&report.notes));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &SummaryMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** `{}`\n", metadata.dataset_path));
    section.push_str(&format!("- **Records:** {}\n", metadata.records));
    section.push_str(&format!(
        "- **Generated:** {}\n\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section
}

fn generate_overview_section(report: &AnalysisReport) -> String {
    let Some(ref o) = report.overview else {
        return String::new();
    };

    let mut section = String::new();
    section.push_str("## Overview\n\n");
    section.push_str(&format!("- **Total websites:** {}\n", o.records));
    section.push_str(&format!(
        "- **Green hosting:** {} ({:.1}%)\n",
        o.green_count, o.green_pct
    ));
    section.push_str(&format!(
        "- **Non-green hosting:** {} ({:.1}%)\n",
        o.records - o.green_count,
        100.0 - o.green_pct
    ));
    section.push_str(&format!("- **Average emissions:** {:.2}g CO2\n", o.mean_gco2e));
    section.push_str(&format!(
        "- **Size range:** {:.3} - {:.3} MB (mean {:.3} MB)\n\n",
        o.min_size_mb, o.max_size_mb, o.mean_size_mb
    ));

    section
}

fn stats_table(rows: &[GroupRow], label: &str) -> String {
    let mut table = String::new();

    table.push_str(&format!(
        "| {} | Count | Mean gCO2e | Median | Std Dev | Mean Size (MB) | Mean Requests | Green % |\n",
        label
    ));
    table.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for row in rows {
        let s = &row.stats;
        let std = s
            .std_gco2e
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "-".to_string());
        table.push_str(&format!(
            "| {} | {} | {:.3} | {:.3} | {} | {:.3} | {:.1} | {:.1} |\n",
            row.group,
            s.count,
            s.mean_gco2e,
            s.median_gco2e,
            std,
            s.mean_size_mb,
            s.mean_requests,
            s.green_pct
        ));
    }
    table.push('\n');

    table
}

fn generate_hosting_section(report: &AnalysisReport) -> String {
    if report.hosting.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Green Hosting Impact\n\n");
    section.push_str(&stats_table(&report.hosting, "Hosting"));

    if let Some(savings) = report.green_savings_pct {
        section.push_str(&format!(
            "Green hosting reduces emissions by **{:.1}%**.\n\n",
            savings
        ));
    }

    section
}

fn generate_size_section(report: &AnalysisReport) -> String {
    if report.size_bands.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Size vs Emissions\n\n");

    if let Some(r) = report.size_emission_correlation {
        section.push_str(&format!("Size-emissions correlation: **{:.3}**\n\n", r));
    }

    section.push_str(&stats_table(&report.size_bands, "Size"));
    section
}

fn generate_rating_section(report: &AnalysisReport) -> String {
    if report.ratings.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Carbon Ratings\n\n");
    section.push_str("| Rating | Websites | Share |\n");
    section.push_str("|:---:|:---:|:---:|\n");

    for share in &report.ratings {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            share.rating, share.count, share.pct
        ));
    }
    section.push('\n');

    section.push_str("### Emissions by Rating\n\n");
    section.push_str(&stats_table(&report.rating_emissions, "Rating"));

    section
}

fn generate_category_section(report: &AnalysisReport) -> String {
    if report.categories.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Categories\n\n");
    section.push_str(&stats_table(&report.categories, "Category"));

    if !report.category_shares.is_empty() {
        section.push_str("### Category Share\n\n");
        for (category, pct) in &report.category_shares {
            section.push_str(&format!("- {}: {:.1}%\n", category, pct));
        }
        section.push('\n');
    }

    if !report.greenest_categories.is_empty() {
        section.push_str("### Greenest Categories (by emissions)\n\n");
        for (i, (category, emissions)) in report.greenest_categories.iter().enumerate() {
            section.push_str(&format!("{}. {}: {:.2}g CO2\n", i + 1, category, emissions));
        }
        section.push('\n');
    }

    if !report.green_adoption.is_empty() {
        section.push_str("### Green Hosting Adoption\n\n");
        for (category, pct) in &report.green_adoption {
            section.push_str(&format!("- {}: {:.1}%\n", category, pct));
        }
        section.push('\n');
    }

    section
}

fn generate_notes_section(notes: &[String]) -> String {
    if notes.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Notes\n\n");
    for note in notes {
        section.push_str(&format!("- {}\n", note));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Summary generated by carbon-eda*\n".to_string()
}

/// Generate a JSON summary.
pub fn generate_json_summary(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::synthesize;

    #[test]
    fn test_generate_markdown_summary() {
        let report = AnalysisReport::build(&synthesize(400, 42), "data/demo.csv");
        let markdown = generate_markdown_summary(&report);

        assert!(markdown.contains("# Website Carbon Emissions Analysis"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("`data/demo.csv`"));
        assert!(markdown.contains("## Green Hosting Impact"));
        assert!(markdown.contains("Green Hosting"));
        assert!(markdown.contains("Non-Green Hosting"));
        assert!(markdown.contains("Size-emissions correlation"));
        assert!(markdown.contains("| A+ |"));
        assert!(markdown.contains("Greenest Categories"));
        assert!(markdown.contains("### Category Share"));
        assert!(!markdown.contains("## Notes"));
    }

    #[test]
    fn test_rating_rows_in_order() {
        let report = AnalysisReport::build(&synthesize(400, 42), "data.csv");
        let labels: Vec<String> = report.ratings.iter().map(|s| s.rating.to_string()).collect();
        assert_eq!(labels, vec!["A+", "A", "B", "C", "D"]);
    }

    #[test]
    fn test_empty_dataset_summary_records_notes() {
        let report = AnalysisReport::build(&Dataset::default(), "empty.csv");

        assert!(report.overview.is_none());
        assert!(report.size_emission_correlation.is_none());
        assert!(report.hosting.is_empty());
        assert_eq!(report.notes.len(), 3);

        let markdown = generate_markdown_summary(&report);
        assert!(markdown.contains("## Notes"));
        assert!(markdown.contains("insufficient data"));
        assert!(!markdown.contains("## Overview"));
    }

    #[test]
    fn test_generate_json_summary() {
        let report = AnalysisReport::build(&synthesize(100, 3), "data.csv");
        let json = generate_json_summary(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["records"], 100);
        assert!(value["hosting"][0]["group"].is_string());
        assert!(value["hosting"][0]["mean_gco2e"].is_number());
        assert_eq!(value["ratings"][0]["rating"], "A+");
        assert_eq!(value["greenest_categories"].as_array().unwrap().len(), 3);
        let share_total: f64 = value["category_shares"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| pair[1].as_f64().unwrap())
            .sum();
        assert!((share_total - 100.0).abs() < 1e-9);
    }
}
