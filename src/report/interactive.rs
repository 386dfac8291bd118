//! Interactive chart documents backed by the Plotly CDN script.

use super::ChartOutcome;
use crate::error::RenderError;
use crate::models::{Dataset, Rating};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const INTERACTIVE_SCATTER: &str = "interactive_scatter.html";
pub const INTERACTIVE_HISTOGRAM: &str = "interactive_histogram.html";
pub const INTERACTIVE_BOXPLOT: &str = "interactive_boxplot.html";

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-latest.min.js";

/// One Plotly figure ready to be wrapped in a page.
struct PlotlyDocument {
    title: &'static str,
    heading: &'static str,
    div_id: &'static str,
    traces: Value,
    layout: Value,
}

/// Render every interactive document into `out_dir`.
pub fn render_interactive_charts(dataset: &Dataset, out_dir: &Path) -> Vec<ChartOutcome> {
    let documents: [(&'static str, fn(&Dataset) -> PlotlyDocument); 3] = [
        (INTERACTIVE_SCATTER, scatter_document),
        (INTERACTIVE_HISTOGRAM, histogram_document),
        (INTERACTIVE_BOXPLOT, boxplot_document),
    ];

    documents
        .into_iter()
        .map(|(file_name, build)| {
            let result = write_document(&build(dataset), out_dir, file_name);
            match &result {
                Ok(path) => info!("Interactive chart written: {}", path.display()),
                Err(e) => warn!("Interactive chart {} failed: {}", file_name, e),
            }
            ChartOutcome { file_name, result }
        })
        .collect()
}

fn scatter_document(dataset: &Dataset) -> PlotlyDocument {
    let x: Vec<f64> = dataset.iter().map(|r| r.size_mb).collect();
    let y: Vec<f64> = dataset.iter().map(|r| r.gco2e).collect();
    let colors: Vec<&str> = dataset
        .iter()
        .map(|r| if r.green { "green" } else { "red" })
        .collect();
    let text: Vec<String> = dataset
        .iter()
        .map(|r| {
            format!(
                "Green: {}, Rating: {}, Size: {}MB",
                if r.green { "True" } else { "False" },
                r.rating,
                r.size_mb
            )
        })
        .collect();

    PlotlyDocument {
        title: "Interactive Scatter Plot - Size vs Emissions",
        heading: "Interactive Analysis: Website Size vs Carbon Emissions",
        div_id: "scatterPlot",
        traces: json!([{
            "x": x,
            "y": y,
            "mode": "markers",
            "type": "scatter",
            "marker": { "color": colors, "size": 8, "opacity": 0.7 },
            "text": text,
            "hovertemplate": "%{text}<extra></extra>",
        }]),
        layout: json!({
            "title": "Website Size vs Carbon Emissions",
            "xaxis": { "title": "Website Size (MB)" },
            "yaxis": { "title": "CO2 Emissions (grams)" },
        }),
    }
}

fn histogram_document(dataset: &Dataset) -> PlotlyDocument {
    let emissions = |green: bool| -> Vec<f64> {
        dataset
            .iter()
            .filter(|r| r.green == green)
            .map(|r| r.gco2e)
            .collect()
    };

    PlotlyDocument {
        title: "Interactive Histogram - Emission Distribution",
        heading: "Interactive Analysis: Carbon Emission Distribution",
        div_id: "histogram",
        traces: json!([
            {
                "x": emissions(true),
                "type": "histogram",
                "name": "Green Hosting",
                "opacity": 0.7,
                "marker": { "color": "green" },
            },
            {
                "x": emissions(false),
                "type": "histogram",
                "name": "Non-Green Hosting",
                "opacity": 0.7,
                "marker": { "color": "red" },
            },
        ]),
        layout: json!({
            "title": "Carbon Emission Distribution by Hosting Type",
            "xaxis": { "title": "CO2 Emissions (grams)" },
            "yaxis": { "title": "Number of Websites" },
            "barmode": "overlay",
        }),
    }
}

fn boxplot_document(dataset: &Dataset) -> PlotlyDocument {
    let traces: Vec<Value> = Rating::ALL
        .iter()
        .map(|rating| {
            let y: Vec<f64> = dataset
                .iter()
                .filter(|r| r.rating == *rating)
                .map(|r| r.gco2e)
                .collect();
            json!({
                "y": y,
                "type": "box",
                "name": rating.to_string(),
                "marker": { "color": "blue" },
            })
        })
        .collect();

    PlotlyDocument {
        title: "Interactive Box Plot - Rating Analysis",
        heading: "Interactive Analysis: Carbon Emissions by Rating",
        div_id: "boxPlot",
        traces: Value::Array(traces),
        layout: json!({
            "title": "CO2 Emissions Distribution by Carbon Rating",
            "yaxis": { "title": "CO2 Emissions (grams)" },
            "xaxis": { "title": "Carbon Rating" },
        }),
    }
}

/// Serialize a value for embedding inside a `<script>` element.
fn script_json(value: &Value, chart: &str) -> Result<String, RenderError> {
    serde_json::to_string(value)
        .map(|s| s.replace('<', "\\u003c"))
        .map_err(|source| RenderError::Encode {
            chart: chart.to_string(),
            source,
        })
}

fn render_page(doc: &PlotlyDocument, chart: &str) -> Result<String, RenderError> {
    let traces = script_json(&doc.traces, chart)?;
    let layout = script_json(&doc.layout, chart)?;

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    page.push_str("    <meta charset=\"utf-8\">\n");
    page.push_str(&format!("    <title>{}</title>\n", doc.title));
    page.push_str(&format!("    <script src=\"{}\"></script>\n", PLOTLY_CDN));
    page.push_str("    <style>\n");
    page.push_str("        body { font-family: Arial, sans-serif; margin: 20px; }\n");
    page.push_str("        .plot-container { width: 100%; height: 500px; }\n");
    page.push_str("    </style>\n</head>\n<body>\n");
    page.push_str(&format!("    <h1>{}</h1>\n", doc.heading));
    page.push_str(&format!(
        "    <div class=\"plot-container\" id=\"{}\"></div>\n",
        doc.div_id
    ));
    page.push_str("    <script>\n");
    page.push_str(&format!("    var data = {};\n", traces));
    page.push_str(&format!("    var layout = {};\n", layout));
    page.push_str(&format!("    Plotly.newPlot('{}', data, layout);\n", doc.div_id));
    page.push_str("    </script>\n</body>\n</html>\n");

    Ok(page)
}

fn write_document(
    doc: &PlotlyDocument,
    out_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, RenderError> {
    let page = render_page(doc, file_name)?;

    fs::create_dir_all(out_dir).map_err(|source| RenderError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let path = out_dir.join(file_name);
    fs::write(&path, page).map_err(|source| RenderError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}
