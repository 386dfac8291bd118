//! Rendered artifacts: static charts, interactive documents and the
//! analysis summary.

pub mod interactive;
pub mod static_charts;
pub mod summary;

pub use interactive::render_interactive_charts;
pub use static_charts::{render_static_charts, RenderOptions};
pub use summary::{generate_json_summary, generate_markdown_summary, AnalysisReport};

use crate::error::RenderError;
use std::path::PathBuf;

/// Result of rendering one artifact.
#[derive(Debug)]
pub struct ChartOutcome {
    pub file_name: &'static str,
    pub result: Result<PathBuf, RenderError>,
}

impl ChartOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
