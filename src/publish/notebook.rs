//! Notebook document model (nbformat 4).

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Oldest major format version understood by the parser.
pub const MIN_NBFORMAT: u32 = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    pub nbformat: u32,
    #[serde(default)]
    pub nbformat_minor: u32,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Markdown {
        source: MultilineText,
    },
    Code {
        source: MultilineText,
        #[serde(default)]
        execution_count: Option<u32>,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        source: MultilineText,
        #[serde(default)]
        metadata: Value,
    },
}

/// Text stored either as one string or as a list of lines.
///
/// Lines keep their trailing newlines, so joining them is plain concatenation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MultilineText {
    Single(String),
    Lines(Vec<String>),
}

impl MultilineText {
    pub fn text(&self) -> String {
        match self {
            MultilineText::Single(s) => s.clone(),
            MultilineText::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        #[serde(default)]
        name: String,
        text: MultilineText,
    },
    DisplayData {
        #[serde(default)]
        data: MimeBundle,
    },
    ExecuteResult {
        #[serde(default)]
        data: MimeBundle,
        #[serde(default)]
        execution_count: Option<u32>,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

/// Output payloads keyed by MIME type.
pub type MimeBundle = BTreeMap<String, Value>;

/// Read a textual MIME payload, which may be a string or a list of lines.
pub fn bundle_text(bundle: &MimeBundle, mime: &str) -> Option<String> {
    match bundle.get(mime)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(lines) => Some(
            lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .concat(),
        ),
        _ => None,
    }
}

impl Notebook {
    /// Parse a notebook, checking the format version before the cell schema.
    pub fn from_value(value: Value) -> Result<Self, NotebookParseError> {
        let version = value
            .get("nbformat")
            .and_then(Value::as_u64)
            .map(|v| v as u32);

        if let Some(version) = version {
            if version < MIN_NBFORMAT {
                return Err(NotebookParseError::Version(version));
            }
        }

        serde_json::from_value(value).map_err(NotebookParseError::Schema)
    }
}

#[derive(Debug)]
pub enum NotebookParseError {
    Version(u32),
    Schema(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cells_and_outputs() {
        let value = json!({
            "nbformat": 4,
            "nbformat_minor": 5,
            "metadata": {},
            "cells": [
                { "cell_type": "markdown", "metadata": {}, "source": ["# Title\n", "text"] },
                {
                    "cell_type": "code",
                    "execution_count": 2,
                    "metadata": {},
                    "source": "print(1)",
                    "outputs": [
                        { "output_type": "stream", "name": "stdout", "text": ["1\n"] },
                        { "output_type": "execute_result", "execution_count": 2,
                          "data": { "text/plain": ["'a'"] }, "metadata": {} }
                    ]
                },
                { "cell_type": "raw", "metadata": {}, "source": "" }
            ]
        });

        let notebook = Notebook::from_value(value).unwrap();
        assert_eq!(notebook.nbformat_minor, 5);
        assert_eq!(notebook.cells.len(), 3);

        match &notebook.cells[0] {
            Cell::Markdown { source } => assert_eq!(source.text(), "# Title\ntext"),
            other => panic!("unexpected cell {:?}", other),
        }
        match &notebook.cells[1] {
            Cell::Code {
                execution_count,
                outputs,
                ..
            } => {
                assert_eq!(*execution_count, Some(2));
                assert_eq!(outputs.len(), 2);
                match &outputs[1] {
                    Output::ExecuteResult { data, .. } => {
                        assert_eq!(bundle_text(data, "text/plain").unwrap(), "'a'")
                    }
                    other => panic!("unexpected output {:?}", other),
                }
            }
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_old_version_rejected_before_schema() {
        let value = json!({ "nbformat": 3, "worksheets": [] });
        assert!(matches!(
            Notebook::from_value(value),
            Err(NotebookParseError::Version(3))
        ));
    }

    #[test]
    fn test_unknown_cell_type_is_schema_error() {
        let value = json!({
            "nbformat": 4,
            "cells": [{ "cell_type": "widget", "source": "" }]
        });
        assert!(matches!(
            Notebook::from_value(value),
            Err(NotebookParseError::Schema(_))
        ));
    }
}
