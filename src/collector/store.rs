//! Dataset file persistence.
//!
//! The CSV file is the only hand-off between stages, so `persist` always
//! truncates and `load` reads the whole file before returning.

use crate::error::DatasetError;
use crate::models::{Dataset, Record};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const HEADER: [&str; 7] = ["url", "green", "gco2e", "rating", "category", "size_mb", "requests"];

/// Write the dataset as CSV, creating parent directories as needed.
pub fn persist(dataset: &Dataset, path: &Path) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    // Serialization only emits the header alongside the first row.
    if dataset.is_empty() {
        writer.write_record(HEADER).map_err(csv_err)?;
    }
    for record in dataset {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Dataset saved to {} ({} records)", path.display(), dataset.len());
    Ok(())
}

/// Read a dataset previously written by [`persist`].
pub fn load(path: &Path) -> Result<Dataset, DatasetError> {
    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let records = reader
        .deserialize::<Record>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)?;

    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(Dataset::new(records))
}
