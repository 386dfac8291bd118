//! Dataset collection.
//!
//! Tries the remote estimation service first, then always builds the working
//! dataset by seeded synthesis and persists it for the later stages.

pub mod remote;
pub mod store;
pub mod synth;

pub use remote::{CarbonClient, RemoteRecord};
pub use store::{load, persist};
pub use synth::synthesize;

use crate::config::CollectorConfig;
use crate::error::{DatasetError, FetchError};
use crate::models::Dataset;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of a collection run.
#[derive(Debug)]
pub struct Collected {
    /// The synthesized dataset that was persisted.
    pub dataset: Dataset,
    /// Outcome of the remote probe; `None` when remote fetching is disabled.
    pub remote: Option<Result<RemoteRecord, FetchError>>,
}

/// Probe the remote service (if enabled), then synthesize and persist.
///
/// A remote failure is reported in [`Collected::remote`] and never stops
/// the run.
pub async fn collect(
    config: &CollectorConfig,
    data_path: &Path,
) -> Result<Collected, DatasetError> {
    let remote = if config.fetch_remote {
        Some(probe_remote(config).await)
    } else {
        None
    };

    match &remote {
        Some(Ok(record)) => info!("Remote estimate received ({} fields)", record.len()),
        Some(Err(e)) => warn!("Remote estimate unavailable, using synthesized data: {}", e),
        None => info!("Remote fetch disabled, generating demo dataset"),
    }

    let dataset = synthesize(config.sample_size, config.seed);
    persist(&dataset, data_path)?;

    Ok(Collected { dataset, remote })
}

async fn probe_remote(config: &CollectorConfig) -> Result<RemoteRecord, FetchError> {
    let client = CarbonClient::new(config.endpoint.clone(), config.timeout_seconds)?;
    debug!("Probing {} with {}", client.endpoint(), config.probe_url);
    client.fetch_remote(&config.probe_url).await
}

/// Load the dataset at `path`, or synthesize and persist one if it is absent.
pub fn load_or_synthesize(
    path: &Path,
    size: usize,
    seed: u64,
) -> Result<Dataset, DatasetError> {
    if path.exists() {
        info!("Loading existing data from {}", path.display());
        return load(path);
    }

    info!("No data found at {}, generating new dataset", path.display());
    let dataset = synthesize(size, seed);
    persist(&dataset, path)?;
    Ok(dataset)
}
