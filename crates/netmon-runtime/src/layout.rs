//! Network-layout acquisition.
//!
//! The layout is a JSON topology document, read from a local file or
//! fetched over HTTPS. Failures map onto the orchestrator error taxonomy:
//! a missing file, a failed download, or an unparseable document each get
//! their own kind.

use std::path::PathBuf;

use netmon_transit::topology::TopologyDoc;
use tracing::info;

use crate::error::MonitorError;

/// Where the topology document comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutSource {
    File(PathBuf),
    Url(String),
}

impl LayoutSource {
    /// Classify a configured layout location: anything with an HTTP
    /// scheme is a URL, the rest is a filesystem path.
    #[must_use]
    pub fn from_config_value(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_owned())
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

/// Fetch and parse the topology document.
pub async fn load_topology(source: &LayoutSource) -> Result<TopologyDoc, MonitorError> {
    match source {
        LayoutSource::File(path) => {
            if !path.exists() {
                return Err(MonitorError::MissingNetworkLayoutFile(
                    path.display().to_string(),
                ));
            }
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| MonitorError::FailedNetworkLayoutFileParsing(e.to_string()))?;
            let doc: TopologyDoc = serde_json::from_str(&content)
                .map_err(|e| MonitorError::FailedNetworkLayoutFileParsing(e.to_string()))?;
            info!(path = %path.display(), stations = doc.stations.len(), "network layout loaded");
            Ok(doc)
        }
        LayoutSource::Url(url) => {
            let response = reqwest::get(url)
                .await
                .map_err(|e| MonitorError::FailedNetworkLayoutFileDownload(e.to_string()))?;
            if !response.status().is_success() {
                return Err(MonitorError::FailedNetworkLayoutFileDownload(format!(
                    "{url}: HTTP {}",
                    response.status()
                )));
            }
            let content = response
                .text()
                .await
                .map_err(|e| MonitorError::FailedNetworkLayoutFileDownload(e.to_string()))?;
            let doc: TopologyDoc = serde_json::from_str(&content)
                .map_err(|e| MonitorError::FailedNetworkLayoutFileParsing(e.to_string()))?;
            info!(%url, stations = doc.stations.len(), "network layout downloaded");
            Ok(doc)
        }
    }
}
