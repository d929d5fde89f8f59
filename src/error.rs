//! Error taxonomy for gateway deployment
//!
//! Each variant corresponds to one stage of the deployment sequence; a stage
//! failure aborts the remaining stages and surfaces with this context.

use std::path::PathBuf;
use std::time::Duration;

/// Deployment error, one variant per pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Prerequisite settings could not be resolved.
    #[error("prerequisite settings unavailable: {0}")]
    Config(String),

    /// The external config-generation script failed.
    #[error("failed generating east-west gateway config for {cluster}: {message}")]
    Generation { cluster: String, message: String },

    /// The generated config could not be written to the working directory.
    #[error("failed writing gateway config to {path}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external render tool failed to produce a manifest.
    #[error("failed rendering east-west gateway manifest: {0}")]
    Render(String),

    /// The rendered manifest could not be applied to the cluster.
    #[error("failed applying east-west gateway manifest to {cluster}")]
    Apply {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },

    /// The readiness deadline passed before the gateway became ready.
    #[error("timed out after {elapsed:?} waiting for {waiting_for}: {last_observed}")]
    Timeout {
        waiting_for: String,
        elapsed: Duration,
        last_observed: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_names_selector() {
        let err = Error::Timeout {
            waiting_for: "istio-eastwestgateway in west".to_string(),
            elapsed: Duration::from_secs(300),
            last_observed: "no ready pods for istio=eastwestgateway".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("istio-eastwestgateway in west"));
        assert!(msg.contains("no ready pods for istio=eastwestgateway"));
    }

    #[test]
    fn test_persistence_carries_source() {
        let err = Error::Persistence {
            path: PathBuf::from("/work/eastwest-west.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("eastwest-west.yaml"));
    }
}
