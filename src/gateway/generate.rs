//! Operator config generation
//!
//! Invokes the external generation script with the cluster/network contract
//! carried in environment variables, then persists the produced document so
//! the render step can consume it from disk.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// One invocation of the gateway config generation script.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    /// Path to the generation script.
    pub script: PathBuf,

    /// Target cluster name, exported as `CLUSTER`.
    pub cluster_name: String,

    /// Target network name, exported as `NETWORK`.
    pub network_name: String,

    /// Mesh identifier, exported as `MESH`.
    pub mesh_id: String,

    /// Whether the environment is a single-cluster one; exports
    /// `SINGLE_CLUSTER=1` when set.
    pub single_cluster: bool,
}

impl GenerateRequest {
    /// The variables added on top of the inherited environment.
    pub fn custom_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("CLUSTER".to_string(), self.cluster_name.clone()),
            ("NETWORK".to_string(), self.network_name.clone()),
            ("MESH".to_string(), self.mesh_id.clone()),
        ];
        if self.single_cluster {
            env.push(("SINGLE_CLUSTER".to_string(), "1".to_string()));
        }
        env
    }
}

/// Run the generation script and capture its combined output as the
/// operator config document.
pub async fn generate(request: &GenerateRequest) -> Result<Vec<u8>> {
    debug!(
        "generating east-west gateway config for {} ({})",
        request.cluster_name, request.network_name
    );

    let output = Command::new(&request.script)
        .envs(request.custom_env())
        .output()
        .await
        .map_err(|e| Error::Generation {
            cluster: request.cluster_name.clone(),
            message: format!("failed running {}: {e}", request.script.display()),
        })?;

    if !output.status.success() {
        return Err(Error::Generation {
            cluster: request.cluster_name.clone(),
            message: format!(
                "{} exited with {}: {}",
                request.script.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    // The script reports through both streams; the document is their union.
    let mut document = output.stdout;
    document.extend_from_slice(&output.stderr);
    Ok(document)
}

/// Write the generated config to `path`, replacing any previous attempt.
pub fn persist(path: &Path, config: &[u8]) -> Result<()> {
    std::fs::write(path, config).map_err(|source| Error::Persistence {
        path: path.to_path_buf(),
        source,
    })
}
