//! Manifest rendering
//!
//! Turns the persisted operator config into concrete cluster resources by
//! invoking the external render tool. The argument vector is built from a
//! structured request in one place so the subprocess contract stays
//! testable without spawning anything.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::error;

use crate::config::Settings;
use crate::error::{Error, Result};

/// One `istioctl manifest generate` invocation.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    /// Path to the render tool binary.
    pub istioctl: PathBuf,

    /// Control-plane namespace.
    pub istio_namespace: String,

    /// Directory of installation manifests.
    pub manifests_dir: PathBuf,

    /// Image hub override.
    pub hub: String,

    /// Image tag override.
    pub tag: String,

    /// Image pull policy override.
    pub pull_policy: String,

    /// Path to the persisted operator config.
    pub config_file: PathBuf,
}

impl RenderRequest {
    pub fn from_settings(settings: &Settings, config_file: PathBuf) -> Self {
        Self {
            istioctl: settings.istioctl.clone(),
            istio_namespace: settings.system_namespace.clone(),
            manifests_dir: settings.manifests_dir(),
            hub: settings.image.hub.clone(),
            tag: settings.image.tag.clone(),
            pull_policy: settings.image.pull_policy.clone(),
            config_file,
        }
    }

    /// The full argument vector, a pure function of the request fields.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "manifest".to_string(),
            "generate".to_string(),
            "--istioNamespace".to_string(),
            self.istio_namespace.clone(),
            "--manifests".to_string(),
            self.manifests_dir.display().to_string(),
            "--set".to_string(),
            format!("hub={}", self.hub),
            "--set".to_string(),
            format!("tag={}", self.tag),
            "--set".to_string(),
            format!("values.global.imagePullPolicy={}", self.pull_policy),
            "-f".to_string(),
            self.config_file.display().to_string(),
        ]
    }
}

/// Run the render tool; stdout is the manifest, stderr diagnostics only.
///
/// On a nonzero exit both streams are logged at error severity and nothing
/// is passed downstream.
pub async fn render(request: &RenderRequest) -> Result<String> {
    let output = Command::new(&request.istioctl)
        .args(request.to_args())
        .output()
        .await
        .map_err(|e| {
            Error::Render(format!("failed running {}: {e}", request.istioctl.display()))
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        error!("render tool output: {}", stdout);
        error!("render tool diagnostics: {}", stderr);
        return Err(Error::Render(format!(
            "{} exited with {}: {}",
            request.istioctl.display(),
            output.status,
            stderr.trim()
        )));
    }

    Ok(stdout)
}
