//! Deployment settings
//!
//! Resolves everything a gateway deployment needs up front: namespaces,
//! working directory, image settings, mesh identity, and the locations of
//! the external tooling inside the source tree.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::retry::RetryPolicy;

/// Default control-plane namespace.
pub const DEFAULT_SYSTEM_NAMESPACE: &str = "istio-system";

/// Default mesh identifier grouping clusters for cross-cluster discovery.
pub const DEFAULT_MESH_ID: &str = "mesh1";

const DEFAULT_PULL_POLICY: &str = "Always";

/// Container image settings forwarded to the render tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSettings {
    /// Image registry hub.
    pub hub: String,

    /// Image tag.
    pub tag: String,

    /// Image pull policy.
    pub pull_policy: String,
}

impl ImageSettings {
    pub fn new(
        hub: impl Into<String>,
        tag: impl Into<String>,
        pull_policy: impl Into<String>,
    ) -> Self {
        Self {
            hub: hub.into(),
            tag: tag.into(),
            pull_policy: pull_policy.into(),
        }
    }

    /// Resolve image settings from process environment variables
    /// (`HUB`, `TAG`, `PULL_POLICY`).
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve image settings through `lookup`. `HUB` and `TAG` are
    /// required; `PULL_POLICY` falls back to `Always`.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let hub = lookup("HUB").ok_or_else(|| Error::Config("HUB is not set".to_string()))?;
        let tag = lookup("TAG").ok_or_else(|| Error::Config("TAG is not set".to_string()))?;
        let pull_policy = lookup("PULL_POLICY").unwrap_or_else(|| DEFAULT_PULL_POLICY.to_string());

        Ok(Self {
            hub,
            tag,
            pull_policy,
        })
    }
}

/// Everything one deployment run needs, constructed once per run.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Namespace the gateway and control plane live in.
    pub system_namespace: String,

    /// Working directory for generated artifacts.
    pub work_dir: PathBuf,

    /// Mesh identifier handed to the config generator.
    pub mesh_id: String,

    /// Whether the overall environment spans multiple clusters.
    pub multicluster: bool,

    /// Image settings forwarded to the render tool.
    pub image: ImageSettings,

    /// Root of the source tree holding manifests and multicluster samples.
    pub source_dir: PathBuf,

    /// Path to the render tool binary.
    pub istioctl: PathBuf,

    /// Readiness polling interval and deadline.
    pub readiness: RetryPolicy,
}

impl Settings {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        image: ImageSettings,
    ) -> Self {
        Self {
            system_namespace: DEFAULT_SYSTEM_NAMESPACE.to_string(),
            work_dir: work_dir.into(),
            mesh_id: DEFAULT_MESH_ID.to_string(),
            multicluster: true,
            image,
            source_dir: source_dir.into(),
            istioctl: PathBuf::from("istioctl"),
            readiness: RetryPolicy::default(),
        }
    }

    pub fn system_namespace(mut self, ns: impl Into<String>) -> Self {
        self.system_namespace = ns.into();
        self
    }

    pub fn mesh_id(mut self, id: impl Into<String>) -> Self {
        self.mesh_id = id.into();
        self
    }

    pub fn multicluster(mut self, multicluster: bool) -> Self {
        self.multicluster = multicluster;
        self
    }

    pub fn istioctl(mut self, path: impl Into<PathBuf>) -> Self {
        self.istioctl = path.into();
        self
    }

    pub fn readiness(mut self, policy: RetryPolicy) -> Self {
        self.readiness = policy;
        self
    }

    /// Directory of installation manifests consumed by the render tool.
    pub fn manifests_dir(&self) -> PathBuf {
        self.source_dir.join("manifests")
    }

    /// Directory of pre-authored multicluster sample manifests.
    pub fn multicluster_samples_dir(&self) -> PathBuf {
        self.source_dir.join("samples").join("multicluster")
    }

    /// The external gateway config generation script.
    pub fn gen_gateway_script(&self) -> PathBuf {
        self.multicluster_samples_dir()
            .join("gen-eastwest-gateway.sh")
    }

    /// Fixed manifest exposing cross-network services.
    pub fn expose_services_manifest(&self) -> PathBuf {
        self.multicluster_samples_dir().join("expose-services.yaml")
    }

    /// Fixed manifest exposing the control-plane endpoint.
    pub fn expose_istiod_manifest(&self) -> PathBuf {
        self.multicluster_samples_dir().join("expose-istiod.yaml")
    }

    /// Destination for the generated operator config, one file per cluster,
    /// overwritten on re-deploy.
    pub fn gateway_config_path(&self, cluster_name: &str) -> PathBuf {
        self.work_dir.join(format!("eastwest-{cluster_name}.yaml"))
    }

    /// Verify that directories the run depends on actually exist.
    pub fn validate(&self) -> Result<()> {
        require_dir(&self.work_dir, "working directory")?;
        require_dir(&self.source_dir, "source directory")?;
        Ok(())
    }
}

fn require_dir(path: &Path, what: &str) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{what} {} does not exist",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageSettings {
        ImageSettings::new("gcr.io/istio-testing", "latest", "Always")
    }

    #[test]
    fn test_image_settings_resolve() {
        let vars = [("HUB", "docker.io/istio"), ("TAG", "1.9.0")];
        let settings = ImageSettings::resolve(|k| {
            vars.iter().find(|(n, _)| *n == k).map(|(_, v)| v.to_string())
        })
        .unwrap();

        assert_eq!(settings.hub, "docker.io/istio");
        assert_eq!(settings.tag, "1.9.0");
        assert_eq!(settings.pull_policy, "Always");
    }

    #[test]
    fn test_image_settings_require_hub_and_tag() {
        let err = ImageSettings::resolve(|_| None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("HUB"));

        let err = ImageSettings::resolve(|k| (k == "HUB").then(|| "h".to_string())).unwrap_err();
        assert!(err.to_string().contains("TAG"));
    }

    #[test]
    fn test_gateway_config_path_is_per_cluster() {
        let settings = Settings::new("/work", "/istio", image());
        assert_eq!(
            settings.gateway_config_path("west"),
            PathBuf::from("/work/eastwest-west.yaml")
        );
        assert_eq!(
            settings.gateway_config_path("east"),
            PathBuf::from("/work/eastwest-east.yaml")
        );
    }

    #[test]
    fn test_sample_paths_live_under_multicluster_samples() {
        let settings = Settings::new("/work", "/istio", image());
        let samples = PathBuf::from("/istio/samples/multicluster");

        assert_eq!(
            settings.gen_gateway_script(),
            samples.join("gen-eastwest-gateway.sh")
        );
        assert_eq!(
            settings.expose_services_manifest(),
            samples.join("expose-services.yaml")
        );
        assert_eq!(
            settings.expose_istiod_manifest(),
            samples.join("expose-istiod.yaml")
        );
    }

    #[test]
    fn test_builder_overrides() {
        let settings = Settings::new("/work", "/istio", image())
            .system_namespace("mesh-system")
            .mesh_id("mesh2")
            .multicluster(false)
            .istioctl("/usr/local/bin/istioctl");

        assert_eq!(settings.system_namespace, "mesh-system");
        assert_eq!(settings.mesh_id, "mesh2");
        assert!(!settings.multicluster);
        assert_eq!(settings.istioctl, PathBuf::from("/usr/local/bin/istioctl"));
    }
}
