//! Cluster targets
//!
//! A [`ClusterTarget`] is one member cluster of the mesh: it knows its own
//! name and network and can list pods and apply or delete manifest text.
//! [`KubeCluster`] is the real implementation on top of the Kubernetes API.

#![allow(dead_code)]

mod apply;

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, ListParams},
    Client, Config,
};

/// One member cluster of the mesh under test.
#[async_trait]
pub trait ClusterTarget: Send + Sync {
    /// Cluster name, unique within the mesh.
    fn name(&self) -> &str;

    /// Name of the network this cluster sits on.
    fn network_name(&self) -> &str;

    /// List pods in `namespace` matching `label_selector`.
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    /// Apply manifest text to `namespace`.
    async fn apply_yaml(&self, namespace: &str, yaml: &str) -> Result<()>;

    /// Delete the resources described by manifest text from `namespace`.
    async fn delete_yaml(&self, namespace: &str, yaml: &str) -> Result<()>;

    /// Apply each manifest file to `namespace`, verbatim, in order.
    async fn apply_yaml_files(&self, namespace: &str, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            let yaml = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read manifest {}", path.display()))?;
            self.apply_yaml(namespace, &yaml).await?;
        }
        Ok(())
    }
}

/// Cluster target backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeCluster {
    name: String,
    network: String,
    client: Client,
}

impl KubeCluster {
    /// Connect using the default kubeconfig resolution.
    pub async fn new(name: impl Into<String>, network: impl Into<String>) -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;

        Ok(Self {
            name: name.into(),
            network: network.into(),
            client,
        })
    }

    /// Connect using an explicit client configuration.
    pub async fn with_config(
        name: impl Into<String>,
        network: impl Into<String>,
        config: Config,
    ) -> Result<Self> {
        let client =
            Client::try_from(config).context("Failed to create Kubernetes client from config")?;

        Ok(Self {
            name: name.into(),
            network: network.into(),
            client,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ClusterTarget for KubeCluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn network_name(&self) -> &str {
        &self.network
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);
        let list = pods.list(&params).await.context("Failed to list pods")?;
        Ok(list.items)
    }

    async fn apply_yaml(&self, namespace: &str, yaml: &str) -> Result<()> {
        apply::apply_manifest(&self.client, namespace, yaml).await
    }

    async fn delete_yaml(&self, namespace: &str, yaml: &str) -> Result<()> {
        apply::delete_manifest(&self.client, namespace, yaml).await
    }
}
