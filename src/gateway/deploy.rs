//! Gateway deployment orchestration
//!
//! Runs the strictly sequential generate → persist → render → apply →
//! poll-ready pipeline for one cluster, and fans it out across clusters
//! when several are deployed in one run.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::cleanup::CleanupRegistry;
use crate::cluster::ClusterTarget;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::utils::retry;

use super::{
    apply_cross_network_gateway, apply_istiod_gateway, generate, persist, render,
    GenerateRequest, RenderRequest, EASTWEST_INGRESS_LABEL, EASTWEST_INGRESS_SERVICE,
};

/// Deploys the east-west gateway into member clusters.
#[derive(Clone)]
pub struct GatewayDeployer {
    settings: Settings,
    registry: CleanupRegistry,
}

impl GatewayDeployer {
    pub fn new(settings: Settings, registry: CleanupRegistry) -> Self {
        Self { settings, registry }
    }

    pub fn registry(&self) -> &CleanupRegistry {
        &self.registry
    }

    /// Deploy the east-west gateway into one cluster.
    ///
    /// Each stage aborts the remaining ones on failure. The applied manifest
    /// is registered for cleanup only once a gateway pod is Running.
    pub async fn deploy(&self, cluster: &dyn ClusterTarget) -> Result<()> {
        let request = GenerateRequest {
            script: self.settings.gen_gateway_script(),
            cluster_name: cluster.name().to_string(),
            network_name: cluster.network_name().to_string(),
            mesh_id: self.settings.mesh_id.clone(),
            single_cluster: !self.settings.multicluster,
        };
        let operator_config = generate(&request).await?;

        let config_file = self.settings.gateway_config_path(cluster.name());
        persist(&config_file, &operator_config)?;

        let render_request = RenderRequest::from_settings(&self.settings, config_file);
        info!(
            "Deploying east-west gateway in {}: {:?}",
            cluster.name(),
            render_request.to_args()
        );
        let manifest = render(&render_request).await?;

        cluster
            .apply_yaml(&self.settings.system_namespace, &manifest)
            .await
            .map_err(|source| Error::Apply {
                cluster: cluster.name().to_string(),
                source,
            })?;

        self.wait_for_ready(cluster).await?;

        self.registry.register(cluster.name(), manifest);
        info!("East-west gateway ready in {}", cluster.name());
        Ok(())
    }

    /// Deploy into every cluster concurrently, one task per cluster.
    pub async fn deploy_all(&self, clusters: Vec<Arc<dyn ClusterTarget>>) -> Result<()> {
        let mut names = Vec::with_capacity(clusters.len());
        let mut handles = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            names.push(cluster.name().to_string());
            let deployer = self.clone();
            handles.push(tokio::spawn(async move {
                deployer.deploy(cluster.as_ref()).await
            }));
        }

        for (name, joined) in names.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(result) => result?,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    return Err(Error::Apply {
                        cluster: name,
                        source: anyhow::anyhow!("deployment task did not finish: {e}"),
                    })
                }
            }
        }
        Ok(())
    }

    /// Expose cross-network services through the installed gateway.
    pub async fn expose_services(&self, cluster: &dyn ClusterTarget) -> Result<()> {
        apply_cross_network_gateway(&self.settings, cluster).await
    }

    /// Expose the control-plane endpoint through the installed gateway.
    pub async fn expose_istiod(&self, cluster: &dyn ClusterTarget) -> Result<()> {
        apply_istiod_gateway(&self.settings, cluster).await
    }

    /// Replay every registered manifest as a deletion, best effort.
    ///
    /// The registry is drained exactly once; records for clusters not in
    /// `clusters` are logged and skipped.
    pub async fn teardown(&self, clusters: &[Arc<dyn ClusterTarget>]) {
        for record in self.registry.drain() {
            let Some(cluster) = clusters.iter().find(|c| c.name() == record.cluster) else {
                warn!("no cluster named {} for teardown, skipping", record.cluster);
                continue;
            };

            info!("Tearing down east-west gateway in {}", record.cluster);
            if let Err(e) = cluster
                .delete_yaml(&self.settings.system_namespace, &record.manifest)
                .await
            {
                warn!(
                    "failed deleting east-west gateway resources from {}: {e:#}",
                    record.cluster
                );
            }
        }
    }

    /// Poll the cluster until a gateway pod is Running or the readiness
    /// budget is exhausted. List failures are transient and absorbed.
    async fn wait_for_ready(&self, cluster: &dyn ClusterTarget) -> Result<()> {
        let selector = format!("istio={EASTWEST_INGRESS_LABEL}");
        let namespace = &self.settings.system_namespace;

        retry::until_success(self.settings.readiness, || async {
            let pods = cluster
                .list_pods(namespace, &selector)
                .await
                .map_err(|e| format!("{e:#}"))?;

            let running = pods.iter().any(|p| {
                p.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running")
            });
            if running {
                Ok(())
            } else {
                Err(format!("no ready pods for {selector}"))
            }
        })
        .await
        .map_err(|timeout| Error::Timeout {
            waiting_for: format!("{EASTWEST_INGRESS_SERVICE} in {}", cluster.name()),
            elapsed: timeout.elapsed,
            last_observed: timeout.last_error,
        })
    }
}
