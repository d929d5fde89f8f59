//! Gateway exposure
//!
//! Applies the two fixed, pre-authored multicluster manifests through an
//! already-ready east-west gateway: one exposing cross-network services,
//! one exposing the control-plane endpoint. No templating, no retries.

use tracing::info;

use crate::cluster::ClusterTarget;
use crate::config::Settings;
use crate::error::{Error, Result};

/// Expose cross-network services through the east-west gateway.
pub async fn apply_cross_network_gateway(
    settings: &Settings,
    cluster: &dyn ClusterTarget,
) -> Result<()> {
    info!("Exposing services via east-west gateway in {}", cluster.name());
    cluster
        .apply_yaml_files(
            &settings.system_namespace,
            &[settings.expose_services_manifest()],
        )
        .await
        .map_err(|source| Error::Apply {
            cluster: cluster.name().to_string(),
            source,
        })
}

/// Expose the control-plane endpoint through the east-west gateway.
pub async fn apply_istiod_gateway(settings: &Settings, cluster: &dyn ClusterTarget) -> Result<()> {
    info!("Exposing istiod via east-west gateway in {}", cluster.name());
    cluster
        .apply_yaml_files(
            &settings.system_namespace,
            &[settings.expose_istiod_manifest()],
        )
        .await
        .map_err(|source| Error::Apply {
            cluster: cluster.name().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::testing::FakeCluster;
    use crate::config::ImageSettings;
    use tempfile::tempdir;

    const EXPOSE_SERVICES: &str = "kind: Gateway\nmetadata:\n  name: cross-network-gateway\n";
    const EXPOSE_ISTIOD: &str = "kind: Gateway\nmetadata:\n  name: istiod-gateway\n";

    fn settings_with_samples() -> (tempfile::TempDir, Settings) {
        let source = tempdir().unwrap();
        let samples = source.path().join("samples").join("multicluster");
        std::fs::create_dir_all(&samples).unwrap();
        std::fs::write(samples.join("expose-services.yaml"), EXPOSE_SERVICES).unwrap();
        std::fs::write(samples.join("expose-istiod.yaml"), EXPOSE_ISTIOD).unwrap();

        let settings = Settings::new(
            "/tmp",
            source.path(),
            ImageSettings::new("hub", "tag", "Always"),
        );
        (source, settings)
    }

    #[tokio::test]
    async fn test_expose_services_applies_file_verbatim() {
        let (_source, settings) = settings_with_samples();
        let cluster = FakeCluster::new("west", "network-2");

        apply_cross_network_gateway(&settings, &cluster).await.unwrap();

        let applied = cluster.applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].0, "istio-system");
        assert_eq!(applied[0].1, EXPOSE_SERVICES);
    }

    #[tokio::test]
    async fn test_expose_istiod_applies_file_verbatim() {
        let (_source, settings) = settings_with_samples();
        let cluster = FakeCluster::new("east", "network-1");

        apply_istiod_gateway(&settings, &cluster).await.unwrap();

        let applied = cluster.applied.lock().unwrap();
        assert_eq!(applied[0].1, EXPOSE_ISTIOD);
    }

    #[tokio::test]
    async fn test_expose_failure_propagates_unmodified() {
        let (_source, settings) = settings_with_samples();
        let cluster = FakeCluster::new("west", "network-2").fail_apply();

        let err = apply_cross_network_gateway(&settings, &cluster)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Apply { .. }));
    }
}
