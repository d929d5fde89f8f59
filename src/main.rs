//! East-west gateway provisioner
//!
//! Deploys a dedicated gateway for cross-cluster discovery and cross-network
//! services into member clusters of a mesh test environment, and exposes
//! services and the control plane through it.
//!
//! ```bash
//! # Deploy the gateway into the west cluster and expose services through it
//! eastwest-gateway deploy --cluster west=network-2 \
//!     --source-dir "$ISTIO_SRC" --work-dir /tmp/work --expose-services
//!
//! # Expose istiod through an already-installed gateway
//! eastwest-gateway expose-istiod --cluster west --network network-2 \
//!     --source-dir "$ISTIO_SRC"
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cleanup;
mod cli;
mod cluster;
mod config;
mod error;
mod gateway;
mod utils;

use cleanup::CleanupRegistry;
use cli::{Args, Command, DeployArgs, EnvOpts, ExposeArgs};
use cluster::{ClusterTarget, KubeCluster};
use config::{ImageSettings, Settings};
use gateway::GatewayDeployer;
use utils::retry::RetryPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();

    match args.command {
        Command::Deploy(deploy_args) => deploy(deploy_args).await,
        Command::ExposeServices(expose_args) => {
            let (settings, cluster) = connect(&expose_args).await?;
            gateway::apply_cross_network_gateway(&settings, &cluster).await?;
            Ok(())
        }
        Command::ExposeIstiod(expose_args) => {
            let (settings, cluster) = connect(&expose_args).await?;
            gateway::apply_istiod_gateway(&settings, &cluster).await?;
            Ok(())
        }
    }
}

async fn deploy(args: DeployArgs) -> Result<()> {
    let settings = Settings::new(&args.work_dir, &args.env.source_dir, image_settings(&args.env)?)
        .system_namespace(&args.env.namespace)
        .mesh_id(&args.mesh)
        .multicluster(!args.single_cluster)
        .istioctl(&args.env.istioctl)
        .readiness(RetryPolicy::new(
            Duration::from_secs(args.poll_interval),
            Duration::from_secs(args.timeout),
        ));
    settings.validate()?;

    let mut clusters: Vec<Arc<dyn ClusterTarget>> = Vec::with_capacity(args.clusters.len());
    for (name, network) in &args.clusters {
        clusters.push(Arc::new(KubeCluster::new(name, network).await?));
    }

    let deployer = GatewayDeployer::new(settings, CleanupRegistry::new());
    let outcome = deploy_and_expose(&deployer, &args, &clusters).await;

    // Whatever got registered is replayed, even after a partial failure.
    if args.cleanup {
        deployer.teardown(&clusters).await;
    }

    outcome
}

async fn deploy_and_expose(
    deployer: &GatewayDeployer,
    args: &DeployArgs,
    clusters: &[Arc<dyn ClusterTarget>],
) -> Result<()> {
    deployer.deploy_all(clusters.to_vec()).await?;
    info!(
        "registered {} manifest(s) for cleanup",
        deployer.registry().len()
    );

    for cluster in clusters {
        if args.expose_services {
            deployer.expose_services(cluster.as_ref()).await?;
        }
        if args.expose_istiod {
            deployer.expose_istiod(cluster.as_ref()).await?;
        }
    }

    Ok(())
}

async fn connect(args: &ExposeArgs) -> Result<(Settings, KubeCluster)> {
    let settings = Settings::new(".", &args.env.source_dir, image_settings(&args.env)?)
        .system_namespace(&args.env.namespace);

    let cluster = KubeCluster::new(&args.target.cluster, &args.target.network).await?;
    Ok((settings, cluster))
}

/// Image settings from flags, falling back to the process environment.
fn image_settings(env: &EnvOpts) -> Result<ImageSettings> {
    let settings = ImageSettings::resolve(|key| match key {
        "HUB" => env.hub.clone(),
        "TAG" => env.tag.clone(),
        "PULL_POLICY" => env.pull_policy.clone(),
        _ => None,
    })?;
    Ok(settings)
}
