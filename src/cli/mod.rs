//! CLI argument parsing

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// East-west gateway provisioning for multi-cluster mesh test environments.
#[derive(Parser)]
#[command(name = "eastwest-gateway", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the east-west gateway into a cluster and wait for readiness
    Deploy(DeployArgs),

    /// Expose cross-network services through an installed gateway
    ExposeServices(ExposeArgs),

    /// Expose the control-plane endpoint through an installed gateway
    ExposeIstiod(ExposeArgs),
}

/// Which cluster to operate on.
#[derive(ClapArgs)]
pub struct TargetOpts {
    /// Cluster name
    #[arg(long)]
    pub cluster: String,

    /// Network the cluster sits on
    #[arg(long)]
    pub network: String,
}

/// Environment shared by every subcommand.
#[derive(ClapArgs)]
pub struct EnvOpts {
    /// Control-plane namespace
    #[arg(long, default_value = "istio-system")]
    pub namespace: String,

    /// Source tree holding manifests and multicluster samples
    #[arg(long, env = "ISTIO_SRC")]
    pub source_dir: PathBuf,

    /// Image registry hub
    #[arg(long, env = "HUB")]
    pub hub: Option<String>,

    /// Image tag
    #[arg(long, env = "TAG")]
    pub tag: Option<String>,

    /// Image pull policy
    #[arg(long, env = "PULL_POLICY")]
    pub pull_policy: Option<String>,

    /// Path to the istioctl binary
    #[arg(long, default_value = "istioctl")]
    pub istioctl: PathBuf,
}

#[derive(ClapArgs)]
pub struct DeployArgs {
    /// Cluster to deploy into, as <name>=<network>; repeat for several
    /// clusters to deploy them concurrently
    #[arg(long = "cluster", value_name = "NAME=NETWORK", required = true, value_parser = parse_cluster_spec)]
    pub clusters: Vec<(String, String)>,

    #[command(flatten)]
    pub env: EnvOpts,

    /// Working directory for generated artifacts
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Mesh identifier grouping clusters for cross-cluster discovery
    #[arg(long, default_value = "mesh1")]
    pub mesh: String,

    /// Declare the environment single-cluster
    #[arg(long)]
    pub single_cluster: bool,

    /// Seconds between readiness polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Readiness deadline in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Also expose cross-network services once the gateway is ready
    #[arg(long)]
    pub expose_services: bool,

    /// Also expose the control-plane endpoint once the gateway is ready
    #[arg(long)]
    pub expose_istiod: bool,

    /// Tear the applied resources back down before exiting
    #[arg(long)]
    pub cleanup: bool,
}

#[derive(ClapArgs)]
pub struct ExposeArgs {
    #[command(flatten)]
    pub target: TargetOpts,

    #[command(flatten)]
    pub env: EnvOpts,
}

/// Parse a `<name>=<network>` cluster specification.
fn parse_cluster_spec(spec: &str) -> Result<(String, String), String> {
    match spec.split_once('=') {
        Some((name, network)) if !name.is_empty() && !network.is_empty() => {
            Ok((name.to_string(), network.to_string()))
        }
        _ => Err(format!("expected <name>=<network>, got {spec:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_args_parse() {
        let args = Args::parse_from([
            "eastwest-gateway",
            "deploy",
            "--cluster",
            "west=network-2",
            "--cluster",
            "east=network-1",
            "--source-dir",
            "/istio",
            "--hub",
            "gcr.io/istio-testing",
            "--tag",
            "latest",
            "--single-cluster",
        ]);

        match args.command {
            Command::Deploy(deploy) => {
                assert_eq!(
                    deploy.clusters,
                    vec![
                        ("west".to_string(), "network-2".to_string()),
                        ("east".to_string(), "network-1".to_string()),
                    ]
                );
                assert!(deploy.single_cluster);
                assert_eq!(deploy.mesh, "mesh1");
                assert_eq!(deploy.poll_interval, 5);
                assert_eq!(deploy.timeout, 300);
            }
            _ => panic!("expected deploy command"),
        }
    }

    #[test]
    fn test_cluster_spec_requires_name_and_network() {
        assert!(parse_cluster_spec("west=network-2").is_ok());
        assert!(parse_cluster_spec("west").is_err());
        assert!(parse_cluster_spec("=network-2").is_err());
        assert!(parse_cluster_spec("west=").is_err());
    }

    #[test]
    fn test_expose_args_parse() {
        let args = Args::parse_from([
            "eastwest-gateway",
            "expose-istiod",
            "--cluster",
            "east",
            "--network",
            "network-1",
            "--source-dir",
            "/istio",
        ]);

        match args.command {
            Command::ExposeIstiod(expose) => {
                assert_eq!(expose.target.cluster, "east");
                assert_eq!(expose.env.namespace, "istio-system");
            }
            _ => panic!("expected expose-istiod command"),
        }
    }
}
