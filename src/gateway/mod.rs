//! East-west gateway provisioning
//!
//! Sequences the full deployment of a cross-cluster gateway: generate the
//! operator config, persist it, render it into cluster resources, apply
//! them, and wait for a ready pod. Exposure of services and the control
//! plane through the installed gateway lives here too.

mod deploy;
mod expose;
mod generate;
mod render;

pub use deploy::GatewayDeployer;
pub use expose::{apply_cross_network_gateway, apply_istiod_gateway};
pub use generate::{generate, persist, GenerateRequest};
pub use render::{render, RenderRequest};

/// Value of the `istio` label carried by east-west ingress pods.
pub const EASTWEST_INGRESS_LABEL: &str = "eastwestgateway";

/// Service name of the east-west ingress, used in readiness reporting.
pub const EASTWEST_INGRESS_SERVICE: &str = "istio-eastwestgateway";
